use solid_client::access::WacAccessModes;
use solid_client::errors::AccessModeError;
use solid_client::mock::MockFetcher;
use solid_client::wac::{
    create_acl, create_acl_from_fallback_acl, delete_acl_for, get_agent_access, get_agent_access_all,
    get_agent_resource_access, get_fallback_acl, get_public_access, get_resource_acl, get_solid_dataset_with_acl,
    has_accessible_acl, has_fallback_acl, has_resource_acl, save_acl_for, set_agent_resource_access,
    set_public_resource_access,
};

const ALICE: &str = "https://id.example/alice";
const BOB: &str = "https://id.example/bob";

const CONTAINER_ACL: &str = r#"
@prefix acl: <http://www.w3.org/ns/auth/acl#> .
<#owner> a acl:Authorization ;
    acl:agent <https://id.example/alice> ;
    acl:accessTo <https://pod.example/c/> ;
    acl:default <https://pod.example/c/> ;
    acl:mode acl:Read, acl:Write, acl:Control .
<#public> a acl:Authorization ;
    acl:agentClass <http://xmlns.com/foaf/0.1/Agent> ;
    acl:default <https://pod.example/c/> ;
    acl:mode acl:Read .
"#;

fn pod() -> MockFetcher {
    MockFetcher::new()
        .with_turtle("https://pod.example/c/", "")
        .with_turtle("https://pod.example/c/.acl", CONTAINER_ACL)
        .with_turtle("https://pod.example/c/doc", "<#it> <https://vocab.example/p> \"v\" .")
        .with_acl("https://pod.example/c/", "https://pod.example/c/.acl")
        .with_acl("https://pod.example/c/doc", "https://pod.example/c/doc.acl")
}

#[test]
fn test_fallback_acl_is_used_when_the_resource_has_none() {
    let fetcher = pod();
    let doc = get_solid_dataset_with_acl("https://pod.example/c/doc", &fetcher).unwrap();
    assert!(has_accessible_acl(&doc));
    assert!(!has_resource_acl(&doc));
    assert!(has_fallback_acl(&doc));
    assert_eq!(get_fallback_acl(&doc).unwrap().access_to(), "https://pod.example/c/");

    let alice = get_agent_access(&doc, ALICE).unwrap();
    assert_eq!(alice, WacAccessModes::new(true, true, true, true));
    assert_eq!(get_agent_access(&doc, BOB), Some(WacAccessModes::none()));
    assert_eq!(get_public_access(&doc), Some(WacAccessModes::new(true, false, false, false)));
}

#[test]
fn test_resource_acl_created_from_the_fallback() {
    let fetcher = pod();
    let doc = get_solid_dataset_with_acl("https://pod.example/c/doc", &fetcher).unwrap();
    let acl = create_acl_from_fallback_acl(&doc).unwrap();
    assert_eq!(acl.access_to(), "https://pod.example/c/doc");
    assert_eq!(
        get_agent_resource_access(&acl, ALICE),
        WacAccessModes::new(true, true, true, true)
    );

    let acl = set_agent_resource_access(&acl, BOB, WacAccessModes::new(true, false, false, false)).unwrap();
    save_acl_for(&doc, &acl, &fetcher).unwrap();
    assert!(fetcher.contains("https://pod.example/c/doc.acl"));

    let doc = get_solid_dataset_with_acl("https://pod.example/c/doc", &fetcher).unwrap();
    assert!(has_resource_acl(&doc));
    assert!(get_fallback_acl(&doc).is_none());
    let all = get_agent_access_all(&doc).unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[BOB], WacAccessModes::new(true, false, false, false));
    assert_eq!(all[ALICE], WacAccessModes::new(true, true, true, true));
    assert_eq!(get_public_access(&doc), Some(WacAccessModes::new(true, false, false, false)));

    // the container's own ACL is untouched
    let container = get_solid_dataset_with_acl("https://pod.example/c/", &fetcher).unwrap();
    assert!(get_agent_access(&container, BOB).unwrap().is_empty());
}

#[test]
fn test_revoking_access_keeps_other_actors() {
    let fetcher = pod();
    let doc = get_solid_dataset_with_acl("https://pod.example/c/doc", &fetcher).unwrap();
    let acl = create_acl_from_fallback_acl(&doc).unwrap();
    let acl = set_public_resource_access(&acl, WacAccessModes::none()).unwrap();
    let acl = set_agent_resource_access(&acl, ALICE, WacAccessModes::new(true, false, false, false)).unwrap();

    let doc = solid_client::mock::add_mock_resource_acl_to(&doc, acl.dataset()).unwrap();
    let resource_acl = get_resource_acl(&doc).unwrap();
    assert_eq!(resource_acl.dataset().source_url(), Some("https://pod.example/c/doc.acl"));
    assert_eq!(get_public_access(&doc), Some(WacAccessModes::none()));
    assert_eq!(get_agent_access(&doc, ALICE), Some(WacAccessModes::new(true, false, false, false)));
}

#[test]
fn test_deleting_the_resource_acl_restores_the_fallback() {
    let fetcher = pod().with_turtle(
        "https://pod.example/c/doc.acl",
        "<#r> a <http://www.w3.org/ns/auth/acl#Authorization> ; \
         <http://www.w3.org/ns/auth/acl#agent> <https://id.example/bob> ; \
         <http://www.w3.org/ns/auth/acl#accessTo> <https://pod.example/c/doc> ; \
         <http://www.w3.org/ns/auth/acl#mode> <http://www.w3.org/ns/auth/acl#Read> .",
    );
    let doc = get_solid_dataset_with_acl("https://pod.example/c/doc", &fetcher).unwrap();
    assert!(has_resource_acl(&doc));
    assert_eq!(get_agent_access(&doc, ALICE), Some(WacAccessModes::none()));

    let doc = delete_acl_for(&doc, &fetcher).unwrap();
    assert!(!has_resource_acl(&doc));
    assert!(!fetcher.contains("https://pod.example/c/doc.acl"));

    let doc = get_solid_dataset_with_acl("https://pod.example/c/doc", &fetcher).unwrap();
    assert!(get_agent_access(&doc, ALICE).unwrap().control);
}

#[test]
fn test_resources_without_an_acl_link() {
    let fetcher = MockFetcher::new().with_turtle("https://pod.example/open", "");
    let open = get_solid_dataset_with_acl("https://pod.example/open", &fetcher).unwrap();
    assert!(!has_accessible_acl(&open));
    assert_eq!(get_agent_access(&open, ALICE), None);
    let err = create_acl(&open).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AccessModeError>(),
        Some(AccessModeError::NoAccessControl(_))
    ));
}
