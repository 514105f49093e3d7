use solid_client::mock::MockFetcher;
use solid_client_cli::run_with_fetcher;
use std::process::Command;

const PROFILE: &str = "<https://pod.example/profile#me> <http://xmlns.com/foaf/0.1/name> \"Vincent\" .\n";

const CONTAINER_ACL: &str = r#"
@prefix acl: <http://www.w3.org/ns/auth/acl#> .
<#owner> a acl:Authorization ;
    acl:agent <https://id.example/alice> ;
    acl:accessTo <https://pod.example/c/> ;
    acl:default <https://pod.example/c/> ;
    acl:mode acl:Read, acl:Write, acl:Control .
"#;

fn solid(args: &[&str], fetcher: &MockFetcher) -> anyhow::Result<String> {
    let mut out = Vec::new();
    let argv = std::iter::once("solid").chain(args.iter().copied());
    run_with_fetcher(argv, fetcher, &mut out)?;
    Ok(String::from_utf8(out)?)
}

fn wac_pod() -> MockFetcher {
    MockFetcher::new()
        .with_turtle("https://pod.example/c/", "")
        .with_turtle("https://pod.example/c/.acl", CONTAINER_ACL)
        .with_turtle("https://pod.example/c/doc", PROFILE)
        .with_acl("https://pod.example/c/", "https://pod.example/c/.acl")
        .with_acl("https://pod.example/c/doc", "https://pod.example/c/doc.acl")
}

#[test]
fn binary_requires_a_command() {
    let out = Command::new(env!("CARGO_BIN_EXE_solid")).output().expect("run solid");
    assert!(!out.status.success(), "expected usage error without arguments");
}

#[test]
fn binary_prints_its_version() {
    let out = Command::new(env!("CARGO_BIN_EXE_solid"))
        .arg("version")
        .output()
        .expect("run version");
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).starts_with("solid "));
}

#[test]
fn binary_refuses_the_network_when_offline() {
    let out = Command::new(env!("CARGO_BIN_EXE_solid"))
        .args(["--offline", "get", "https://pod.example/profile"])
        .output()
        .expect("run get");
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("offline"), "unexpected error: {stderr}");
}

#[test]
fn get_prints_turtle_and_markdown() {
    let fetcher = MockFetcher::new().with_turtle("https://pod.example/profile", PROFILE);
    let turtle = solid(&["get", "https://pod.example/profile"], &fetcher).unwrap();
    assert!(turtle.contains("<https://pod.example/profile#me>"));
    assert!(turtle.contains("Vincent"));

    let markdown = solid(&["get", "--markdown", "https://pod.example/profile"], &fetcher).unwrap();
    assert!(markdown.starts_with("# SolidDataset: https://pod.example/profile"));
    assert!(markdown.contains("Vincent"));

    let err = solid(&["get", "-f", "rdfxml", "https://pod.example/profile"], &fetcher).unwrap_err();
    assert!(err.to_string().contains("Unsupported format"));
}

#[test]
fn containers_can_be_listed_created_and_removed() {
    let fetcher = MockFetcher::new()
        .with_turtle("https://pod.example/", "")
        .with_turtle("https://pod.example/notes/a", "");
    let created = solid(&["mkdir", "https://pod.example/archive"], &fetcher).unwrap();
    assert_eq!(created.trim(), "https://pod.example/archive/");

    let listing = solid(&["ls", "https://pod.example/"], &fetcher).unwrap();
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines, vec!["https://pod.example/archive/", "https://pod.example/notes/"]);

    solid(&["rm", "https://pod.example/notes/a"], &fetcher).unwrap();
    assert!(!fetcher.contains("https://pod.example/notes/a"));
    solid(&["rm", "https://pod.example/archive/"], &fetcher).unwrap();
    assert!(!fetcher.contains("https://pod.example/archive/"));

    let err = solid(&["ls", "https://pod.example/notes/a"], &fetcher).unwrap_err();
    assert!(err.to_string().contains("404"), "unexpected error: {err}");
}

#[test]
fn info_reports_the_access_protocol() {
    let fetcher = wac_pod();
    let text = solid(&["info", "https://pod.example/c/doc"], &fetcher).unwrap();
    assert!(text.contains("Access protocol: WAC"));
    assert!(text.contains("Access control document: https://pod.example/c/doc.acl"));

    let json = solid(&["info", "--json", "https://pod.example/c/doc"], &fetcher).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["accessProtocol"], "WAC");
    assert_eq!(value["isContainer"], false);
}

#[test]
fn access_can_be_read_and_changed() {
    let fetcher = wac_pod();
    let all = solid(&["access", "https://pod.example/c/doc"], &fetcher).unwrap();
    assert_eq!(
        all.trim(),
        "https://id.example/alice: read, append, write, controlRead, controlWrite"
    );

    let changed = solid(
        &["set-access", "https://pod.example/c/doc", "--agent", "https://id.example/bob", "--read", "true"],
        &fetcher,
    )
    .unwrap();
    assert_eq!(changed.trim(), "https://id.example/bob: read");
    assert!(fetcher.contains("https://pod.example/c/doc.acl"));

    let bob = solid(
        &["access", "--json", "--agent", "https://id.example/bob", "https://pod.example/c/doc"],
        &fetcher,
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&bob).unwrap();
    assert_eq!(value["https://id.example/bob"]["read"], true);
    assert_eq!(value["https://id.example/bob"]["write"], false);

    let public = solid(&["access", "--public", "https://pod.example/c/doc"], &fetcher).unwrap();
    assert_eq!(public.trim(), "public: none");
}

#[test]
fn set_access_needs_an_agent_or_public() {
    let fetcher = wac_pod();
    assert!(solid(&["set-access", "https://pod.example/c/doc", "--read", "true"], &fetcher).is_err());
    assert!(fetcher.requests().is_empty());
}

#[test]
fn cat_writes_raw_bytes() {
    let fetcher = MockFetcher::new().with_resource("https://pod.example/files/a.txt", "text/plain", "hello");
    let out = solid(&["cat", "https://pod.example/files/a.txt"], &fetcher).unwrap();
    assert_eq!(out, "hello");
}
