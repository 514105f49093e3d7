use solid_client::accessors::{
    add_boolean, add_string_no_locale, add_url, get_boolean_all, get_string_no_locale, get_url, get_url_all,
    remove_boolean, set_integer,
};
use solid_client::consts::{TYPE, XSD_BOOLEAN};
use solid_client::dataset::{create_solid_dataset, ResourceInfo, SolidDataset};
use solid_client::options::{BlankNodeThings, ChainDetection};
use solid_client::store::BlankNodeValue;
use solid_client::thing::{create_thing, create_thing_with_url, get_thing, get_thing_all, remove_thing, set_thing};
use oxigraph::model::{BlankNode, GraphName, Literal, NamedNode, Quad, Term};
use std::collections::HashSet;

const PERSON: &str = "https://schema.example/Person";

fn iri(s: &str) -> NamedNode {
    NamedNode::new(s).unwrap()
}

fn quad(s: &str, p: &str, o: impl Into<Term>) -> Quad {
    Quad::new(iri(s), iri(p), o, GraphName::DefaultGraph)
}

#[test]
fn test_quads_round_trip_without_blank_nodes() {
    let quads = vec![
        quad("https://pod.example/doc#me", TYPE.as_str(), iri(PERSON)),
        quad("https://pod.example/doc#me", "https://vocab.example/name", Literal::new_simple_literal("Me")),
        quad(
            "https://pod.example/doc#me",
            "https://vocab.example/name",
            Literal::new_language_tagged_literal("Moi", "fr").unwrap(),
        ),
        Quad::new(
            iri("https://pod.example/doc#you"),
            iri("https://vocab.example/age"),
            Literal::new_typed_literal("42", iri("http://www.w3.org/2001/XMLSchema#integer")),
            iri("https://pod.example/graphs/g1"),
        ),
    ];
    let dataset = SolidDataset::from_quads(&quads, ChainDetection::Enabled).unwrap();
    let expected: HashSet<Quad> = quads.into_iter().collect();
    let actual: HashSet<Quad> = dataset.to_quads().into_iter().collect();
    assert_eq!(expected, actual);
}

#[test]
fn test_blank_node_chains_are_nested() {
    let address = BlankNode::new("address").unwrap();
    let quads = vec![
        quad("https://pod.example/doc#me", "https://vocab.example/address", address.clone()),
        Quad::new(
            address,
            iri("https://vocab.example/city"),
            Literal::new_simple_literal("Ghent"),
            GraphName::DefaultGraph,
        ),
    ];
    let dataset = SolidDataset::from_quads(&quads, ChainDetection::Enabled).unwrap();
    // the chain node is nested in its parent, not a Thing of its own
    assert_eq!(get_thing_all(&dataset, BlankNodeThings::Include).len(), 1);
    let me = get_thing(&dataset, "https://pod.example/doc#me").unwrap();
    let objects = me.objects("https://vocab.example/address").unwrap();
    match &objects.blank_nodes[..] {
        [BlankNodeValue::Nested(predicates)] => assert!(predicates.contains_key("https://vocab.example/city")),
        other => panic!("expected one nested Blank Node, got {other:?}"),
    }
    // re-serialising keeps the structure, with a fresh Blank Node
    let out = dataset.to_quads();
    assert_eq!(out.len(), 2);

    let opaque = SolidDataset::from_quads(&quads, ChainDetection::Disabled).unwrap();
    assert_eq!(get_thing_all(&opaque, BlankNodeThings::Include).len(), 2);
    assert_eq!(get_thing_all(&opaque, BlankNodeThings::Exclude).len(), 1);
}

#[test]
fn test_chains_referenced_by_two_predicates_of_one_subject_are_nested() {
    let place = BlankNode::new("place").unwrap();
    let quads = vec![
        quad("https://pod.example/doc#me", "https://vocab.example/home", place.clone()),
        quad("https://pod.example/doc#me", "https://vocab.example/work", place.clone()),
        Quad::new(place, iri("https://vocab.example/city"), Literal::new_simple_literal("Ghent"), GraphName::DefaultGraph),
    ];
    let dataset = SolidDataset::from_quads(&quads, ChainDetection::Enabled).unwrap();
    assert_eq!(get_thing_all(&dataset, BlankNodeThings::Include).len(), 1);
    let me = get_thing(&dataset, "https://pod.example/doc#me").unwrap();
    for predicate in ["https://vocab.example/home", "https://vocab.example/work"] {
        let objects = me.objects(predicate).unwrap();
        assert!(matches!(&objects.blank_nodes[..], [BlankNodeValue::Nested(_)]));
    }
}

#[test]
fn test_blank_node_cycles_terminate_with_opaque_ids() {
    let a = BlankNode::new("a").unwrap();
    let b = BlankNode::new("b").unwrap();
    let quads = vec![
        quad("https://pod.example/doc#me", "https://vocab.example/p", a.clone()),
        Quad::new(a.clone(), iri("https://vocab.example/p"), b.clone(), GraphName::DefaultGraph),
        Quad::new(b, iri("https://vocab.example/p"), a, GraphName::DefaultGraph),
    ];
    let dataset = SolidDataset::from_quads(&quads, ChainDetection::Enabled).unwrap();
    let me = get_thing(&dataset, "https://pod.example/doc#me").unwrap();
    let objects = me.objects("https://vocab.example/p").unwrap();
    assert_eq!(objects.blank_nodes, vec![BlankNodeValue::Id("_:a".to_string())]);
    assert_eq!(dataset.to_quads().len(), 3);
}

#[test]
fn test_things_round_trip_through_a_dataset() {
    let thing = create_thing_with_url("https://pod.example/doc#me").unwrap();
    let thing = add_url(&thing, &TYPE, PERSON).unwrap();
    let thing = add_string_no_locale(&thing, "https://vocab.example/name", "Me").unwrap();
    let dataset = set_thing(&create_solid_dataset(), &thing).unwrap();

    let stored = get_thing(&dataset, "https://pod.example/doc#me").unwrap();
    assert_eq!(get_url(&stored, &TYPE).unwrap(), Some(PERSON.to_string()));
    assert_eq!(
        get_string_no_locale(&stored, "https://vocab.example/name").unwrap(),
        Some("Me".to_string())
    );
    // the original dataset is untouched
    assert!(get_thing(&create_solid_dataset(), "https://pod.example/doc#me").is_none());
}

#[test]
fn test_removing_a_boolean_matches_by_value() {
    let thing = create_thing_with_url("https://pod.example/doc#me").unwrap();
    let stored_as_zero = Quad::new(
        iri("https://pod.example/doc#me"),
        iri("https://vocab.example/flag"),
        Literal::new_typed_literal("0", XSD_BOOLEAN),
        GraphName::DefaultGraph,
    );
    let dataset = SolidDataset::from_quads(&[stored_as_zero], ChainDetection::Enabled).unwrap();
    let thing = get_thing(&dataset, thing.url()).unwrap();
    assert_eq!(get_boolean_all(&thing, "https://vocab.example/flag").unwrap(), vec![false]);

    let removed = remove_boolean(&thing, "https://vocab.example/flag", false).unwrap();
    assert!(get_boolean_all(&removed, "https://vocab.example/flag").unwrap().is_empty());

    let both = add_boolean(&thing, "https://vocab.example/flag", true).unwrap();
    let kept = remove_boolean(&both, "https://vocab.example/flag", false).unwrap();
    assert_eq!(get_boolean_all(&kept, "https://vocab.example/flag").unwrap(), vec![true]);
}

#[test]
fn test_local_things_resolve_once_the_dataset_has_a_url() {
    let fetched = create_solid_dataset().with_resource_info(ResourceInfo::new("https://pod.example/doc"));
    let thing = create_thing();
    let thing = set_integer(&thing, "https://vocab.example/age", 7).unwrap();
    let dataset = set_thing(&fetched, &thing).unwrap();
    let things = get_thing_all(&dataset, BlankNodeThings::Exclude);
    assert_eq!(things.len(), 1);
    assert!(things[0].url().starts_with("https://pod.example/doc#"));
    // the local Thing still finds its stored version
    assert!(get_thing(&dataset, &thing).is_some());
}

#[test]
fn test_change_log_cancels_in_both_directions() {
    let fetched = SolidDataset::from_quads(
        &[quad("https://pod.example/doc#me", "https://vocab.example/knows", iri("https://pod.example/doc#you"))],
        ChainDetection::Enabled,
    )
    .unwrap();
    let me = get_thing(&fetched, "https://pod.example/doc#me").unwrap();

    // delete then re-add: nothing pending
    let removed = remove_thing(&fetched, &me);
    assert_eq!(removed.change_log().unwrap().deletions.len(), 1);
    let restored = set_thing(&removed, &me).unwrap();
    assert!(restored.change_log().unwrap().is_empty());

    // add then delete: nothing pending
    let friend = add_url(&me, "https://vocab.example/knows", "https://pod.example/doc#them").unwrap();
    let added = set_thing(&fetched, &friend).unwrap();
    let log = added.change_log().unwrap();
    assert_eq!(log.additions.len(), 1);
    assert!(log.deletions.is_empty());
    let reverted = set_thing(&added, &me).unwrap();
    assert!(reverted.change_log().unwrap().is_empty());
    assert_eq!(
        get_url_all(&get_thing(&reverted, &me).unwrap(), "https://vocab.example/knows").unwrap(),
        vec!["https://pod.example/doc#you".to_string()]
    );
}
