//! Creating Things and storing them in, or removing them from, a SolidDataset.
//!
//! A Thing created locally gets a Local Node IRI under
//! [`LOCAL_NODE_PREFIX`](crate::consts::LOCAL_NODE_PREFIX). Once the Thing is
//! stored in a dataset that knows its source URL, or once that dataset is
//! saved, the Local Node IRI becomes `<resource>#<name>`.

use crate::changelog::{record_additions, record_deletions};
use crate::consts::{DEFAULT_GRAPH, LOCAL_NODE_PREFIX};
use crate::dataset::SolidDataset;
use crate::errors::{AccessorError, LocalNodeError};
use crate::options::BlankNodeThings;
use crate::store::{graph_name, Thing};
use crate::util::strip_fragment;
use anyhow::{anyhow, Result};
use oxigraph::model::{NamedNode, NamedNodeRef};
use rand::distr::Alphanumeric;
use rand::Rng;

/// Anything that identifies a Thing or a value by IRI.
pub trait AsIri {
    fn as_iri(&self) -> &str;
}

impl AsIri for str {
    fn as_iri(&self) -> &str {
        self
    }
}

impl AsIri for String {
    fn as_iri(&self) -> &str {
        self
    }
}

impl AsIri for Thing {
    fn as_iri(&self) -> &str {
        self.url()
    }
}

impl AsIri for NamedNode {
    fn as_iri(&self) -> &str {
        self.as_str()
    }
}

impl AsIri for NamedNodeRef<'_> {
    fn as_iri(&self) -> &str {
        self.as_str()
    }
}

pub(crate) fn random_name() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// A new, empty Thing with a random Local Node IRI.
pub fn create_thing() -> Thing {
    create_thing_named(&random_name())
}

/// A new, empty Thing that will be saved as `<resource>#<name>`.
pub fn create_thing_named(name: &str) -> Thing {
    Thing::new(format!("{LOCAL_NODE_PREFIX}{name}"))
}

/// A new, empty Thing with a fixed URL.
pub fn create_thing_with_url(url: &str) -> Result<Thing> {
    NamedNode::new(url).map_err(|_| anyhow!(AccessorError::ValidThingUrlExpected(url.to_string())))?;
    Ok(Thing::new(url))
}

pub fn is_thing_local(thing: &Thing) -> bool {
    local_node_name(thing.url()).is_some()
}

/// The name of a Local Node IRI, or `None` for any other IRI.
pub fn local_node_name(iri: &str) -> Option<&str> {
    iri.strip_prefix(LOCAL_NODE_PREFIX)
}

/// Turns a Local Node IRI into a fragment of `base`. Other IRIs are returned as is.
pub fn resolve_local_iri(iri: &str, base: &str) -> String {
    match local_node_name(iri) {
        Some(name) => format!("{}#{}", strip_fragment(base), name),
        None => iri.to_string(),
    }
}

/// The URL of `thing`. Local Things need the URL of the Resource they will be saved to.
pub fn as_url(thing: &Thing, base: Option<&str>) -> Result<String> {
    match (local_node_name(thing.url()), base) {
        (Some(_), Some(base)) => Ok(resolve_local_iri(thing.url(), base)),
        (Some(name), None) => Err(anyhow!(LocalNodeError::NoBaseIri(name.to_string()))),
        (None, _) => Ok(thing.url().to_string()),
    }
}

fn is_valid_thing_url(url: &str) -> bool {
    match url.strip_prefix("_:") {
        Some(id) => !id.is_empty(),
        None => NamedNode::new(url).is_ok(),
    }
}

pub(crate) fn ensure_thing(thing: &Thing) -> Result<()> {
    if is_valid_thing_url(thing.url()) {
        Ok(())
    } else {
        Err(anyhow!(AccessorError::ThingExpected(thing.url().to_string())))
    }
}

pub fn thing_to_json(thing: &Thing) -> Result<String> {
    Ok(serde_json::to_string(thing)?)
}

/// Parses a Thing serialised by [`thing_to_json`].
pub fn thing_from_json(json: &str) -> Result<Thing> {
    let thing: Thing = serde_json::from_str(json).map_err(|_| {
        let received: String = json.chars().take(80).collect();
        anyhow!(AccessorError::ThingExpected(received))
    })?;
    ensure_thing(&thing)?;
    Ok(thing)
}

fn subject_key(dataset: &SolidDataset, url: &str) -> String {
    match dataset.source_url() {
        Some(base) => resolve_local_iri(url, base),
        None => url.to_string(),
    }
}

pub fn get_thing(dataset: &SolidDataset, url: &(impl AsIri + ?Sized)) -> Option<Thing> {
    get_thing_in_graph(dataset, url, DEFAULT_GRAPH)
}

pub fn get_thing_in_graph(dataset: &SolidDataset, url: &(impl AsIri + ?Sized), graph: &str) -> Option<Thing> {
    let key = subject_key(dataset, url.as_iri());
    dataset
        .graphs
        .get(graph, &key)
        .map(|thing| thing.as_ref().clone())
}

/// Every Thing in the default graph.
pub fn get_thing_all(dataset: &SolidDataset, blank_nodes: BlankNodeThings) -> Vec<Thing> {
    dataset
        .graphs
        .subjects(DEFAULT_GRAPH)
        .map(|subjects| {
            subjects
                .values()
                .filter(|thing| blank_nodes.is_included() || !thing.is_blank_node())
                .map(|thing| thing.as_ref().clone())
                .collect()
        })
        .unwrap_or_default()
}

/// Stores `thing`, replacing whatever the dataset held about the same subject.
pub fn set_thing(dataset: &SolidDataset, thing: &Thing) -> Result<SolidDataset> {
    ensure_thing(thing)?;
    let thing = match dataset.source_url() {
        Some(base) if is_thing_local(thing) => {
            Thing::with_predicates(resolve_local_iri(thing.url(), base), thing.predicates().clone())
        }
        _ => thing.clone(),
    };
    let without = remove_thing(dataset, thing.url());
    let graphs = without.graphs.with_thing(DEFAULT_GRAPH, thing.clone());
    let additions = thing.to_quads(&graph_name(DEFAULT_GRAPH));
    Ok(record_additions(without.with_graphs(graphs), additions))
}

pub fn remove_thing(dataset: &SolidDataset, url: &(impl AsIri + ?Sized)) -> SolidDataset {
    let key = subject_key(dataset, url.as_iri());
    let Some(existing) = dataset.graphs.get(DEFAULT_GRAPH, &key) else {
        return dataset.clone();
    };
    let deletions = existing.to_quads(&graph_name(DEFAULT_GRAPH));
    let graphs = dataset.graphs.without_subject(DEFAULT_GRAPH, &key);
    record_deletions(dataset.with_graphs(graphs), deletions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accessors::{add_url, get_url};
    use crate::dataset::{create_solid_dataset, ResourceInfo};

    #[test]
    fn local_things_resolve_against_the_resource() {
        let thing = create_thing_named("me");
        assert!(is_thing_local(&thing));
        assert_eq!(
            as_url(&thing, Some("https://pod.example/profile#x")).unwrap(),
            "https://pod.example/profile#me"
        );
        let err = as_url(&thing, None).unwrap_err();
        assert!(err.downcast_ref::<LocalNodeError>().is_some());
    }

    #[test]
    fn random_local_names_differ() {
        assert_ne!(create_thing().url(), create_thing().url());
    }

    #[test]
    fn invalid_thing_urls_are_rejected() {
        let err = create_thing_with_url("not a url").unwrap_err();
        assert_eq!(
            err.downcast_ref::<AccessorError>(),
            Some(&AccessorError::ValidThingUrlExpected("not a url".to_string()))
        );
        let err = thing_from_json("{\"nope\": 1}").unwrap_err();
        assert!(matches!(err.downcast_ref::<AccessorError>(), Some(AccessorError::ThingExpected(_))));
    }

    #[test]
    fn json_round_trip() {
        let thing = add_url(&create_thing_named("me"), "https://vocab.example/knows", "https://pod.example/you").unwrap();
        let parsed = thing_from_json(&thing_to_json(&thing).unwrap()).unwrap();
        assert_eq!(parsed, thing);
    }

    #[test]
    fn set_then_get() {
        let thing = add_url(
            &create_thing_with_url("https://pod.example/doc#me").unwrap(),
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#type",
            "http://xmlns.com/foaf/0.1/Person",
        )
        .unwrap();
        let dataset = set_thing(&create_solid_dataset(), &thing).unwrap();
        let stored = get_thing(&dataset, "https://pod.example/doc#me").unwrap();
        assert_eq!(
            get_url(&stored, "http://www.w3.org/1999/02/22-rdf-syntax-ns#type").unwrap().as_deref(),
            Some("http://xmlns.com/foaf/0.1/Person")
        );
        assert_eq!(dataset.change_log().unwrap().additions.len(), 1);

        let removed = remove_thing(&dataset, &thing);
        assert!(get_thing(&removed, "https://pod.example/doc#me").is_none());
        assert!(removed.change_log().unwrap().is_empty());
    }

    #[test]
    fn local_things_resolve_on_set_when_the_source_is_known() {
        let dataset = create_solid_dataset().with_resource_info(ResourceInfo::new("https://pod.example/doc"));
        let thing = add_url(&create_thing_named("it"), "https://vocab.example/p", "https://vocab.example/o").unwrap();
        let dataset = set_thing(&dataset, &thing).unwrap();
        assert!(get_thing(&dataset, "https://pod.example/doc#it").is_some());
        // the local IRI still finds it
        assert!(get_thing(&dataset, &thing).is_some());
    }

    #[test]
    fn blank_node_things_are_optional() {
        let blank = add_url(&Thing::new("_:b0"), "https://vocab.example/p", "https://vocab.example/o").unwrap();
        let dataset = set_thing(&create_solid_dataset(), &blank).unwrap();
        assert!(get_thing_all(&dataset, BlankNodeThings::Exclude).is_empty());
        assert_eq!(get_thing_all(&dataset, BlankNodeThings::Include).len(), 1);
    }
}
