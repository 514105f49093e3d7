//! The in-memory quad store.
//!
//! Quads are indexed `graph -> subject -> predicate -> objects`, and objects are
//! bucketed by kind: named nodes, typed literals (by datatype), language-tagged
//! strings (by lower-cased locale) and Blank Nodes. Every level sits behind an
//! [`Arc`], so a mutation copies only the path it touches and the rest is shared
//! with the previous version.

use crate::chain::{find_chain_blank_nodes, CHAIN_DETECTION_LIMIT};
use crate::consts::DEFAULT_GRAPH;
use crate::errors::TermError;
use crate::options::ChainDetection;
use anyhow::{anyhow, Result};
use log::debug;
use oxigraph::model::{
    BlankNode, BlankNodeRef, GraphName, GraphNameRef, Literal, NamedNode, NamedOrBlankNode,
    NamedOrBlankNodeRef, Quad, QuadRef, TermRef,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// predicate IRI -> objects
pub type Predicates = BTreeMap<String, PredicateObjects>;
/// subject key -> Thing
pub type Subjects = BTreeMap<String, Arc<Thing>>;

/// The objects stored for one subject and predicate.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateObjects {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub named_nodes: Vec<String>,
    /// datatype IRI -> lexical forms
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub literals: BTreeMap<String, Vec<String>>,
    /// lower-cased language tag -> lexical forms
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lang_strings: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blank_nodes: Vec<BlankNodeValue>,
}

impl PredicateObjects {
    pub fn is_empty(&self) -> bool {
        self.named_nodes.is_empty()
            && self.literals.is_empty()
            && self.lang_strings.is_empty()
            && self.blank_nodes.is_empty()
    }

    /// Drops buckets that no longer hold a value.
    pub(crate) fn prune(&mut self) {
        self.literals.retain(|_, values| !values.is_empty());
        self.lang_strings.retain(|_, values| !values.is_empty());
    }
}

/// A Blank Node object: either an opaque reference to another subject in the
/// same graph, or the predicates of a chain node nested in place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlankNodeValue {
    Id(String),
    Nested(Predicates),
}

/// A subject and everything said about it in one graph.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thing {
    url: String,
    #[serde(default)]
    predicates: Predicates,
}

impl Thing {
    pub(crate) fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            predicates: Predicates::new(),
        }
    }

    pub(crate) fn with_predicates(url: impl Into<String>, predicates: Predicates) -> Self {
        Self {
            url: url.into(),
            predicates,
        }
    }

    /// The subject IRI, a Local Node IRI, or `_:id` for a Blank Node subject.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn predicates(&self) -> &Predicates {
        &self.predicates
    }

    pub(crate) fn predicates_mut(&mut self) -> &mut Predicates {
        &mut self.predicates
    }

    pub fn objects(&self, property: &str) -> Option<&PredicateObjects> {
        self.predicates.get(property)
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.values().all(PredicateObjects::is_empty)
    }

    pub fn is_blank_node(&self) -> bool {
        self.url.starts_with("_:")
    }

    /// The quads this Thing holds, placed in `graph`.
    pub fn to_quads(&self, graph: &GraphName) -> Vec<Quad> {
        let mut out = Vec::new();
        predicates_to_quads(&self.predicates, &subject_node(&self.url), graph, &mut out);
        out
    }
}

/// Blank Nodes nested into their parent during parsing.
pub struct ChainContext<'a> {
    chain_nodes: HashSet<BlankNode>,
    quads: &'a [Quad],
}

impl<'a> ChainContext<'a> {
    /// A context in which every Blank Node stays opaque.
    pub fn none() -> ChainContext<'static> {
        ChainContext {
            chain_nodes: HashSet::new(),
            quads: &[],
        }
    }

    pub fn detect(quads: &'a [Quad]) -> Self {
        Self {
            chain_nodes: find_chain_blank_nodes(quads),
            quads,
        }
    }

    pub fn is_chain_node(&self, node: BlankNodeRef<'_>) -> bool {
        !self.chain_nodes.is_empty() && self.chain_nodes.contains(&node.into_owned())
    }

    fn blank_node_value(&self, node: BlankNodeRef<'_>) -> Result<BlankNodeValue> {
        if !self.is_chain_node(node) {
            return Ok(BlankNodeValue::Id(format!("_:{}", node.as_str())));
        }
        let mut predicates = Predicates::new();
        for quad in self.quads.iter().filter(|q| q.subject.as_ref() == NamedOrBlankNodeRef::from(node)) {
            let objects = predicates
                .entry(quad.predicate.as_str().to_owned())
                .or_default();
            add_object(objects, quad.object.as_ref(), self)?;
        }
        Ok(BlankNodeValue::Nested(predicates))
    }
}

fn add_object(objects: &mut PredicateObjects, object: TermRef<'_>, ctx: &ChainContext<'_>) -> Result<()> {
    match object {
        TermRef::NamedNode(node) => objects.named_nodes.push(node.as_str().to_owned()),
        TermRef::Literal(literal) => {
            if let Some(language) = literal.language() {
                objects
                    .lang_strings
                    .entry(language.to_ascii_lowercase())
                    .or_default()
                    .push(literal.value().to_owned());
            } else {
                objects
                    .literals
                    .entry(literal.datatype().as_str().to_owned())
                    .or_default()
                    .push(literal.value().to_owned());
            }
        }
        TermRef::BlankNode(node) => objects.blank_nodes.push(ctx.blank_node_value(node)?),
        #[allow(unreachable_patterns)]
        other => return Err(anyhow!(TermError::UnsupportedObjectType(other.to_string()))),
    }
    Ok(())
}

/// Maps a graph name onto its key in the index.
pub fn graph_key(graph: GraphNameRef<'_>) -> Result<String> {
    match graph {
        GraphNameRef::NamedNode(node) => Ok(node.as_str().to_owned()),
        GraphNameRef::DefaultGraph => Ok(DEFAULT_GRAPH.to_owned()),
        GraphNameRef::BlankNode(node) => {
            Err(anyhow!(TermError::UnsupportedGraphType(node.to_string())))
        }
    }
}

/// Inverse of [`graph_key`].
pub fn graph_name(key: &str) -> GraphName {
    if key == DEFAULT_GRAPH {
        GraphName::DefaultGraph
    } else {
        NamedNode::new_unchecked(key).into()
    }
}

fn subject_key(subject: NamedOrBlankNodeRef<'_>) -> String {
    match subject {
        NamedOrBlankNodeRef::NamedNode(node) => node.as_str().to_owned(),
        NamedOrBlankNodeRef::BlankNode(node) => format!("_:{}", node.as_str()),
    }
}

/// Inverse of the subject key: `_:id` becomes a Blank Node, anything else an IRI.
pub fn subject_node(key: &str) -> NamedOrBlankNode {
    match key.strip_prefix("_:") {
        Some(id) => BlankNode::new_unchecked(id).into(),
        None => NamedNode::new_unchecked(key).into(),
    }
}

pub(crate) fn predicates_to_quads(
    predicates: &Predicates,
    subject: &NamedOrBlankNode,
    graph: &GraphName,
    out: &mut Vec<Quad>,
) {
    for (predicate, objects) in predicates {
        let predicate = NamedNode::new_unchecked(predicate.as_str());
        for iri in &objects.named_nodes {
            out.push(Quad::new(
                subject.clone(),
                predicate.clone(),
                NamedNode::new_unchecked(iri.as_str()),
                graph.clone(),
            ));
        }
        for (datatype, values) in &objects.literals {
            let datatype = NamedNode::new_unchecked(datatype.as_str());
            for value in values {
                out.push(Quad::new(
                    subject.clone(),
                    predicate.clone(),
                    Literal::new_typed_literal(value.as_str(), datatype.clone()),
                    graph.clone(),
                ));
            }
        }
        for (language, values) in &objects.lang_strings {
            for value in values {
                out.push(Quad::new(
                    subject.clone(),
                    predicate.clone(),
                    Literal::new_language_tagged_literal_unchecked(value.as_str(), language.as_str()),
                    graph.clone(),
                ));
            }
        }
        for blank in &objects.blank_nodes {
            match blank {
                BlankNodeValue::Id(id) => out.push(Quad::new(
                    subject.clone(),
                    predicate.clone(),
                    BlankNode::new_unchecked(id.trim_start_matches("_:")),
                    graph.clone(),
                )),
                BlankNodeValue::Nested(nested) => {
                    let node = BlankNode::default();
                    out.push(Quad::new(
                        subject.clone(),
                        predicate.clone(),
                        node.clone(),
                        graph.clone(),
                    ));
                    predicates_to_quads(nested, &node.into(), graph, out);
                }
            }
        }
    }
}

/// Rewrites IRIs in subject and object position. `rewrite` returns `None` to keep an IRI.
fn rewrite_predicates(predicates: &Predicates, rewrite: &dyn Fn(&str) -> Option<String>) -> Predicates {
    predicates
        .iter()
        .map(|(predicate, objects)| {
            let mut objects = objects.clone();
            for iri in objects.named_nodes.iter_mut() {
                if let Some(new_iri) = rewrite(iri) {
                    *iri = new_iri;
                }
            }
            for blank in objects.blank_nodes.iter_mut() {
                if let BlankNodeValue::Nested(nested) = blank {
                    *nested = rewrite_predicates(nested, rewrite);
                }
            }
            (predicate.clone(), objects)
        })
        .collect()
}

fn merge_predicates(into: &mut Predicates, from: Predicates) {
    for (predicate, objects) in from {
        let target = into.entry(predicate).or_default();
        target.named_nodes.extend(objects.named_nodes);
        for (datatype, values) in objects.literals {
            target.literals.entry(datatype).or_default().extend(values);
        }
        for (language, values) in objects.lang_strings {
            target.lang_strings.entry(language).or_default().extend(values);
        }
        target.blank_nodes.extend(objects.blank_nodes);
    }
}

/// The `graph -> subject -> Thing` index backing a SolidDataset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphIndex {
    graphs: BTreeMap<String, Arc<Subjects>>,
}

impl Default for GraphIndex {
    fn default() -> Self {
        let mut graphs = BTreeMap::new();
        graphs.insert(DEFAULT_GRAPH.to_owned(), Arc::new(Subjects::new()));
        Self { graphs }
    }
}

impl GraphIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an index from one parsed batch, nesting chain Blank Nodes when
    /// `detection` is enabled.
    pub fn from_quads(quads: &[Quad], detection: ChainDetection) -> Result<Self> {
        let ctx = if detection.is_enabled() {
            ChainContext::detect(quads)
        } else {
            ChainContext {
                chain_nodes: HashSet::new(),
                quads,
            }
        };
        if !ctx.chain_nodes.is_empty() {
            debug!(
                "Nesting {} chain Blank Nodes (limit {} Blank Node quads)",
                ctx.chain_nodes.len(),
                CHAIN_DETECTION_LIMIT
            );
        }
        let mut index = GraphIndex::new();
        for quad in quads {
            if let NamedOrBlankNode::BlankNode(node) = &quad.subject {
                if ctx.is_chain_node(node.as_ref()) {
                    continue;
                }
            }
            index.insert_quad(quad.as_ref(), &ctx)?;
        }
        Ok(index)
    }

    /// Returns a new index that also holds `quad`.
    pub fn add_quad(&self, quad: QuadRef<'_>, ctx: &ChainContext<'_>) -> Result<Self> {
        let mut next = self.clone();
        next.insert_quad(quad, ctx)?;
        Ok(next)
    }

    pub(crate) fn insert_quad(&mut self, quad: QuadRef<'_>, ctx: &ChainContext<'_>) -> Result<()> {
        let graph = graph_key(quad.graph_name)?;
        let subject = subject_key(quad.subject);
        let subjects = Arc::make_mut(self.graphs.entry(graph).or_default());
        let thing = Arc::make_mut(
            subjects
                .entry(subject.clone())
                .or_insert_with(|| Arc::new(Thing::new(subject))),
        );
        let objects = thing
            .predicates
            .entry(quad.predicate.as_str().to_owned())
            .or_default();
        add_object(objects, quad.object, ctx)
    }

    pub fn to_quads(&self) -> Vec<Quad> {
        let mut out = Vec::new();
        for (key, subjects) in &self.graphs {
            let graph = graph_name(key);
            for (subject, thing) in subjects.iter() {
                predicates_to_quads(&thing.predicates, &subject_node(subject), &graph, &mut out);
            }
        }
        out
    }

    pub fn graph_keys(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }

    pub fn subjects(&self, graph: &str) -> Option<&Subjects> {
        self.graphs.get(graph).map(|subjects| subjects.as_ref())
    }

    pub fn get(&self, graph: &str, subject: &str) -> Option<&Arc<Thing>> {
        self.graphs.get(graph).and_then(|subjects| subjects.get(subject))
    }

    /// Replaces (or inserts) the Thing stored under its own URL.
    pub fn with_thing(&self, graph: &str, thing: Thing) -> Self {
        let mut next = self.clone();
        let subjects = Arc::make_mut(next.graphs.entry(graph.to_owned()).or_default());
        if thing.is_empty() {
            subjects.remove(&thing.url);
        } else {
            subjects.insert(thing.url.clone(), Arc::new(thing));
        }
        next
    }

    pub fn without_subject(&self, graph: &str, subject: &str) -> Self {
        let mut next = self.clone();
        if let Some(subjects) = next.graphs.get_mut(graph) {
            if subjects.contains_key(subject) {
                Arc::make_mut(subjects).remove(subject);
            }
        }
        next
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.values().all(|subjects| subjects.is_empty())
    }

    pub fn subject_count(&self) -> usize {
        self.graphs.values().map(|subjects| subjects.len()).sum()
    }

    /// Rewrites subject and object IRIs; Things whose new URLs collide are merged.
    pub fn rewrite_iris(&self, rewrite: &dyn Fn(&str) -> Option<String>) -> Self {
        let mut graphs = BTreeMap::new();
        for (key, subjects) in &self.graphs {
            let mut rewritten = Subjects::new();
            for (subject, thing) in subjects.iter() {
                let url = rewrite(subject).unwrap_or_else(|| subject.clone());
                let predicates = rewrite_predicates(&thing.predicates, rewrite);
                match rewritten.get_mut(&url) {
                    Some(existing) => merge_predicates(&mut Arc::make_mut(existing).predicates, predicates),
                    None => {
                        rewritten.insert(url.clone(), Arc::new(Thing::with_predicates(url, predicates)));
                    }
                }
            }
            graphs.insert(key.clone(), Arc::new(rewritten));
        }
        Self { graphs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{XSD_INTEGER, XSD_STRING};
    use oxigraph::model::Term;

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    #[test]
    fn objects_land_in_their_buckets() {
        let subject = iri("https://pod.example/doc#me");
        let quads = vec![
            Quad::new(subject.clone(), iri("https://vocab.example/knows"), iri("https://pod.example/doc#you"), GraphName::DefaultGraph),
            Quad::new(subject.clone(), iri("https://vocab.example/name"), Literal::new_simple_literal("Me"), GraphName::DefaultGraph),
            Quad::new(subject.clone(), iri("https://vocab.example/name"), Literal::new_language_tagged_literal("Moi", "FR").unwrap(), GraphName::DefaultGraph),
            Quad::new(subject.clone(), iri("https://vocab.example/age"), Literal::new_typed_literal("42", XSD_INTEGER), GraphName::DefaultGraph),
        ];
        let index = GraphIndex::from_quads(&quads, ChainDetection::Disabled).unwrap();
        let thing = index.get(DEFAULT_GRAPH, "https://pod.example/doc#me").unwrap();
        let name = thing.objects("https://vocab.example/name").unwrap();
        assert_eq!(name.literals[XSD_STRING.as_str()], vec!["Me".to_string()]);
        assert_eq!(name.lang_strings["fr"], vec!["Moi".to_string()]);
        let knows = thing.objects("https://vocab.example/knows").unwrap();
        assert_eq!(knows.named_nodes, vec!["https://pod.example/doc#you".to_string()]);
        assert_eq!(index.to_quads().len(), 4);
    }

    #[test]
    fn blank_node_graphs_are_rejected() {
        let quad = Quad::new(
            iri("https://pod.example/doc#me"),
            iri("https://vocab.example/p"),
            iri("https://vocab.example/o"),
            BlankNode::new("g").unwrap(),
        );
        let err = GraphIndex::new().add_quad(quad.as_ref(), &ChainContext::none()).unwrap_err();
        assert!(matches!(err.downcast_ref::<TermError>(), Some(TermError::UnsupportedGraphType(_))));
    }

    #[test]
    fn add_quad_leaves_the_original_untouched() {
        let base = GraphIndex::new();
        let quad = Quad::new(
            iri("https://pod.example/doc#me"),
            iri("https://vocab.example/p"),
            iri("https://vocab.example/o"),
            iri("https://pod.example/graph"),
        );
        let next = base.add_quad(quad.as_ref(), &ChainContext::none()).unwrap();
        assert!(base.is_empty());
        assert!(next.get("https://pod.example/graph", "https://pod.example/doc#me").is_some());
        assert_eq!(next.to_quads(), vec![quad]);
    }

    #[test]
    fn unchanged_graphs_are_shared() {
        let quad = Quad::new(
            iri("https://pod.example/doc#me"),
            iri("https://vocab.example/p"),
            iri("https://vocab.example/o"),
            iri("https://pod.example/graph"),
        );
        let base = GraphIndex::new().add_quad(quad.as_ref(), &ChainContext::none()).unwrap();
        let other = Quad::new(
            iri("https://pod.example/doc#you"),
            iri("https://vocab.example/p"),
            Term::from(iri("https://vocab.example/o")),
            GraphName::DefaultGraph,
        );
        let next = base.add_quad(other.as_ref(), &ChainContext::none()).unwrap();
        assert!(Arc::ptr_eq(
            &base.graphs["https://pod.example/graph"],
            &next.graphs["https://pod.example/graph"]
        ));
    }

    #[test]
    fn opaque_blank_subjects_keep_their_ids() {
        let node = BlankNode::new("b0").unwrap();
        let quads = vec![
            Quad::new(iri("https://pod.example/doc#a"), iri("https://vocab.example/p"), node.clone(), GraphName::DefaultGraph),
            Quad::new(iri("https://pod.example/doc#b"), iri("https://vocab.example/p"), node.clone(), GraphName::DefaultGraph),
            Quad::new(node.clone(), iri("https://vocab.example/q"), iri("https://vocab.example/o"), GraphName::DefaultGraph),
        ];
        let index = GraphIndex::from_quads(&quads, ChainDetection::Enabled).unwrap();
        assert!(index.get(DEFAULT_GRAPH, "_:b0").is_some());
        let mut round_trip = index.to_quads();
        let mut expected = quads.clone();
        round_trip.sort_by_key(|q| q.to_string());
        expected.sort_by_key(|q| q.to_string());
        assert_eq!(round_trip, expected);
    }
}
