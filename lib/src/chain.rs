//! Detects Blank Nodes that can be nested into their parent Thing.
//!
//! Quads whose object is a Blank Node form a directed graph from subjects to
//! Blank Nodes. A chain node is a Blank Node outside every cycle of that graph
//! whose incoming edges all come from one subject in one graph. Detection is
//! skipped for larger batches: past [`CHAIN_DETECTION_LIMIT`] quads involving a
//! Blank Node every node stays opaque.

use log::debug;
use oxigraph::model::{BlankNode, GraphName, NamedOrBlankNode, Quad, Term};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{Graph as DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

pub const CHAIN_DETECTION_LIMIT: usize = 20;

fn involves_blank_node(quad: &Quad) -> bool {
    matches!(quad.subject, NamedOrBlankNode::BlankNode(_)) || matches!(quad.object, Term::BlankNode(_))
}

/// Subjects and Blank Node objects as nodes, one edge per quad linking them.
struct ReferenceGraph<'a> {
    graph: DiGraph<NamedOrBlankNode, &'a Quad, petgraph::Directed>,
}

impl<'a> ReferenceGraph<'a> {
    fn new(quads: &[&'a Quad]) -> Self {
        let mut graph: DiGraph<NamedOrBlankNode, &'a Quad, petgraph::Directed> = DiGraph::new();
        let mut indices: HashMap<NamedOrBlankNode, NodeIndex> = HashMap::new();
        let mut index_of = |graph: &mut DiGraph<NamedOrBlankNode, &'a Quad, petgraph::Directed>,
                            node: NamedOrBlankNode| {
            *indices
                .entry(node.clone())
                .or_insert_with(|| graph.add_node(node))
        };
        for quad in quads {
            if let Term::BlankNode(object) = &quad.object {
                let from = index_of(&mut graph, quad.subject.clone());
                let to = index_of(&mut graph, object.clone().into());
                graph.add_edge(from, to, *quad);
            }
        }
        Self { graph }
    }

    fn blank_node(&self, index: NodeIndex) -> Option<&BlankNode> {
        match &self.graph[index] {
            NamedOrBlankNode::BlankNode(node) => Some(node),
            _ => None,
        }
    }

    fn cyclic(&self) -> HashSet<NodeIndex> {
        tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| component.len() > 1 || self.graph.contains_edge(component[0], component[0]))
            .flatten()
            .collect()
    }

    // one distinct subject, and every referencing quad in the same graph
    fn single_parent_graph(&self, index: NodeIndex) -> Option<&'a GraphName> {
        let parents: HashSet<NodeIndex> = self.graph.neighbors_directed(index, Direction::Incoming).collect();
        if parents.len() != 1 {
            return None;
        }
        let mut graphs = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| {
                let quad: &'a Quad = *edge.weight();
                &quad.graph_name
            });
        let first = graphs.next()?;
        graphs.all(|graph| graph == first).then_some(first)
    }
}

/// Returns the Blank Nodes in `quads` that are safe to nest.
pub fn find_chain_blank_nodes(quads: &[Quad]) -> HashSet<BlankNode> {
    let blank_quads: Vec<&Quad> = quads.iter().filter(|q| involves_blank_node(q)).collect();
    if blank_quads.len() > CHAIN_DETECTION_LIMIT {
        debug!(
            "{} quads involve a Blank Node, skipping chain detection",
            blank_quads.len()
        );
        return HashSet::new();
    }

    let references = ReferenceGraph::new(&blank_quads);
    let cyclic = references.cyclic();
    references
        .graph
        .node_indices()
        .filter(|index| !cyclic.contains(index))
        .filter_map(|index| {
            let node = references.blank_node(index)?;
            let graph = references.single_parent_graph(index)?;
            only_in_graph(node, graph, &blank_quads).then(|| node.clone())
        })
        .collect()
}

// a nested node is re-emitted in its parent's graph
fn only_in_graph(node: &BlankNode, graph: &GraphName, quads: &[&Quad]) -> bool {
    quads.iter().all(|quad| match &quad.subject {
        NamedOrBlankNode::BlankNode(subject) if subject == node => &quad.graph_name == graph,
        _ => true,
    })
}

/// The Blank Nodes that lie on a cycle of Blank Node references.
pub fn find_cyclic_blank_nodes(quads: &[&Quad]) -> HashSet<BlankNode> {
    let references = ReferenceGraph::new(quads);
    references
        .cyclic()
        .into_iter()
        .filter_map(|index| references.blank_node(index).cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::NamedNode;

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    fn bnode(id: &str) -> BlankNode {
        BlankNode::new(id).unwrap()
    }

    #[test]
    fn single_parent_nodes_are_chains() {
        let quads = vec![
            Quad::new(iri("https://pod.example/doc#me"), iri("https://vocab.example/address"), bnode("a"), GraphName::DefaultGraph),
            Quad::new(bnode("a"), iri("https://vocab.example/street"), bnode("b"), GraphName::DefaultGraph),
            Quad::new(bnode("b"), iri("https://vocab.example/name"), iri("https://vocab.example/Main"), GraphName::DefaultGraph),
        ];
        let chains = find_chain_blank_nodes(&quads);
        assert!(chains.contains(&bnode("a")));
        assert!(chains.contains(&bnode("b")));
    }

    #[test]
    fn cycles_stay_opaque() {
        let quads = vec![
            Quad::new(iri("https://pod.example/doc#me"), iri("https://vocab.example/p"), bnode("a"), GraphName::DefaultGraph),
            Quad::new(bnode("a"), iri("https://vocab.example/p"), bnode("b"), GraphName::DefaultGraph),
            Quad::new(bnode("b"), iri("https://vocab.example/p"), bnode("a"), GraphName::DefaultGraph),
        ];
        let refs: Vec<&Quad> = quads.iter().collect();
        let cyclic = find_cyclic_blank_nodes(&refs);
        assert!(cyclic.contains(&bnode("a")) && cyclic.contains(&bnode("b")));
        assert!(find_chain_blank_nodes(&quads).is_empty());
    }

    #[test]
    fn one_subject_may_reference_a_chain_twice() {
        let quads = vec![
            Quad::new(iri("https://pod.example/doc#me"), iri("https://vocab.example/home"), bnode("b"), GraphName::DefaultGraph),
            Quad::new(iri("https://pod.example/doc#me"), iri("https://vocab.example/work"), bnode("b"), GraphName::DefaultGraph),
            Quad::new(bnode("b"), iri("https://vocab.example/city"), iri("https://vocab.example/Utrecht"), GraphName::DefaultGraph),
        ];
        assert_eq!(find_chain_blank_nodes(&quads), HashSet::from([bnode("b")]));
    }

    #[test]
    fn self_references_are_cycles() {
        let quads = vec![
            Quad::new(iri("https://pod.example/doc#me"), iri("https://vocab.example/p"), bnode("a"), GraphName::DefaultGraph),
            Quad::new(bnode("a"), iri("https://vocab.example/p"), bnode("a"), GraphName::DefaultGraph),
        ];
        let refs: Vec<&Quad> = quads.iter().collect();
        assert_eq!(find_cyclic_blank_nodes(&refs), HashSet::from([bnode("a")]));
        assert!(find_chain_blank_nodes(&quads).is_empty());
    }

    #[test]
    fn nodes_leading_into_a_cycle_still_nest() {
        let quads = vec![
            Quad::new(iri("https://pod.example/doc#me"), iri("https://vocab.example/p"), bnode("a"), GraphName::DefaultGraph),
            Quad::new(bnode("a"), iri("https://vocab.example/p"), bnode("b"), GraphName::DefaultGraph),
            Quad::new(bnode("b"), iri("https://vocab.example/p"), bnode("c"), GraphName::DefaultGraph),
            Quad::new(bnode("c"), iri("https://vocab.example/p"), bnode("b"), GraphName::DefaultGraph),
        ];
        assert_eq!(find_chain_blank_nodes(&quads), HashSet::from([bnode("a")]));
    }

    #[test]
    fn shared_nodes_stay_opaque() {
        let quads = vec![
            Quad::new(iri("https://pod.example/doc#a"), iri("https://vocab.example/p"), bnode("x"), GraphName::DefaultGraph),
            Quad::new(iri("https://pod.example/doc#b"), iri("https://vocab.example/p"), bnode("x"), GraphName::DefaultGraph),
        ];
        assert!(find_chain_blank_nodes(&quads).is_empty());
    }

    #[test]
    fn large_batches_skip_detection() {
        let quads: Vec<Quad> = (0..=CHAIN_DETECTION_LIMIT)
            .map(|i| {
                Quad::new(
                    iri(&format!("https://pod.example/doc#s{i}")),
                    iri("https://vocab.example/p"),
                    bnode(&format!("n{i}")),
                    GraphName::DefaultGraph,
                )
            })
            .collect();
        assert!(find_chain_blank_nodes(&quads).is_empty());
        assert_eq!(find_chain_blank_nodes(&quads[..CHAIN_DETECTION_LIMIT]).len(), CHAIN_DETECTION_LIMIT);
    }
}
