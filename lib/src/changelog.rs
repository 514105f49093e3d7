//! Pending changes of a SolidDataset since it was fetched or last saved.
//!
//! Recording an addition cancels every equal pending deletion and vice versa,
//! so no quad is ever pending in both lists. Quads that involve a Blank Node
//! are not recorded: they cannot be addressed in a SPARQL `DELETE DATA`.

use crate::dataset::SolidDataset;
use oxigraph::model::{NamedNode, NamedOrBlankNode, Quad, Term};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeLog {
    pub additions: Vec<Quad>,
    pub deletions: Vec<Quad>,
}

impl ChangeLog {
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    pub fn add(&mut self, quad: Quad) {
        record(&mut self.deletions, &mut self.additions, quad);
    }

    pub fn delete(&mut self, quad: Quad) {
        record(&mut self.additions, &mut self.deletions, quad);
    }

    /// Rewrites the IRIs of every pending quad. `rewrite` returns `None` to keep an IRI.
    pub(crate) fn rewrite_iris(&self, rewrite: &dyn Fn(&str) -> Option<String>) -> Self {
        let map = |quads: &Vec<Quad>| -> Vec<Quad> { quads.iter().map(|q| rewrite_quad(q, rewrite)).collect() };
        Self {
            additions: map(&self.additions),
            deletions: map(&self.deletions),
        }
    }
}

fn record(opposite: &mut Vec<Quad>, target: &mut Vec<Quad>, quad: Quad) {
    if contains_blank_node(&quad) {
        return;
    }
    let pending = opposite.len();
    opposite.retain(|q| q != &quad);
    if opposite.len() == pending {
        target.push(quad);
    }
}

pub fn contains_blank_node(quad: &Quad) -> bool {
    matches!(quad.subject, NamedOrBlankNode::BlankNode(_)) || matches!(quad.object, Term::BlankNode(_))
}

fn rewrite_quad(quad: &Quad, rewrite: &dyn Fn(&str) -> Option<String>) -> Quad {
    let mut quad = quad.clone();
    if let NamedOrBlankNode::NamedNode(subject) = &quad.subject {
        if let Some(iri) = rewrite(subject.as_str()) {
            quad.subject = NamedNode::new_unchecked(iri).into();
        }
    }
    if let Term::NamedNode(object) = &quad.object {
        if let Some(iri) = rewrite(object.as_str()) {
            quad.object = NamedNode::new_unchecked(iri).into();
        }
    }
    quad
}

/// Records `additions` as pending, cancelling matching pending deletions.
pub fn record_additions(dataset: SolidDataset, additions: impl IntoIterator<Item = Quad>) -> SolidDataset {
    let mut dataset = dataset;
    let change_log = dataset.change_log.get_or_insert_with(ChangeLog::default);
    for quad in additions {
        change_log.add(quad);
    }
    dataset
}

/// Records `deletions` as pending, cancelling matching pending additions.
pub fn record_deletions(dataset: SolidDataset, deletions: impl IntoIterator<Item = Quad>) -> SolidDataset {
    let mut dataset = dataset;
    let change_log = dataset.change_log.get_or_insert_with(ChangeLog::default);
    for quad in deletions {
        change_log.delete(quad);
    }
    dataset
}
