//! Human-readable dumps of Things, SolidDatasets and their pending changes.

use crate::consts::{XSD_BOOLEAN, XSD_DATE, XSD_DATE_TIME, XSD_DECIMAL, XSD_INTEGER, XSD_STRING, XSD_TIME};
use crate::dataset::SolidDataset;
use crate::options::BlankNodeThings;
use crate::store::{BlankNodeValue, PredicateObjects, Thing};
use crate::thing::get_thing_all;
use oxigraph::model::{NamedOrBlankNode, Quad, Term};
use std::collections::BTreeMap;
use std::fmt::Write;

fn datatype_label(datatype: &str) -> String {
    let known = [
        (XSD_STRING, "string"),
        (XSD_BOOLEAN, "boolean"),
        (XSD_DATE_TIME, "datetime"),
        (XSD_DATE, "date"),
        (XSD_TIME, "time"),
        (XSD_DECIMAL, "decimal"),
        (XSD_INTEGER, "integer"),
    ];
    known
        .iter()
        .find(|(iri, _)| iri.as_str() == datatype)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| format!("<{datatype}>"))
}

fn object_lines(objects: &PredicateObjects) -> Vec<String> {
    let mut lines: Vec<String> = objects.named_nodes.iter().map(|url| format!("<{url}> (URL)")).collect();
    for (datatype, values) in &objects.literals {
        let label = datatype_label(datatype);
        lines.extend(values.iter().map(|value| format!("\"{value}\" ({label})")));
    }
    for (locale, values) in &objects.lang_strings {
        lines.extend(values.iter().map(|value| format!("\"{value}\" (string, {locale})")));
    }
    for blank in &objects.blank_nodes {
        lines.push(match blank {
            BlankNodeValue::Id(id) => format!("{id} (Blank Node)"),
            BlankNodeValue::Nested(predicates) => {
                format!("[{} properties] (Blank Node)", predicates.len())
            }
        });
    }
    lines
}

/// The Thing's properties and values, one Markdown list per property.
pub fn thing_as_markdown(thing: &Thing) -> String {
    let mut out = format!("## Thing: {}\n", thing.url());
    if thing.is_empty() {
        out.push_str("\n_This Thing is empty._\n");
        return out;
    }
    for (predicate, objects) in thing.predicates() {
        let _ = write!(out, "\nProperty: {predicate}\n");
        for line in object_lines(objects) {
            let _ = writeln!(out, "- {line}");
        }
    }
    out
}

/// Every Thing of the dataset, followed by its pending changes.
pub fn solid_dataset_as_markdown(dataset: &SolidDataset) -> String {
    let mut out = match dataset.source_url() {
        Some(url) => format!("# SolidDataset: {url}\n"),
        None => "# SolidDataset (no URL yet)\n".to_string(),
    };
    let things = get_thing_all(dataset, BlankNodeThings::Include);
    if things.is_empty() {
        out.push_str("\n_This SolidDataset is empty._\n");
    }
    for thing in &things {
        out.push('\n');
        out.push_str(&thing_as_markdown(thing));
    }
    out.push('\n');
    out.push_str(&change_log_as_markdown(dataset));
    out
}

fn term_label(term: &Term) -> String {
    match term {
        Term::NamedNode(node) => format!("<{}> (URL)", node.as_str()),
        Term::BlankNode(node) => format!("_:{} (Blank Node)", node.as_str()),
        Term::Literal(literal) => match literal.language() {
            Some(locale) => format!("\"{}\" (string, {locale})", literal.value()),
            None => format!("\"{}\" ({})", literal.value(), datatype_label(literal.datatype().as_str())),
        },
        #[allow(unreachable_patterns)]
        _ => term.to_string(),
    }
}

#[derive(Default)]
struct Changes {
    added: Vec<String>,
    removed: Vec<String>,
}

fn changes_for<'a>(grouped: &'a mut BTreeMap<String, BTreeMap<String, Changes>>, quad: &Quad) -> &'a mut Changes {
    let subject = match &quad.subject {
        NamedOrBlankNode::NamedNode(node) => node.as_str().to_string(),
        NamedOrBlankNode::BlankNode(node) => format!("_:{}", node.as_str()),
    };
    grouped
        .entry(subject)
        .or_default()
        .entry(quad.predicate.as_str().to_string())
        .or_default()
}

/// What has changed since the dataset was fetched, grouped by Thing and property.
pub fn change_log_as_markdown(dataset: &SolidDataset) -> String {
    let Some(source) = dataset.source_url() else {
        return "_This is a newly initialized SolidDataset, so there is no source to compare it to._\n".to_string();
    };
    let change_log = dataset.change_log().cloned().unwrap_or_default();
    if change_log.is_empty() {
        return format!("_This SolidDataset has not been modified since it was fetched from {source}._\n");
    }

    let mut grouped: BTreeMap<String, BTreeMap<String, Changes>> = BTreeMap::new();
    for quad in &change_log.deletions {
        changes_for(&mut grouped, quad).removed.push(term_label(&quad.object));
    }
    for quad in &change_log.additions {
        changes_for(&mut grouped, quad).added.push(term_label(&quad.object));
    }

    let mut out = format!("## Changes compared to {source}\n");
    for (subject, predicates) in &grouped {
        let _ = write!(out, "\n### Thing: {subject}\n");
        for (predicate, changes) in predicates {
            let _ = write!(out, "\nProperty: {predicate}\n");
            if !changes.removed.is_empty() {
                out.push_str("- Removed:\n");
                for value in &changes.removed {
                    let _ = writeln!(out, "  - {value}");
                }
            }
            if !changes.added.is_empty() {
                out.push_str("- Added:\n");
                for value in &changes.added {
                    let _ = writeln!(out, "  - {value}");
                }
            }
        }
    }
    out
}
