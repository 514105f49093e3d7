//! Adapters between HTTP bodies and quads, over oxigraph's parsers and serializers.

use anyhow::{anyhow, Result};
use oxigraph::io::{JsonLdProfileSet, RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{Quad, TripleRef};

pub const TURTLE: &str = "text/turtle";
pub const JSON_LD: &str = "application/ld+json";
pub const SPARQL_UPDATE: &str = "application/sparql-update";

/// Picks a parser from a `Content-Type` header value; Turtle when unknown.
pub fn detect_format(content_type: Option<&str>) -> RdfFormat {
    content_type
        .and_then(|ct| ct.split(';').next())
        .and_then(|ct| RdfFormat::from_media_type(ct.trim()))
        .unwrap_or(RdfFormat::Turtle)
}

/// True for the media types a SolidDataset can be parsed from.
pub fn is_rdf_content_type(content_type: Option<&str>) -> bool {
    content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| {
            let ct = ct.trim();
            ct.eq_ignore_ascii_case(TURTLE) || ct.eq_ignore_ascii_case(JSON_LD)
        })
        .unwrap_or(false)
}

pub fn parse_quads(bytes: &[u8], format: RdfFormat, base_iri: &str) -> Result<Vec<Quad>> {
    let parser = RdfParser::from_format(format).with_base_iri(base_iri)?;
    parser
        .for_reader(bytes)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("Failed to parse {base_iri}: {e}"))
}

fn serialize(quads: &[Quad], format: RdfFormat) -> Result<String> {
    let mut serializer = RdfSerializer::from_format(format).for_writer(Vec::new());
    for quad in quads {
        serializer.serialize_triple(TripleRef {
            subject: quad.subject.as_ref(),
            predicate: quad.predicate.as_ref(),
            object: quad.object.as_ref(),
        })?;
    }
    let bytes = serializer.finish()?;
    Ok(String::from_utf8(bytes)?)
}

/// Turtle for the triples of `quads`; graph names are dropped.
pub fn quads_to_turtle(quads: &[Quad]) -> Result<String> {
    serialize(quads, RdfFormat::Turtle)
}

pub fn quads_to_jsonld(quads: &[Quad]) -> Result<String> {
    serialize(
        quads,
        RdfFormat::JsonLd {
            profile: JsonLdProfileSet::default(),
        },
    )
}
