//! Reading and writing the values of a Thing.
//!
//! Every kind of value has the same five operations: `get_*` returns the first
//! value (or `None`), `get_*_all` every value, `add_*` appends, `set_*`
//! replaces all values of the property, and `remove_*` drops matching values.
//! Typed literals match by value, not by spelling: removing `false` also
//! removes a stored `"0"`. Values that do not parse as the requested type are
//! skipped. Every mutation returns a new Thing.

use crate::consts::XSD_STRING;
use crate::errors::{AccessorError, TermError};
use crate::literal::XsdLiteral;
use crate::store::{BlankNodeValue, PredicateObjects, Thing};
use crate::thing::AsIri;
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use oxigraph::model::{BlankNode, Literal, NamedNode, Term};
use std::collections::BTreeMap;

fn valid_property(property: &(impl AsIri + ?Sized)) -> Result<&str> {
    let property = property.as_iri();
    NamedNode::new(property)
        .map_err(|_| anyhow!(AccessorError::ValidPropertyUrlExpected(property.to_string())))?;
    Ok(property)
}

fn valid_url_value(url: &(impl AsIri + ?Sized)) -> Result<&str> {
    let url = url.as_iri();
    NamedNode::new(url).map_err(|_| anyhow!(AccessorError::ValidValueUrlExpected(url.to_string())))?;
    Ok(url)
}

/// Applies `change` to the objects of `property` on a copy of `thing`.
fn update(thing: &Thing, property: &str, change: impl FnOnce(&mut PredicateObjects)) -> Thing {
    let mut next = thing.clone();
    let predicates = next.predicates_mut();
    let objects = predicates.entry(property.to_string()).or_default();
    change(objects);
    objects.prune();
    let empty = objects.is_empty();
    if empty {
        predicates.remove(property);
    }
    next
}

fn literal_values<'a>(thing: &'a Thing, property: &str, datatype: &str) -> &'a [String] {
    thing
        .objects(property)
        .and_then(|objects| objects.literals.get(datatype))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn lang_values<'a>(thing: &'a Thing, property: &str, locale: &str) -> &'a [String] {
    thing
        .objects(property)
        .and_then(|objects| objects.lang_strings.get(&locale.to_ascii_lowercase()))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Every property the Thing has a value for.
pub fn get_property_all(thing: &Thing) -> Vec<String> {
    thing.predicates().keys().cloned().collect()
}

/// Removes every value of `property`.
pub fn remove_all(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Thing> {
    let property = valid_property(property)?;
    let mut next = thing.clone();
    next.predicates_mut().remove(property);
    Ok(next)
}

// urls

pub fn get_url(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Option<String>> {
    Ok(get_url_all(thing, property)?.into_iter().next())
}

pub fn get_url_all(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Vec<String>> {
    let property = valid_property(property)?;
    Ok(thing
        .objects(property)
        .map(|objects| objects.named_nodes.clone())
        .unwrap_or_default())
}

pub fn add_url(thing: &Thing, property: &(impl AsIri + ?Sized), url: &(impl AsIri + ?Sized)) -> Result<Thing> {
    let property = valid_property(property)?;
    let url = valid_url_value(url)?;
    Ok(update(thing, property, |objects| objects.named_nodes.push(url.to_string())))
}

pub fn set_url(thing: &Thing, property: &(impl AsIri + ?Sized), url: &(impl AsIri + ?Sized)) -> Result<Thing> {
    add_url(&remove_all(thing, property)?, property, url)
}

pub fn remove_url(thing: &Thing, property: &(impl AsIri + ?Sized), url: &(impl AsIri + ?Sized)) -> Result<Thing> {
    let property = valid_property(property)?;
    let url = valid_url_value(url)?;
    Ok(update(thing, property, |objects| objects.named_nodes.retain(|iri| iri != url)))
}

// typed literals

pub fn get_literal<T: XsdLiteral>(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Option<T>> {
    let property = valid_property(property)?;
    Ok(literal_values(thing, property, T::DATATYPE.as_str())
        .first()
        .and_then(|lexical| T::deserialize(lexical)))
}

pub fn get_literal_all<T: XsdLiteral>(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Vec<T>> {
    let property = valid_property(property)?;
    Ok(literal_values(thing, property, T::DATATYPE.as_str())
        .iter()
        .filter_map(|lexical| T::deserialize(lexical))
        .collect())
}

pub fn add_literal<T: XsdLiteral>(thing: &Thing, property: &(impl AsIri + ?Sized), value: &T) -> Result<Thing> {
    let property = valid_property(property)?;
    let lexical = value
        .serialize()
        .ok_or_else(|| anyhow!(AccessorError::UnrepresentableValue(T::DATATYPE.as_str().to_string())))?;
    Ok(update(thing, property, |objects| {
        objects
            .literals
            .entry(T::DATATYPE.as_str().to_string())
            .or_default()
            .push(lexical)
    }))
}

pub fn set_literal<T: XsdLiteral>(thing: &Thing, property: &(impl AsIri + ?Sized), value: &T) -> Result<Thing> {
    add_literal(&remove_all(thing, property)?, property, value)
}

pub fn remove_literal<T: XsdLiteral>(thing: &Thing, property: &(impl AsIri + ?Sized), value: &T) -> Result<Thing> {
    let property = valid_property(property)?;
    Ok(update(thing, property, |objects| {
        if let Some(values) = objects.literals.get_mut(T::DATATYPE.as_str()) {
            values.retain(|lexical| T::deserialize(lexical).as_ref() != Some(value));
        }
    }))
}

macro_rules! typed_accessors {
    ($ty:ty, $get:ident, $get_all:ident, $add:ident, $set:ident, $remove:ident) => {
        pub fn $get(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Option<$ty>> {
            get_literal::<$ty>(thing, property)
        }

        pub fn $get_all(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Vec<$ty>> {
            get_literal_all::<$ty>(thing, property)
        }

        pub fn $add(thing: &Thing, property: &(impl AsIri + ?Sized), value: $ty) -> Result<Thing> {
            add_literal(thing, property, &value)
        }

        pub fn $set(thing: &Thing, property: &(impl AsIri + ?Sized), value: $ty) -> Result<Thing> {
            set_literal(thing, property, &value)
        }

        pub fn $remove(thing: &Thing, property: &(impl AsIri + ?Sized), value: $ty) -> Result<Thing> {
            remove_literal(thing, property, &value)
        }
    };
}

typed_accessors!(bool, get_boolean, get_boolean_all, add_boolean, set_boolean, remove_boolean);
typed_accessors!(
    DateTime<Utc>,
    get_datetime,
    get_datetime_all,
    add_datetime,
    set_datetime,
    remove_datetime
);
typed_accessors!(NaiveDate, get_date, get_date_all, add_date, set_date, remove_date);
typed_accessors!(NaiveTime, get_time, get_time_all, add_time, set_time, remove_time);
typed_accessors!(f64, get_decimal, get_decimal_all, add_decimal, set_decimal, remove_decimal);
typed_accessors!(i64, get_integer, get_integer_all, add_integer, set_integer, remove_integer);

// strings

pub fn get_string_no_locale(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Option<String>> {
    Ok(get_string_no_locale_all(thing, property)?.into_iter().next())
}

pub fn get_string_no_locale_all(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Vec<String>> {
    let property = valid_property(property)?;
    Ok(literal_values(thing, property, XSD_STRING.as_str()).to_vec())
}

pub fn add_string_no_locale(thing: &Thing, property: &(impl AsIri + ?Sized), value: &str) -> Result<Thing> {
    let property = valid_property(property)?;
    Ok(update(thing, property, |objects| {
        objects
            .literals
            .entry(XSD_STRING.as_str().to_string())
            .or_default()
            .push(value.to_string())
    }))
}

pub fn set_string_no_locale(thing: &Thing, property: &(impl AsIri + ?Sized), value: &str) -> Result<Thing> {
    add_string_no_locale(&remove_all(thing, property)?, property, value)
}

pub fn remove_string_no_locale(thing: &Thing, property: &(impl AsIri + ?Sized), value: &str) -> Result<Thing> {
    let property = valid_property(property)?;
    Ok(update(thing, property, |objects| {
        if let Some(values) = objects.literals.get_mut(XSD_STRING.as_str()) {
            values.retain(|v| v != value);
        }
    }))
}

/// Locales compare case-insensitively.
pub fn get_string_with_locale(
    thing: &Thing,
    property: &(impl AsIri + ?Sized),
    locale: &str,
) -> Result<Option<String>> {
    Ok(get_string_with_locale_all(thing, property, locale)?.into_iter().next())
}

pub fn get_string_with_locale_all(
    thing: &Thing,
    property: &(impl AsIri + ?Sized),
    locale: &str,
) -> Result<Vec<String>> {
    let property = valid_property(property)?;
    Ok(lang_values(thing, property, locale).to_vec())
}

/// Every language-tagged string of `property`, keyed by lower-cased locale.
pub fn get_string_by_locale_all(
    thing: &Thing,
    property: &(impl AsIri + ?Sized),
) -> Result<BTreeMap<String, Vec<String>>> {
    let property = valid_property(property)?;
    Ok(thing
        .objects(property)
        .map(|objects| objects.lang_strings.clone())
        .unwrap_or_default())
}

pub fn add_string_with_locale(
    thing: &Thing,
    property: &(impl AsIri + ?Sized),
    value: &str,
    locale: &str,
) -> Result<Thing> {
    let property = valid_property(property)?;
    Ok(update(thing, property, |objects| {
        objects
            .lang_strings
            .entry(locale.to_ascii_lowercase())
            .or_default()
            .push(value.to_string())
    }))
}

pub fn set_string_with_locale(
    thing: &Thing,
    property: &(impl AsIri + ?Sized),
    value: &str,
    locale: &str,
) -> Result<Thing> {
    add_string_with_locale(&remove_all(thing, property)?, property, value, locale)
}

pub fn remove_string_with_locale(
    thing: &Thing,
    property: &(impl AsIri + ?Sized),
    value: &str,
    locale: &str,
) -> Result<Thing> {
    let property = valid_property(property)?;
    Ok(update(thing, property, |objects| {
        if let Some(values) = objects.lang_strings.get_mut(&locale.to_ascii_lowercase()) {
            values.retain(|v| v != value);
        }
    }))
}

// raw terms

/// Named nodes first, then typed literals, language-tagged strings and Blank Nodes.
pub fn get_term_all(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Vec<Term>> {
    let property = valid_property(property)?;
    let Some(objects) = thing.objects(property) else {
        return Ok(Vec::new());
    };
    let mut terms: Vec<Term> = objects
        .named_nodes
        .iter()
        .map(|iri| NamedNode::new_unchecked(iri.as_str()).into())
        .collect();
    for (datatype, values) in &objects.literals {
        let datatype = NamedNode::new_unchecked(datatype.as_str());
        terms.extend(
            values
                .iter()
                .map(|v| Term::from(Literal::new_typed_literal(v.as_str(), datatype.clone()))),
        );
    }
    for (locale, values) in &objects.lang_strings {
        terms.extend(values.iter().map(|v| {
            Term::from(Literal::new_language_tagged_literal_unchecked(v.as_str(), locale.as_str()))
        }));
    }
    for blank in &objects.blank_nodes {
        let node = match blank {
            BlankNodeValue::Id(id) => BlankNode::new_unchecked(id.trim_start_matches("_:")),
            // nested structures have no stable identifier
            BlankNodeValue::Nested(_) => BlankNode::default(),
        };
        terms.push(node.into());
    }
    Ok(terms)
}

pub fn get_term(thing: &Thing, property: &(impl AsIri + ?Sized)) -> Result<Option<Term>> {
    Ok(get_term_all(thing, property)?.into_iter().next())
}

pub fn add_term(thing: &Thing, property: &(impl AsIri + ?Sized), term: &Term) -> Result<Thing> {
    let property = valid_property(property)?;
    let term = term.clone();
    match term {
        Term::NamedNode(node) => Ok(update(thing, property, |objects| {
            objects.named_nodes.push(node.into_string())
        })),
        Term::BlankNode(node) => Ok(update(thing, property, |objects| {
            objects
                .blank_nodes
                .push(BlankNodeValue::Id(format!("_:{}", node.as_str())))
        })),
        Term::Literal(literal) => Ok(update(thing, property, |objects| match literal.language() {
            Some(locale) => objects
                .lang_strings
                .entry(locale.to_ascii_lowercase())
                .or_default()
                .push(literal.value().to_string()),
            None => objects
                .literals
                .entry(literal.datatype().as_str().to_string())
                .or_default()
                .push(literal.value().to_string()),
        })),
        #[allow(unreachable_patterns)]
        other => Err(anyhow!(TermError::UnsupportedObjectType(other.to_string()))),
    }
}

pub fn set_term(thing: &Thing, property: &(impl AsIri + ?Sized), term: &Term) -> Result<Thing> {
    add_term(&remove_all(thing, property)?, property, term)
}

pub fn remove_term(thing: &Thing, property: &(impl AsIri + ?Sized), term: &Term) -> Result<Thing> {
    let property = valid_property(property)?;
    Ok(update(thing, property, |objects| match term {
        Term::NamedNode(node) => objects.named_nodes.retain(|iri| iri != node.as_str()),
        Term::BlankNode(node) => {
            let id = format!("_:{}", node.as_str());
            objects
                .blank_nodes
                .retain(|blank| !matches!(blank, BlankNodeValue::Id(existing) if *existing == id))
        }
        Term::Literal(literal) => {
            let bucket = match literal.language() {
                Some(locale) => objects.lang_strings.get_mut(&locale.to_ascii_lowercase()),
                None => objects.literals.get_mut(literal.datatype().as_str()),
            };
            if let Some(values) = bucket {
                values.retain(|v| v != literal.value());
            }
        }
        #[allow(unreachable_patterns)]
        _ => {}
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{TYPE, XSD_BOOLEAN};
    use crate::thing::create_thing_named;

    const NAME: &str = "https://vocab.example/name";
    const FLAG: &str = "https://vocab.example/flag";

    #[test]
    fn invalid_properties_are_rejected() {
        let err = get_url(&create_thing_named("me"), "not a url").unwrap_err();
        assert_eq!(
            err.downcast_ref::<AccessorError>(),
            Some(&AccessorError::ValidPropertyUrlExpected("not a url".to_string()))
        );
        let err = add_url(&create_thing_named("me"), &TYPE, "also not a url").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AccessorError>(),
            Some(AccessorError::ValidValueUrlExpected(_))
        ));
    }

    #[test]
    fn remove_boolean_matches_by_value() {
        let thing = add_term(
            &create_thing_named("me"),
            FLAG,
            &Literal::new_typed_literal("0", XSD_BOOLEAN).into(),
        )
        .unwrap();
        assert_eq!(get_boolean(&thing, FLAG).unwrap(), Some(false));
        let thing = remove_boolean(&thing, FLAG, false).unwrap();
        assert_eq!(get_boolean(&thing, FLAG).unwrap(), None);
        assert!(get_property_all(&thing).is_empty());
    }

    #[test]
    fn malformed_values_are_skipped() {
        let thing = add_term(
            &create_thing_named("me"),
            FLAG,
            &Literal::new_typed_literal("maybe", XSD_BOOLEAN).into(),
        )
        .unwrap();
        let thing = add_boolean(&thing, FLAG, true).unwrap();
        assert_eq!(get_boolean(&thing, FLAG).unwrap(), None);
        assert_eq!(get_boolean_all(&thing, FLAG).unwrap(), vec![true]);
    }

    #[test]
    fn set_replaces_every_kind() {
        let thing = add_url(&create_thing_named("me"), NAME, "https://pod.example/x").unwrap();
        let thing = add_string_with_locale(&thing, NAME, "Moi", "fr").unwrap();
        let thing = set_integer(&thing, NAME, 42).unwrap();
        assert_eq!(get_integer_all(&thing, NAME).unwrap(), vec![42]);
        assert!(get_url(&thing, NAME).unwrap().is_none());
        assert!(get_string_with_locale(&thing, NAME, "fr").unwrap().is_none());
    }

    #[test]
    fn locales_are_case_insensitive() {
        let thing = add_string_with_locale(&create_thing_named("me"), NAME, "Hello", "en-GB").unwrap();
        assert_eq!(
            get_string_with_locale(&thing, NAME, "EN-gb").unwrap().as_deref(),
            Some("Hello")
        );
        let by_locale = get_string_by_locale_all(&thing, NAME).unwrap();
        assert_eq!(by_locale["en-gb"], vec!["Hello".to_string()]);
        let thing = remove_string_with_locale(&thing, NAME, "Hello", "EN-GB").unwrap();
        assert!(get_string_with_locale_all(&thing, NAME, "en-gb").unwrap().is_empty());
    }

    #[test]
    fn strings_without_locale() {
        let thing = add_string_no_locale(&create_thing_named("me"), NAME, "Me").unwrap();
        let thing = add_string_no_locale(&thing, NAME, "Myself").unwrap();
        assert_eq!(get_string_no_locale(&thing, NAME).unwrap().as_deref(), Some("Me"));
        let thing = remove_string_no_locale(&thing, NAME, "Me").unwrap();
        assert_eq!(get_string_no_locale_all(&thing, NAME).unwrap(), vec!["Myself".to_string()]);
    }

    #[test]
    fn terms_come_out_in_bucket_order() {
        let thing = add_string_no_locale(&create_thing_named("me"), NAME, "Me").unwrap();
        let thing = add_url(&thing, NAME, "https://pod.example/x").unwrap();
        let first = get_term(&thing, NAME).unwrap().unwrap();
        assert_eq!(first, Term::from(NamedNode::new("https://pod.example/x").unwrap()));
        let thing = remove_term(&thing, NAME, &first).unwrap();
        assert_eq!(get_term_all(&thing, NAME).unwrap().len(), 1);
    }

    #[test]
    fn typed_round_trips() {
        let date = NaiveDate::from_ymd_opt(1990, 11, 12).unwrap();
        let thing = set_date(&create_thing_named("me"), NAME, date).unwrap();
        assert_eq!(get_date(&thing, NAME).unwrap(), Some(date));
        let thing = set_decimal(&thing, NAME, 13.37).unwrap();
        assert_eq!(get_decimal(&thing, NAME).unwrap(), Some(13.37));
        let thing = remove_decimal(&thing, NAME, 13.37).unwrap();
        assert!(get_decimal_all(&thing, NAME).unwrap().is_empty());
    }

    #[test]
    fn times_round_trip() {
        let time = NaiveTime::from_hms_opt(13, 37, 42).unwrap();
        let thing = set_time(&create_thing_named("me"), NAME, time).unwrap();
        assert_eq!(get_time(&thing, NAME).unwrap(), Some(time));
        let thing = remove_time(&thing, NAME, time).unwrap();
        assert_eq!(get_time(&thing, NAME).unwrap(), None);
    }

    #[test]
    fn non_finite_decimals_are_rejected() {
        let thing = create_thing_named("me");
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = set_decimal(&thing, NAME, value).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<AccessorError>(),
                Some(AccessorError::UnrepresentableValue(_))
            ));
        }
        assert!(add_decimal(&thing, NAME, f64::NAN).is_err());
    }
}
