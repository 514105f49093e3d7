//! Matchers: who a Policy is about.
//!
//! The special agents (`acp:PublicAgent`, `acp:AuthenticatedAgent`,
//! `acp:CreatorAgent`) and `acp:PublicClient` are stored as ordinary values but
//! exposed as flags, so [`get_agent_all`] and [`get_client_all`] list only
//! specific WebIDs and client identifiers.

use crate::accessors::{add_url, get_url_all, remove_url};
use crate::consts::{
    ACP_AGENT, ACP_AUTHENTICATED_AGENT, ACP_CLIENT, ACP_CREATOR_AGENT, ACP_MATCHER, ACP_PUBLIC_AGENT,
    ACP_PUBLIC_CLIENT, TYPE,
};
use crate::dataset::SolidDataset;
use crate::options::BlankNodeThings;
use crate::store::Thing;
use crate::thing::{create_thing_with_url, get_thing, get_thing_all, remove_thing, set_thing, AsIri};
use anyhow::{anyhow, Result};
use oxigraph::model::NamedNodeRef;

const SPECIAL_AGENTS: [NamedNodeRef<'static>; 3] = [ACP_PUBLIC_AGENT, ACP_AUTHENTICATED_AGENT, ACP_CREATOR_AGENT];

pub(crate) fn is_matcher(thing: &Thing) -> bool {
    thing
        .objects(TYPE.as_str())
        .is_some_and(|types| types.named_nodes.iter().any(|t| t == ACP_MATCHER.as_str()))
}

pub fn create_matcher(url: &str) -> Result<Thing> {
    add_url(&create_thing_with_url(url)?, &TYPE, &ACP_MATCHER)
}

pub fn get_matcher(dataset: &SolidDataset, url: &(impl AsIri + ?Sized)) -> Option<Thing> {
    get_thing(dataset, url).filter(is_matcher)
}

pub fn get_matcher_all(dataset: &SolidDataset) -> Vec<Thing> {
    get_thing_all(dataset, BlankNodeThings::Exclude)
        .into_iter()
        .filter(is_matcher)
        .collect()
}

pub fn set_matcher(dataset: &SolidDataset, matcher: &Thing) -> Result<SolidDataset> {
    if !is_matcher(matcher) {
        return Err(anyhow!("[{}] is not typed as an acp:Matcher", matcher.url()));
    }
    set_thing(dataset, matcher)
}

pub fn remove_matcher(dataset: &SolidDataset, url: &(impl AsIri + ?Sized)) -> SolidDataset {
    remove_thing(dataset, url)
}

fn has_value(matcher: &Thing, predicate: NamedNodeRef<'_>, value: NamedNodeRef<'_>) -> bool {
    get_url_all(matcher, &predicate)
        .unwrap_or_default()
        .iter()
        .any(|v| v == value.as_str())
}

fn with_flag(matcher: &Thing, predicate: NamedNodeRef<'_>, value: NamedNodeRef<'_>, on: bool) -> Result<Thing> {
    let without = remove_url(matcher, &predicate, &value)?;
    if on {
        add_url(&without, &predicate, &value)
    } else {
        Ok(without)
    }
}

/// The specific WebIDs the Matcher lists.
pub fn get_agent_all(matcher: &Thing) -> Vec<String> {
    get_url_all(matcher, &ACP_AGENT)
        .unwrap_or_default()
        .into_iter()
        .filter(|agent| !SPECIAL_AGENTS.iter().any(|special| special.as_str() == agent))
        .collect()
}

pub fn add_agent(matcher: &Thing, webid: &str) -> Result<Thing> {
    add_url(matcher, &ACP_AGENT, webid)
}

pub fn remove_agent(matcher: &Thing, webid: &str) -> Result<Thing> {
    remove_url(matcher, &ACP_AGENT, webid)
}

pub fn has_public(matcher: &Thing) -> bool {
    has_value(matcher, ACP_AGENT, ACP_PUBLIC_AGENT)
}

/// Makes the Matcher match everyone, or stop doing so.
pub fn set_public(matcher: &Thing, public: bool) -> Result<Thing> {
    with_flag(matcher, ACP_AGENT, ACP_PUBLIC_AGENT, public)
}

pub fn has_authenticated(matcher: &Thing) -> bool {
    has_value(matcher, ACP_AGENT, ACP_AUTHENTICATED_AGENT)
}

pub fn set_authenticated(matcher: &Thing, authenticated: bool) -> Result<Thing> {
    with_flag(matcher, ACP_AGENT, ACP_AUTHENTICATED_AGENT, authenticated)
}

pub fn has_creator(matcher: &Thing) -> bool {
    has_value(matcher, ACP_AGENT, ACP_CREATOR_AGENT)
}

pub fn set_creator(matcher: &Thing, creator: bool) -> Result<Thing> {
    with_flag(matcher, ACP_AGENT, ACP_CREATOR_AGENT, creator)
}

/// The specific client identifiers the Matcher lists.
pub fn get_client_all(matcher: &Thing) -> Vec<String> {
    get_url_all(matcher, &ACP_CLIENT)
        .unwrap_or_default()
        .into_iter()
        .filter(|client| client != ACP_PUBLIC_CLIENT.as_str())
        .collect()
}

pub fn add_client(matcher: &Thing, client: &str) -> Result<Thing> {
    add_url(matcher, &ACP_CLIENT, client)
}

pub fn remove_client(matcher: &Thing, client: &str) -> Result<Thing> {
    remove_url(matcher, &ACP_CLIENT, client)
}

pub fn has_any_client(matcher: &Thing) -> bool {
    has_value(matcher, ACP_CLIENT, ACP_PUBLIC_CLIENT)
}

pub fn set_any_client(matcher: &Thing, any: bool) -> Result<Thing> {
    with_flag(matcher, ACP_CLIENT, ACP_PUBLIC_CLIENT, any)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "https://alice.example/profile#me";

    #[test]
    fn special_agents_are_flags() {
        let matcher = create_matcher("https://pod.example/acr#m").unwrap();
        let matcher = add_agent(&matcher, ALICE).unwrap();
        let matcher = set_public(&matcher, true).unwrap();
        let matcher = set_authenticated(&matcher, true).unwrap();
        assert_eq!(get_agent_all(&matcher), vec![ALICE.to_string()]);
        assert!(has_public(&matcher));
        assert!(has_authenticated(&matcher));
        assert!(!has_creator(&matcher));

        let matcher = set_public(&matcher, false).unwrap();
        assert!(!has_public(&matcher));
        assert!(has_authenticated(&matcher));
    }

    #[test]
    fn public_client_is_a_flag() {
        let matcher = create_matcher("https://pod.example/acr#m").unwrap();
        let matcher = add_client(&matcher, "https://app.example/id").unwrap();
        let matcher = set_any_client(&matcher, true).unwrap();
        assert_eq!(get_client_all(&matcher), vec!["https://app.example/id".to_string()]);
        assert!(has_any_client(&matcher));
        let matcher = remove_client(&matcher, "https://app.example/id").unwrap();
        assert!(get_client_all(&matcher).is_empty());
    }
}
