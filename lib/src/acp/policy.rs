//! Policies: which modes to allow or deny, and the Matchers deciding to whom.

use crate::accessors::{add_url, get_url_all, remove_all, remove_url, set_url};
use crate::consts::{ACL_APPEND, ACL_READ, ACL_WRITE, ACP_ALLOW, ACP_ALL_OF, ACP_ANY_OF, ACP_DENY, ACP_NONE_OF, ACP_POLICY, TYPE};
use crate::dataset::SolidDataset;
use crate::options::BlankNodeThings;
use crate::store::Thing;
use crate::thing::{create_thing_with_url, get_thing, get_thing_all, remove_thing, set_thing, AsIri};
use anyhow::{anyhow, Result};
use oxigraph::model::NamedNodeRef;

/// How a Policy combines the Matchers listed under one predicate.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MatcherCombination {
    /// Every Matcher must match.
    AllOf,
    /// At least one Matcher must match.
    AnyOf,
    /// No Matcher may match.
    NoneOf,
}

impl MatcherCombination {
    pub fn predicate(self) -> NamedNodeRef<'static> {
        match self {
            MatcherCombination::AllOf => ACP_ALL_OF,
            MatcherCombination::AnyOf => ACP_ANY_OF,
            MatcherCombination::NoneOf => ACP_NONE_OF,
        }
    }
}

/// The modes a Policy allows or denies.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct PolicyModes {
    pub read: bool,
    pub append: bool,
    pub write: bool,
}

impl PolicyModes {
    pub fn new(read: bool, append: bool, write: bool) -> Self {
        Self { read, append, write }
    }

    pub fn is_empty(&self) -> bool {
        !(self.read || self.append || self.write)
    }
}

fn has_type(thing: &Thing, type_iri: NamedNodeRef<'_>) -> bool {
    thing
        .objects(TYPE.as_str())
        .is_some_and(|types| types.named_nodes.iter().any(|t| t == type_iri.as_str()))
}

pub(crate) fn is_policy(thing: &Thing) -> bool {
    has_type(thing, ACP_POLICY)
}

/// A new Policy at `url`, allowing and denying nothing.
pub fn create_policy(url: &str) -> Result<Thing> {
    add_url(&create_thing_with_url(url)?, &TYPE, &ACP_POLICY)
}

pub fn get_policy(dataset: &SolidDataset, url: &(impl AsIri + ?Sized)) -> Option<Thing> {
    get_thing(dataset, url).filter(is_policy)
}

pub fn get_policy_all(dataset: &SolidDataset) -> Vec<Thing> {
    get_thing_all(dataset, BlankNodeThings::Exclude)
        .into_iter()
        .filter(is_policy)
        .collect()
}

pub fn set_policy(dataset: &SolidDataset, policy: &Thing) -> Result<SolidDataset> {
    if !is_policy(policy) {
        return Err(anyhow!("[{}] is not typed as an acp:Policy", policy.url()));
    }
    set_thing(dataset, policy)
}

pub fn remove_policy(dataset: &SolidDataset, url: &(impl AsIri + ?Sized)) -> SolidDataset {
    remove_thing(dataset, url)
}

fn modes_of(policy: &Thing, predicate: NamedNodeRef<'_>) -> PolicyModes {
    let modes = get_url_all(policy, &predicate).unwrap_or_default();
    let has = |mode: NamedNodeRef<'_>| modes.iter().any(|m| m == mode.as_str());
    PolicyModes::new(has(ACL_READ), has(ACL_APPEND), has(ACL_WRITE))
}

fn with_modes(policy: &Thing, predicate: NamedNodeRef<'_>, modes: PolicyModes) -> Result<Thing> {
    let mut policy = remove_all(policy, &predicate)?;
    for (granted, mode) in [(modes.read, ACL_READ), (modes.append, ACL_APPEND), (modes.write, ACL_WRITE)] {
        if granted {
            policy = add_url(&policy, &predicate, &mode)?;
        }
    }
    Ok(policy)
}

pub fn get_allow_modes(policy: &Thing) -> PolicyModes {
    modes_of(policy, ACP_ALLOW)
}

/// Replaces the modes the Policy allows.
pub fn set_allow_modes(policy: &Thing, modes: PolicyModes) -> Result<Thing> {
    with_modes(policy, ACP_ALLOW, modes)
}

pub fn get_deny_modes(policy: &Thing) -> PolicyModes {
    modes_of(policy, ACP_DENY)
}

pub fn set_deny_modes(policy: &Thing, modes: PolicyModes) -> Result<Thing> {
    with_modes(policy, ACP_DENY, modes)
}

pub fn get_matcher_url_all(policy: &Thing, combination: MatcherCombination) -> Vec<String> {
    get_url_all(policy, &combination.predicate()).unwrap_or_default()
}

pub fn add_matcher_url(policy: &Thing, combination: MatcherCombination, matcher: &(impl AsIri + ?Sized)) -> Result<Thing> {
    add_url(policy, &combination.predicate(), matcher)
}

pub fn remove_matcher_url(
    policy: &Thing,
    combination: MatcherCombination,
    matcher: &(impl AsIri + ?Sized),
) -> Result<Thing> {
    remove_url(policy, &combination.predicate(), matcher)
}

/// Makes `matcher` the only Matcher of the combination.
pub fn set_matcher_url(policy: &Thing, combination: MatcherCombination, matcher: &(impl AsIri + ?Sized)) -> Result<Thing> {
    set_url(policy, &combination.predicate(), matcher)
}
