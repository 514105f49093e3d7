//! Computing and changing one actor's access from the Policies of an ACR.

use super::acr::{acr_url, add_acr_policy_url, add_policy_url, new_thing_url, remove_acr_policy_url, remove_policy_url};
use super::matcher::create_matcher;
use super::policy::{
    add_matcher_url, create_policy, get_allow_modes, get_deny_modes, get_matcher_url_all, remove_matcher_url,
    set_allow_modes, set_matcher_url, MatcherCombination, PolicyModes,
};
use super::resolve::{get_policies_and_matchers, AcpData};
use super::{get_acr, has_accessible_acr, with_acr};
use crate::access::{AccessModes, AccessModesPatch};
use crate::accessors::{add_url, remove_url};
use crate::consts::{ACP_AGENT, ACP_AUTHENTICATED_AGENT, ACP_CLIENT, ACP_CREATOR_AGENT, ACP_PUBLIC_AGENT, ACP_PUBLIC_CLIENT};
use crate::dataset::SolidDataset;
use crate::fetch::Fetcher;
use crate::store::Thing;
use crate::thing::set_thing;
use anyhow::Result;
use log::{debug, info};
use oxigraph::model::NamedNodeRef;
use std::collections::BTreeMap;

/// How a Matcher refers to an actor.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ActorRelation {
    /// `acp:agent`
    Agent,
    /// `acp:client`
    Client,
}

impl ActorRelation {
    pub fn predicate(self) -> NamedNodeRef<'static> {
        match self {
            ActorRelation::Agent => ACP_AGENT,
            ActorRelation::Client => ACP_CLIENT,
        }
    }

    fn special_values(self) -> &'static [NamedNodeRef<'static>] {
        match self {
            ActorRelation::Agent => &[ACP_PUBLIC_AGENT, ACP_AUTHENTICATED_AGENT, ACP_CREATOR_AGENT],
            ActorRelation::Client => &[ACP_PUBLIC_CLIENT],
        }
    }
}

const COMBINATIONS: [MatcherCombination; 3] =
    [MatcherCombination::AllOf, MatcherCombination::AnyOf, MatcherCombination::NoneOf];

fn actors<'a>(matcher: &'a Thing, relation: ActorRelation) -> &'a [String] {
    matcher
        .objects(relation.predicate().as_str())
        .map(|o| o.named_nodes.as_slice())
        .unwrap_or(&[])
}

fn lists_actor(matcher: &Thing, relation: ActorRelation, actor: &str) -> bool {
    actors(matcher, relation).iter().any(|a| a == actor)
}

// A Matcher without actors matches nobody.
fn matches_someone(matcher: &Thing) -> bool {
    [ActorRelation::Agent, ActorRelation::Client]
        .iter()
        .any(|relation| !actors(matcher, *relation).is_empty())
}

/// A Policy applies to an actor when every AllOf Matcher and at least one
/// AnyOf Matcher (if there are any) list it. A Policy with NoneOf Matchers
/// never counts as applying, since it cannot be decided from the actor alone.
pub fn policy_applies_to(policy: &Thing, data: &AcpData, relation: ActorRelation, actor: &str) -> bool {
    let all_of = get_matcher_url_all(policy, MatcherCombination::AllOf);
    let any_of = get_matcher_url_all(policy, MatcherCombination::AnyOf);
    let none_of = get_matcher_url_all(policy, MatcherCombination::NoneOf);
    if (all_of.is_empty() && any_of.is_empty()) || !none_of.is_empty() {
        return false;
    }
    let applies = |url: &String| data.matcher(url).is_some_and(|m| lists_actor(m, relation, actor));
    all_of.iter().all(applies) && (any_of.is_empty() || any_of.iter().any(applies))
}

fn applicable<'a>(policies: &'a [Thing], data: &AcpData, relation: ActorRelation, actor: &str) -> Vec<&'a Thing> {
    policies
        .iter()
        .filter(|policy| policy_applies_to(policy, data, relation, actor))
        .collect()
}

// Allows first, then denies, so a deny always wins.
fn aggregate(acr_policies: &[&Thing], policies: &[&Thing]) -> AccessModes {
    let mut access = AccessModes::none();
    for policy in acr_policies {
        let allow = get_allow_modes(policy);
        access.control_read |= allow.read;
        access.control_write |= allow.write;
    }
    for policy in policies {
        let allow = get_allow_modes(policy);
        access.read |= allow.read;
        access.append |= allow.append;
        access.write |= allow.write;
    }
    for policy in acr_policies {
        let deny = get_deny_modes(policy);
        access.control_read &= !deny.read;
        access.control_write &= !deny.write;
    }
    for policy in policies {
        let deny = get_deny_modes(policy);
        access.read &= !deny.read;
        access.append &= !deny.append;
        access.write &= !deny.write;
    }
    access
}

/// The access the Policies in `data` give `actor`, or `None` when some of
/// them could not be fetched.
pub fn get_actor_access(data: &AcpData, relation: ActorRelation, actor: &str) -> Option<AccessModes> {
    if !data.is_complete() {
        return None;
    }
    Some(aggregate(
        &applicable(&data.acr_policies, data, relation, actor),
        &applicable(&data.policies, data, relation, actor),
    ))
}

/// The access of every specific actor the Matchers in `data` list.
pub fn get_actor_access_all(data: &AcpData, relation: ActorRelation) -> Option<BTreeMap<String, AccessModes>> {
    if !data.is_complete() {
        return None;
    }
    let mut all = BTreeMap::new();
    for matcher in &data.matchers {
        for actor in actors(matcher, relation) {
            let special = relation.special_values().iter().any(|s| s.as_str() == actor);
            if !special && !all.contains_key(actor) {
                let access = get_actor_access(data, relation, actor).unwrap_or_default();
                all.insert(actor.clone(), access);
            }
        }
    }
    Some(all)
}

fn conflicts(allow: PolicyModes, deny: PolicyModes, wanted: PolicyModes) -> bool {
    (allow.read && !wanted.read)
        || (allow.append && !wanted.append)
        || (allow.write && !wanted.write)
        || (deny.read && wanted.read)
        || (deny.append && wanted.append)
        || (deny.write && wanted.write)
}

fn regular_modes(access: &AccessModes) -> PolicyModes {
    PolicyModes::new(access.read, access.append, access.write)
}

fn control_modes(access: &AccessModes) -> PolicyModes {
    PolicyModes::new(access.control_read, false, access.control_write)
}

// A copy of `policy` that no longer mentions `actor`: every Matcher listing the
// actor is copied without it. `None` when the copy would apply to nobody.
fn isolate(
    policy: &Thing,
    data: &AcpData,
    relation: ActorRelation,
    actor: &str,
    acr_url: &str,
) -> Result<Option<(Thing, Vec<Thing>)>> {
    let mut copy = Thing::with_predicates(new_thing_url(acr_url, "policy"), policy.predicates().clone());
    let mut matchers: Vec<Thing> = Vec::new();
    for combination in COMBINATIONS {
        for url in get_matcher_url_all(policy, combination) {
            let Some(matcher) = data.matcher(&url) else {
                continue;
            };
            if lists_actor(matcher, relation, actor) {
                let matcher_copy = Thing::with_predicates(new_thing_url(acr_url, "matcher"), matcher.predicates().clone());
                let matcher_copy = remove_url(&matcher_copy, &relation.predicate(), actor)?;
                copy = remove_matcher_url(&copy, combination, &url)?;
                copy = add_matcher_url(&copy, combination, &matcher_copy)?;
                matchers.push(matcher_copy);
            }
        }
    }

    let lookup = |url: &String| matchers.iter().find(|m| m.url() == url).or_else(|| data.matcher(url));
    let all_of = get_matcher_url_all(&copy, MatcherCombination::AllOf);
    let any_of = get_matcher_url_all(&copy, MatcherCombination::AnyOf);
    let still_applies = (!all_of.is_empty() || !any_of.is_empty())
        && all_of.iter().all(|url| lookup(url).is_some_and(matches_someone))
        && (any_of.is_empty() || any_of.iter().any(|url| lookup(url).is_some_and(matches_someone)));
    Ok(still_applies.then_some((copy, matchers)))
}

/// Changes what `actor` may do with `resource` without changing anyone else's
/// access, and returns the Resource with its updated (unsaved) ACR.
///
/// Policies that apply to the actor and contradict the wanted access are
/// detached from the ACR. Each is replaced by a copy whose Matchers no longer
/// list the actor, so whoever else it applied to keeps their access. If the
/// remaining Policies do not already give the actor what is wanted, a new
/// Policy and Matcher for the actor alone are added. Returns `None` when
/// access cannot be determined.
pub fn set_actor_access(
    resource: &SolidDataset,
    data: &AcpData,
    relation: ActorRelation,
    actor: &str,
    patch: &AccessModesPatch,
) -> Result<Option<SolidDataset>> {
    let (Some(acr), Some(current)) = (get_acr(resource), get_actor_access(data, relation, actor)) else {
        return Ok(None);
    };
    let acr_url = acr_url(acr)?.to_string();
    let wanted = current.apply(patch);

    let conflicting_acr: Vec<&Thing> = applicable(&data.acr_policies, data, relation, actor)
        .into_iter()
        .filter(|p| conflicts(get_allow_modes(p), get_deny_modes(p), control_modes(&wanted)))
        .collect();
    let conflicting: Vec<&Thing> = applicable(&data.policies, data, relation, actor)
        .into_iter()
        .filter(|p| conflicts(get_allow_modes(p), get_deny_modes(p), regular_modes(&wanted)))
        .collect();

    let mut updated = resource.clone();
    let mut new_things: Vec<Thing> = Vec::new();
    for (policies, is_acr_policy) in [(&conflicting_acr, true), (&conflicting, false)] {
        for policy in policies.iter() {
            debug!("Detaching {} from {}", policy.url(), acr_url);
            updated = if is_acr_policy {
                remove_acr_policy_url(&updated, policy.url())?
            } else {
                remove_policy_url(&updated, policy.url())?
            };
            if let Some((copy, matchers)) = isolate(policy, data, relation, actor, &acr_url)? {
                updated = if is_acr_policy {
                    add_acr_policy_url(&updated, copy.url())?
                } else {
                    add_policy_url(&updated, copy.url())?
                };
                new_things.extend(matchers);
                new_things.push(copy);
            }
        }
    }

    let remaining_data = AcpData {
        acr_policies: data
            .acr_policies
            .iter()
            .filter(|p| !conflicting_acr.iter().any(|c| c.url() == p.url()))
            .cloned()
            .collect(),
        policies: data
            .policies
            .iter()
            .filter(|p| !conflicting.iter().any(|c| c.url() == p.url()))
            .cloned()
            .collect(),
        ..data.clone()
    };
    let remaining = get_actor_access(&remaining_data, relation, actor).unwrap_or_default();

    let regular_differs = regular_modes(&wanted) != regular_modes(&remaining);
    let control_differs = control_modes(&wanted) != control_modes(&remaining);
    if regular_differs || control_differs {
        let matcher = create_matcher(&new_thing_url(&acr_url, "matcher"))?;
        let matcher = add_url(&matcher, &relation.predicate(), actor)?;
        if regular_differs {
            let policy = create_policy(&new_thing_url(&acr_url, "policy"))?;
            let policy = set_matcher_url(&policy, MatcherCombination::AllOf, &matcher)?;
            let policy = set_allow_modes(&policy, regular_modes(&wanted))?;
            updated = add_policy_url(&updated, policy.url())?;
            new_things.push(policy);
        }
        if control_differs {
            let policy = create_policy(&new_thing_url(&acr_url, "policy"))?;
            let policy = set_matcher_url(&policy, MatcherCombination::AllOf, &matcher)?;
            let policy = set_allow_modes(&policy, control_modes(&wanted))?;
            updated = add_acr_policy_url(&updated, policy.url())?;
            new_things.push(policy);
        }
        new_things.push(matcher);
    }

    let Some(acr) = get_acr(&updated) else {
        return Ok(None);
    };
    let mut acr = acr.clone();
    for thing in &new_things {
        acr = set_thing(&acr, thing)?;
    }
    info!("Updated the access of {actor} in {acr_url}");
    Ok(Some(with_acr(&updated, acr)))
}

/// What `webid` may do with a Resource fetched with its ACR.
pub fn get_agent_access(resource: &SolidDataset, webid: &str, fetcher: &dyn Fetcher) -> Result<Option<AccessModes>> {
    if !has_accessible_acr(resource) {
        return Ok(None);
    }
    let data = get_policies_and_matchers(resource, fetcher)?;
    Ok(get_actor_access(&data, ActorRelation::Agent, webid))
}

pub fn get_public_access(resource: &SolidDataset, fetcher: &dyn Fetcher) -> Result<Option<AccessModes>> {
    get_agent_access(resource, ACP_PUBLIC_AGENT.as_str(), fetcher)
}

pub fn get_agent_access_all(
    resource: &SolidDataset,
    fetcher: &dyn Fetcher,
) -> Result<Option<BTreeMap<String, AccessModes>>> {
    if !has_accessible_acr(resource) {
        return Ok(None);
    }
    let data = get_policies_and_matchers(resource, fetcher)?;
    Ok(get_actor_access_all(&data, ActorRelation::Agent))
}

/// Changes what `webid` may do with the Resource. The returned Resource's ACR
/// still has to be saved with [`save_acr_for`](super::save_acr_for).
pub fn set_agent_access(
    resource: &SolidDataset,
    webid: &str,
    patch: &AccessModesPatch,
    fetcher: &dyn Fetcher,
) -> Result<Option<SolidDataset>> {
    if !has_accessible_acr(resource) {
        return Ok(None);
    }
    let data = get_policies_and_matchers(resource, fetcher)?;
    set_actor_access(resource, &data, ActorRelation::Agent, webid, patch)
}

pub fn set_public_access(
    resource: &SolidDataset,
    patch: &AccessModesPatch,
    fetcher: &dyn Fetcher,
) -> Result<Option<SolidDataset>> {
    set_agent_access(resource, ACP_PUBLIC_AGENT.as_str(), patch, fetcher)
}
