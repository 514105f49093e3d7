//! Reading and rewriting `acl:Authorization` rules.

use super::AclDataset;
use crate::access::WacAccessModes;
use crate::accessors::{add_url, remove_url};
use crate::consts::{
    ACL_ACCESS_TO, ACL_AGENT, ACL_AGENT_CLASS, ACL_AGENT_GROUP, ACL_APPEND, ACL_AUTHENTICATED_AGENT,
    ACL_AUTHORIZATION, ACL_CONTROL, ACL_DEFAULT, ACL_DEFAULT_FOR_NEW, ACL_MODE, ACL_ORIGIN, ACL_READ, ACL_WRITE,
    FOAF_AGENT, TYPE,
};
use crate::options::{AccessTarget, BlankNodeThings};
use crate::store::Thing;
use crate::thing::{create_thing_named, get_thing_all, random_name, remove_thing, set_thing};
use anyhow::Result;
use log::debug;
use oxigraph::model::NamedNodeRef;
use std::collections::BTreeMap;

const ACTOR_PREDICATES: [NamedNodeRef<'static>; 4] = [ACL_AGENT, ACL_AGENT_GROUP, ACL_AGENT_CLASS, ACL_ORIGIN];

/// Someone a rule can grant access to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WacActor {
    /// `acl:agent <webid>`
    Agent(String),
    /// `acl:agentGroup <group>`
    Group(String),
    /// `acl:agentClass foaf:Agent`
    Public,
    /// `acl:agentClass acl:AuthenticatedAgent`
    Authenticated,
}

impl WacActor {
    pub fn predicate(&self) -> NamedNodeRef<'static> {
        match self {
            WacActor::Agent(_) => ACL_AGENT,
            WacActor::Group(_) => ACL_AGENT_GROUP,
            WacActor::Public | WacActor::Authenticated => ACL_AGENT_CLASS,
        }
    }

    pub fn iri(&self) -> &str {
        match self {
            WacActor::Agent(iri) | WacActor::Group(iri) => iri,
            WacActor::Public => FOAF_AGENT.as_str(),
            WacActor::Authenticated => ACL_AUTHENTICATED_AGENT.as_str(),
        }
    }
}

fn urls<'a>(thing: &'a Thing, predicate: NamedNodeRef<'_>) -> &'a [String] {
    thing
        .objects(predicate.as_str())
        .map(|o| o.named_nodes.as_slice())
        .unwrap_or(&[])
}

fn has_url(thing: &Thing, predicate: NamedNodeRef<'_>, url: &str) -> bool {
    urls(thing, predicate).iter().any(|u| u == url)
}

fn target_predicates(target: AccessTarget) -> &'static [NamedNodeRef<'static>] {
    match target {
        AccessTarget::Resource => &[ACL_ACCESS_TO],
        AccessTarget::Default => &[ACL_DEFAULT, ACL_DEFAULT_FOR_NEW],
    }
}

pub fn is_acl_rule(thing: &Thing) -> bool {
    has_url(thing, TYPE, ACL_AUTHORIZATION.as_str())
}

/// Every `acl:Authorization` in the ACL.
pub fn get_rule_all(acl: &AclDataset) -> Vec<Thing> {
    get_thing_all(acl.dataset(), BlankNodeThings::Exclude)
        .into_iter()
        .filter(is_acl_rule)
        .collect()
}

fn applies_to(rule: &Thing, resource: &str, target: AccessTarget) -> bool {
    target_predicates(target)
        .iter()
        .any(|p| has_url(rule, *p, resource))
}

/// The modes a rule grants. Write implies Append.
pub fn rule_access(rule: &Thing) -> WacAccessModes {
    let modes = urls(rule, ACL_MODE);
    let has = |mode: NamedNodeRef<'_>| modes.iter().any(|m| m == mode.as_str());
    WacAccessModes::new(has(ACL_READ), has(ACL_APPEND), has(ACL_WRITE), has(ACL_CONTROL))
}

fn rules_for<'a>(acl: &'a AclDataset, target: AccessTarget) -> impl Iterator<Item = Thing> + 'a {
    get_rule_all(acl)
        .into_iter()
        .filter(move |rule| applies_to(rule, acl.access_to(), target))
}

/// The union of what every rule for `target` grants `actor`.
pub fn get_actor_access(acl: &AclDataset, actor: &WacActor, target: AccessTarget) -> WacAccessModes {
    rules_for(acl, target)
        .filter(|rule| has_url(rule, actor.predicate(), actor.iri()))
        .fold(WacAccessModes::none(), |access, rule| access.union(rule_access(&rule)))
}

/// What every actor listed under `predicate` is granted, keyed by actor IRI.
pub fn get_actor_access_all(
    acl: &AclDataset,
    predicate: NamedNodeRef<'_>,
    target: AccessTarget,
) -> BTreeMap<String, WacAccessModes> {
    let mut all: BTreeMap<String, WacAccessModes> = BTreeMap::new();
    for rule in rules_for(acl, target) {
        let access = rule_access(&rule);
        for actor in urls(&rule, predicate) {
            let entry = all.entry(actor.clone()).or_insert_with(WacAccessModes::none);
            *entry = entry.union(access);
        }
    }
    all
}

// The same rule, minus `actor`.
fn without_actor(rule: &Thing, actor: &WacActor) -> Result<Thing> {
    remove_url(rule, &actor.predicate(), actor.iri())
}

// A copy of `rule` for `actor` alone that no longer applies to `resource`
// through `target`, so the actor keeps whatever else the rule granted.
fn actor_only_copy(rule: &Thing, actor: &WacActor, resource: &str, target: AccessTarget) -> Result<Thing> {
    let mut copy = create_thing_named(&format!("rule-{}", random_name()));
    for (predicate, objects) in rule.predicates() {
        if !ACTOR_PREDICATES.iter().any(|p| p.as_str() == predicate) {
            copy.predicates_mut().insert(predicate.clone(), objects.clone());
        }
    }
    copy = add_url(&copy, &actor.predicate(), actor.iri())?;
    for predicate in target_predicates(target) {
        copy = remove_url(&copy, predicate, resource)?;
    }
    Ok(copy)
}

fn is_empty_rule(rule: &Thing) -> bool {
    let no_target = [ACL_ACCESS_TO, ACL_DEFAULT, ACL_DEFAULT_FOR_NEW]
        .iter()
        .all(|p| urls(rule, *p).is_empty());
    let no_actor = ACTOR_PREDICATES.iter().all(|p| urls(rule, *p).is_empty());
    no_target || no_actor || urls(rule, ACL_MODE).is_empty()
}

/// Rewrites the ACL so that `actor` has exactly `access` to its Resource
/// through `target`, leaving every other actor's access unchanged.
pub fn set_actor_access(
    acl: &AclDataset,
    access: WacAccessModes,
    actor: &WacActor,
    target: AccessTarget,
) -> Result<AclDataset> {
    let resource = acl.access_to().to_string();
    let mut dataset = acl.dataset().clone();

    for rule in rules_for(acl, target).filter(|rule| has_url(rule, actor.predicate(), actor.iri())) {
        dataset = set_thing(&dataset, &without_actor(&rule, actor)?)?;
        dataset = set_thing(&dataset, &actor_only_copy(&rule, actor, &resource, target)?)?;
    }

    if !access.is_empty() {
        let mut rule = create_thing_named(&format!("rule-{}", random_name()));
        rule = add_url(&rule, &TYPE, &ACL_AUTHORIZATION)?;
        for predicate in target_predicates(target).iter().take(1) {
            rule = add_url(&rule, predicate, resource.as_str())?;
        }
        rule = add_url(&rule, &actor.predicate(), actor.iri())?;
        let modes = [
            (access.read, ACL_READ),
            (access.append && !access.write, ACL_APPEND),
            (access.write, ACL_WRITE),
            (access.control, ACL_CONTROL),
        ];
        for (granted, mode) in modes {
            if granted {
                rule = add_url(&rule, &ACL_MODE, &mode)?;
            }
        }
        dataset = set_thing(&dataset, &rule)?;
    }

    let interim = acl.with_dataset(dataset);
    let mut dataset = interim.dataset().clone();
    for rule in get_rule_all(&interim) {
        if is_empty_rule(&rule) {
            debug!("Dropping empty rule {}", rule.url());
            dataset = remove_thing(&dataset, rule.url());
        }
    }
    Ok(acl.with_dataset(dataset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{create_solid_dataset, ResourceInfo};

    const RESOURCE: &str = "https://pod.example/doc";
    const ACL_URL: &str = "https://pod.example/doc.acl";
    const ALICE: &str = "https://alice.example/profile#me";
    const BOB: &str = "https://bob.example/profile#me";

    fn rule(name: &str, agents: &[&str], modes: &[NamedNodeRef<'_>]) -> Thing {
        let mut rule = create_thing_named(name);
        rule = add_url(&rule, &TYPE, &ACL_AUTHORIZATION).unwrap();
        rule = add_url(&rule, &ACL_ACCESS_TO, RESOURCE).unwrap();
        for agent in agents {
            rule = add_url(&rule, &ACL_AGENT, *agent).unwrap();
        }
        for mode in modes {
            rule = add_url(&rule, &ACL_MODE, mode).unwrap();
        }
        rule
    }

    fn acl_with(rules: &[Thing]) -> AclDataset {
        let mut dataset = create_solid_dataset().with_resource_info(ResourceInfo::new(ACL_URL));
        for rule in rules {
            dataset = set_thing(&dataset, rule).unwrap();
        }
        AclDataset::new(dataset, RESOURCE)
    }

    #[test]
    fn write_implies_append() {
        let acl = acl_with(&[rule("w", &[ALICE], &[ACL_WRITE])]);
        let access = get_actor_access(&acl, &WacActor::Agent(ALICE.into()), AccessTarget::Resource);
        assert!(access.write);
        assert!(access.append);
        assert!(!access.read);
    }

    #[test]
    fn rules_combine_monotonically() {
        let acl = acl_with(&[rule("r", &[ALICE], &[ACL_READ]), rule("c", &[ALICE], &[ACL_CONTROL])]);
        let access = get_actor_access(&acl, &WacActor::Agent(ALICE.into()), AccessTarget::Resource);
        assert_eq!(access, WacAccessModes::new(true, false, false, true));
    }

    #[test]
    fn default_rules_do_not_grant_resource_access() {
        let mut default_rule = create_thing_named("d");
        default_rule = add_url(&default_rule, &TYPE, &ACL_AUTHORIZATION).unwrap();
        default_rule = add_url(&default_rule, &ACL_DEFAULT, RESOURCE).unwrap();
        default_rule = add_url(&default_rule, &ACL_AGENT, ALICE).unwrap();
        default_rule = add_url(&default_rule, &ACL_MODE, &ACL_READ).unwrap();
        let acl = acl_with(&[default_rule]);
        let alice = WacActor::Agent(ALICE.into());
        assert!(get_actor_access(&acl, &alice, AccessTarget::Resource).is_empty());
        assert!(get_actor_access(&acl, &alice, AccessTarget::Default).read);
    }

    #[test]
    fn setting_access_leaves_other_agents_alone() {
        let acl = acl_with(&[rule("shared", &[ALICE, BOB], &[ACL_READ, ACL_WRITE])]);
        let updated = set_actor_access(
            &acl,
            WacAccessModes::new(true, false, false, false),
            &WacActor::Agent(ALICE.into()),
            AccessTarget::Resource,
        )
        .unwrap();
        let alice = get_actor_access(&updated, &WacActor::Agent(ALICE.into()), AccessTarget::Resource);
        let bob = get_actor_access(&updated, &WacActor::Agent(BOB.into()), AccessTarget::Resource);
        assert_eq!(alice, WacAccessModes::new(true, false, false, false));
        assert_eq!(bob, WacAccessModes::new(true, true, true, false));
    }

    #[test]
    fn revoking_access_removes_empty_rules() {
        let acl = acl_with(&[rule("solo", &[ALICE], &[ACL_READ])]);
        let updated = set_actor_access(
            &acl,
            WacAccessModes::none(),
            &WacActor::Agent(ALICE.into()),
            AccessTarget::Resource,
        )
        .unwrap();
        assert!(get_rule_all(&updated).is_empty());
    }

    #[test]
    fn access_all_lists_every_agent() {
        let acl = acl_with(&[rule("r", &[ALICE, BOB], &[ACL_READ]), rule("w", &[BOB], &[ACL_WRITE])]);
        let all = get_actor_access_all(&acl, ACL_AGENT, AccessTarget::Resource);
        assert_eq!(all.len(), 2);
        assert_eq!(all[ALICE], WacAccessModes::new(true, false, false, false));
        assert_eq!(all[BOB], WacAccessModes::new(true, true, true, false));
    }
}
