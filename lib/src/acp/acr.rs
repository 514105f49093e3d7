//! Which Policies an ACR applies, to its Resource and to the Resource's members.
//!
//! Regular Policies hang off AccessControl Things (`acp:accessControl` then
//! `acp:apply`); ACR Policies, which govern the ACR itself, are listed directly
//! on the ACR Thing with `acp:access`. The member variants apply to the
//! children of a Container.

use super::{require_acr, with_acr};
use crate::accessors::{add_url, get_url_all, remove_all, remove_url, set_url};
use crate::consts::{
    ACP_ACCESS, ACP_ACCESS_CONTROL, ACP_ACCESS_CONTROL_RESOURCE, ACP_ACCESS_MEMBERS, ACP_APPLY,
    ACP_HAS_ACCESS_CONTROL, ACP_HAS_MEMBER_ACCESS_CONTROL, ACP_RESOURCE, TYPE,
};
use crate::dataset::SolidDataset;
use crate::store::Thing;
use crate::thing::{create_thing_with_url, get_thing, random_name, set_thing};
use crate::util::strip_fragment;
use anyhow::{anyhow, Result};
use oxigraph::model::NamedNodeRef;

/// A fresh IRI in the ACR, e.g. `<acr>#policy-Xy3...`.
pub(crate) fn new_thing_url(acr_url: &str, prefix: &str) -> String {
    format!("{}#{}-{}", strip_fragment(acr_url), prefix, random_name())
}

pub(crate) fn acr_url(acr: &SolidDataset) -> Result<&str> {
    acr.source_url()
        .ok_or_else(|| anyhow!("The Access Control Resource has no URL"))
}

// The ACR Thing, created when the ACR does not describe itself yet.
fn acr_thing(acr: &SolidDataset, resource: &SolidDataset) -> Result<Thing> {
    let url = acr_url(acr)?;
    if let Some(thing) = get_thing(acr, url) {
        return Ok(thing);
    }
    let mut thing = create_thing_with_url(url)?;
    thing = add_url(&thing, &TYPE, &ACP_ACCESS_CONTROL_RESOURCE)?;
    if let Some(resource_url) = resource.source_url() {
        thing = set_url(&thing, &ACP_RESOURCE, resource_url)?;
    }
    Ok(thing)
}

fn control_links(acr: &SolidDataset, link: NamedNodeRef<'_>) -> Vec<String> {
    acr_url(acr)
        .ok()
        .and_then(|url| get_thing(acr, url))
        .and_then(|thing| get_url_all(&thing, &link).ok())
        .unwrap_or_default()
}

fn applied_policy_urls(resource: &SolidDataset, link: NamedNodeRef<'_>) -> Vec<String> {
    let Ok(acr) = require_acr(resource) else {
        return Vec::new();
    };
    let mut urls = Vec::new();
    for control_url in control_links(acr, link) {
        if let Some(control) = get_thing(acr, &control_url) {
            for policy in get_url_all(&control, &ACP_APPLY).unwrap_or_default() {
                if !urls.contains(&policy) {
                    urls.push(policy);
                }
            }
        }
    }
    urls
}

fn apply_policy_url(resource: &SolidDataset, link: NamedNodeRef<'_>, policy_url: &str) -> Result<SolidDataset> {
    let acr = require_acr(resource)?;
    let mut root = acr_thing(acr, resource)?;
    let control = match control_links(acr, link).first().and_then(|url| get_thing(acr, url)) {
        Some(control) => control,
        None => {
            let control = create_thing_with_url(&new_thing_url(acr_url(acr)?, "accessControl"))?;
            root = add_url(&root, &link, &control)?;
            add_url(&control, &TYPE, &ACP_ACCESS_CONTROL)?
        }
    };
    let control = add_url(&control, &ACP_APPLY, policy_url)?;
    let acr = set_thing(&set_thing(acr, &root)?, &control)?;
    Ok(with_acr(resource, acr))
}

fn unapply_policy_url(resource: &SolidDataset, link: NamedNodeRef<'_>, policy_url: Option<&str>) -> Result<SolidDataset> {
    let mut acr = require_acr(resource)?.clone();
    for control_url in control_links(&acr, link) {
        let Some(control) = get_thing(&acr, &control_url) else {
            continue;
        };
        let control = match policy_url {
            Some(policy_url) => remove_url(&control, &ACP_APPLY, policy_url)?,
            None => remove_all(&control, &ACP_APPLY)?,
        };
        acr = set_thing(&acr, &control)?;
    }
    Ok(with_acr(resource, acr))
}

fn direct_policy_urls(resource: &SolidDataset, predicate: NamedNodeRef<'_>) -> Vec<String> {
    require_acr(resource)
        .map(|acr| control_links(acr, predicate))
        .unwrap_or_default()
}

fn add_direct_policy_url(resource: &SolidDataset, predicate: NamedNodeRef<'_>, policy_url: &str) -> Result<SolidDataset> {
    let acr = require_acr(resource)?;
    let root = add_url(&acr_thing(acr, resource)?, &predicate, policy_url)?;
    Ok(with_acr(resource, set_thing(acr, &root)?))
}

fn remove_direct_policy_url(
    resource: &SolidDataset,
    predicate: NamedNodeRef<'_>,
    policy_url: Option<&str>,
) -> Result<SolidDataset> {
    let acr = require_acr(resource)?;
    let root = acr_thing(acr, resource)?;
    let root = match policy_url {
        Some(policy_url) => remove_url(&root, &predicate, policy_url)?,
        None => remove_all(&root, &predicate)?,
    };
    Ok(with_acr(resource, set_thing(acr, &root)?))
}

// policies applying to the Resource

pub fn get_policy_url_all(resource: &SolidDataset) -> Vec<String> {
    applied_policy_urls(resource, ACP_HAS_ACCESS_CONTROL)
}

pub fn add_policy_url(resource: &SolidDataset, policy_url: &str) -> Result<SolidDataset> {
    apply_policy_url(resource, ACP_HAS_ACCESS_CONTROL, policy_url)
}

pub fn remove_policy_url(resource: &SolidDataset, policy_url: &str) -> Result<SolidDataset> {
    unapply_policy_url(resource, ACP_HAS_ACCESS_CONTROL, Some(policy_url))
}

pub fn remove_policy_url_all(resource: &SolidDataset) -> Result<SolidDataset> {
    unapply_policy_url(resource, ACP_HAS_ACCESS_CONTROL, None)
}

// policies applying to the ACR

pub fn get_acr_policy_url_all(resource: &SolidDataset) -> Vec<String> {
    direct_policy_urls(resource, ACP_ACCESS)
}

pub fn add_acr_policy_url(resource: &SolidDataset, policy_url: &str) -> Result<SolidDataset> {
    add_direct_policy_url(resource, ACP_ACCESS, policy_url)
}

pub fn remove_acr_policy_url(resource: &SolidDataset, policy_url: &str) -> Result<SolidDataset> {
    remove_direct_policy_url(resource, ACP_ACCESS, Some(policy_url))
}

pub fn remove_acr_policy_url_all(resource: &SolidDataset) -> Result<SolidDataset> {
    remove_direct_policy_url(resource, ACP_ACCESS, None)
}

// policies applying to a Container's children

pub fn get_member_policy_url_all(resource: &SolidDataset) -> Vec<String> {
    applied_policy_urls(resource, ACP_HAS_MEMBER_ACCESS_CONTROL)
}

pub fn add_member_policy_url(resource: &SolidDataset, policy_url: &str) -> Result<SolidDataset> {
    apply_policy_url(resource, ACP_HAS_MEMBER_ACCESS_CONTROL, policy_url)
}

pub fn remove_member_policy_url(resource: &SolidDataset, policy_url: &str) -> Result<SolidDataset> {
    unapply_policy_url(resource, ACP_HAS_MEMBER_ACCESS_CONTROL, Some(policy_url))
}

pub fn remove_member_policy_url_all(resource: &SolidDataset) -> Result<SolidDataset> {
    unapply_policy_url(resource, ACP_HAS_MEMBER_ACCESS_CONTROL, None)
}

// policies applying to the children's ACRs

pub fn get_member_acr_policy_url_all(resource: &SolidDataset) -> Vec<String> {
    direct_policy_urls(resource, ACP_ACCESS_MEMBERS)
}

pub fn add_member_acr_policy_url(resource: &SolidDataset, policy_url: &str) -> Result<SolidDataset> {
    add_direct_policy_url(resource, ACP_ACCESS_MEMBERS, policy_url)
}

pub fn remove_member_acr_policy_url(resource: &SolidDataset, policy_url: &str) -> Result<SolidDataset> {
    remove_direct_policy_url(resource, ACP_ACCESS_MEMBERS, Some(policy_url))
}

pub fn remove_member_acr_policy_url_all(resource: &SolidDataset) -> Result<SolidDataset> {
    remove_direct_policy_url(resource, ACP_ACCESS_MEMBERS, None)
}
