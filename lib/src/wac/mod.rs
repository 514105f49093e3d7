//! Web Access Control.
//!
//! A Resource's access is described by its ACL, a SolidDataset of
//! `acl:Authorization` rules. When a Resource has no ACL of its own, the
//! closest ancestor Container's ACL applies through its `acl:default` rules
//! (the "fallback ACL").

mod acl;
mod rules;

pub use acl::{
    create_acl, create_acl_from_fallback_acl, delete_acl_for, fetch_acl, get_fallback_acl,
    get_resource_acl, get_resource_info_with_acl, get_solid_dataset_with_acl, has_accessible_acl,
    has_fallback_acl, has_resource_acl, save_acl_for,
};
pub use rules::{
    get_actor_access, get_actor_access_all, get_rule_all, is_acl_rule, rule_access, set_actor_access,
    WacActor,
};

use crate::access::WacAccessModes;
use crate::consts::{ACL_AGENT, ACL_AGENT_GROUP};
use crate::dataset::SolidDataset;
use crate::options::AccessTarget;
use anyhow::Result;
use std::collections::BTreeMap;

/// An ACL together with the URL of the Resource it governs.
#[derive(Clone, Debug, PartialEq)]
pub struct AclDataset {
    pub(crate) dataset: SolidDataset,
    pub(crate) access_to: String,
}

impl AclDataset {
    pub fn new(dataset: SolidDataset, access_to: &str) -> Self {
        Self {
            dataset,
            access_to: access_to.to_string(),
        }
    }

    pub fn dataset(&self) -> &SolidDataset {
        &self.dataset
    }

    /// The URL of the Resource this ACL applies to.
    pub fn access_to(&self) -> &str {
        &self.access_to
    }

    pub(crate) fn with_dataset(&self, dataset: SolidDataset) -> Self {
        Self {
            dataset,
            access_to: self.access_to.clone(),
        }
    }
}

/// The ACLs fetched alongside a Resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AclInfo {
    pub resource_acl: Option<AclDataset>,
    pub fallback_acl: Option<AclDataset>,
}

// agent

pub fn get_agent_resource_access(acl: &AclDataset, webid: &str) -> WacAccessModes {
    get_actor_access(acl, &WacActor::Agent(webid.to_string()), AccessTarget::Resource)
}

pub fn get_agent_default_access(acl: &AclDataset, webid: &str) -> WacAccessModes {
    get_actor_access(acl, &WacActor::Agent(webid.to_string()), AccessTarget::Default)
}

pub fn get_agent_resource_access_all(acl: &AclDataset) -> BTreeMap<String, WacAccessModes> {
    get_actor_access_all(acl, ACL_AGENT, AccessTarget::Resource)
}

pub fn get_agent_default_access_all(acl: &AclDataset) -> BTreeMap<String, WacAccessModes> {
    get_actor_access_all(acl, ACL_AGENT, AccessTarget::Default)
}

pub fn set_agent_resource_access(acl: &AclDataset, webid: &str, access: WacAccessModes) -> Result<AclDataset> {
    set_actor_access(acl, access, &WacActor::Agent(webid.to_string()), AccessTarget::Resource)
}

pub fn set_agent_default_access(acl: &AclDataset, webid: &str, access: WacAccessModes) -> Result<AclDataset> {
    set_actor_access(acl, access, &WacActor::Agent(webid.to_string()), AccessTarget::Default)
}

// group

pub fn get_group_resource_access(acl: &AclDataset, group: &str) -> WacAccessModes {
    get_actor_access(acl, &WacActor::Group(group.to_string()), AccessTarget::Resource)
}

pub fn get_group_default_access(acl: &AclDataset, group: &str) -> WacAccessModes {
    get_actor_access(acl, &WacActor::Group(group.to_string()), AccessTarget::Default)
}

pub fn get_group_resource_access_all(acl: &AclDataset) -> BTreeMap<String, WacAccessModes> {
    get_actor_access_all(acl, ACL_AGENT_GROUP, AccessTarget::Resource)
}

pub fn get_group_default_access_all(acl: &AclDataset) -> BTreeMap<String, WacAccessModes> {
    get_actor_access_all(acl, ACL_AGENT_GROUP, AccessTarget::Default)
}

pub fn set_group_resource_access(acl: &AclDataset, group: &str, access: WacAccessModes) -> Result<AclDataset> {
    set_actor_access(acl, access, &WacActor::Group(group.to_string()), AccessTarget::Resource)
}

pub fn set_group_default_access(acl: &AclDataset, group: &str, access: WacAccessModes) -> Result<AclDataset> {
    set_actor_access(acl, access, &WacActor::Group(group.to_string()), AccessTarget::Default)
}

// public (foaf:Agent) and authenticated agents

pub fn get_public_resource_access(acl: &AclDataset) -> WacAccessModes {
    get_actor_access(acl, &WacActor::Public, AccessTarget::Resource)
}

pub fn get_public_default_access(acl: &AclDataset) -> WacAccessModes {
    get_actor_access(acl, &WacActor::Public, AccessTarget::Default)
}

pub fn set_public_resource_access(acl: &AclDataset, access: WacAccessModes) -> Result<AclDataset> {
    set_actor_access(acl, access, &WacActor::Public, AccessTarget::Resource)
}

pub fn set_public_default_access(acl: &AclDataset, access: WacAccessModes) -> Result<AclDataset> {
    set_actor_access(acl, access, &WacActor::Public, AccessTarget::Default)
}

pub fn get_authenticated_resource_access(acl: &AclDataset) -> WacAccessModes {
    get_actor_access(acl, &WacActor::Authenticated, AccessTarget::Resource)
}

pub fn get_authenticated_default_access(acl: &AclDataset) -> WacAccessModes {
    get_actor_access(acl, &WacActor::Authenticated, AccessTarget::Default)
}

pub fn set_authenticated_resource_access(acl: &AclDataset, access: WacAccessModes) -> Result<AclDataset> {
    set_actor_access(acl, access, &WacActor::Authenticated, AccessTarget::Resource)
}

pub fn set_authenticated_default_access(acl: &AclDataset, access: WacAccessModes) -> Result<AclDataset> {
    set_actor_access(acl, access, &WacActor::Authenticated, AccessTarget::Default)
}

/// The access `actor` has to a Resource fetched with its ACL: the resource ACL's
/// rules when it has one, otherwise the fallback ACL's default rules. `None` when
/// neither ACL could be fetched.
pub fn get_actor_access_for(resource: &SolidDataset, actor: &WacActor) -> Option<WacAccessModes> {
    if let Some(acl) = get_resource_acl(resource) {
        return Some(get_actor_access(acl, actor, AccessTarget::Resource));
    }
    get_fallback_acl(resource).map(|acl| get_actor_access(acl, actor, AccessTarget::Default))
}

pub fn get_agent_access(resource: &SolidDataset, webid: &str) -> Option<WacAccessModes> {
    get_actor_access_for(resource, &WacActor::Agent(webid.to_string()))
}

pub fn get_group_access(resource: &SolidDataset, group: &str) -> Option<WacAccessModes> {
    get_actor_access_for(resource, &WacActor::Group(group.to_string()))
}

pub fn get_public_access(resource: &SolidDataset) -> Option<WacAccessModes> {
    get_actor_access_for(resource, &WacActor::Public)
}

pub fn get_authenticated_access(resource: &SolidDataset) -> Option<WacAccessModes> {
    get_actor_access_for(resource, &WacActor::Authenticated)
}

/// Every agent's access to a Resource fetched with its ACL.
pub fn get_agent_access_all(resource: &SolidDataset) -> Option<BTreeMap<String, WacAccessModes>> {
    if let Some(acl) = get_resource_acl(resource) {
        return Some(get_agent_resource_access_all(acl));
    }
    get_fallback_acl(resource).map(get_agent_default_access_all)
}

pub fn get_group_access_all(resource: &SolidDataset) -> Option<BTreeMap<String, WacAccessModes>> {
    if let Some(acl) = get_resource_acl(resource) {
        return Some(get_group_resource_access_all(acl));
    }
    get_fallback_acl(resource).map(get_group_default_access_all)
}
