//! Access Control Policies.
//!
//! A Resource governed by ACP links to an Access Control Resource (ACR). The
//! ACR applies Policies to the Resource; each Policy allows or denies modes to
//! whoever its Matchers match. Policies and Matchers may live in the ACR itself
//! or in other Resources.

mod acr;
mod engine;
mod matcher;
mod policy;
mod resolve;

pub use acr::{
    add_acr_policy_url, add_member_acr_policy_url, add_member_policy_url, add_policy_url, get_acr_policy_url_all,
    get_member_acr_policy_url_all, get_member_policy_url_all, get_policy_url_all, remove_acr_policy_url,
    remove_acr_policy_url_all, remove_member_acr_policy_url, remove_member_acr_policy_url_all,
    remove_member_policy_url, remove_member_policy_url_all, remove_policy_url, remove_policy_url_all,
};
pub use engine::{
    get_actor_access, get_actor_access_all, get_agent_access, get_agent_access_all, get_public_access,
    policy_applies_to, set_actor_access, set_agent_access, set_public_access, ActorRelation,
};
pub use matcher::{
    add_agent, add_client, create_matcher, get_agent_all, get_client_all, get_matcher, get_matcher_all,
    has_any_client, has_authenticated, has_creator, has_public, remove_agent, remove_client, remove_matcher,
    set_any_client, set_authenticated, set_creator, set_matcher, set_public,
};
pub use policy::{
    add_matcher_url, create_policy, get_allow_modes, get_deny_modes, get_matcher_url_all, get_policy,
    get_policy_all, remove_matcher_url, remove_policy, set_allow_modes, set_deny_modes, set_matcher_url,
    set_policy, MatcherCombination, PolicyModes,
};
pub use resolve::{get_policies_and_matchers, AcpData};

use crate::consts::{ACP_ACCESS_CONTROL_RESOURCE, TYPE};
use crate::dataset::{get_linked_resource_url_all, SolidDataset};
use crate::errors::AccessModeError;
use crate::fetch::Fetcher;
use crate::options::BlankNodeThings;
use crate::resource::{get_resource_info, get_solid_dataset, is_fetch_error_with_status, save_solid_dataset_at};
use crate::thing::get_thing_all;
use anyhow::{anyhow, Result};
use log::{debug, info};

const ACP_NAMESPACE: &str = "http://www.w3.org/ns/solid/acp#";

/// The Access Control Resource fetched alongside a Resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AcpInfo {
    pub acr: Option<SolidDataset>,
}

/// Fetches the Resource at `url` and, when it is governed by ACP, its ACR.
pub fn get_solid_dataset_with_acr(url: &str, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    let resource = get_solid_dataset(url, fetcher)?;
    let acp = fetch_acr(&resource, fetcher)?;
    Ok(with_acp(resource, acp))
}

pub fn get_resource_info_with_acr(url: &str, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    let resource = get_resource_info(url, fetcher)?;
    let acp = fetch_acr(&resource, fetcher)?;
    Ok(with_acp(resource, acp))
}

fn with_acp(resource: SolidDataset, acp: AcpInfo) -> SolidDataset {
    SolidDataset {
        acp: Some(Box::new(acp)),
        ..resource
    }
}

/// Fetches the access-control document `resource` links to, keeping it only
/// when it is an ACR. A missing or forbidden document is not an error.
pub fn fetch_acr(resource: &SolidDataset, fetcher: &dyn Fetcher) -> Result<AcpInfo> {
    let Some(acl_url) = resource.resource_info().and_then(|info| info.acl_url.clone()) else {
        return Ok(AcpInfo::default());
    };
    let document = match get_solid_dataset(&acl_url, fetcher) {
        Ok(document) => document,
        Err(err) if is_fetch_error_with_status(&err, 404) || is_fetch_error_with_status(&err, 403) => {
            debug!("The access-control document {acl_url} is not accessible");
            return Ok(AcpInfo::default());
        }
        Err(err) => return Err(err),
    };
    if is_acr(&document) {
        debug!("{acl_url} is an Access Control Resource");
        Ok(AcpInfo { acr: Some(document) })
    } else {
        Ok(AcpInfo::default())
    }
}

/// True for a document the server types as an ACR, or that uses the ACP vocabulary.
pub fn is_acr(document: &SolidDataset) -> bool {
    if get_linked_resource_url_all(document, "type")
        .iter()
        .any(|t| t == ACP_ACCESS_CONTROL_RESOURCE.as_str())
    {
        return true;
    }
    get_thing_all(document, BlankNodeThings::Exclude).iter().any(|thing| {
        thing.predicates().iter().any(|(predicate, objects)| {
            predicate.starts_with(ACP_NAMESPACE)
                || (predicate == TYPE.as_str() && objects.named_nodes.iter().any(|t| t.starts_with(ACP_NAMESPACE)))
        })
    })
}

pub fn has_accessible_acr(resource: &SolidDataset) -> bool {
    get_acr(resource).is_some()
}

pub fn get_acr(resource: &SolidDataset) -> Option<&SolidDataset> {
    resource.acp.as_deref()?.acr.as_ref()
}

/// `resource` with `acr` as its Access Control Resource.
pub fn with_acr(resource: &SolidDataset, acr: SolidDataset) -> SolidDataset {
    with_acp(resource.clone(), AcpInfo { acr: Some(acr) })
}

pub(crate) fn require_acr(resource: &SolidDataset) -> Result<&SolidDataset> {
    get_acr(resource).ok_or_else(|| {
        anyhow!(AccessModeError::NoAccessControl(
            resource.source_url().unwrap_or_default().to_string()
        ))
    })
}

/// Saves the ACR of `resource` and returns the Resource with the saved ACR.
pub fn save_acr_for(resource: &SolidDataset, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    let acr = require_acr(resource)?;
    let acr_url = acr
        .source_url()
        .ok_or_else(|| anyhow!("The Access Control Resource has no URL to be saved to"))?;
    let saved = save_solid_dataset_at(acr_url, acr, fetcher)?;
    info!("Saved the Access Control Resource {acr_url}");
    Ok(with_acr(resource, saved))
}
