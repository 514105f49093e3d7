//! Reading and setting access without knowing which protocol the server speaks.
//!
//! A Resource whose access-control document is an ACR is governed by ACP;
//! anything else that links an ACL is governed by WAC. Both are expressed as
//! [`AccessModes`], with WAC's Control standing for both controlRead and
//! controlWrite. Every function returns `Ok(None)` when access cannot be
//! determined.

use crate::access::{AccessModes, AccessModesPatch, WacAccessModes};
use crate::acp;
use crate::dataset::SolidDataset;
use crate::errors::AccessModeError;
use crate::fetch::Fetcher;
use crate::options::AccessTarget;
use crate::resource::get_resource_info;
use crate::wac::{self, WacActor};
use anyhow::{anyhow, Result};
use log::debug;
use std::collections::BTreeMap;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AccessControlProtocol {
    Acp,
    Wac,
}

// A Resource together with the access-control data of its protocol.
enum Governed {
    Acp(SolidDataset),
    Wac(SolidDataset),
}

fn detect(url: &str, fetcher: &dyn Fetcher) -> Result<Option<Governed>> {
    let resource = get_resource_info(url, fetcher)?;
    if !wac::has_accessible_acl(&resource) {
        debug!("{url} links no access-control document");
        return Ok(None);
    }
    let acp_info = acp::fetch_acr(&resource, fetcher)?;
    if let Some(acr) = acp_info.acr {
        debug!("{url} is governed by ACP");
        return Ok(Some(Governed::Acp(acp::with_acr(&resource, acr))));
    }
    debug!("{url} is governed by WAC");
    let acl = wac::fetch_acl(&resource, fetcher)?;
    Ok(Some(Governed::Wac(SolidDataset {
        acl: Some(Box::new(acl)),
        ..resource
    })))
}

/// The protocol governing access to the Resource at `url`.
pub fn get_access_protocol(url: &str, fetcher: &dyn Fetcher) -> Result<Option<AccessControlProtocol>> {
    Ok(detect(url, fetcher)?.map(|governed| match governed {
        Governed::Acp(_) => AccessControlProtocol::Acp,
        Governed::Wac(_) => AccessControlProtocol::Wac,
    }))
}

/// WAC cannot grant controlRead without controlWrite, or the other way around.
pub fn to_wac_access(access: &AccessModes) -> Result<WacAccessModes> {
    if access.control_read != access.control_write {
        return Err(anyhow!(AccessModeError::AsymmetricControl {
            control_read: access.control_read,
            control_write: access.control_write,
        }));
    }
    Ok(WacAccessModes::new(access.read, access.append, access.write, access.control_read))
}

pub fn get_agent_access(url: &str, webid: &str, fetcher: &dyn Fetcher) -> Result<Option<AccessModes>> {
    match detect(url, fetcher)? {
        None => Ok(None),
        Some(Governed::Acp(resource)) => acp::get_agent_access(&resource, webid, fetcher),
        Some(Governed::Wac(resource)) => Ok(wac::get_agent_access(&resource, webid).map(AccessModes::from)),
    }
}

/// What everyone, including unauthenticated visitors, may do.
pub fn get_public_access(url: &str, fetcher: &dyn Fetcher) -> Result<Option<AccessModes>> {
    match detect(url, fetcher)? {
        None => Ok(None),
        Some(Governed::Acp(resource)) => acp::get_public_access(&resource, fetcher),
        Some(Governed::Wac(resource)) => Ok(wac::get_public_access(&resource).map(AccessModes::from)),
    }
}

/// The access of every agent the Resource's access controls name.
pub fn get_agent_access_all(url: &str, fetcher: &dyn Fetcher) -> Result<Option<BTreeMap<String, AccessModes>>> {
    match detect(url, fetcher)? {
        None => Ok(None),
        Some(Governed::Acp(resource)) => acp::get_agent_access_all(&resource, fetcher),
        Some(Governed::Wac(resource)) => Ok(wac::get_agent_access_all(&resource).map(|all| {
            all.into_iter()
                .map(|(agent, access)| (agent, AccessModes::from(access)))
                .collect()
        })),
    }
}

pub fn set_agent_access(
    url: &str,
    webid: &str,
    patch: &AccessModesPatch,
    fetcher: &dyn Fetcher,
) -> Result<Option<AccessModes>> {
    set_actor_access(url, &WacActor::Agent(webid.to_string()), patch, fetcher)
}

pub fn set_public_access(url: &str, patch: &AccessModesPatch, fetcher: &dyn Fetcher) -> Result<Option<AccessModes>> {
    set_actor_access(url, &WacActor::Public, patch, fetcher)
}

/// Applies `patch` to the actor's access, saves the access-control document
/// and returns the access the actor now has.
fn set_actor_access(
    url: &str,
    actor: &WacActor,
    patch: &AccessModesPatch,
    fetcher: &dyn Fetcher,
) -> Result<Option<AccessModes>> {
    match detect(url, fetcher)? {
        None => Ok(None),
        Some(Governed::Acp(resource)) => {
            let acp_actor = match actor {
                WacActor::Public => crate::consts::ACP_PUBLIC_AGENT.as_str(),
                _ => actor.iri(),
            };
            let Some(updated) = acp::set_agent_access(&resource, acp_actor, patch, fetcher)? else {
                return Ok(None);
            };
            let saved = acp::save_acr_for(&updated, fetcher)?;
            acp::get_agent_access(&saved, acp_actor, fetcher)
        }
        Some(Governed::Wac(resource)) => {
            let Some(current) = wac::get_actor_access_for(&resource, actor) else {
                return Ok(None);
            };
            let wanted = to_wac_access(&AccessModes::from(current).apply(patch))?;
            let acl = match wac::get_resource_acl(&resource) {
                Some(acl) => acl.clone(),
                None => wac::create_acl_from_fallback_acl(&resource)?,
            };
            let updated = wac::set_actor_access(&acl, wanted, actor, AccessTarget::Resource)?;
            let saved = wac::save_acl_for(&resource, &updated, fetcher)?;
            Ok(Some(AccessModes::from(wac::get_actor_access(
                &saved,
                actor,
                AccessTarget::Resource,
            ))))
        }
    }
}
