//! Fetching, creating, saving and deleting ACLs.

use super::{AclDataset, AclInfo};
use crate::consts::{ACL_ACCESS_TO, ACL_AUTHORIZATION, ACL_DEFAULT, ACL_DEFAULT_FOR_NEW, TYPE};
use crate::dataset::{create_solid_dataset, is_container, ResourceInfo, SolidDataset};
use crate::errors::AccessModeError;
use crate::fetch::Fetcher;
use crate::resource::{
    delete_solid_dataset, get_resource_info, get_solid_dataset, is_fetch_error_with_status, save_solid_dataset_at,
};
use crate::thing::{create_thing_named, random_name, set_thing};
use crate::util::get_parent_container_url;
use anyhow::{anyhow, Result};
use log::{debug, info};

/// Fetches the Resource at `url` together with its resource ACL and, when it
/// has none, the fallback ACL of its closest ancestor.
pub fn get_solid_dataset_with_acl(url: &str, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    let resource = get_solid_dataset(url, fetcher)?;
    let acl = fetch_acl(&resource, fetcher)?;
    Ok(SolidDataset {
        acl: Some(Box::new(acl)),
        ..resource
    })
}

/// Like [`get_solid_dataset_with_acl`], but only fetches the Resource's metadata.
pub fn get_resource_info_with_acl(url: &str, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    let resource = get_resource_info(url, fetcher)?;
    let acl = fetch_acl(&resource, fetcher)?;
    Ok(SolidDataset {
        acl: Some(Box::new(acl)),
        ..resource
    })
}

/// The resource ACL of `resource`, or the fallback ACL when it has none. Both
/// are absent when the server does not advertise an ACL.
pub fn fetch_acl(resource: &SolidDataset, fetcher: &dyn Fetcher) -> Result<AclInfo> {
    if !has_accessible_acl(resource) {
        debug!("{} advertises no ACL", resource.source_url().unwrap_or_default());
        return Ok(AclInfo::default());
    }
    let resource_acl = fetch_resource_acl(resource, fetcher)?;
    let fallback_acl = match resource_acl {
        Some(_) => None,
        None => fetch_fallback_acl(resource, fetcher)?,
    };
    Ok(AclInfo {
        resource_acl,
        fallback_acl,
    })
}

fn fetch_resource_acl(resource: &SolidDataset, fetcher: &dyn Fetcher) -> Result<Option<AclDataset>> {
    let (Some(source), Some(acl_url)) = (resource.source_url(), acl_url_of(resource)) else {
        return Ok(None);
    };
    match get_solid_dataset(acl_url, fetcher) {
        Ok(dataset) => Ok(Some(AclDataset::new(dataset, source))),
        Err(err) if is_fetch_error_with_status(&err, 404) => {
            debug!("{source} has no ACL of its own");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

// Walks up the Container hierarchy until a Container with an ACL is found.
fn fetch_fallback_acl(resource: &SolidDataset, fetcher: &dyn Fetcher) -> Result<Option<AclDataset>> {
    let mut current = resource.clone();
    loop {
        let Some(parent_url) = current.source_url().and_then(get_parent_container_url) else {
            return Ok(None);
        };
        let container = get_resource_info(&parent_url, fetcher)?;
        if !has_accessible_acl(&container) {
            debug!("The ACL of {parent_url} is not accessible; no fallback ACL");
            return Ok(None);
        }
        if let Some(acl) = fetch_resource_acl(&container, fetcher)? {
            debug!("Using the ACL of {parent_url} as fallback");
            return Ok(Some(acl));
        }
        current = container;
    }
}

fn acl_url_of(resource: &SolidDataset) -> Option<&str> {
    resource.resource_info().and_then(|info| info.acl_url.as_deref())
}

fn acl_info(resource: &SolidDataset) -> Option<&AclInfo> {
    resource.acl.as_deref()
}

/// True when the server told us where the Resource's ACL lives.
pub fn has_accessible_acl(resource: &SolidDataset) -> bool {
    acl_url_of(resource).is_some()
}

pub fn has_resource_acl(resource: &SolidDataset) -> bool {
    get_resource_acl(resource).is_some()
}

/// The ACL that applies to exactly this Resource, when it has one and it was fetched.
pub fn get_resource_acl(resource: &SolidDataset) -> Option<&AclDataset> {
    let acl = acl_info(resource)?.resource_acl.as_ref()?;
    let governs_resource = resource.source_url() == Some(acl.access_to());
    let fetched_from_link = acl.dataset().source_url() == acl_url_of(resource);
    (governs_resource && fetched_from_link).then_some(acl)
}

pub fn has_fallback_acl(resource: &SolidDataset) -> bool {
    get_fallback_acl(resource).is_some()
}

pub fn get_fallback_acl(resource: &SolidDataset) -> Option<&AclDataset> {
    acl_info(resource)?.fallback_acl.as_ref()
}

/// An empty resource ACL for `target`, to be saved at its ACL URL.
pub fn create_acl(target: &SolidDataset) -> Result<AclDataset> {
    let source = target
        .source_url()
        .ok_or_else(|| anyhow!("Cannot create an ACL for a Resource that was not fetched"))?;
    let acl_url = acl_url_of(target).ok_or_else(|| anyhow!(AccessModeError::NoAccessControl(source.to_string())))?;
    let mut resource_info = ResourceInfo::new(acl_url);
    resource_info.content_type = Some(crate::io::TURTLE.to_string());
    Ok(AclDataset::new(
        create_solid_dataset().with_resource_info(resource_info),
        source,
    ))
}

/// A resource ACL for `target` that grants what its fallback ACL's default
/// rules grant today. The copied rules also become default rules when the
/// target is a Container.
pub fn create_acl_from_fallback_acl(target: &SolidDataset) -> Result<AclDataset> {
    let fallback = get_fallback_acl(target).ok_or_else(|| {
        anyhow!(
            "No fallback ACL was fetched for [{}]",
            target.source_url().unwrap_or_default()
        )
    })?;
    let empty = create_acl(target)?;
    let target_url = empty.access_to().to_string();
    let container = is_container(target);

    let mut dataset = empty.dataset().clone();
    for rule in super::rules::get_rule_all(fallback) {
        let defaults: Vec<String> = [ACL_DEFAULT, ACL_DEFAULT_FOR_NEW]
            .iter()
            .filter_map(|p| rule.objects(p.as_str()))
            .flat_map(|o| o.named_nodes.iter().cloned())
            .collect();
        if !defaults.iter().any(|d| d == fallback.access_to()) {
            continue;
        }
        let mut copy = create_thing_named(&format!("rule-{}", random_name()));
        for (predicate, objects) in rule.predicates() {
            let inherited = [ACL_ACCESS_TO, ACL_DEFAULT, ACL_DEFAULT_FOR_NEW, TYPE]
                .iter()
                .any(|p| p.as_str() == predicate);
            if !inherited {
                copy.predicates_mut().insert(predicate.clone(), objects.clone());
            }
        }
        copy = crate::accessors::add_url(&copy, &TYPE, &ACL_AUTHORIZATION)?;
        copy = crate::accessors::add_url(&copy, &ACL_ACCESS_TO, target_url.as_str())?;
        if container {
            copy = crate::accessors::add_url(&copy, &ACL_DEFAULT, target_url.as_str())?;
        }
        dataset = set_thing(&dataset, &copy)?;
    }
    Ok(empty.with_dataset(dataset))
}

/// Saves `acl` at the ACL URL of `resource`.
pub fn save_acl_for(resource: &SolidDataset, acl: &AclDataset, fetcher: &dyn Fetcher) -> Result<AclDataset> {
    let source = resource.source_url().unwrap_or_default();
    let acl_url = acl_url_of(resource).ok_or_else(|| anyhow!(AccessModeError::NoAccessControl(source.to_string())))?;
    let saved = save_solid_dataset_at(acl_url, acl.dataset(), fetcher)?;
    info!("Saved the ACL of {source}");
    Ok(acl.with_dataset(saved))
}

/// Deletes the resource ACL of `resource`, so its fallback ACL applies again.
pub fn delete_acl_for(resource: &SolidDataset, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    let source = resource.source_url().unwrap_or_default();
    let acl_url = acl_url_of(resource).ok_or_else(|| anyhow!(AccessModeError::NoAccessControl(source.to_string())))?;
    delete_solid_dataset(acl_url, fetcher)?;
    let acl = resource.acl.as_deref().map(|acl| AclInfo {
        resource_acl: None,
        fallback_acl: acl.fallback_acl.clone(),
    });
    Ok(SolidDataset {
        acl: acl.map(Box::new),
        ..resource.clone()
    })
}
