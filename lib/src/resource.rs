//! Fetching, saving and deleting SolidDatasets and Containers.
//!
//! Saving picks one of two requests. A dataset fetched from the target URL is
//! sent as a SPARQL `PATCH` of its change log, so concurrent edits of other
//! triples survive. Anything else is created with a `PUT` guarded by
//! `If-None-Match: *`, so an existing Resource is never overwritten by accident.

use crate::changelog::ChangeLog;
use crate::consts::{LDP_BASIC_CONTAINER, LDP_CONTAINS, LDP_RESOURCE, PIM_STORAGE, PIM_STORAGE_TYPE, SOLID_POD_OWNER};
use crate::dataset::{create_solid_dataset, get_linked_resource_url_all, ResourceInfo, SolidDataset};
use crate::errors::FetchError;
use crate::fetch::{parse_link_header, parse_wac_allow_header, Fetcher, HttpRequest, HttpResponse, WAC_ALLOW};
use crate::io::{detect_format, is_rdf_content_type, parse_quads, quads_to_turtle, SPARQL_UPDATE, TURTLE};
use crate::options::ChainDetection;
use crate::thing::{get_thing, resolve_local_iri};
use crate::util::{as_container_url, is_container_url, resolve_relative};
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use reqwest::header::{HeaderName, ACCEPT, CONTENT_TYPE, IF_NONE_MATCH, LINK, LOCATION};
use reqwest::StatusCode;

/// The body Node Solid Server answers a `PUT` to a Container with.
pub const NSS_PUT_CONTAINER_MESSAGE: &str = "Can't write file: PUT not supported on containers, use POST instead";

pub(crate) const SLUG: HeaderName = HeaderName::from_static("slug");

fn type_link(type_iri: &str) -> String {
    format!("<{type_iri}>; rel=\"type\"")
}

/// Reads `Content-Type`, `Link` and `WAC-Allow` from a response.
pub fn parse_resource_info(response: &HttpResponse) -> ResourceInfo {
    let linked_resources = parse_link_header(&response.headers, &response.url);
    let content_type = response.content_type().map(str::to_string);
    ResourceInfo {
        source_iri: response.url.clone(),
        is_raw_data: !is_rdf_content_type(content_type.as_deref()),
        acl_url: linked_resources.get("acl").and_then(|urls| urls.first().cloned()),
        permissions: response.header_value(WAC_ALLOW).map(parse_wac_allow_header),
        linked_resources,
        content_type,
    }
}

pub fn get_solid_dataset(url: &str, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    get_solid_dataset_with(url, fetcher, ChainDetection::Enabled)
}

/// Fetches and parses the Resource at `url` (Turtle or JSON-LD).
pub fn get_solid_dataset_with(url: &str, fetcher: &dyn Fetcher, detection: ChainDetection) -> Result<SolidDataset> {
    let request = HttpRequest::get(url).header(ACCEPT, TURTLE)?;
    let response = fetcher
        .fetch(&request)?
        .error_for_status(&format!("Fetching the Resource at [{url}] failed"))?;
    let quads = parse_quads(&response.body, detect_format(response.content_type()), &response.url)?;
    info!("Fetched {} ({} quads)", response.url, quads.len());
    let mut dataset = SolidDataset::from_quads(&quads, detection)?;
    let mut resource_info = parse_resource_info(&response);
    resource_info.is_raw_data = false;
    dataset.resource_info = Some(resource_info);
    dataset.change_log = Some(ChangeLog::default());
    Ok(dataset)
}

/// Metadata of the Resource at `url`, from a `HEAD` request. The returned
/// dataset holds no data.
pub fn get_resource_info(url: &str, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    let response = fetcher
        .fetch(&HttpRequest::head(url))?
        .error_for_status(&format!("Fetching the metadata of the Resource at [{url}] failed"))?;
    Ok(create_solid_dataset().with_resource_info(parse_resource_info(&response)))
}

/// The SPARQL Update body for a change log: `DELETE DATA {..}; INSERT DATA {..};`,
/// leaving out empty clauses.
pub fn change_log_to_sparql_update(change_log: &ChangeLog) -> Result<String> {
    let mut statements = Vec::new();
    if !change_log.deletions.is_empty() {
        statements.push(format!("DELETE DATA {{{}}};", quads_to_turtle(&change_log.deletions)?));
    }
    if !change_log.additions.is_empty() {
        statements.push(format!("INSERT DATA {{{}}};", quads_to_turtle(&change_log.additions)?));
    }
    Ok(statements.join(" "))
}

fn prepare_update(url: &str, change_log: &ChangeLog) -> Result<HttpRequest> {
    Ok(HttpRequest::patch(url)
        .header(CONTENT_TYPE, SPARQL_UPDATE)?
        .body(change_log_to_sparql_update(change_log)?))
}

fn prepare_create(url: &str, dataset: &SolidDataset) -> Result<HttpRequest> {
    Ok(HttpRequest::put(url)
        .header(CONTENT_TYPE, TURTLE)?
        .header(IF_NONE_MATCH, "*")?
        .header(LINK, &type_link(LDP_RESOURCE.as_str()))?
        .body(quads_to_turtle(&dataset.to_quads())?))
}

/// Saves `dataset` at `url` and returns it as stored: Local Nodes resolved
/// against `url`, the change log emptied and the resource info refreshed.
pub fn save_solid_dataset_at(url: &str, dataset: &SolidDataset, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    let resolved = dataset.resolve_local_nodes(url);
    let is_update = dataset.is_update(url);
    let mut resource_info = if is_update {
        let change_log = resolved.change_log.clone().unwrap_or_default();
        if change_log.is_empty() {
            debug!("Nothing to save at {url}");
            return Ok(resolved);
        }
        let response = fetcher
            .fetch(&prepare_update(url, &change_log)?)?
            .error_for_status(&format!("Storing the Resource at [{url}] failed"))?;
        let mut resource_info = resolved.resource_info.clone().unwrap_or_default();
        for (rel, urls) in parse_link_header(&response.headers, url) {
            resource_info.linked_resources.insert(rel, urls);
        }
        resource_info
    } else {
        let response = fetcher
            .fetch(&prepare_create(url, &resolved)?)?
            .error_for_status(&format!("Storing the Resource at [{url}] failed"))?;
        let mut resource_info = parse_resource_info(&response);
        resource_info.content_type = Some(TURTLE.to_string());
        resource_info
    };
    info!("Saved {} ({})", url, if is_update { "PATCH" } else { "PUT" });
    resource_info.source_iri = url.to_string();
    resource_info.is_raw_data = false;
    if resource_info.acl_url.is_none() {
        resource_info.acl_url = resource_info
            .linked_resources
            .get("acl")
            .and_then(|urls| urls.first().cloned());
    }
    Ok(SolidDataset {
        resource_info: Some(resource_info),
        change_log: Some(ChangeLog::default()),
        ..resolved
    })
}

fn location_of(response: &HttpResponse, container_url: &str) -> Result<String> {
    response
        .header_value(LOCATION.as_str())
        .map(|location| resolve_relative(container_url, location))
        .ok_or_else(|| anyhow!("Could not determine the location of the Resource created in [{container_url}]"))
}

/// Saves `dataset` as a new Resource inside a Container. The server picks the
/// final URL, optionally guided by `slug`.
pub fn save_solid_dataset_in_container(
    container_url: &str,
    dataset: &SolidDataset,
    slug: Option<&str>,
    fetcher: &dyn Fetcher,
) -> Result<SolidDataset> {
    // Local Nodes become relative fragments; the server resolves them against the new URL.
    let relative = SolidDataset {
        graphs: dataset.graphs.rewrite_iris(&|iri: &str| {
            crate::thing::local_node_name(iri).map(|_| resolve_local_iri(iri, ""))
        }),
        ..create_solid_dataset()
    };
    let mut request = HttpRequest::post(container_url)
        .header(CONTENT_TYPE, TURTLE)?
        .header(LINK, &type_link(LDP_RESOURCE.as_str()))?
        .body(quads_to_turtle(&relative.to_quads())?);
    if let Some(slug) = slug {
        request = request.header(SLUG, slug)?;
    }
    let response = fetcher
        .fetch(&request)?
        .error_for_status(&format!("Storing the Resource in the Container at [{container_url}] failed"))?;
    let url = location_of(&response, container_url)?;
    info!("Created {url} in {container_url}");
    let mut resource_info = ResourceInfo::new(&url);
    resource_info.content_type = Some(TURTLE.to_string());
    resource_info.linked_resources = parse_link_header(&response.headers, &url);
    resource_info.acl_url = resource_info
        .linked_resources
        .get("acl")
        .and_then(|urls| urls.first().cloned());
    Ok(SolidDataset {
        resource_info: Some(resource_info),
        change_log: Some(ChangeLog::default()),
        ..dataset.resolve_local_nodes(&url)
    })
}

fn empty_container(url: &str, response: &HttpResponse) -> SolidDataset {
    let mut resource_info = parse_resource_info(response);
    resource_info.source_iri = url.to_string();
    resource_info.is_raw_data = false;
    SolidDataset {
        resource_info: Some(resource_info),
        change_log: Some(ChangeLog::default()),
        ..create_solid_dataset()
    }
}

/// Creates an empty Container at `url` (a trailing slash is added when missing).
pub fn create_container_at(url: &str, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    let url = as_container_url(url);
    let request = HttpRequest::put(&url)
        .header(CONTENT_TYPE, TURTLE)?
        .header(IF_NONE_MATCH, "*")?
        .header(LINK, &type_link(LDP_BASIC_CONTAINER.as_str()))?;
    let response = fetcher.fetch(&request)?;
    if response.status == StatusCode::CONFLICT && response.text().trim() == NSS_PUT_CONTAINER_MESSAGE {
        warn!("{url}: the server does not support creating Containers with PUT, creating it through a placeholder");
        return create_container_with_nss_workaround(&url, fetcher);
    }
    let response = response.error_for_status(&format!("Creating the empty Container at [{url}] failed"))?;
    info!("Created Container {url}");
    Ok(empty_container(&url, &response))
}

// Node Solid Server creates missing Containers when a Resource is written into them.
fn create_container_with_nss_workaround(url: &str, fetcher: &dyn Fetcher) -> Result<SolidDataset> {
    if get_resource_info(url, fetcher).is_ok() {
        return Err(anyhow!(
            "The Container at [{url}] already exists, and therefore cannot be created again"
        ));
    }
    let dummy_url = format!("{url}.dummy");
    let create = HttpRequest::put(&dummy_url)
        .header(ACCEPT, TURTLE)?
        .header(CONTENT_TYPE, TURTLE)?;
    fetcher
        .fetch(&create)?
        .error_for_status(&format!("Creating the empty Container at [{url}] failed"))?;
    fetcher
        .fetch(&HttpRequest::delete(&dummy_url))?
        .error_for_status(&format!("Removing the placeholder at [{dummy_url}] failed"))?;
    let response = fetcher.fetch(&HttpRequest::head(url))?;
    Ok(empty_container(url, &response))
}

/// Creates an empty Container inside `container_url`.
pub fn create_container_in_container(
    container_url: &str,
    slug: Option<&str>,
    fetcher: &dyn Fetcher,
) -> Result<SolidDataset> {
    let mut request = HttpRequest::post(container_url)
        .header(CONTENT_TYPE, TURTLE)?
        .header(LINK, &type_link(LDP_BASIC_CONTAINER.as_str()))?;
    if let Some(slug) = slug {
        request = request.header(SLUG, slug)?;
    }
    let response = fetcher
        .fetch(&request)?
        .error_for_status(&format!("Creating an empty Container in the Container at [{container_url}] failed"))?;
    let url = location_of(&response, container_url)?;
    info!("Created Container {url}");
    Ok(empty_container(&url, &response))
}

pub fn delete_solid_dataset(url: &str, fetcher: &dyn Fetcher) -> Result<()> {
    fetcher
        .fetch(&HttpRequest::delete(url))?
        .error_for_status(&format!("Deleting the Resource at [{url}] failed"))?;
    info!("Deleted {url}");
    Ok(())
}

pub fn delete_container(url: &str, fetcher: &dyn Fetcher) -> Result<()> {
    if !is_container_url(url) {
        return Err(anyhow!(
            "You're trying to delete the Container at [{url}], but Container URLs should end in a `/`"
        ));
    }
    delete_solid_dataset(url, fetcher)
}

/// The URLs a Container lists with `ldp:contains`.
pub fn get_contained_resource_url_all(container: &SolidDataset) -> Vec<String> {
    container
        .source_url()
        .and_then(|url| get_thing(container, url))
        .and_then(|thing| thing.objects(LDP_CONTAINS.as_str()).map(|o| o.named_nodes.clone()))
        .unwrap_or_default()
}

/// The WebID owning the Pod, when `resource` is a storage root that says so.
pub fn get_pod_owner(resource: &SolidDataset) -> Option<String> {
    let is_storage_root = get_linked_resource_url_all(resource, "type")
        .iter()
        .any(|t| t == PIM_STORAGE_TYPE.as_str());
    if !is_storage_root {
        return None;
    }
    get_linked_resource_url_all(resource, SOLID_POD_OWNER).first().cloned()
}

/// `None` when the owner is unknown.
pub fn is_pod_owner(webid: &str, resource: &SolidDataset) -> Option<bool> {
    get_pod_owner(resource).map(|owner| owner == webid)
}

/// The Pods a WebID profile points to with `pim:storage`.
pub fn get_pod_url_all(webid: &str, fetcher: &dyn Fetcher) -> Result<Vec<String>> {
    let profile = get_solid_dataset(webid, fetcher)?;
    Ok(get_thing(&profile, webid)
        .and_then(|me| me.objects(PIM_STORAGE.as_str()).map(|o| o.named_nodes.clone()))
        .unwrap_or_default())
}

/// True when the error is a [`FetchError`] with the given status.
pub fn is_fetch_error_with_status(err: &anyhow::Error, status: u16) -> bool {
    err.downcast_ref::<FetchError>()
        .is_some_and(|e| e.status == status)
}
