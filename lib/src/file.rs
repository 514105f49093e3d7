//! Non-RDF Resources: images, documents and anything else stored as raw bytes.

use crate::dataset::ResourceInfo;
use crate::fetch::{Fetcher, HttpRequest};
use crate::resource::{parse_resource_info, SLUG};
use crate::util::resolve_relative;
use anyhow::{anyhow, Result};
use log::info;
use reqwest::header::{CONTENT_TYPE, LOCATION};

pub const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolidFile {
    pub data: Vec<u8>,
    pub resource_info: ResourceInfo,
}

impl SolidFile {
    pub fn content_type(&self) -> Option<&str> {
        self.resource_info.content_type.as_deref()
    }
}

pub fn get_file(url: &str, fetcher: &dyn Fetcher) -> Result<SolidFile> {
    let response = fetcher
        .fetch(&HttpRequest::get(url))?
        .error_for_status(&format!("Fetching the File at [{url}] failed"))?;
    let mut resource_info = parse_resource_info(&response);
    resource_info.is_raw_data = true;
    Ok(SolidFile {
        data: response.body,
        resource_info,
    })
}

/// Writes `data` to `url`, replacing whatever is there.
pub fn overwrite_file(
    url: &str,
    data: &[u8],
    content_type: Option<&str>,
    fetcher: &dyn Fetcher,
) -> Result<ResourceInfo> {
    let request = HttpRequest::put(url)
        .header(CONTENT_TYPE, content_type.unwrap_or(OCTET_STREAM))?
        .body(data.to_vec());
    let response = fetcher
        .fetch(&request)?
        .error_for_status(&format!("Overwriting the file at [{url}] failed"))?;
    info!("Wrote {} bytes to {url}", data.len());
    let mut resource_info = parse_resource_info(&response);
    resource_info.source_iri = url.to_string();
    resource_info.is_raw_data = true;
    resource_info.content_type = Some(content_type.unwrap_or(OCTET_STREAM).to_string());
    Ok(resource_info)
}

/// Saves `data` as a new Resource in a Container; the server picks the URL.
pub fn save_file_in_container(
    container_url: &str,
    data: &[u8],
    slug: Option<&str>,
    content_type: Option<&str>,
    fetcher: &dyn Fetcher,
) -> Result<ResourceInfo> {
    let mut request = HttpRequest::post(container_url)
        .header(CONTENT_TYPE, content_type.unwrap_or(OCTET_STREAM))?
        .body(data.to_vec());
    if let Some(slug) = slug {
        request = request.header(SLUG, slug)?;
    }
    let response = fetcher
        .fetch(&request)?
        .error_for_status(&format!("Saving the file in [{container_url}] failed"))?;
    let location = response
        .header_value(LOCATION.as_str())
        .ok_or_else(|| anyhow!("Could not determine the location of the file saved in [{container_url}]"))?;
    let url = resolve_relative(container_url, location);
    info!("Saved {} bytes as {url}", data.len());
    let mut resource_info = parse_resource_info(&response);
    resource_info.source_iri = url;
    resource_info.is_raw_data = true;
    resource_info.content_type = Some(content_type.unwrap_or(OCTET_STREAM).to_string());
    Ok(resource_info)
}

pub fn delete_file(url: &str, fetcher: &dyn Fetcher) -> Result<()> {
    fetcher
        .fetch(&HttpRequest::delete(url))?
        .error_for_status(&format!("Deleting the file at [{url}] failed"))?;
    info!("Deleted {url}");
    Ok(())
}
