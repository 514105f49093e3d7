//! Test doubles: hand-built SolidDatasets, and [`MockFetcher`], an in-memory
//! Solid server.

use crate::acp::with_acr;
use crate::consts::{ACP_ACCESS_CONTROL_RESOURCE, ACP_RESOURCE, LDP_BASIC_CONTAINER, LDP_CONTAINS, TYPE};
use crate::changelog::ChangeLog;
use crate::dataset::{ResourceInfo, SolidDataset};
use crate::errors::FetchError;
use crate::fetch::{Fetcher, HttpRequest, HttpResponse};
use crate::io::{parse_quads, quads_to_turtle, TURTLE};
use crate::resource::SLUG;
use crate::store::Thing;
use crate::thing::{create_thing_with_url, random_name, set_thing};
use crate::util::{get_parent_container_url, is_container_url, normalize_url, resolve_relative};
use crate::wac::AclDataset;
use anyhow::{anyhow, Result};
use log::debug;
use oxigraph::io::RdfFormat;
use oxigraph::model::Quad;
use oxigraph::sparql::SparqlEvaluator;
use oxigraph::store::Store;
use reqwest::header::{HeaderValue, CONTENT_TYPE, IF_NONE_MATCH, LINK, LOCATION};
use reqwest::{Method, StatusCode};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// A SolidDataset that looks as if it was just fetched from `url`.
pub fn mock_solid_dataset_from(url: &str) -> SolidDataset {
    let mut resource_info = ResourceInfo::new(url);
    resource_info.content_type = Some(TURTLE.to_string());
    SolidDataset {
        resource_info: Some(resource_info),
        change_log: Some(ChangeLog::default()),
        ..Default::default()
    }
}

pub fn mock_container_from(url: &str) -> Result<SolidDataset> {
    if !is_container_url(url) {
        return Err(anyhow!("A Container's URL should end in a slash, but [{url}] does not"));
    }
    Ok(mock_solid_dataset_from(url))
}

pub fn mock_thing_from(url: &str) -> Result<Thing> {
    create_thing_with_url(url)
}

pub fn mock_fetch_error(url: &str, status: u16) -> FetchError {
    let status_text = StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("");
    FetchError::new(url, status, status_text, &format!("Fetching [{url}] failed"))
}

fn with_acl_url(resource: &SolidDataset, acl_url: &str) -> SolidDataset {
    let mut resource = resource.clone();
    let info = resource.resource_info.get_or_insert_with(ResourceInfo::default);
    if info.acl_url.is_none() {
        info.acl_url = Some(acl_url.to_string());
        info.linked_resources
            .insert("acl".to_string(), vec![acl_url.to_string()]);
    }
    resource
}

/// Attaches `acl` to `resource` as if it had been fetched as its resource ACL.
pub fn add_mock_resource_acl_to(resource: &SolidDataset, acl: &SolidDataset) -> Result<SolidDataset> {
    let source = resource
        .source_url()
        .ok_or_else(|| anyhow!("The Resource needs a URL to get an ACL"))?;
    let acl_url = acl
        .source_url()
        .ok_or_else(|| anyhow!("The ACL needs a URL"))?;
    let mut resource = with_acl_url(resource, acl_url);
    let mut info = resource.acl.take().map(|info| *info).unwrap_or_default();
    info.resource_acl = Some(AclDataset::new(acl.clone(), source));
    resource.acl = Some(Box::new(info));
    Ok(resource)
}

/// Attaches `acl` as the fallback ACL of `resource`, inherited from `container_url`.
pub fn add_mock_fallback_acl_to(resource: &SolidDataset, acl: &SolidDataset, container_url: &str) -> Result<SolidDataset> {
    let source = resource
        .source_url()
        .ok_or_else(|| anyhow!("The Resource needs a URL to get an ACL"))?;
    let mut resource = with_acl_url(resource, &format!("{source}.acl"));
    let mut info = resource.acl.take().map(|info| *info).unwrap_or_default();
    info.fallback_acl = Some(AclDataset::new(acl.clone(), container_url));
    resource.acl = Some(Box::new(info));
    Ok(resource)
}

/// An empty ACR for the Resource at `url`, located at `<url>?ext=acr`.
pub fn mock_acr_for(url: &str) -> Result<SolidDataset> {
    let acr_url = format!("{url}?ext=acr");
    let mut acr = mock_solid_dataset_from(&acr_url);
    if let Some(info) = acr.resource_info.as_mut() {
        info.linked_resources
            .insert("type".to_string(), vec![ACP_ACCESS_CONTROL_RESOURCE.as_str().to_string()]);
    }
    let root = create_thing_with_url(&acr_url)?;
    let root = crate::accessors::add_url(&root, &TYPE, &ACP_ACCESS_CONTROL_RESOURCE)?;
    let root = crate::accessors::add_url(&root, &ACP_RESOURCE, url)?;
    let acr = set_thing(&acr, &root)?;
    Ok(SolidDataset {
        change_log: Some(ChangeLog::default()),
        ..acr
    })
}

pub fn add_mock_acr_to(resource: &SolidDataset, acr: &SolidDataset) -> Result<SolidDataset> {
    let acr_url = acr
        .source_url()
        .ok_or_else(|| anyhow!("The ACR needs a URL"))?;
    let resource = with_acl_url(resource, acr_url);
    Ok(with_acr(&resource, acr.clone()))
}

#[derive(Debug, Clone)]
struct StoredResource {
    content_type: String,
    body: Vec<u8>,
}

/// An in-memory Solid server.
///
/// GET and HEAD serve stored Resources (Containers list their children with
/// `ldp:contains`), PUT and POST store bodies, PATCH applies the
/// `DELETE DATA`/`INSERT DATA` updates this crate sends, and DELETE removes.
/// `Link` headers can be attached per URL, and any request can be answered
/// with a fixed response instead. Every request is recorded.
#[derive(Debug, Default)]
pub struct MockFetcher {
    resources: Mutex<BTreeMap<String, StoredResource>>,
    links: Mutex<BTreeMap<String, Vec<String>>>,
    overrides: Mutex<Vec<(Method, String, HttpResponse)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(self, url: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        self.put_resource(url, content_type, body.into());
        self
    }

    pub fn with_turtle(self, url: &str, turtle: &str) -> Self {
        self.with_resource(url, TURTLE, turtle)
    }

    /// Adds `Link: <target>; rel="<rel>"` to every response for `url`.
    pub fn with_link(self, url: &str, target: &str, rel: &str) -> Self {
        self.lock_links()
            .entry(normalize_url(url))
            .or_default()
            .push(format!("<{target}>; rel=\"{rel}\""));
        self
    }

    pub fn with_acl(self, url: &str, acl_url: &str) -> Self {
        self.with_link(url, acl_url, "acl")
    }

    /// Answers every `method` request to `url` with `response`.
    pub fn with_response(self, method: Method, url: &str, response: HttpResponse) -> Self {
        self.respond_with(method, url, response);
        self
    }

    pub fn respond_with(&self, method: Method, url: &str, response: HttpResponse) {
        self.lock_overrides().push((method, normalize_url(url), response));
    }

    pub fn put_resource(&self, url: &str, content_type: &str, body: Vec<u8>) {
        let key = normalize_url(url);
        self.ensure_parents(&key);
        self.lock_resources().insert(
            key,
            StoredResource {
                content_type: content_type.to_string(),
                body,
            },
        );
    }

    pub fn contains(&self, url: &str) -> bool {
        self.lock_resources().contains_key(&normalize_url(url))
    }

    pub fn body_of(&self, url: &str) -> Option<String> {
        self.lock_resources()
            .get(&normalize_url(url))
            .map(|r| String::from_utf8_lossy(&r.body).into_owned())
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock_requests().clone()
    }

    pub fn requests_with(&self, method: Method) -> Vec<HttpRequest> {
        self.lock_requests()
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }

    fn lock_resources(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredResource>> {
        self.resources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_links(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<String>>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_overrides(&self) -> std::sync::MutexGuard<'_, Vec<(Method, String, HttpResponse)>> {
        self.overrides.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<HttpRequest>> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Servers create missing intermediate Containers.
    fn ensure_parents(&self, url: &str) {
        let mut resources = self.lock_resources();
        let mut current = get_parent_container_url(url);
        while let Some(parent) = current {
            resources.entry(parent.clone()).or_insert_with(|| StoredResource {
                content_type: TURTLE.to_string(),
                body: Vec::new(),
            });
            current = get_parent_container_url(&parent);
        }
    }

    fn response(&self, status: StatusCode, url: &str) -> HttpResponse {
        let mut response = HttpResponse::new(status, url);
        if let Some(links) = self.lock_links().get(url) {
            for link in links {
                if let Ok(value) = HeaderValue::from_str(link) {
                    response.headers.append(LINK, value);
                }
            }
        }
        if is_container_url(url) {
            let link = format!("<{}>; rel=\"type\"", LDP_BASIC_CONTAINER.as_str());
            if let Ok(value) = HeaderValue::from_str(&link) {
                response.headers.append(LINK, value);
            }
        }
        response
    }

    fn read(&self, url: &str, with_body: bool) -> HttpResponse {
        let Some(stored) = self.lock_resources().get(url).cloned() else {
            return self.response(StatusCode::NOT_FOUND, url);
        };
        let mut response = self.response(StatusCode::OK, url);
        if let Ok(value) = HeaderValue::from_str(&stored.content_type) {
            response.headers.insert(CONTENT_TYPE, value);
        }
        if with_body {
            response.body = stored.body;
            if is_container_url(url) {
                for child in self.children_of(url) {
                    let triple = format!("\n<{url}> <{}> <{child}> .\n", LDP_CONTAINS.as_str());
                    response.body.extend_from_slice(triple.as_bytes());
                }
            }
        }
        response
    }

    fn children_of(&self, container: &str) -> Vec<String> {
        self.lock_resources()
            .keys()
            .filter(|url| {
                url.strip_prefix(container).is_some_and(|rest| {
                    let rest = rest.strip_suffix('/').unwrap_or(rest);
                    !rest.is_empty() && !rest.contains('/')
                })
            })
            .cloned()
            .collect()
    }

    fn put(&self, request: &HttpRequest, url: &str) -> HttpResponse {
        let exists = self.lock_resources().contains_key(url);
        if exists && request.header_value(IF_NONE_MATCH.as_str()) == Some("*") {
            return self.response(StatusCode::PRECONDITION_FAILED, url);
        }
        let content_type = request.header_value(CONTENT_TYPE.as_str()).unwrap_or(TURTLE);
        self.put_resource(url, content_type, request.body.clone().unwrap_or_default());
        let status = if exists { StatusCode::NO_CONTENT } else { StatusCode::CREATED };
        self.response(status, url)
    }

    fn patch(&self, request: &HttpRequest, url: &str) -> Result<HttpResponse> {
        let current = self
            .lock_resources()
            .get(url)
            .map(|r| r.body.clone())
            .unwrap_or_default();
        let update = request.body_text().unwrap_or_default();
        let body = apply_sparql_update(&current, url, &update)?;
        self.put_resource(url, TURTLE, body.into_bytes());
        Ok(self.response(StatusCode::RESET_CONTENT, url))
    }

    fn post(&self, request: &HttpRequest, container: &str) -> HttpResponse {
        if !self.lock_resources().contains_key(container) {
            return self.response(StatusCode::NOT_FOUND, container);
        }
        let is_container = request
            .headers
            .get_all(LINK)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains(LDP_BASIC_CONTAINER.as_str()));
        let mut name = request
            .header_value(SLUG.as_str())
            .map(str::to_string)
            .unwrap_or_else(random_name);
        let suffix = if is_container { "/" } else { "" };
        if self.lock_resources().contains_key(&format!("{container}{name}{suffix}")) {
            name = format!("{name}-{}", random_name());
        }
        let url = format!("{container}{name}{suffix}");
        let content_type = request.header_value(CONTENT_TYPE.as_str()).unwrap_or(TURTLE);
        self.put_resource(&url, content_type, request.body.clone().unwrap_or_default());
        let mut response = self.response(StatusCode::CREATED, container);
        if let Ok(value) = HeaderValue::from_str(&url) {
            response.headers.insert(LOCATION, value);
        }
        response
    }

    fn delete(&self, url: &str) -> HttpResponse {
        match self.lock_resources().remove(url) {
            Some(_) => HttpResponse::new(StatusCode::NO_CONTENT, url),
            None => HttpResponse::new(StatusCode::NOT_FOUND, url),
        }
    }
}

// Runs the update against a scratch store holding the current body.
fn apply_sparql_update(current: &[u8], base: &str, update: &str) -> Result<String> {
    let store = Store::new()?;
    store.extend(parse_quads(current, RdfFormat::Turtle, base)?)?;
    SparqlEvaluator::new()
        .with_base_iri(base)?
        .parse_update(update)?
        .on_store(&store)
        .execute()?;
    let quads = store.iter().collect::<Result<Vec<Quad>, _>>()?;
    quads_to_turtle(&quads)
}

impl Fetcher for MockFetcher {
    fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.lock_requests().push(request.clone());
        let url = normalize_url(&request.url);
        debug!("mock {} {}", request.method, url);
        let overridden = self
            .lock_overrides()
            .iter()
            .find(|(method, target, _)| *method == request.method && *target == url)
            .map(|(_, _, response)| response.clone());
        if let Some(response) = overridden {
            return Ok(response);
        }
        let response = match request.method {
            Method::GET => self.read(&url, true),
            Method::HEAD => self.read(&url, false),
            Method::PUT => self.put(request, &url),
            Method::PATCH => self.patch(request, &url)?,
            Method::POST => self.post(request, &url),
            Method::DELETE => self.delete(&url),
            _ => HttpResponse::new(StatusCode::METHOD_NOT_ALLOWED, &url),
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containers_list_their_children() {
        let fetcher = MockFetcher::new().with_turtle("https://pod.example/c/doc", "");
        assert!(fetcher.contains("https://pod.example/c/"));
        assert!(fetcher.contains("https://pod.example/"));
        let response = fetcher.fetch(&HttpRequest::get("https://pod.example/c/")).unwrap();
        assert!(response.text().contains("<https://pod.example/c/doc>"));
        let root = fetcher.fetch(&HttpRequest::get("https://pod.example/")).unwrap();
        assert!(root.text().contains("<https://pod.example/c/>"));
        assert!(!root.text().contains("<https://pod.example/c/doc>"));
    }

    #[test]
    fn patches_apply_data_blocks() {
        let fetcher = MockFetcher::new().with_turtle(
            "https://pod.example/doc",
            "<https://pod.example/doc#me> <https://vocab.example/name> \"Old\" .",
        );
        let update = "DELETE DATA {<https://pod.example/doc#me> <https://vocab.example/name> \"Old\" .}; \
                      INSERT DATA {<https://pod.example/doc#me> <https://vocab.example/name> \"New\" .};";
        let request = HttpRequest::patch("https://pod.example/doc").body(update);
        assert!(fetcher.fetch(&request).unwrap().is_success());
        let body = fetcher.body_of("https://pod.example/doc").unwrap();
        assert!(body.contains("New"));
        assert!(!body.contains("Old"));
    }

    #[test]
    fn patches_keep_literals_with_braces() {
        let fetcher = MockFetcher::new().with_turtle("https://pod.example/doc", "");
        let update = "INSERT DATA {<https://pod.example/doc#me> <https://vocab.example/name> \"a};b\" .};";
        let request = HttpRequest::patch("https://pod.example/doc").body(update);
        assert!(fetcher.fetch(&request).unwrap().is_success());
        let body = fetcher.body_of("https://pod.example/doc").unwrap();
        assert!(body.contains("\"a};b\""), "unexpected body: {body}");
    }

    #[test]
    fn overrides_win_and_requests_are_recorded() {
        let fetcher = MockFetcher::new()
            .with_turtle("https://pod.example/doc", "")
            .with_response(
                Method::GET,
                "https://pod.example/doc",
                HttpResponse::new(StatusCode::FORBIDDEN, "https://pod.example/doc"),
            );
        let response = fetcher.fetch(&HttpRequest::get("https://pod.example/doc")).unwrap();
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        let head = fetcher.fetch(&HttpRequest::head("https://pod.example/doc")).unwrap();
        assert_eq!(head.status, StatusCode::OK);
        assert_eq!(fetcher.requests().len(), 2);
        assert_eq!(fetcher.requests_with(Method::HEAD).len(), 1);
    }

    #[test]
    fn mock_fetch_errors_carry_the_status() {
        let err = mock_fetch_error("https://pod.example/doc", 404);
        assert!(err.is_not_found());
        assert_eq!(err.status_text, "Not Found");
    }
}
