//! HTTP plumbing for Solid servers.
//!
//! Every networked operation takes a [`Fetcher`], so the transport is chosen
//! by the caller: [`ReqwestFetcher`] talks to real servers and
//! [`crate::mock::MockFetcher`] serves canned responses in tests. This module
//! also parses the headers Solid servers use to advertise metadata: `Link`
//! (ACL location, resource types, storage description) and `WAC-Allow`
//! (effective permissions of the current user and the public).

use crate::access::{EffectivePermissions, WacAccessModes};
use crate::config::ClientConfig;
use crate::errors::{FetchError, OfflineRetrievalError};
use crate::util::resolve_relative;
use anyhow::{anyhow, Result};
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE, LINK};
use reqwest::{Method, StatusCode};
use std::collections::BTreeMap;

lazy_static! {
    static ref WAC_ALLOW_ENTRY: Regex = Regex::new(r#"([a-zA-Z]+)\s*=\s*"([^"]*)""#).unwrap();
}

pub const WAC_ALLOW: &str = "wac-allow";

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: &str) -> Self {
        Self {
            method,
            url: url.to_string(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: &str) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn head(url: &str) -> Self {
        Self::new(Method::HEAD, url)
    }

    pub fn put(url: &str) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn post(url: &str) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn patch(url: &str) -> Self {
        Self::new(Method::PATCH, url)
    }

    pub fn delete(url: &str) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Appends a header; several `Link` headers may be sent.
    pub fn header(mut self, name: HeaderName, value: &str) -> Result<Self> {
        self.headers.append(name, HeaderValue::from_str(value)?);
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    /// The final URL, after redirects.
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode, url: &str) -> Self {
        Self {
            status,
            url: url.to_string(),
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn status_text(&self) -> &str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Turns a non-2xx response into a [`FetchError`].
    pub fn error_for_status(self, message: &str) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            let status_text = self.status_text().to_string();
            Err(anyhow!(FetchError::new(
                &self.url,
                self.status.as_u16(),
                &status_text,
                message
            )))
        }
    }
}

/// Sends one HTTP request. Implementations must be shareable across threads:
/// policy resolution fetches several Resources in parallel.
pub trait Fetcher: Send + Sync {
    fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// A [`Fetcher`] over a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
    offline: bool,
}

impl ReqwestFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        if let Some(token) = &config.bearer_token {
            default_headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {token}"))?);
        }
        let mut builder = Client::builder()
            .timeout(config.timeout())
            .default_headers(default_headers);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        Ok(Self {
            client: builder.build()?,
            offline: config.offline,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    fn fetch(&self, request: &HttpRequest) -> Result<HttpResponse> {
        if self.offline {
            return Err(anyhow!(OfflineRetrievalError {
                url: request.url.clone()
            }));
        }
        debug!("{} {}", request.method, request.url);
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        let resp = builder.send()?;
        let status = resp.status();
        let url = resp.url().to_string();
        let headers = resp.headers().clone();
        let body = resp.bytes()?.to_vec();
        debug!("{} {} -> {}", request.method, request.url, status);
        Ok(HttpResponse {
            status,
            url,
            headers,
            body,
        })
    }
}

/// Runs `fetch_one` for every URL on its own scoped thread. Each URL succeeds
/// or fails on its own; results come back in input order.
pub fn fetch_all<T, F>(urls: &[String], fetch_one: F) -> Vec<(String, Result<T>)>
where
    T: Send,
    F: Fn(&str) -> Result<T> + Sync,
{
    let fetch_one = &fetch_one;
    std::thread::scope(|scope| {
        let handles: Vec<_> = urls
            .iter()
            .map(|url| (url.clone(), scope.spawn(move || fetch_one(url.as_str()))))
            .collect();
        handles
            .into_iter()
            .map(|(url, handle)| {
                let result = match handle.join() {
                    Ok(result) => result,
                    Err(_) => Err(anyhow!("Fetching {url} panicked")),
                };
                (url, result)
            })
            .collect()
    })
}

/// Parses every `Link` header into `rel -> targets`, resolving relative targets
/// against `base`. A link with several space-separated rels is filed under each.
pub fn parse_link_header(headers: &HeaderMap, base: &str) -> BTreeMap<String, Vec<String>> {
    let mut links: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for value in headers.get_all(LINK) {
        let Ok(value) = value.to_str() else {
            warn!("Ignoring a Link header that is not valid UTF-8");
            continue;
        };
        for part in split_links(value) {
            let Some(start) = part.find('<') else { continue };
            let Some(end) = part[start + 1..].find('>') else { continue };
            let target = resolve_relative(base, &part[start + 1..start + 1 + end]);
            for param in part[start + 2 + end..].split(';') {
                let Some((key, val)) = param.split_once('=') else { continue };
                if !key.trim().eq_ignore_ascii_case("rel") {
                    continue;
                }
                let rels = val.trim().trim_matches(|c| c == '"' || c == '\'');
                for rel in rels.split_whitespace() {
                    links.entry(rel.to_string()).or_default().push(target.clone());
                }
            }
        }
    }
    links
}

// commas inside <...> belong to the URL
fn split_links(value: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_url = false;
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, c) in value.char_indices() {
        match c {
            '<' if !in_quotes => in_url = true,
            '>' if !in_quotes => in_url = false,
            '"' if !in_url => in_quotes = !in_quotes,
            ',' if !in_url && !in_quotes => {
                parts.push(value[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(value[start..].trim());
    parts
}

/// Parses `WAC-Allow: user="read write",public="read"`.
pub fn parse_wac_allow_header(value: &str) -> EffectivePermissions {
    let mut permissions = EffectivePermissions::default();
    for captures in WAC_ALLOW_ENTRY.captures_iter(value) {
        let modes = parse_wac_modes(&captures[2]);
        match captures[1].to_ascii_lowercase().as_str() {
            "user" => permissions.user = modes,
            "public" => permissions.public = modes,
            other => debug!("Ignoring WAC-Allow group {other}"),
        }
    }
    permissions
}

fn parse_wac_modes(modes: &str) -> WacAccessModes {
    let has = |mode: &str| modes.split_whitespace().any(|m| m.eq_ignore_ascii_case(mode));
    WacAccessModes::new(has("read"), has("append"), has("write"), has("control"))
}
