//! Collecting the Policies and Matchers an ACR refers to, wherever they live.

use super::acr::{acr_url, get_acr_policy_url_all, get_policy_url_all};
use super::policy::{get_matcher_url_all, MatcherCombination};
use super::require_acr;
use crate::dataset::SolidDataset;
use crate::fetch::{fetch_all, Fetcher};
use crate::resource::get_solid_dataset;
use crate::store::Thing;
use crate::thing::get_thing;
use crate::util::{normalize_url, strip_fragment};
use anyhow::Result;
use log::{debug, warn};
use std::collections::BTreeMap;

/// The Policies and Matchers that decide access to one Resource.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AcpData {
    pub acr_policies: Vec<Thing>,
    pub policies: Vec<Thing>,
    pub matchers: Vec<Thing>,
    /// Resources holding Policies or Matchers that could not be fetched. When
    /// any exist, access cannot be determined.
    pub inaccessible_urls: Vec<String>,
}

impl AcpData {
    pub fn is_complete(&self) -> bool {
        self.inaccessible_urls.is_empty()
    }

    pub fn matcher(&self, url: &str) -> Option<&Thing> {
        self.matchers.iter().find(|m| m.url() == url)
    }
}

// Resource URL -> fetched dataset, with the ACR itself pre-loaded.
struct DocumentCache {
    documents: BTreeMap<String, SolidDataset>,
    inaccessible: Vec<String>,
}

impl DocumentCache {
    fn new(acr: &SolidDataset) -> Result<Self> {
        let mut documents = BTreeMap::new();
        documents.insert(normalize_url(acr_url(acr)?), acr.clone());
        Ok(Self {
            documents,
            inaccessible: Vec::new(),
        })
    }

    // Fetches, once and in parallel, every Resource holding one of `urls`.
    fn load(&mut self, urls: &[String], fetcher: &dyn Fetcher) {
        let mut missing: Vec<String> = Vec::new();
        for url in urls {
            let document = normalize_url(strip_fragment(url));
            if !self.documents.contains_key(&document)
                && !self.inaccessible.contains(&document)
                && !missing.contains(&document)
            {
                missing.push(document);
            }
        }
        if missing.is_empty() {
            return;
        }
        debug!("Fetching {} Resources referenced by an ACR", missing.len());
        for (url, result) in fetch_all(&missing, |url| get_solid_dataset(url, fetcher)) {
            match result {
                Ok(document) => {
                    self.documents.insert(url, document);
                }
                Err(err) => {
                    warn!("Could not fetch {url}: {err}");
                    self.inaccessible.push(url);
                }
            }
        }
    }

    fn things(&self, urls: &[String]) -> Vec<Thing> {
        urls.iter()
            .filter_map(|url| {
                let document = self.documents.get(&normalize_url(strip_fragment(url)))?;
                get_thing(document, url)
            })
            .collect()
    }
}

/// Fetches everything needed to compute access to `resource`: the Policies
/// its ACR applies, then the Matchers those Policies use. Every referenced
/// Resource is fetched at most once.
pub fn get_policies_and_matchers(resource: &SolidDataset, fetcher: &dyn Fetcher) -> Result<AcpData> {
    let acr = require_acr(resource)?;
    let mut cache = DocumentCache::new(acr)?;

    let acr_policy_urls = get_acr_policy_url_all(resource);
    let policy_urls = get_policy_url_all(resource);
    let all_policy_urls: Vec<String> = acr_policy_urls.iter().chain(policy_urls.iter()).cloned().collect();
    cache.load(&all_policy_urls, fetcher);
    let acr_policies = cache.things(&acr_policy_urls);
    let policies = cache.things(&policy_urls);

    let mut matcher_urls: Vec<String> = Vec::new();
    for policy in acr_policies.iter().chain(policies.iter()) {
        for combination in [MatcherCombination::AllOf, MatcherCombination::AnyOf, MatcherCombination::NoneOf] {
            for url in get_matcher_url_all(policy, combination) {
                if !matcher_urls.contains(&url) {
                    matcher_urls.push(url);
                }
            }
        }
    }
    cache.load(&matcher_urls, fetcher);
    let matchers = cache.things(&matcher_urls);

    Ok(AcpData {
        acr_policies,
        policies,
        matchers,
        inaccessible_urls: cache.inaccessible,
    })
}
