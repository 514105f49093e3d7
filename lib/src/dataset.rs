//! The SolidDataset value: an immutable graph index plus what is known about
//! the Resource it was fetched from, its pending changes, and optionally the
//! access-control documents that govern it.

use crate::access::EffectivePermissions;
use crate::acp::AcpInfo;
use crate::changelog::ChangeLog;
use crate::consts::{LDP_BASIC_CONTAINER, LDP_CONTAINER, TYPE};
use crate::options::ChainDetection;
use crate::store::GraphIndex;
use crate::thing::resolve_local_iri;
use crate::util::{is_container_url, normalize_url};
use crate::wac::AclInfo;
use anyhow::Result;
use oxigraph::model::Quad;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the server told us about a Resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInfo {
    pub source_iri: String,
    pub is_raw_data: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Target of the `Link: <...>; rel="acl"` header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_url: Option<String>,
    /// rel -> target URLs, from the `Link` header.
    #[serde(default)]
    pub linked_resources: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<EffectivePermissions>,
}

impl ResourceInfo {
    pub fn new(source_iri: &str) -> Self {
        Self {
            source_iri: source_iri.to_string(),
            ..Default::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolidDataset {
    pub(crate) graphs: GraphIndex,
    pub(crate) resource_info: Option<ResourceInfo>,
    pub(crate) change_log: Option<ChangeLog>,
    pub(crate) acl: Option<Box<AclInfo>>,
    pub(crate) acp: Option<Box<AcpInfo>>,
}

/// An empty dataset that has not been fetched from or saved to anywhere.
pub fn create_solid_dataset() -> SolidDataset {
    SolidDataset::default()
}

impl SolidDataset {
    pub fn from_quads(quads: &[Quad], detection: ChainDetection) -> Result<Self> {
        Ok(Self {
            graphs: GraphIndex::from_quads(quads, detection)?,
            ..Default::default()
        })
    }

    pub fn graphs(&self) -> &GraphIndex {
        &self.graphs
    }

    pub fn to_quads(&self) -> Vec<Quad> {
        self.graphs.to_quads()
    }

    pub fn resource_info(&self) -> Option<&ResourceInfo> {
        self.resource_info.as_ref()
    }

    pub fn change_log(&self) -> Option<&ChangeLog> {
        self.change_log.as_ref()
    }

    pub fn source_url(&self) -> Option<&str> {
        self.resource_info.as_ref().map(|info| info.source_iri.as_str())
    }

    /// The ACLs fetched with the Resource, if it was fetched with them.
    pub fn acl_info(&self) -> Option<&AclInfo> {
        self.acl.as_deref()
    }

    pub fn acp_info(&self) -> Option<&AcpInfo> {
        self.acp.as_deref()
    }

    pub fn with_resource_info(mut self, info: ResourceInfo) -> Self {
        self.resource_info = Some(info);
        self
    }

    pub(crate) fn with_graphs(&self, graphs: GraphIndex) -> Self {
        Self {
            graphs,
            ..self.clone()
        }
    }

    /// True when saving to `url` should send a PATCH of the pending changes
    /// rather than PUT the whole graph.
    pub fn is_update(&self, url: &str) -> bool {
        match (&self.change_log, self.source_url()) {
            (Some(_), Some(source)) => normalize_url(source) == normalize_url(url),
            _ => false,
        }
    }

    /// Replaces every Local Node IRI, in the graphs and in the change log, by
    /// the matching fragment IRI of `base`.
    pub fn resolve_local_nodes(&self, base: &str) -> Self {
        let rewrite = |iri: &str| -> Option<String> {
            crate::thing::local_node_name(iri).map(|_| resolve_local_iri(iri, base))
        };
        Self {
            graphs: self.graphs.rewrite_iris(&rewrite),
            change_log: self.change_log.as_ref().map(|log| log.rewrite_iris(&rewrite)),
            ..self.clone()
        }
    }
}

pub fn get_source_url(dataset: &SolidDataset) -> Option<&str> {
    dataset.source_url()
}

pub fn has_resource_info(dataset: &SolidDataset) -> bool {
    dataset.resource_info.is_some()
}

pub fn is_raw_data(dataset: &SolidDataset) -> bool {
    dataset.resource_info.as_ref().is_some_and(|info| info.is_raw_data)
}

pub fn get_content_type(dataset: &SolidDataset) -> Option<&str> {
    dataset
        .resource_info
        .as_ref()
        .and_then(|info| info.content_type.as_deref())
}

/// Every target the server linked under `rel`.
pub fn get_linked_resource_url_all<'a>(dataset: &'a SolidDataset, rel: &str) -> &'a [String] {
    dataset
        .resource_info
        .as_ref()
        .and_then(|info| info.linked_resources.get(rel))
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn get_effective_access(dataset: &SolidDataset) -> Option<EffectivePermissions> {
    dataset.resource_info.as_ref().and_then(|info| info.permissions)
}

/// A Resource is a Container when its URL ends in a slash or the server types it as one.
pub fn is_container(dataset: &SolidDataset) -> bool {
    let Some(source) = dataset.source_url() else {
        return false;
    };
    if is_container_url(source) {
        return true;
    }
    get_linked_resource_url_all(dataset, "type")
        .iter()
        .any(|t| t == LDP_CONTAINER.as_str() || t == LDP_BASIC_CONTAINER.as_str())
        || crate::thing::get_thing(dataset, source).is_some_and(|thing| {
            thing.objects(TYPE.as_str()).is_some_and(|types| {
                types
                    .named_nodes
                    .iter()
                    .any(|t| t == LDP_CONTAINER.as_str() || t == LDP_BASIC_CONTAINER.as_str())
            })
        })
}
