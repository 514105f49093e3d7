//! Defines the configuration of a Solid client: transport settings for the
//! [`crate::fetch::ReqwestFetcher`] and parsing defaults.

use crate::options::ChainDetection;
use anyhow::Result;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Duration;

fn default_user_agent() -> Option<String> {
    Some(format!("solid-client/{}", env!("CARGO_PKG_VERSION")))
}

#[derive(Builder, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[builder(default)]
pub struct ClientConfig {
    /// Overall network timeout applied to individual HTTP requests, in seconds.
    pub timeout_secs: u64,
    #[builder(setter(into, strip_option))]
    pub user_agent: Option<String>,
    /// Sent as `Authorization: Bearer <token>` on every request.
    #[builder(setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
    // offline mode (every request fails with OfflineRetrievalError)
    pub offline: bool,
    pub chain_detection: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: default_user_agent(),
            bearer_token: None,
            offline: false,
            chain_detection: true,
        }
    }
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn chain_detection(&self) -> ChainDetection {
        ChainDetection::from(self.chain_detection)
    }

    pub fn save_to_file(&self, file: &Path) -> Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: ClientConfig = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// Prints out the current ClientConfig in a clear and readable way for command line output.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  Timeout: {}s", self.timeout_secs);
        if let Some(user_agent) = &self.user_agent {
            println!("  User Agent: {}", user_agent);
        }
        if self.bearer_token.is_some() {
            println!("  Bearer Token: ********");
        }
        println!("  Offline: {}", self.offline);
        println!("  Chain Detection: {}", self.chain_detection);
    }
}
