//! A client for Solid Pods.
//!
//! Data is read and written as [`SolidDataset`](dataset::SolidDataset)s:
//! immutable graphs of [`Thing`](store::Thing)s that remember where they were
//! fetched from and what changed since. Access to Resources is managed with
//! either Web Access Control ([`wac`]) or Access Control Policies ([`acp`]);
//! [`universal`] hides the difference.
//!
//! Every networked call takes a [`Fetcher`](fetch::Fetcher).

extern crate derive_builder;

pub mod access;
pub mod accessors;
pub mod acp;
pub mod chain;
pub mod changelog;
pub mod config;
pub mod consts;
pub mod dataset;
pub mod errors;
pub mod fetch;
pub mod file;
pub mod io;
pub mod literal;
pub mod markdown;
pub mod mock;
pub mod options;
pub mod resource;
pub mod store;
pub mod thing;
pub mod universal;
pub mod util;
pub mod wac;

pub use access::{AccessModes, AccessModesPatch, WacAccessModes};
pub use config::ClientConfig;
pub use dataset::{create_solid_dataset, ResourceInfo, SolidDataset};
pub use fetch::{Fetcher, HttpRequest, HttpResponse, ReqwestFetcher};
pub use resource::{get_solid_dataset, save_solid_dataset_at};
pub use store::Thing;
pub use thing::{create_thing, get_thing, get_thing_all, remove_thing, set_thing};

pub fn init_logging() {
    // Allow SOLID_CLIENT_LOG to override RUST_LOG.
    if let Ok(log_level) = std::env::var("SOLID_CLIENT_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
