//! Persisted node and keg data model.

mod config;
mod meta;
mod stats;

pub use config::{KEG_CONFIG_VERSION, KegConfig};
pub use meta::{NodeMeta, normalize_tag};
pub use stats::{NodeRef, NodeStats};
