//! omni-keg - Storage and index engine for kegs.
//!
//! A keg is a directory of numbered markdown nodes. Each node has a body
//! (`README.md`), user metadata (`meta.yaml`) and engine-derived stats
//! (`stats.json`). The keg-level "dex" caches the node listing, tag index,
//! forward links and backlinks so queries never re-scan node bodies.
//!
//! Module layout:
//! - `parser`: title / lead / reference extraction and content digests
//! - `store`: the [`NodeStore`] trait with filesystem and in-memory backends
//! - `dex`: index artifacts and the full / incremental build
//! - `query`: boolean tag expressions
//! - `lifecycle`: create, write, move (with reference rewriting), remove
//! - `editor`: external editor sessions with debounced saves
//!
//! # Examples
//!
//! ```rust
//! use omni_keg::{CreateOptions, IndexOptions, Keg, KegConfig, MemoryStore};
//!
//! # fn main() -> Result<(), omni_keg::KegError> {
//! let mut keg = Keg::init(Box::new(MemoryStore::default()), KegConfig::titled("Notes"))?;
//! let id = keg.create(&CreateOptions {
//!     tags: vec!["rust".to_string()],
//!     ..CreateOptions::titled("Ownership")
//! })?;
//! keg.index(IndexOptions::default())?;
//! assert!(keg.query_tags("rust")?.contains(&id));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod dex;
pub mod editor;
mod error;
mod keg;
mod lifecycle;
pub mod model;
mod node_id;
pub mod parser;
pub mod query;
pub mod runtime_config;
pub mod store;
mod stream;

pub use cache::DexCache;
pub use dex::{Dex, IndexOptions, IndexReport, invert_links};
pub use editor::{EditOutcome, EditSummary, EditorConfig, WatchState, edit_node, run_edit_session};
pub use error::{ErrorKind, KegError, KegResult, ResultExt};
pub use keg::{Keg, ZERO_NODE_BODY};
pub use lifecycle::CreateOptions;
pub use model::{KegConfig, NodeMeta, NodeRef, NodeStats};
pub use node_id::NodeId;
pub use parser::{Content, parse_content};
pub use query::{TagExpr, evaluate, parse_tag_expression};
pub use runtime_config::RuntimeConfig;
pub use store::{FileAttachments, FsStore, ImageAttachments, KegTarget, MemoryStore, NodeStore};
pub use stream::Stream;
