//! [`Keg`]: one opened keg (store + config + dex).

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{info, warn};

use crate::cache::DexCache;
use crate::dex::{Dex, IndexOptions, IndexReport, rebuild_dex};
use crate::error::{ErrorKind, KegError, KegResult, ResultExt};
use crate::lifecycle::CreateOptions;
use crate::model::{KegConfig, NodeMeta, NodeStats};
use crate::node_id::NodeId;
use crate::query::parse_tag_expression;
use crate::store::{FileAttachments, ImageAttachments, NodeStore, require_files, require_images};

/// Body of the permanent node `0`.
pub const ZERO_NODE_BODY: &str = "# Sorry, planned but not yet available\n\n\
This node is a placeholder for content that has not been written yet. \
Links to it mark topics worth writing up.\n";

/// An opened keg.
pub struct Keg {
    store: Box<dyn NodeStore>,
    config: KegConfig,
    dex: Dex,
}

impl std::fmt::Debug for Keg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keg")
            .field("store", &self.store.name())
            .field("config", &self.config)
            .field("nodes", &self.dex.len())
            .finish()
    }
}

fn read_config(store: &dyn NodeStore) -> KegResult<KegConfig> {
    let raw = store.read_config()?;
    let text = String::from_utf8(raw).map_err(|e| KegError::parse("keg config", e))?;
    KegConfig::parse(&text)
}

/// An unreadable dex starts over empty; the next index run then reprocesses
/// every node and rewrites all artifacts.
fn dex_or_empty(store: &dyn NodeStore, loaded: KegResult<Dex>) -> KegResult<Dex> {
    match loaded {
        Err(err) if err.kind() == ErrorKind::ParseFailure => {
            warn!(keg = store.name(), error = %err, "dex is corrupt; starting from an empty dex");
            Ok(Dex::default())
        }
        other => other,
    }
}

impl Keg {
    /// Open an initialized keg and load its dex.
    ///
    /// A corrupt dex is replaced by an empty one so that [`Keg::index`] can
    /// regenerate it.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] when the keg has no config; parse failures for
    /// a malformed config.
    pub fn open(store: Box<dyn NodeStore>) -> KegResult<Self> {
        let config = read_config(store.as_ref()).with_context(|| format!("opening keg {}", store.name()))?;
        let dex = dex_or_empty(store.as_ref(), Dex::load(store.as_ref()))?;
        Ok(Self { store, config, dex })
    }

    /// Like [`Keg::open`], but reuse a cached dex when present.
    ///
    /// # Errors
    ///
    /// Same as [`Keg::open`].
    pub fn open_cached(store: Box<dyn NodeStore>, cache: &DexCache) -> KegResult<Self> {
        let config = read_config(store.as_ref()).with_context(|| format!("opening keg {}", store.name()))?;
        let dex = dex_or_empty(store.as_ref(), cache.load(store.as_ref()))?;
        Ok(Self { store, config, dex })
    }

    /// Create a new keg: config, node `0`, and a full index.
    ///
    /// # Errors
    ///
    /// [`KegError::Invalid`] when the target already holds a keg config.
    pub fn init(store: Box<dyn NodeStore>, config: KegConfig) -> KegResult<Self> {
        match store.read_config() {
            Ok(_) => {
                return Err(KegError::invalid(
                    "keg",
                    format!("{} is already initialized", store.name()),
                ));
            }
            Err(err) if err.kind() == ErrorKind::NotExist => {}
            Err(err) => return Err(err),
        }
        store.write_config(config.to_yaml()?.as_bytes())?;
        let mut keg = Self {
            store,
            config,
            dex: Dex::default(),
        };
        if !keg.store.has_node(&NodeId::ZERO)? {
            let options = CreateOptions {
                body: Some(ZERO_NODE_BODY.as_bytes().to_vec()),
                ..CreateOptions::default()
            };
            keg.create_at(&NodeId::ZERO, &options)?;
        }
        keg.index(IndexOptions::full())?;
        info!(keg = keg.store.name(), "initialized keg");
        Ok(keg)
    }

    /// Backend handle.
    #[must_use]
    pub fn store(&self) -> &dyn NodeStore {
        self.store.as_ref()
    }

    /// Keg configuration as last read or written.
    #[must_use]
    pub fn config(&self) -> &KegConfig {
        &self.config
    }

    /// Current dex.
    #[must_use]
    pub fn dex(&self) -> &Dex {
        &self.dex
    }

    /// Edit and persist the keg config.
    ///
    /// # Errors
    ///
    /// Serialization or backend failures; the in-memory config is only
    /// replaced after a successful write.
    pub fn update_config(&mut self, edit: impl FnOnce(&mut KegConfig)) -> KegResult<()> {
        let mut next = self.config.clone();
        edit(&mut next);
        self.store.write_config(next.to_yaml()?.as_bytes())?;
        self.config = next;
        Ok(())
    }

    /// Run a full or incremental index and publish the dex.
    ///
    /// Aborts with no dex mutation if any node's metadata fails to parse.
    ///
    /// # Errors
    ///
    /// Parse failures (wrapped with "index aborted") and backend failures.
    pub fn index(&mut self, options: IndexOptions) -> KegResult<IndexReport> {
        let now = Utc::now();
        let (dex, report) = rebuild_dex(
            self.store.as_ref(),
            &self.dex,
            self.config.updated,
            options,
            now,
        )?;
        dex.write(self.store.as_ref())?;
        self.dex = dex;
        self.update_config(|config| config.updated = Some(now))?;
        info!(
            keg = self.store.name(),
            rebuild = report.rebuild,
            nodes = report.nodes,
            processed = report.processed,
            removed = report.removed,
            "indexed keg"
        );
        Ok(report)
    }

    /// Store the current dex in `cache`.
    pub fn sync_cache(&self, cache: &DexCache) {
        cache.put(self.store.name(), self.dex.clone());
    }

    /// Raw body bytes.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for unknown nodes.
    pub fn read_content(&self, id: &NodeId) -> KegResult<Vec<u8>> {
        self.store.read_content(id)
    }

    /// Parsed metadata; a node without `meta.yaml` yields defaults.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for unknown nodes, parse failures for bad YAML.
    pub fn read_meta(&self, id: &NodeId) -> KegResult<NodeMeta> {
        let subject = format!("meta.yaml for node {id}");
        match self.store.read_meta(id) {
            Ok(raw) => {
                let text = String::from_utf8(raw).map_err(|e| KegError::parse(&subject, e))?;
                NodeMeta::parse(&text, &subject)
            }
            Err(err) if err.kind() == ErrorKind::NotExist && self.store.has_node(id)? => {
                Ok(NodeMeta::default())
            }
            Err(err) => Err(err),
        }
    }

    /// Stored stats.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] when the node or its stats are missing.
    pub fn read_stats(&self, id: &NodeId) -> KegResult<NodeStats> {
        self.store.read_stats(id)
    }

    /// Nodes matching a tag expression, evaluated against the dex.
    ///
    /// # Errors
    ///
    /// [`KegError::ParseFailure`] for an invalid expression.
    pub fn query_tags(&self, expr: &str) -> KegResult<BTreeSet<NodeId>> {
        let expr = parse_tag_expression(expr)?;
        Ok(self.dex.evaluate(&expr))
    }

    /// File attachment capability.
    ///
    /// # Errors
    ///
    /// [`KegError::Unsupported`] when the backend has none.
    pub fn files(&self) -> KegResult<&dyn FileAttachments> {
        require_files(self.store.as_ref())
    }

    /// Image attachment capability.
    ///
    /// # Errors
    ///
    /// [`KegError::Unsupported`] when the backend has none.
    pub fn images(&self) -> KegResult<&dyn ImageAttachments> {
        require_images(self.store.as_ref())
    }
}
