//! In-process store used for scratch kegs and tests. No attachment support.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{NodeStore, validate_meta};
use crate::error::{KegError, KegResult};
use crate::model::NodeStats;
use crate::node_id::NodeId;

#[derive(Debug, Clone, Default)]
struct MemoryNode {
    content: Option<Vec<u8>>,
    meta: Option<Vec<u8>>,
    stats: Option<NodeStats>,
}

/// Volatile node store.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    nodes: RwLock<BTreeMap<NodeId, MemoryNode>>,
    indexes: RwLock<HashMap<String, Vec<u8>>>,
    config: RwLock<Option<Vec<u8>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn missing(what: &str, id: &NodeId) -> KegError {
    KegError::NotExist(format!("{what} for node {id}"))
}

impl MemoryStore {
    /// Empty store with an explicit identity.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: RwLock::new(BTreeMap::new()),
            indexes: RwLock::new(HashMap::new()),
            config: RwLock::new(None),
        }
    }

    fn with_node<T>(&self, id: &NodeId, f: impl FnOnce(&MemoryNode) -> KegResult<T>) -> KegResult<T> {
        let nodes = read(&self.nodes);
        let node = nodes
            .get(id)
            .ok_or_else(|| KegError::NotExist(format!("node {id}")))?;
        f(node)
    }
}

impl NodeStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_node(&self, id: &NodeId) -> KegResult<bool> {
        Ok(read(&self.nodes).contains_key(id))
    }

    fn list_nodes(&self) -> KegResult<Vec<NodeId>> {
        Ok(read(&self.nodes).keys().cloned().collect())
    }

    fn read_content(&self, id: &NodeId) -> KegResult<Vec<u8>> {
        self.with_node(id, |node| node.content.clone().ok_or_else(|| missing("README.md", id)))
    }

    fn write_content(&self, id: &NodeId, data: &[u8]) -> KegResult<()> {
        write(&self.nodes).entry(id.clone()).or_default().content = Some(data.to_vec());
        Ok(())
    }

    fn read_meta(&self, id: &NodeId) -> KegResult<Vec<u8>> {
        self.with_node(id, |node| node.meta.clone().ok_or_else(|| missing("meta.yaml", id)))
    }

    fn write_meta(&self, id: &NodeId, data: &[u8]) -> KegResult<()> {
        validate_meta(id, data)?;
        write(&self.nodes).entry(id.clone()).or_default().meta = Some(data.to_vec());
        Ok(())
    }

    fn read_stats(&self, id: &NodeId) -> KegResult<NodeStats> {
        self.with_node(id, |node| node.stats.clone().ok_or_else(|| missing("stats.json", id)))
    }

    fn write_stats(&self, id: &NodeId, stats: &NodeStats) -> KegResult<()> {
        write(&self.nodes).entry(id.clone()).or_default().stats = Some(stats.clone());
        Ok(())
    }

    fn remove(&self, id: &NodeId) -> KegResult<()> {
        write(&self.nodes)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| KegError::NotExist(format!("node {id}")))
    }

    fn move_node(&self, src: &NodeId, dst: &NodeId) -> KegResult<()> {
        let mut nodes = write(&self.nodes);
        if !nodes.contains_key(src) {
            return Err(KegError::NotExist(format!("node {src}")));
        }
        if nodes.contains_key(dst) {
            return Err(KegError::DestinationExists(dst.clone()));
        }
        if let Some(node) = nodes.remove(src) {
            nodes.insert(dst.clone(), node);
        }
        Ok(())
    }

    fn read_index(&self, name: &str) -> KegResult<Vec<u8>> {
        read(&self.indexes)
            .get(name)
            .cloned()
            .ok_or_else(|| KegError::NotExist(format!("dex/{name}")))
    }

    fn write_index(&self, name: &str, data: &[u8]) -> KegResult<()> {
        write(&self.indexes).insert(name.to_string(), data.to_vec());
        Ok(())
    }

    fn read_config(&self) -> KegResult<Vec<u8>> {
        read(&self.config)
            .clone()
            .ok_or_else(|| KegError::NotExist("keg config".to_string()))
    }

    fn write_config(&self, data: &[u8]) -> KegResult<()> {
        *write(&self.config) = Some(data.to_vec());
        Ok(())
    }
}
