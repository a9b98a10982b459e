//! Directory-backed keg: `<root>/<id>/{README.md,meta.yaml,stats.json}`.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use super::persistence::atomic_write;
use super::{
    FileAttachments, ImageAttachments, NodeStore, validate_attachment_name, validate_meta,
};
use crate::error::{KegError, KegResult};
use crate::model::NodeStats;
use crate::node_id::NodeId;

const CONTENT_FILE: &str = "README.md";
const META_FILE: &str = "meta.yaml";
const STATS_FILE: &str = "stats.json";
const CONFIG_FILE: &str = "keg";
const DEX_DIR: &str = "dex";
const ASSETS_DIR: &str = "assets";
const IMAGES_DIR: &str = "images";

/// Filesystem node store rooted at a keg directory.
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    name: String,
}

impl FsStore {
    /// Store rooted at `root`. Nothing is touched until the first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        let name = root.canonicalize().map_or_else(
            |_| root.to_string_lossy().trim_end_matches('/').to_string(),
            |p| p.to_string_lossy().into_owned(),
        );
        Self { root, name }
    }

    /// Keg root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one node.
    #[must_use]
    pub fn node_dir(&self, id: &NodeId) -> PathBuf {
        self.root.join(id.path())
    }

    fn node_file(&self, id: &NodeId, file: &str) -> PathBuf {
        self.node_dir(id).join(file)
    }

    fn require_node(&self, id: &NodeId) -> KegResult<PathBuf> {
        let dir = self.node_dir(id);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(KegError::NotExist(format!("node {id}")))
        }
    }

    fn read_node_file(&self, id: &NodeId, file: &str) -> KegResult<Vec<u8>> {
        self.require_node(id)?;
        let path = self.node_file(id, file);
        std::fs::read(&path).map_err(|e| KegError::from_io(&path, e, &format!("{file} for node {id}")))
    }

    fn list_dir_files(dir: &Path) -> KegResult<Vec<String>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names: Vec<String> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        Ok(names)
    }

    fn attachment_path(&self, id: &NodeId, sub: &str, name: &str) -> KegResult<PathBuf> {
        validate_attachment_name(name)?;
        Ok(self.require_node(id)?.join(sub).join(name))
    }

    fn read_attachment(&self, id: &NodeId, sub: &str, name: &str) -> KegResult<Vec<u8>> {
        let path = self.attachment_path(id, sub, name)?;
        std::fs::read(&path).map_err(|e| KegError::from_io(&path, e, &format!("{sub}/{name} for node {id}")))
    }

    fn delete_attachment(&self, id: &NodeId, sub: &str, name: &str) -> KegResult<()> {
        let path = self.attachment_path(id, sub, name)?;
        std::fs::remove_file(&path)
            .map_err(|e| KegError::from_io(&path, e, &format!("{sub}/{name} for node {id}")))
    }
}

impl NodeStore for FsStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_node(&self, id: &NodeId) -> KegResult<bool> {
        Ok(self.node_dir(id).is_dir())
    }

    fn list_nodes(&self) -> KegResult<Vec<NodeId>> {
        if !self.root.is_dir() {
            return Err(KegError::NotExist(format!("keg at {}", self.root.display())));
        }
        let mut ids: Vec<NodeId> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?;
                let id: NodeId = name.parse().ok()?;
                (id.path() == name).then_some(id)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn read_content(&self, id: &NodeId) -> KegResult<Vec<u8>> {
        self.read_node_file(id, CONTENT_FILE)
    }

    fn write_content(&self, id: &NodeId, data: &[u8]) -> KegResult<()> {
        atomic_write(&self.node_file(id, CONTENT_FILE), data)
    }

    fn read_meta(&self, id: &NodeId) -> KegResult<Vec<u8>> {
        self.read_node_file(id, META_FILE)
    }

    fn write_meta(&self, id: &NodeId, data: &[u8]) -> KegResult<()> {
        validate_meta(id, data)?;
        atomic_write(&self.node_file(id, META_FILE), data)
    }

    fn read_stats(&self, id: &NodeId) -> KegResult<NodeStats> {
        let raw = self.read_node_file(id, STATS_FILE)?;
        NodeStats::parse(&raw, &format!("stats.json for node {id}"))
    }

    fn write_stats(&self, id: &NodeId, stats: &NodeStats) -> KegResult<()> {
        atomic_write(&self.node_file(id, STATS_FILE), stats.to_json()?.as_bytes())
    }

    fn remove(&self, id: &NodeId) -> KegResult<()> {
        let dir = self.require_node(id)?;
        std::fs::remove_dir_all(&dir).map_err(|e| KegError::io(&dir, e))?;
        debug!("removed node directory {}", dir.display());
        Ok(())
    }

    fn move_node(&self, src: &NodeId, dst: &NodeId) -> KegResult<()> {
        let from = self.require_node(src)?;
        let to = self.node_dir(dst);
        if to.exists() {
            return Err(KegError::DestinationExists(dst.clone()));
        }
        std::fs::rename(&from, &to).map_err(|e| KegError::io(&from, e))?;
        debug!("moved node directory {} -> {}", from.display(), to.display());
        Ok(())
    }

    fn read_index(&self, name: &str) -> KegResult<Vec<u8>> {
        let path = self.root.join(DEX_DIR).join(name);
        std::fs::read(&path).map_err(|e| KegError::from_io(&path, e, &format!("dex/{name}")))
    }

    fn write_index(&self, name: &str, data: &[u8]) -> KegResult<()> {
        atomic_write(&self.root.join(DEX_DIR).join(name), data)
    }

    fn read_config(&self) -> KegResult<Vec<u8>> {
        let path = self.root.join(CONFIG_FILE);
        std::fs::read(&path).map_err(|e| KegError::from_io(&path, e, "keg config"))
    }

    fn write_config(&self, data: &[u8]) -> KegResult<()> {
        atomic_write(&self.root.join(CONFIG_FILE), data)
    }

    fn files(&self) -> Option<&dyn FileAttachments> {
        Some(self)
    }

    fn images(&self) -> Option<&dyn ImageAttachments> {
        Some(self)
    }
}

impl FileAttachments for FsStore {
    fn list_files(&self, id: &NodeId) -> KegResult<Vec<String>> {
        Self::list_dir_files(&self.require_node(id)?.join(ASSETS_DIR))
    }

    fn read_file(&self, id: &NodeId, name: &str) -> KegResult<Vec<u8>> {
        self.read_attachment(id, ASSETS_DIR, name)
    }

    fn write_file(&self, id: &NodeId, name: &str, data: &[u8]) -> KegResult<()> {
        atomic_write(&self.attachment_path(id, ASSETS_DIR, name)?, data)
    }

    fn delete_file(&self, id: &NodeId, name: &str) -> KegResult<()> {
        self.delete_attachment(id, ASSETS_DIR, name)
    }
}

impl ImageAttachments for FsStore {
    fn list_images(&self, id: &NodeId) -> KegResult<Vec<String>> {
        Self::list_dir_files(&self.require_node(id)?.join(IMAGES_DIR))
    }

    fn read_image(&self, id: &NodeId, name: &str) -> KegResult<Vec<u8>> {
        self.read_attachment(id, IMAGES_DIR, name)
    }

    fn write_image(&self, id: &NodeId, name: &str, data: &[u8]) -> KegResult<()> {
        atomic_write(&self.attachment_path(id, IMAGES_DIR, name)?, data)
    }

    fn delete_image(&self, id: &NodeId, name: &str) -> KegResult<()> {
        self.delete_attachment(id, IMAGES_DIR, name)
    }
}
