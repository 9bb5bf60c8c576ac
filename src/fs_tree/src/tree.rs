use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use kube_api::ContextSource;

use crate::bytes_file::FileHandle;
use crate::context::RootContext;
use crate::generic::{FileMode, Node, ResolvedEntry};
use crate::params::Params;
use crate::state::StateStore;
use crate::util::{hash_path, join_path};
use crate::{FsError, FsResult};

/// The kernel's fixed root inode.
pub const ROOT_INODE: u64 = 1;

struct HandleTable {
    next_fh: AtomicU64,
    handles: Mutex<HashMap<u64, Arc<FileHandle>>>,
}

impl HandleTable {
    fn new() -> Self {
        Self {
            next_fh: AtomicU64::new(1),
            handles: Mutex::new(HashMap::new()),
        }
    }

    fn insert(&self, handle: FileHandle) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::SeqCst);
        let mut handles = self.handles.lock().expect("handle table lock poisoned");
        handles.insert(fh, Arc::new(handle));
        fh
    }

    fn get(&self, fh: u64) -> FsResult<Arc<FileHandle>> {
        let handles = self.handles.lock().expect("handle table lock poisoned");
        handles
            .get(&fh)
            .cloned()
            .ok_or_else(|| FsError::Internal(format!("unknown file handle {}", fh)))
    }

    fn remove(&self, fh: u64) {
        let mut handles = self.handles.lock().expect("handle table lock poisoned");
        handles.remove(&fh);
    }
}

/// The virtual tree's dispatch table: maps kernel inodes onto synthesized
/// nodes and open file handles onto their backing objects. All operations
/// are async; the FUSE bridge blocks on them per callback.
pub struct KubeFsTree {
    nodes: RwLock<HashMap<u64, Arc<Node>>>,
    handles: HandleTable,
}

impl KubeFsTree {
    pub fn new(contexts: Arc<dyn ContextSource>) -> FsResult<Self> {
        Self::with_discovery_ttl(contexts, crate::params::DEFAULT_DISCOVERY_TTL)
    }

    pub fn with_discovery_ttl(
        contexts: Arc<dyn ContextSource>,
        discovery_ttl: Duration,
    ) -> FsResult<Self> {
        let state = Arc::new(StateStore::new());
        let mut params = Params::new(contexts, state);
        params.discovery_ttl = discovery_ttl;
        let root = RootContext::new_node(params)?;

        let mut nodes = HashMap::new();
        nodes.insert(ROOT_INODE, Arc::new(root));
        Ok(Self {
            nodes: RwLock::new(nodes),
            handles: HandleTable::new(),
        })
    }

    fn node(&self, ino: u64) -> FsResult<Arc<Node>> {
        let nodes = self.nodes.read().expect("node table lock poisoned");
        nodes.get(&ino).cloned().ok_or(FsError::DoesNotExist)
    }

    fn dir_node(&self, ino: u64) -> FsResult<Arc<Node>> {
        let node = self.node(ino)?;
        match &*node {
            Node::Dir(_) => Ok(node),
            Node::File(_) => Err(FsError::Internal(format!(
                "inode {} is not a directory",
                ino
            ))),
        }
    }

    /// Resolve `name` under `parent`. The child's inode is the hash of its
    /// path, so re-lookups return the same number.
    pub async fn lookup(&self, parent: u64, name: &str) -> FsResult<(u64, FileMode)> {
        let parent_node = self.dir_node(parent)?;
        let Node::Dir(dir) = &*parent_node else {
            unreachable!("dir_node returned a file");
        };
        let child = dir.lookup(name).await?;
        let mode = child.mode();
        let ino = hash_path(&join_path(&dir.base_path, name));
        debug!("lookup {:?} under inode {} -> inode {}", name, parent, ino);

        let mut nodes = self.nodes.write().expect("node table lock poisoned");
        nodes.insert(ino, Arc::new(child));
        Ok((ino, mode))
    }

    /// Enumerate a directory. Errors become a one-entry `error` listing,
    /// so this only fails for an unknown or non-directory inode.
    pub async fn readdir(&self, ino: u64) -> FsResult<Vec<ResolvedEntry>> {
        let node = self.dir_node(ino)?;
        let Node::Dir(dir) = &*node else {
            unreachable!("dir_node returned a file");
        };
        Ok(dir.readdir().await)
    }

    pub fn getattr(&self, ino: u64) -> FsResult<FileMode> {
        Ok(self.node(ino)?.mode())
    }

    /// Open a file inode, returning the handle id. All content is
    /// synthesized, so the caller must request direct I/O.
    pub async fn open(&self, ino: u64, write: bool) -> FsResult<u64> {
        let node = self.node(ino)?;
        let file = match &*node {
            Node::File(file) => file,
            Node::Dir(_) => {
                return Err(FsError::Internal(format!("inode {} is not a file", ino)))
            }
        };
        let handle = file.open(write).await?;
        Ok(self.handles.insert(handle))
    }

    pub async fn read(&self, fh: u64, offset: i64, size: u32) -> FsResult<Vec<u8>> {
        let handle = self.handles.get(fh)?;
        handle.read(offset, size).await
    }

    pub async fn write(&self, fh: u64, offset: i64, data: &[u8]) -> FsResult<usize> {
        let handle = self.handles.get(fh)?;
        handle.write(offset, data).await
    }

    pub fn fsync(&self, fh: u64) -> FsResult<()> {
        self.handles.get(fh)?.fsync()
    }

    pub fn release(&self, fh: u64) {
        self.handles.remove(fh);
    }
}
