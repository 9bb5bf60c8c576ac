use async_trait::async_trait;
use log::{debug, error, warn};
use tokio::sync::Mutex;

use crate::bytes_file::{new_error_file, FileHandle};
use crate::params::Params;
use crate::util::{hash_path, join_path, DirEntries};
use crate::{FsError, FsResult};

/// Mode of a synthesized node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    Directory,
    Regular,
}

/// Constructor passed upward from `VirtualDirectory::entry`. Receives the
/// parent's params copy (with `name` already set) and may mutate further
/// fields before building the node.
pub type NodeFactory = fn(Params) -> FsResult<Node>;

/// A directory view. `entries` enumerates children; `entry` resolves one
/// child name to its node factory and mode. Both may touch the network and
/// may lazily fill params fields (client handles, resolved resources).
#[async_trait]
pub trait VirtualDirectory: Send + Sync {
    async fn entries(&self, params: &mut Params) -> FsResult<DirEntries>;

    async fn entry(&self, name: &str, params: &mut Params) -> FsResult<(NodeFactory, FileMode)>;
}

/// A file view. `open` produces the handle that serves reads and writes.
#[async_trait]
pub trait VirtualFile: Send + Sync {
    fn access(&self, _params: &Params) -> FsResult<()> {
        Ok(())
    }

    async fn open(&self, params: &mut Params, write: bool) -> FsResult<FileHandle>;
}

/// A node of the virtual tree: the polymorphic shell around one directory
/// or file action.
pub enum Node {
    Dir(GenericDir),
    File(GenericFile),
}

impl Node {
    pub fn mode(&self) -> FileMode {
        match self {
            Node::Dir(_) => FileMode::Directory,
            Node::File(_) => FileMode::Regular,
        }
    }

    pub fn base_path(&self) -> &str {
        match self {
            Node::Dir(dir) => &dir.base_path,
            Node::File(file) => &file.base_path,
        }
    }
}

/// One entry of a resolved directory stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEntry {
    pub ino: u64,
    pub mode: FileMode,
    pub name: String,
}

pub struct GenericDir {
    action: Box<dyn VirtualDirectory>,
    pub(crate) base_path: String,
    params: Mutex<Params>,
}

impl GenericDir {
    pub fn new(action: Box<dyn VirtualDirectory>, base_path: String, params: Params) -> Self {
        Self {
            action,
            base_path,
            params: Mutex::new(params),
        }
    }

    /// Enumerate this directory. Never fails: a remote error becomes a
    /// single regular-file entry named `error`, and the error itself is
    /// kept for the moment the user opens that entry.
    pub async fn readdir(&self) -> Vec<ResolvedEntry> {
        let mut params = self.params.lock().await;
        let entries = match self.action.entries(&mut params).await {
            Ok(entries) => entries,
            Err(err) => {
                warn!("readdir of {:?} failed: {}", self.base_path, err);
                params.last_error = Some(err.to_string());
                return vec![ResolvedEntry {
                    ino: hash_path(&join_path(&self.base_path, "error")),
                    mode: FileMode::Regular,
                    name: "error".to_string(),
                }];
            }
        };

        let mut resolved = Vec::with_capacity(entries.files.len() + entries.directories.len());
        for name in &entries.files {
            if name.is_empty() {
                continue;
            }
            resolved.push(ResolvedEntry {
                ino: hash_path(&join_path(&self.base_path, name)),
                mode: FileMode::Regular,
                name: name.clone(),
            });
        }
        for name in &entries.directories {
            if name.is_empty() {
                continue;
            }
            resolved.push(ResolvedEntry {
                ino: hash_path(&join_path(&self.base_path, name)),
                mode: FileMode::Directory,
                name: name.clone(),
            });
        }
        resolved
    }

    /// Resolve one child. `DoesNotExist` maps to ENOENT at the boundary;
    /// any other failure materializes an ErrorFile child so the error is
    /// readable through the filesystem itself.
    pub async fn lookup(&self, name: &str) -> FsResult<Node> {
        let mut params = self.params.lock().await;

        if name == "error" && params.last_error.is_some() {
            return new_error_file(params.clone());
        }

        let (factory, _mode) = match self.action.entry(name, &mut params).await {
            Ok(resolved) => resolved,
            Err(err) if err.is_not_found() => return Err(FsError::DoesNotExist),
            Err(err) => {
                error!("lookup of {:?} under {:?} failed: {}", name, self.base_path, err);
                params.last_error = Some(err.to_string());
                return new_error_file(params.clone());
            }
        };

        let mut child_params = params.clone();
        child_params.name = name.to_string();
        match factory(child_params) {
            Ok(node) => {
                debug!("built node {:?} under {:?}", name, self.base_path);
                Ok(node)
            }
            Err(err) if err.is_not_found() => Err(FsError::DoesNotExist),
            Err(err) => {
                error!("constructing {:?} under {:?} failed: {}", name, self.base_path, err);
                params.last_error = Some(err.to_string());
                new_error_file(params.clone())
            }
        }
    }
}

pub struct GenericFile {
    action: Box<dyn VirtualFile>,
    pub(crate) base_path: String,
    params: Mutex<Params>,
}

impl GenericFile {
    pub fn new(action: Box<dyn VirtualFile>, base_path: String, params: Params) -> Self {
        Self {
            action,
            base_path,
            params: Mutex::new(params),
        }
    }

    pub async fn open(&self, write: bool) -> FsResult<FileHandle> {
        let mut params = self.params.lock().await;
        self.action.access(&params)?;
        self.action.open(&mut params, write).await
    }
}
