mod api_resource;
mod bytes_file;
mod containers;
mod context;
mod generic;
mod json_file;
mod namespace;
mod params;
mod pod;
mod resources;
mod state;
mod tree;
mod util;

#[cfg(test)]
mod testutil;

pub use bytes_file::{FileHandle, RoBytesFileHandle, RwBytesFileHandle};
pub use containers::ContainerExecFile;
pub use generic::{
    FileMode, GenericDir, GenericFile, Node, NodeFactory, ResolvedEntry, VirtualDirectory,
    VirtualFile,
};
pub use json_file::EditableJsonFileHandle;
pub use params::{check_params, ensure_client, Params, ParamsSpec, DEFAULT_DISCOVERY_TTL};
pub use resources::{split_group_version, ApiResources, GroupedAPIResource};
pub use state::{StateStore, StateValue};
pub use tree::{KubeFsTree, ROOT_INODE};
pub use util::{hash_path, join_path, DirEntries};

use kube_api::KubeError;
use thiserror::Error;

/// Engine error taxonomy. The filesystem bridge maps each variant onto an
/// errno; directory enumerations instead surface failures as an `error`
/// entry in the listing.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("does not exist")]
    DoesNotExist,
    #[error("params was missing required values [{}]", .0.join(", "))]
    ParamsMissing(Vec<String>),
    #[error("write not permitted")]
    ReadOnly,
    #[error("update rejected: {0}")]
    Stale(String),
    #[error("remote command failed: {0}")]
    RemoteIo(String),
    #[error("failed to split group/version {0:?}: expected \"v1\" or exactly one '/'")]
    InvalidGroupVersion(String),
    #[error(transparent)]
    Api(#[from] KubeError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl FsError {
    pub fn is_not_found(&self) -> bool {
        match self {
            FsError::DoesNotExist => true,
            FsError::Api(err) => err.is_not_found(),
            _ => false,
        }
    }
}

pub type FsResult<T> = std::result::Result<T, FsError>;
