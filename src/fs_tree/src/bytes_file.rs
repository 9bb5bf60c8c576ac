use async_trait::async_trait;
use std::sync::Arc;

use crate::containers::ContainerExecFile;
use crate::generic::{GenericFile, Node, VirtualFile};
use crate::json_file::EditableJsonFileHandle;
use crate::params::{check_params, Params, ParamsSpec};
use crate::{FsError, FsResult};

/// Serve the `[off, off+len)` window of a fixed buffer.
pub(crate) fn slice_content(content: &[u8], offset: i64, size: u32) -> Vec<u8> {
    if offset < 0 {
        return Vec::new();
    }
    let start = (offset as usize).min(content.len());
    let end = (start + size as usize).min(content.len());
    content[start..end].to_vec()
}

/// Read-only in-memory content, one per open.
pub struct RoBytesFileHandle {
    content: Vec<u8>,
}

impl RoBytesFileHandle {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    pub fn read(&self, offset: i64, size: u32) -> Vec<u8> {
        slice_content(&self.content, offset, size)
    }
}

/// Read-write in-memory content. Reads mirror the read-only variant;
/// writes are acknowledged and dropped (the owning node interprets real
/// writes through its own handle kind).
pub struct RwBytesFileHandle {
    content: Vec<u8>,
}

impl RwBytesFileHandle {
    pub fn new(content: Vec<u8>) -> Self {
        Self { content }
    }

    pub fn read(&self, offset: i64, size: u32) -> Vec<u8> {
        slice_content(&self.content, offset, size)
    }

    pub fn write(&self, _offset: i64, data: &[u8]) -> usize {
        data.len()
    }
}

/// Every open file maps to one of these. Reads and writes dispatch on the
/// kind; fsync and setattr are accepted no-ops across the board.
pub enum FileHandle {
    RoBytes(RoBytesFileHandle),
    RwBytes(RwBytesFileHandle),
    EditableJson(EditableJsonFileHandle),
    Exec(Arc<ContainerExecFile>),
}

impl FileHandle {
    pub fn read_only(content: Vec<u8>) -> Self {
        FileHandle::RoBytes(RoBytesFileHandle::new(content))
    }

    pub async fn read(&self, offset: i64, size: u32) -> FsResult<Vec<u8>> {
        match self {
            FileHandle::RoBytes(handle) => Ok(handle.read(offset, size)),
            FileHandle::RwBytes(handle) => Ok(handle.read(offset, size)),
            FileHandle::EditableJson(handle) => handle.read(offset, size),
            FileHandle::Exec(file) => Ok(file.read(offset, size).await),
        }
    }

    pub async fn write(&self, offset: i64, data: &[u8]) -> FsResult<usize> {
        match self {
            FileHandle::RoBytes(_) => Err(FsError::ReadOnly),
            FileHandle::RwBytes(handle) => Ok(handle.write(offset, data)),
            FileHandle::EditableJson(handle) => handle.write(offset, data).await,
            FileHandle::Exec(file) => file.run(offset, data).await,
        }
    }

    pub fn fsync(&self) -> FsResult<()> {
        Ok(())
    }

    pub fn setattr(&self) -> FsResult<()> {
        Ok(())
    }
}

/// Read-only file whose content is the rendering of the enclosing
/// directory's last error.
struct ErrorFile;

#[async_trait]
impl VirtualFile for ErrorFile {
    async fn open(&self, params: &mut Params, write: bool) -> FsResult<FileHandle> {
        if write {
            return Err(FsError::ReadOnly);
        }
        let text = params
            .last_error
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        Ok(FileHandle::read_only(format!("{}\n", text).into_bytes()))
    }
}

pub(crate) fn new_error_file(params: Params) -> FsResult<Node> {
    check_params(
        &ParamsSpec {
            last_error: true,
            ..ParamsSpec::default()
        },
        &params,
    )?;
    let base_path = format!("{}/error", params.identifier());
    Ok(Node::File(GenericFile::new(
        Box::new(ErrorFile),
        base_path,
        params,
    )))
}
