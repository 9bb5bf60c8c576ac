use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use kube_api::{ClusterApi, DynamicObject, GroupVersionResource};

use crate::bytes_file::{slice_content, FileHandle};
use crate::generic::VirtualFile;
use crate::params::{ensure_client, Params};
use crate::resources::GroupedAPIResource;
use crate::{FsError, FsResult};

fn namespace_for(params: &Params, gv: &GroupedAPIResource) -> Option<String> {
    if gv.namespaced {
        Some(params.namespace.clone())
    } else {
        None
    }
}

/// Read-only `def.json`: the object definition fetched through the dynamic
/// API, pretty-printed.
pub(crate) struct GenericJsonFile;

#[async_trait]
impl VirtualFile for GenericJsonFile {
    async fn open(&self, params: &mut Params, write: bool) -> FsResult<FileHandle> {
        if write {
            return Err(FsError::ReadOnly);
        }
        let Some(gv) = params.group_version.clone() else {
            return Ok(FileHandle::read_only(
                b"error while opening json file, group/version was unset\n".to_vec(),
            ));
        };
        let client = ensure_client(params).await?;
        let namespace = namespace_for(params, &gv);
        match client
            .get_unstructured(&params.name, &gv.gvr(), namespace.as_deref())
            .await
        {
            Ok(content) => Ok(FileHandle::read_only(content)),
            Err(err) if err.is_not_found() => Err(FsError::DoesNotExist),
            // The filesystem is the interface with the user; remote errors
            // are served as the file's content.
            Err(err) => Ok(FileHandle::read_only(format!("{}\n", err).into_bytes())),
        }
    }
}

/// `edit.json`: reading renders the object inside the unlock-for-edit
/// envelope; writing buffers chunks until the envelope parses and then
/// updates the object, strict-validated, if the unlock flag is set.
pub(crate) struct EditableJsonFile;

#[async_trait]
impl VirtualFile for EditableJsonFile {
    async fn open(&self, params: &mut Params, _write: bool) -> FsResult<FileHandle> {
        let Some(gv) = params.group_version.clone() else {
            return Ok(FileHandle::read_only(
                b"error while opening editable json file, group/version was unset\n".to_vec(),
            ));
        };
        let client = ensure_client(params).await?;
        let namespace = namespace_for(params, &gv);
        let object = match client
            .get_unstructured_raw(&params.name, namespace.as_deref(), &gv.gvr())
            .await
        {
            Ok(object) => object,
            Err(err) if err.is_not_found() => return Err(FsError::DoesNotExist),
            Err(err) => return Ok(FileHandle::read_only(format!("{}\n", err).into_bytes())),
        };
        Ok(FileHandle::EditableJson(EditableJsonFileHandle::new(
            object,
            params.name.clone(),
            namespace,
            gv.gvr(),
            client,
        )))
    }
}

/// The unlock-for-edit envelope. The user must flip `unlockForEdit` to
/// true for a write to be committed.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SafeContent {
    unlock_for_edit: bool,
    content: DynamicObject,
}

/// Accumulates multi-chunk writes for the lifetime of one open.
pub struct EditableJsonFileHandle {
    content: DynamicObject,
    buf: Mutex<Vec<u8>>,

    name: String,
    namespace: Option<String>,
    gvr: GroupVersionResource,
    client: Arc<dyn ClusterApi>,
}

impl EditableJsonFileHandle {
    pub fn new(
        content: DynamicObject,
        name: String,
        namespace: Option<String>,
        gvr: GroupVersionResource,
        client: Arc<dyn ClusterApi>,
    ) -> Self {
        Self {
            content,
            buf: Mutex::new(Vec::new()),
            name,
            namespace,
            gvr,
            client,
        }
    }

    fn safe_content(&self) -> FsResult<Vec<u8>> {
        let envelope = SafeContent {
            unlock_for_edit: false,
            content: self.content.clone(),
        };
        serde_json::to_vec_pretty(&envelope)
            .map_err(|e| FsError::Internal(format!("failed to render edit envelope: {}", e)))
    }

    pub fn read(&self, offset: i64, size: u32) -> FsResult<Vec<u8>> {
        let content = self.safe_content()?;
        Ok(slice_content(&content, offset, size))
    }

    pub async fn write(&self, offset: i64, data: &[u8]) -> FsResult<usize> {
        let mut buf = self.buf.lock().await;
        if offset == 0 {
            buf.clear();
        }
        buf.extend_from_slice(data);

        let envelope: SafeContent = match serde_json::from_slice(&buf) {
            Ok(envelope) => envelope,
            Err(err) => {
                // Writers deliver the document in chunks; an unparsable
                // buffer means the document is not complete yet.
                debug!("edit buffer for {} not yet complete: {}", self.name, err);
                return Ok(data.len());
            }
        };
        if !envelope.unlock_for_edit {
            return Err(FsError::ReadOnly);
        }
        match self
            .client
            .write_unstructured(
                &self.name,
                self.namespace.as_deref(),
                &self.gvr,
                &envelope.content,
            )
            .await
        {
            Ok(_) => Ok(data.len()),
            Err(err) => {
                warn!("update of {} rejected: {}", self.name, err);
                Err(FsError::Stale(err.to_string()))
            }
        }
    }
}
