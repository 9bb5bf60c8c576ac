use async_trait::async_trait;

use crate::bytes_file::FileHandle;
use crate::containers::RootContainer;
use crate::generic::{
    FileMode, GenericDir, GenericFile, Node, NodeFactory, VirtualDirectory, VirtualFile,
};
use crate::params::{check_params, ensure_client, Params, ParamsSpec};
use crate::util::{join_path, DirEntries};
use crate::{FsError, FsResult};

pub(crate) fn pod_base_path(params: &Params) -> String {
    format!(
        "{}/{}/pods/{}",
        params.context_name, params.namespace, params.pod
    )
}

/// The per-pod surface: definition files plus the container tree.
pub(crate) struct PodObjects;

impl PodObjects {
    pub(crate) fn new_node(mut params: Params) -> FsResult<Node> {
        params.pod = params.name.clone();
        check_params(
            &ParamsSpec {
                context_name: true,
                namespace: true,
                pod: true,
                state: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        let base_path = pod_base_path(&params);
        Ok(Node::Dir(GenericDir::new(
            Box::new(PodObjects),
            base_path,
            params,
        )))
    }
}

#[async_trait]
impl VirtualDirectory for PodObjects {
    async fn entries(&self, _params: &mut Params) -> FsResult<DirEntries> {
        Ok(DirEntries {
            files: vec!["def.json".to_string(), "def.yaml".to_string()],
            directories: vec!["containers".to_string()],
        })
    }

    async fn entry(&self, name: &str, _params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        match name {
            // def.yaml reuses the JSON rendering until a yaml backend
            // lands.
            "def.json" | "def.yaml" => Ok((new_pod_def_node, FileMode::Regular)),
            "containers" => Ok((RootContainer::new_node, FileMode::Directory)),
            _ => Err(FsError::DoesNotExist),
        }
    }
}

/// Read-only pod definition, fetched through the typed API.
struct PodDefFile;

#[async_trait]
impl VirtualFile for PodDefFile {
    async fn open(&self, params: &mut Params, write: bool) -> FsResult<FileHandle> {
        if write {
            return Err(FsError::ReadOnly);
        }
        let client = ensure_client(params).await?;
        match client
            .get_pod_definition(&params.namespace, &params.pod)
            .await
        {
            Ok(content) => Ok(FileHandle::read_only(content)),
            Err(err) if err.is_not_found() => Err(FsError::DoesNotExist),
            Err(err) => Ok(FileHandle::read_only(format!("{}\n", err).into_bytes())),
        }
    }
}

fn new_pod_def_node(params: Params) -> FsResult<Node> {
    check_params(
        &ParamsSpec {
            context_name: true,
            namespace: true,
            pod: true,
            state: true,
            ..ParamsSpec::default()
        },
        &params,
    )?;
    let base_path = join_path(&pod_base_path(&params), &params.name);
    Ok(Node::File(GenericFile::new(
        Box::new(PodDefFile),
        base_path,
        params,
    )))
}
