use async_trait::async_trait;

use crate::api_resource::APIResourceNode;
use crate::generic::{FileMode, GenericDir, Node, NodeFactory, VirtualDirectory};
use crate::params::{check_params, ensure_client, Params, ParamsSpec};
use crate::util::DirEntries;
use crate::{FsError, FsResult};

/// A namespaced resource's root. Its only child is the literal
/// `namespaces` directory, so instance paths read
/// `<resource>/namespaces/<namespace>/<object>`.
pub(crate) struct NamespacedResource;

impl NamespacedResource {
    pub(crate) fn new_node(params: Params) -> FsResult<Node> {
        check_params(
            &ParamsSpec {
                context_name: true,
                group_version: true,
                state: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        let gv = params
            .group_version
            .clone()
            .ok_or_else(|| FsError::ParamsMissing(vec!["group_version".to_string()]))?;
        let base_path = format!(
            "{}/resources/{}/{}",
            params.context_name,
            gv.group_version(),
            gv.resource_name,
        );
        Ok(Node::Dir(GenericDir::new(
            Box::new(NamespacedResource),
            base_path,
            params,
        )))
    }
}

#[async_trait]
impl VirtualDirectory for NamespacedResource {
    async fn entries(&self, _params: &mut Params) -> FsResult<DirEntries> {
        Ok(DirEntries::with_directories(["namespaces"]))
    }

    async fn entry(&self, name: &str, _params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        match name {
            "namespaces" => Ok((ListNamespaces::new_node, FileMode::Directory)),
            _ => Err(FsError::DoesNotExist),
        }
    }
}

/// The namespace layer of a namespaced resource: one directory per
/// namespace in the cluster.
pub(crate) struct ListNamespaces;

impl ListNamespaces {
    pub(crate) fn new_node(params: Params) -> FsResult<Node> {
        check_params(
            &ParamsSpec {
                context_name: true,
                group_version: true,
                state: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        let gv = params
            .group_version
            .clone()
            .ok_or_else(|| FsError::ParamsMissing(vec!["group_version".to_string()]))?;
        let base_path = format!(
            "{}/resources/{}/{}/namespaces",
            params.context_name,
            gv.group_version(),
            gv.resource_name,
        );
        Ok(Node::Dir(GenericDir::new(
            Box::new(ListNamespaces),
            base_path,
            params,
        )))
    }
}

#[async_trait]
impl VirtualDirectory for ListNamespaces {
    async fn entries(&self, params: &mut Params) -> FsResult<DirEntries> {
        let client = ensure_client(params).await?;
        let namespaces = client.list_namespaces().await?;
        Ok(DirEntries::with_directories(namespaces))
    }

    async fn entry(&self, _name: &str, _params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        Ok((APIResourceNode::new_node_in_namespace, FileMode::Directory))
    }
}
