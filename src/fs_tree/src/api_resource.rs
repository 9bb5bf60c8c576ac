use async_trait::async_trait;
use std::sync::Arc;

use crate::generic::{
    FileMode, GenericDir, GenericFile, Node, NodeFactory, VirtualDirectory, VirtualFile,
};
use crate::json_file::{EditableJsonFile, GenericJsonFile};
use crate::params::{check_params, ensure_client, Params, ParamsSpec};
use crate::pod::PodObjects;
use crate::resources::GroupedAPIResource;
use crate::util::{join_path, DirEntries};
use crate::{FsError, FsResult};

pub(crate) fn required_group_version(params: &Params) -> FsResult<Arc<GroupedAPIResource>> {
    params
        .group_version
        .clone()
        .ok_or_else(|| FsError::ParamsMissing(vec!["group_version".to_string()]))
}

/// Base path of the instance list of one resource. The namespace segment
/// is present iff the resource is namespaced.
pub(crate) fn instances_base_path(params: &Params, gv: &GroupedAPIResource) -> String {
    if gv.namespaced {
        format!(
            "{}/resources/{}/{}/namespaces/{}",
            params.context_name,
            gv.group_version(),
            gv.resource_name,
            params.namespace,
        )
    } else {
        format!(
            "{}/resources/{}/{}",
            params.context_name,
            gv.group_version(),
            gv.resource_name,
        )
    }
}

/// The instances of one API resource, namespaced or cluster-scoped. Names
/// come from the server's Table rendering.
pub(crate) struct APIResourceNode;

impl APIResourceNode {
    pub(crate) fn new_node(params: Params) -> FsResult<Node> {
        let gv = required_group_version(&params)?;
        check_params(
            &ParamsSpec {
                context_name: true,
                group_version: true,
                namespace: gv.namespaced,
                state: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        let base_path = instances_base_path(&params, &gv);
        Ok(Node::Dir(GenericDir::new(
            Box::new(APIResourceNode),
            base_path,
            params,
        )))
    }

    /// Factory used under the namespace list: the looked-up name is the
    /// namespace.
    pub(crate) fn new_node_in_namespace(mut params: Params) -> FsResult<Node> {
        params.namespace = params.name.clone();
        Self::new_node(params)
    }
}

#[async_trait]
impl VirtualDirectory for APIResourceNode {
    async fn entries(&self, params: &mut Params) -> FsResult<DirEntries> {
        let gv = required_group_version(params)?;
        let client = ensure_client(params).await?;
        let namespace = gv.namespaced.then(|| params.namespace.clone());
        let names = client
            .list_resource_names(
                &gv.group_version(),
                &gv.resource_name,
                namespace.as_deref(),
            )
            .await?;
        Ok(DirEntries::with_directories(names))
    }

    async fn entry(&self, _name: &str, params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        let gv = required_group_version(params)?;
        if gv.group.is_empty() && gv.version == "v1" && gv.resource_name == "pods" {
            Ok((PodObjects::new_node, FileMode::Directory))
        } else {
            Ok((APIResourceActions::new_node, FileMode::Directory))
        }
    }
}

/// The fixed action files of one resource instance.
pub(crate) struct APIResourceActions;

impl APIResourceActions {
    pub(crate) fn new_node(mut params: Params) -> FsResult<Node> {
        // `name` will be re-pointed at the action file on the next lookup;
        // the object keeps its own slot.
        params.object_name = params.name.clone();
        let gv = required_group_version(&params)?;
        check_params(
            &ParamsSpec {
                context_name: true,
                group_version: true,
                name: true,
                namespace: gv.namespaced,
                state: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        let base_path = join_path(&instances_base_path(&params, &gv), &params.name);
        Ok(Node::Dir(GenericDir::new(
            Box::new(APIResourceActions),
            base_path,
            params,
        )))
    }
}

#[async_trait]
impl VirtualDirectory for APIResourceActions {
    async fn entries(&self, _params: &mut Params) -> FsResult<DirEntries> {
        Ok(DirEntries::with_files(["def.json", "edit.json"]))
    }

    async fn entry(&self, name: &str, _params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        match name {
            "def.json" => Ok((new_def_json_node, FileMode::Regular)),
            "edit.json" => Ok((new_edit_json_node, FileMode::Regular)),
            _ => Err(FsError::DoesNotExist),
        }
    }
}

fn new_def_json_node(params: Params) -> FsResult<Node> {
    new_object_file_node(params, Box::new(GenericJsonFile))
}

fn new_edit_json_node(params: Params) -> FsResult<Node> {
    new_object_file_node(params, Box::new(EditableJsonFile))
}

fn new_object_file_node(mut params: Params, action: Box<dyn VirtualFile>) -> FsResult<Node> {
    let gv = required_group_version(&params)?;
    let file_name = params.name.clone();
    // The open path addresses the object through `name`.
    params.name = params.object_name.clone();
    check_params(
        &ParamsSpec {
            context_name: true,
            group_version: true,
            name: true,
            namespace: gv.namespaced,
            state: true,
            ..ParamsSpec::default()
        },
        &params,
    )?;
    let base_path = join_path(
        &join_path(&instances_base_path(&params, &gv), &params.name),
        &file_name,
    );
    Ok(Node::File(GenericFile::new(action, base_path, params)))
}
