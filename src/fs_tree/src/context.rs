use async_trait::async_trait;

use crate::generic::{FileMode, GenericDir, Node, NodeFactory, VirtualDirectory};
use crate::params::{check_params, Params, ParamsSpec};
use crate::resources::ResourceType;
use crate::util::DirEntries;
use crate::{FsError, FsResult};

/// The mount root: one directory per discoverable kubeconfig context.
pub(crate) struct RootContext;

impl RootContext {
    pub(crate) fn new_node(params: Params) -> FsResult<Node> {
        check_params(
            &ParamsSpec {
                state: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        Ok(Node::Dir(GenericDir::new(
            Box::new(RootContext),
            String::new(),
            params,
        )))
    }
}

#[async_trait]
impl VirtualDirectory for RootContext {
    async fn entries(&self, params: &mut Params) -> FsResult<DirEntries> {
        let contexts = params.contexts.list_contexts().await?;
        Ok(DirEntries::with_directories(contexts))
    }

    async fn entry(&self, _name: &str, _params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        // Any name resolves to a context dir; an unknown context surfaces
        // its error on the first enumeration beneath it.
        Ok((RootContextObjects::new_node, FileMode::Directory))
    }
}

/// The fixed surface under one context.
pub(crate) struct RootContextObjects;

impl RootContextObjects {
    pub(crate) fn new_node(mut params: Params) -> FsResult<Node> {
        params.context_name = params.name.clone();
        check_params(
            &ParamsSpec {
                context_name: true,
                state: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        let base_path = params.context_name.clone();
        Ok(Node::Dir(GenericDir::new(
            Box::new(RootContextObjects),
            base_path,
            params,
        )))
    }
}

#[async_trait]
impl VirtualDirectory for RootContextObjects {
    async fn entries(&self, _params: &mut Params) -> FsResult<DirEntries> {
        Ok(DirEntries::with_directories(["resources"]))
    }

    async fn entry(&self, name: &str, _params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        match name {
            "resources" => Ok((ResourceType::new_node, FileMode::Directory)),
            // "config" is reserved for exposing kubeconfig content; not
            // implemented.
            _ => Err(FsError::DoesNotExist),
        }
    }
}
