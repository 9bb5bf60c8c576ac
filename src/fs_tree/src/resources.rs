use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

use kube_api::GroupVersionResource;

use crate::api_resource::APIResourceNode;
use crate::generic::{FileMode, GenericDir, Node, NodeFactory, VirtualDirectory};
use crate::namespace::NamespacedResource;
use crate::params::{check_params, ensure_client, Params, ParamsSpec};
use crate::state::StateValue;
use crate::util::DirEntries;
use crate::{FsError, FsResult};

/// Denormalization of one discovered API resource and its group/version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedAPIResource {
    pub group: String,
    pub version: String,
    pub resource_name: String,
    pub short_names: Vec<String>,
    pub namespaced: bool,
}

impl GroupedAPIResource {
    /// The joined group/version string, bare `v1` for the core group.
    pub fn group_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// The user-visible name: `resource` for the core group, else
    /// `resource.group`, mirroring kubectl's fully-qualified names.
    pub fn cli_name(&self) -> String {
        if self.group.is_empty() {
            self.resource_name.clone()
        } else {
            format!("{}.{}", self.resource_name, self.group)
        }
    }

    pub fn gvr(&self) -> GroupVersionResource {
        GroupVersionResource::new(&self.group, &self.version, &self.resource_name)
    }
}

/// Discovered resources of one context, indexed by CLI name.
pub type ApiResources = HashMap<String, Arc<GroupedAPIResource>>;

/// Split a joined group/version string. `v1` is the core group; every
/// other accepted shape contains exactly one `/`.
pub fn split_group_version(group_version: &str) -> FsResult<(String, String)> {
    if group_version == "v1" {
        return Ok((String::new(), "v1".to_string()));
    }
    let parts: Vec<&str> = group_version.split('/').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(FsError::InvalidGroupVersion(group_version.to_string()));
    }
    Ok((parts[0].to_string(), parts[1].to_string()))
}

/// Enumerate the API surface of a context, cached in the state store under
/// `<context>/api-resources` for the discovery TTL.
pub(crate) async fn ensure_api_resources(params: &mut Params) -> FsResult<Arc<ApiResources>> {
    check_params(
        &ParamsSpec {
            context_name: true,
            state: true,
            ..ParamsSpec::default()
        },
        params,
    )?;
    let state = params.state()?;
    let key = format!("{}/api-resources", params.context_name);
    if let Some(cached) = state.get_api_resources(&key) {
        debug!("using cached api-resources for {}", params.context_name);
        return Ok(cached);
    }

    let client = ensure_client(params).await?;
    let groups = client.api_resources().await?;

    let mut resources: ApiResources = HashMap::new();
    for group in groups {
        let (group_name, version) = split_group_version(&group.group_version)?;
        for resource in group.resources {
            let grouped = GroupedAPIResource {
                group: group_name.clone(),
                version: version.clone(),
                resource_name: resource.name,
                short_names: resource.short_names,
                namespaced: resource.namespaced,
            };
            let cli_name = grouped.cli_name();
            if let Some(existing) = resources.get(&cli_name) {
                // Two resources mapping onto one CLI name means the server's
                // API surface is misconfigured; serving either would be
                // silently wrong.
                panic!(
                    "api resource collision between {}/{} and {}/{}",
                    grouped.group_version(),
                    grouped.resource_name,
                    existing.group_version(),
                    existing.resource_name,
                );
            }
            resources.insert(cli_name, Arc::new(grouped));
        }
    }

    let resources = Arc::new(resources);
    state.put_ttl(
        &key,
        StateValue::ApiResources(resources.clone()),
        params.discovery_ttl,
    );
    Ok(resources)
}

/// Splits the resource tree into its two scopes: `namespaced` and
/// `cluster`.
pub(crate) struct ResourceType;

impl ResourceType {
    pub(crate) fn new_node(params: Params) -> FsResult<Node> {
        check_params(
            &ParamsSpec {
                context_name: true,
                state: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        let base_path = format!("{}/resources", params.context_name);
        Ok(Node::Dir(GenericDir::new(
            Box::new(ResourceType),
            base_path,
            params,
        )))
    }
}

#[async_trait]
impl VirtualDirectory for ResourceType {
    async fn entries(&self, _params: &mut Params) -> FsResult<DirEntries> {
        Ok(DirEntries::with_directories(["namespaced", "cluster"]))
    }

    async fn entry(&self, name: &str, params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        match name {
            "namespaced" => params.namespaced = Some(true),
            "cluster" => params.namespaced = Some(false),
            _ => return Err(FsError::DoesNotExist),
        }
        Ok((RootResources::new_node, FileMode::Directory))
    }
}

/// All API resources of one scope within a context.
pub(crate) struct RootResources;

impl RootResources {
    pub(crate) fn new_node(params: Params) -> FsResult<Node> {
        check_params(
            &ParamsSpec {
                context_name: true,
                state: true,
                namespaced: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        let base_path = format!("{}/resources", params.context_name);
        Ok(Node::Dir(GenericDir::new(
            Box::new(RootResources),
            base_path,
            params,
        )))
    }
}

#[async_trait]
impl VirtualDirectory for RootResources {
    async fn entries(&self, params: &mut Params) -> FsResult<DirEntries> {
        let want_namespaced = params
            .namespaced
            .ok_or_else(|| FsError::ParamsMissing(vec!["namespaced".to_string()]))?;
        let resources = ensure_api_resources(params).await?;
        let mut names: Vec<String> = resources
            .values()
            .filter(|res| res.namespaced == want_namespaced)
            .map(|res| res.cli_name())
            .collect();
        names.sort();
        Ok(DirEntries::with_directories(names))
    }

    async fn entry(&self, name: &str, params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        let resources = ensure_api_resources(params).await?;
        let resource = resources.get(name).ok_or(FsError::DoesNotExist)?;
        params.group_version = Some(resource.clone());
        if resource.namespaced {
            Ok((NamespacedResource::new_node, FileMode::Directory))
        } else {
            Ok((APIResourceNode::new_node, FileMode::Directory))
        }
    }
}
