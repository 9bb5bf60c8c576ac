mod client;
mod deployment;
mod discovery;
mod exec;
mod namespace;
mod pod;
mod unstructured;

pub use client::{KubeCluster, KubeContextSource};

pub use kube::core::{DynamicObject, ObjectMeta, TypeMeta};

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KubeError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("kubeconfig error: {0}")]
    Config(String),
    #[error("remote error: {0}")]
    Remote(String),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("exec refused: {0}")]
    ExecRefused(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl KubeError {
    /// The one sentinel callers are expected to match on. Everything else
    /// is an opaque message.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KubeError::NotFound(_))
    }

    pub(crate) fn from_kube(err: kube::Error, what: &str) -> Self {
        match err {
            kube::Error::Api(resp) if resp.code == 404 => {
                KubeError::NotFound(format!("{}: {}", what, resp.message))
            }
            other => KubeError::Remote(format!("{}: {}", what, other)),
        }
    }
}

pub type KubeResult<T> = std::result::Result<T, KubeError>;

/// Group/version/resource triple identifying an API resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupVersionResource {
    pub group: String,
    pub version: String,
    pub resource: String,
}

impl GroupVersionResource {
    pub fn new(group: &str, version: &str, resource: &str) -> Self {
        Self {
            group: group.to_string(),
            version: version.to_string(),
            resource: resource.to_string(),
        }
    }

    /// The joined group/version string, `v1` for the core group.
    pub fn group_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl std::fmt::Display for GroupVersionResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group_version(), self.resource)
    }
}

/// One discovered API resource within a group/version.
#[derive(Debug, Clone)]
pub struct DiscoveredResource {
    pub name: String,
    pub short_names: Vec<String>,
    pub namespaced: bool,
}

/// The resources served under a single group/version, as reported by the
/// server's discovery endpoints.
#[derive(Debug, Clone)]
pub struct ApiResourceGroup {
    pub group_version: String,
    pub resources: Vec<DiscoveredResource>,
}

/// Source of kubeconfig contexts and per-context cluster connections.
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn list_contexts(&self) -> KubeResult<Vec<String>>;

    async fn connect(&self, context_name: &str) -> KubeResult<Arc<dyn ClusterApi>>;
}

/// Thin operations against a single cluster. Implemented over kube-rs for
/// real clusters and by mocks in engine tests.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    fn context_name(&self) -> &str;

    async fn list_namespaces(&self) -> KubeResult<Vec<String>>;

    async fn list_pods(&self, namespace: &str) -> KubeResult<Vec<String>>;

    async fn get_containers(&self, namespace: &str, pod: &str) -> KubeResult<Vec<String>>;

    async fn get_pod_definition(&self, namespace: &str, name: &str) -> KubeResult<Vec<u8>>;

    async fn get_deployment_definition(&self, namespace: &str, name: &str) -> KubeResult<Vec<u8>>;

    /// List the object names of one resource via the server-side Table
    /// representation. `namespace` is `None` for cluster-scoped resources.
    async fn list_resource_names(
        &self,
        group_version: &str,
        resource: &str,
        namespace: Option<&str>,
    ) -> KubeResult<Vec<String>>;

    /// Fetch one object through the dynamic API, pretty-printed as JSON.
    async fn get_unstructured(
        &self,
        name: &str,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
    ) -> KubeResult<Vec<u8>>;

    async fn get_unstructured_raw(
        &self,
        name: &str,
        namespace: Option<&str>,
        gvr: &GroupVersionResource,
    ) -> KubeResult<DynamicObject>;

    /// Replace one object through the dynamic API with strict server-side
    /// field validation.
    async fn write_unstructured(
        &self,
        name: &str,
        namespace: Option<&str>,
        gvr: &GroupVersionResource,
        obj: &DynamicObject,
    ) -> KubeResult<DynamicObject>;

    async fn get_logs(
        &self,
        pod: &str,
        container: &str,
        namespace: &str,
        previous: bool,
    ) -> KubeResult<Vec<u8>>;

    /// Run a command in a container, stdin disabled, returning the captured
    /// (stdout, stderr). Refused before any cluster contact when the
    /// context is not on the exec allow-list.
    async fn exec_command(
        &self,
        pod: &str,
        container: &str,
        namespace: &str,
        cmd: &[String],
    ) -> KubeResult<(Vec<u8>, Vec<u8>)>;

    /// Enumerate the server's API surface: the core `v1` group plus the
    /// preferred version of every named group.
    async fn api_resources(&self) -> KubeResult<Vec<ApiResourceGroup>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_the_only_sentinel() {
        assert!(KubeError::NotFound("pod x".into()).is_not_found());
        assert!(!KubeError::Remote("boom".into()).is_not_found());
        assert!(!KubeError::ExecRefused("ctx".into()).is_not_found());
    }

    #[test]
    fn gvr_group_version_joins_non_core_groups() {
        let core = GroupVersionResource::new("", "v1", "pods");
        assert_eq!(core.group_version(), "v1");
        let apps = GroupVersionResource::new("apps", "v1", "deployments");
        assert_eq!(apps.group_version(), "apps/v1");
        assert_eq!(apps.to_string(), "apps/v1/deployments");
    }
}
