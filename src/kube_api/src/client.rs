use async_trait::async_trait;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    deployment, discovery, exec, namespace, pod, unstructured, ApiResourceGroup, ClusterApi,
    ContextSource, DynamicObject, GroupVersionResource, KubeError, KubeResult,
};

/// Request timeout applied to every per-context client.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Discovers contexts from the kubeconfig and builds per-context clients.
pub struct KubeContextSource {
    kubeconfig_path: Option<PathBuf>,
    exec_allow: Arc<Vec<String>>,
}

impl KubeContextSource {
    /// `kubeconfig_path` of `None` uses the client library's default
    /// resolution (the `KUBECONFIG` env var, then `~/.kube/config`).
    /// `exec_allow` lists the contexts allowed to run exec; empty means
    /// exec is disabled everywhere.
    pub fn new(kubeconfig_path: Option<PathBuf>, exec_allow: Vec<String>) -> Self {
        Self {
            kubeconfig_path,
            exec_allow: Arc::new(exec_allow),
        }
    }

    fn load_kubeconfig(&self) -> KubeResult<Kubeconfig> {
        let loaded = match &self.kubeconfig_path {
            Some(path) => Kubeconfig::read_from(path),
            None => Kubeconfig::read(),
        };
        loaded.map_err(|e| KubeError::Config(format!("failed to read kubeconfig: {}", e)))
    }
}

#[async_trait]
impl ContextSource for KubeContextSource {
    async fn list_contexts(&self) -> KubeResult<Vec<String>> {
        let kubeconfig = self.load_kubeconfig()?;
        Ok(kubeconfig.contexts.into_iter().map(|c| c.name).collect())
    }

    async fn connect(&self, context_name: &str) -> KubeResult<Arc<dyn ClusterApi>> {
        let kubeconfig = self.load_kubeconfig()?;
        let options = KubeConfigOptions {
            context: Some(context_name.to_string()),
            ..KubeConfigOptions::default()
        };
        let mut config = Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| {
                KubeError::Config(format!(
                    "failed to build config for context {}: {}",
                    context_name, e
                ))
            })?;
        config.connect_timeout = Some(REQUEST_TIMEOUT);
        config.read_timeout = Some(REQUEST_TIMEOUT);

        let client = Client::try_from(config).map_err(|e| {
            KubeError::Config(format!(
                "failed to build client for context {}: {}",
                context_name, e
            ))
        })?;
        info!("built client for context {}", context_name);
        Ok(Arc::new(KubeCluster {
            context_name: context_name.to_string(),
            client,
            exec_allow: self.exec_allow.clone(),
        }))
    }
}

/// A connected cluster: one kube client scoped to one kubeconfig context.
pub struct KubeCluster {
    context_name: String,
    client: Client,
    exec_allow: Arc<Vec<String>>,
}

#[async_trait]
impl ClusterApi for KubeCluster {
    fn context_name(&self) -> &str {
        &self.context_name
    }

    async fn list_namespaces(&self) -> KubeResult<Vec<String>> {
        namespace::list_namespaces(&self.client).await
    }

    async fn list_pods(&self, namespace: &str) -> KubeResult<Vec<String>> {
        pod::list_pods(&self.client, namespace).await
    }

    async fn get_containers(&self, namespace: &str, pod_name: &str) -> KubeResult<Vec<String>> {
        pod::get_containers(&self.client, namespace, pod_name).await
    }

    async fn get_pod_definition(&self, namespace: &str, name: &str) -> KubeResult<Vec<u8>> {
        pod::get_pod_definition(&self.client, namespace, name).await
    }

    async fn get_deployment_definition(&self, namespace: &str, name: &str) -> KubeResult<Vec<u8>> {
        deployment::get_deployment_definition(&self.client, namespace, name).await
    }

    async fn list_resource_names(
        &self,
        group_version: &str,
        resource: &str,
        namespace: Option<&str>,
    ) -> KubeResult<Vec<String>> {
        debug!(
            "listing {}/{} in namespace {:?} on context {}",
            group_version, resource, namespace, self.context_name
        );
        unstructured::list_resource_names(&self.client, group_version, resource, namespace).await
    }

    async fn get_unstructured(
        &self,
        name: &str,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
    ) -> KubeResult<Vec<u8>> {
        unstructured::get_unstructured(&self.client, name, gvr, namespace).await
    }

    async fn get_unstructured_raw(
        &self,
        name: &str,
        namespace: Option<&str>,
        gvr: &GroupVersionResource,
    ) -> KubeResult<DynamicObject> {
        unstructured::get_unstructured_raw(&self.client, name, namespace, gvr).await
    }

    async fn write_unstructured(
        &self,
        name: &str,
        namespace: Option<&str>,
        gvr: &GroupVersionResource,
        obj: &DynamicObject,
    ) -> KubeResult<DynamicObject> {
        unstructured::write_unstructured(&self.client, name, namespace, gvr, obj).await
    }

    async fn get_logs(
        &self,
        pod_name: &str,
        container: &str,
        namespace: &str,
        previous: bool,
    ) -> KubeResult<Vec<u8>> {
        pod::get_logs(&self.client, pod_name, container, namespace, previous).await
    }

    async fn exec_command(
        &self,
        pod_name: &str,
        container: &str,
        namespace: &str,
        cmd: &[String],
    ) -> KubeResult<(Vec<u8>, Vec<u8>)> {
        exec::exec_command(
            &self.client,
            &self.context_name,
            &self.exec_allow,
            pod_name,
            container,
            namespace,
            cmd,
        )
        .await
    }

    async fn api_resources(&self) -> KubeResult<Vec<ApiResourceGroup>> {
        discovery::api_resources(&self.client).await
    }
}
