use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use kube_api::{
    ApiResourceGroup, ClusterApi, ContextSource, DiscoveredResource, DynamicObject,
    GroupVersionResource, KubeError, KubeResult, ObjectMeta, TypeMeta,
};

use crate::params::Params;
use crate::state::StateStore;

pub(crate) fn configmap_object(name: &str) -> DynamicObject {
    DynamicObject {
        types: Some(TypeMeta {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
        }),
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..ObjectMeta::default()
        },
        data: serde_json::json!({ "data": { "key": "value" } }),
    }
}

fn resource(name: &str, namespaced: bool) -> DiscoveredResource {
    DiscoveredResource {
        name: name.to_string(),
        short_names: Vec::new(),
        namespaced,
    }
}

/// The discovery surface most tests run against: a small core group plus
/// two named groups.
pub(crate) fn standard_groups() -> Vec<ApiResourceGroup> {
    vec![
        ApiResourceGroup {
            group_version: "v1".to_string(),
            resources: vec![
                resource("pods", true),
                resource("configmaps", true),
                resource("namespaces", false),
                resource("nodes", false),
            ],
        },
        ApiResourceGroup {
            group_version: "apps/v1".to_string(),
            resources: vec![resource("deployments", true)],
        },
        ApiResourceGroup {
            group_version: "rbac.authorization.k8s.io/v1".to_string(),
            resources: vec![resource("clusterroles", false)],
        },
    ]
}

#[derive(Default)]
pub(crate) struct MockCluster {
    pub namespaces: Vec<String>,
    pub namespaces_error: Option<String>,
    pub pods: HashMap<String, Vec<String>>,
    pub containers: HashMap<(String, String), Vec<String>>,
    pub pod_definitions: HashMap<(String, String), Vec<u8>>,
    pub resource_names: HashMap<String, Vec<String>>,
    pub list_error: Option<String>,
    pub objects: HashMap<(String, String), DynamicObject>,
    pub update_error: Option<String>,
    pub logs: HashMap<(String, String), Vec<u8>>,
    pub previous_logs: HashMap<(String, String), Vec<u8>>,
    pub exec_result: (Vec<u8>, Vec<u8>),
    pub exec_error: Option<String>,
    pub groups: Vec<ApiResourceGroup>,

    discovery_calls: AtomicUsize,
    list_calls: Mutex<Vec<(String, String, Option<String>)>>,
    update_calls: Mutex<Vec<(String, DynamicObject)>>,
    exec_calls: Mutex<Vec<Vec<String>>>,
}

impl MockCluster {
    pub(crate) fn with_groups(mut self, groups: Vec<ApiResourceGroup>) -> Self {
        self.groups = groups;
        self
    }

    pub(crate) fn with_namespaces(mut self, namespaces: &[&str]) -> Self {
        self.namespaces = namespaces.iter().map(|ns| ns.to_string()).collect();
        self
    }

    pub(crate) fn with_resource_names(mut self, resource: &str, names: &[&str]) -> Self {
        self.resource_names.insert(
            resource.to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub(crate) fn with_containers(mut self, namespace: &str, pod: &str, names: &[&str]) -> Self {
        self.containers.insert(
            (namespace.to_string(), pod.to_string()),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub(crate) fn with_pod_definition(mut self, namespace: &str, pod: &str, def: &[u8]) -> Self {
        self.pod_definitions
            .insert((namespace.to_string(), pod.to_string()), def.to_vec());
        self
    }

    pub(crate) fn with_logs(mut self, pod: &str, container: &str, logs: &[u8]) -> Self {
        self.logs
            .insert((pod.to_string(), container.to_string()), logs.to_vec());
        self
    }

    pub(crate) fn with_previous_logs(mut self, pod: &str, container: &str, logs: &[u8]) -> Self {
        self.previous_logs
            .insert((pod.to_string(), container.to_string()), logs.to_vec());
        self
    }

    pub(crate) fn with_object(mut self, resource: &str, name: &str, obj: DynamicObject) -> Self {
        self.objects
            .insert((resource.to_string(), name.to_string()), obj);
        self
    }

    pub(crate) fn with_exec_result(mut self, stdout: &[u8], stderr: &[u8]) -> Self {
        self.exec_result = (stdout.to_vec(), stderr.to_vec());
        self
    }

    pub(crate) fn with_exec_error(mut self, message: &str) -> Self {
        self.exec_error = Some(message.to_string());
        self
    }

    pub(crate) fn with_update_error(mut self, message: &str) -> Self {
        self.update_error = Some(message.to_string());
        self
    }

    pub(crate) fn with_list_error(mut self, message: &str) -> Self {
        self.list_error = Some(message.to_string());
        self
    }

    pub(crate) fn discovery_calls(&self) -> usize {
        self.discovery_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn list_calls(&self) -> Vec<(String, String, Option<String>)> {
        self.list_calls.lock().expect("lock").clone()
    }

    pub(crate) fn update_calls(&self) -> Vec<(String, DynamicObject)> {
        self.update_calls.lock().expect("lock").clone()
    }

    pub(crate) fn exec_calls(&self) -> Vec<Vec<String>> {
        self.exec_calls.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ClusterApi for MockCluster {
    fn context_name(&self) -> &str {
        "alpha"
    }

    async fn list_namespaces(&self) -> KubeResult<Vec<String>> {
        if let Some(message) = &self.namespaces_error {
            return Err(KubeError::Remote(message.clone()));
        }
        Ok(self.namespaces.clone())
    }

    async fn list_pods(&self, namespace: &str) -> KubeResult<Vec<String>> {
        Ok(self.pods.get(namespace).cloned().unwrap_or_default())
    }

    async fn get_containers(&self, namespace: &str, pod: &str) -> KubeResult<Vec<String>> {
        self.containers
            .get(&(namespace.to_string(), pod.to_string()))
            .cloned()
            .ok_or_else(|| KubeError::NotFound(format!("pod {}/{}", namespace, pod)))
    }

    async fn get_pod_definition(&self, namespace: &str, name: &str) -> KubeResult<Vec<u8>> {
        self.pod_definitions
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| KubeError::NotFound(format!("pod {}/{}", namespace, name)))
    }

    async fn get_deployment_definition(&self, namespace: &str, name: &str) -> KubeResult<Vec<u8>> {
        Err(KubeError::NotFound(format!(
            "deployment {}/{}",
            namespace, name
        )))
    }

    async fn list_resource_names(
        &self,
        group_version: &str,
        resource: &str,
        namespace: Option<&str>,
    ) -> KubeResult<Vec<String>> {
        self.list_calls.lock().expect("lock").push((
            group_version.to_string(),
            resource.to_string(),
            namespace.map(|ns| ns.to_string()),
        ));
        if let Some(message) = &self.list_error {
            return Err(KubeError::Remote(message.clone()));
        }
        Ok(self.resource_names.get(resource).cloned().unwrap_or_default())
    }

    async fn get_unstructured(
        &self,
        name: &str,
        gvr: &GroupVersionResource,
        namespace: Option<&str>,
    ) -> KubeResult<Vec<u8>> {
        let obj = self.get_unstructured_raw(name, namespace, gvr).await?;
        serde_json::to_vec_pretty(&obj)
            .map_err(|e| KubeError::Decode(format!("failed to render {}: {}", name, e)))
    }

    async fn get_unstructured_raw(
        &self,
        name: &str,
        _namespace: Option<&str>,
        gvr: &GroupVersionResource,
    ) -> KubeResult<DynamicObject> {
        self.objects
            .get(&(gvr.resource.clone(), name.to_string()))
            .cloned()
            .ok_or_else(|| KubeError::NotFound(format!("{} {}", gvr.resource, name)))
    }

    async fn write_unstructured(
        &self,
        name: &str,
        _namespace: Option<&str>,
        _gvr: &GroupVersionResource,
        obj: &DynamicObject,
    ) -> KubeResult<DynamicObject> {
        if let Some(message) = &self.update_error {
            return Err(KubeError::Remote(message.clone()));
        }
        self.update_calls
            .lock()
            .expect("lock")
            .push((name.to_string(), obj.clone()));
        Ok(obj.clone())
    }

    async fn get_logs(
        &self,
        pod: &str,
        container: &str,
        _namespace: &str,
        previous: bool,
    ) -> KubeResult<Vec<u8>> {
        let source = if previous { &self.previous_logs } else { &self.logs };
        source
            .get(&(pod.to_string(), container.to_string()))
            .cloned()
            .ok_or_else(|| KubeError::NotFound(format!("logs for {}/{}", pod, container)))
    }

    async fn exec_command(
        &self,
        _pod: &str,
        _container: &str,
        _namespace: &str,
        cmd: &[String],
    ) -> KubeResult<(Vec<u8>, Vec<u8>)> {
        self.exec_calls.lock().expect("lock").push(cmd.to_vec());
        if let Some(message) = &self.exec_error {
            return Err(KubeError::Remote(message.clone()));
        }
        Ok(self.exec_result.clone())
    }

    async fn api_resources(&self) -> KubeResult<Vec<ApiResourceGroup>> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.groups.clone())
    }
}

pub(crate) struct MockContextSource {
    pub contexts: Vec<String>,
    pub cluster: Arc<MockCluster>,
    connect_calls: AtomicUsize,
}

impl Default for MockContextSource {
    fn default() -> Self {
        Self::new(Arc::new(MockCluster::default()))
    }
}

impl MockContextSource {
    pub(crate) fn new(cluster: Arc<MockCluster>) -> Self {
        Self {
            contexts: vec!["alpha".to_string(), "beta".to_string()],
            cluster,
            connect_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContextSource for MockContextSource {
    async fn list_contexts(&self) -> KubeResult<Vec<String>> {
        Ok(self.contexts.clone())
    }

    async fn connect(&self, _context_name: &str) -> KubeResult<Arc<dyn ClusterApi>> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.cluster.clone())
    }
}

pub(crate) fn mock_params() -> Params {
    let contexts = Arc::new(MockContextSource::default());
    Params::new(contexts, Arc::new(StateStore::new()))
}
