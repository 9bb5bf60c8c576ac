use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, LogParams};
use kube::{Client, ResourceExt};

use crate::{KubeError, KubeResult};

pub(crate) async fn list_pods(client: &Client, namespace: &str) -> KubeResult<Vec<String>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let pods = api
        .list(&ListParams::default())
        .await
        .map_err(|e| KubeError::from_kube(e, "failed to list pods"))?;
    Ok(pods.items.iter().map(|p| p.name_any()).collect())
}

pub(crate) async fn get_pod(client: &Client, namespace: &str, name: &str) -> KubeResult<Pod> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    api.get(name)
        .await
        .map_err(|e| KubeError::from_kube(e, &format!("failed to get pod {}/{}", namespace, name)))
}

pub(crate) async fn get_containers(
    client: &Client,
    namespace: &str,
    pod_name: &str,
) -> KubeResult<Vec<String>> {
    let pod = get_pod(client, namespace, pod_name).await?;
    let spec = pod.spec.ok_or_else(|| {
        KubeError::Decode(format!("pod {}/{} has no spec", namespace, pod_name))
    })?;
    Ok(spec.containers.into_iter().map(|c| c.name).collect())
}

pub(crate) async fn get_pod_definition(
    client: &Client,
    namespace: &str,
    name: &str,
) -> KubeResult<Vec<u8>> {
    let pod = get_pod(client, namespace, name).await?;
    serde_json::to_vec_pretty(&pod)
        .map_err(|e| KubeError::Decode(format!("failed to render pod {} as json: {}", name, e)))
}

pub(crate) async fn get_logs(
    client: &Client,
    pod_name: &str,
    container: &str,
    namespace: &str,
    previous: bool,
) -> KubeResult<Vec<u8>> {
    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let params = LogParams {
        container: Some(container.to_string()),
        previous,
        ..LogParams::default()
    };
    let logs = api.logs(pod_name, &params).await.map_err(|e| {
        KubeError::from_kube(
            e,
            &format!("failed to get logs for {}/{}", pod_name, container),
        )
    })?;
    Ok(logs.into_bytes())
}
