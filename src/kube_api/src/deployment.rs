use k8s_openapi::api::apps::v1::Deployment;
use kube::api::Api;
use kube::Client;

use crate::{KubeError, KubeResult};

pub(crate) async fn get_deployment(
    client: &Client,
    namespace: &str,
    name: &str,
) -> KubeResult<Deployment> {
    let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    api.get(name).await.map_err(|e| {
        KubeError::from_kube(e, &format!("failed to get deployment {}/{}", namespace, name))
    })
}

pub(crate) async fn get_deployment_definition(
    client: &Client,
    namespace: &str,
    name: &str,
) -> KubeResult<Vec<u8>> {
    let deployment = get_deployment(client, namespace, name).await?;
    serde_json::to_vec_pretty(&deployment).map_err(|e| {
        KubeError::Decode(format!("failed to render deployment {} as json: {}", name, e))
    })
}
