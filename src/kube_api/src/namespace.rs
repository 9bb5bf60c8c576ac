use k8s_openapi::api::core::v1::Namespace;
use kube::api::{Api, ListParams};
use kube::{Client, ResourceExt};

use crate::{KubeError, KubeResult};

pub(crate) async fn list_namespaces(client: &Client) -> KubeResult<Vec<String>> {
    let api: Api<Namespace> = Api::all(client.clone());
    let namespaces = api
        .list(&ListParams::default())
        .await
        .map_err(|e| KubeError::from_kube(e, "failed to list namespaces"))?;
    Ok(namespaces.items.iter().map(|ns| ns.name_any()).collect())
}
