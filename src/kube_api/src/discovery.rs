use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResourceList;
use kube::Client;
use log::warn;

use crate::{ApiResourceGroup, DiscoveredResource, KubeError, KubeResult};

/// Core group/version. The only accepted shape for the core API surface.
const CORE_GROUP_VERSION: &str = "v1";

fn convert(list: APIResourceList) -> ApiResourceGroup {
    let resources = list
        .resources
        .into_iter()
        // Subresources (`pods/log`, `deployments/scale`, ...) are not
        // addressable objects; the tree only exposes top-level resources.
        .filter(|r| !r.name.contains('/'))
        .map(|r| DiscoveredResource {
            name: r.name,
            short_names: r.short_names.unwrap_or_default(),
            namespaced: r.namespaced,
        })
        .collect();
    ApiResourceGroup {
        group_version: list.group_version,
        resources,
    }
}

/// Walk the server's discovery endpoints: the core `v1` resources plus the
/// preferred version of every named group. A group whose resource list
/// cannot be fetched (e.g. an orphaned APIService) is skipped with a
/// warning and the partial result is still returned.
pub(crate) async fn api_resources(client: &Client) -> KubeResult<Vec<ApiResourceGroup>> {
    let mut groups = Vec::new();

    let core = client
        .list_core_api_resources(CORE_GROUP_VERSION)
        .await
        .map_err(|e| KubeError::from_kube(e, "failed to list core api resources"))?;
    groups.push(convert(core));

    let named = client
        .list_api_groups()
        .await
        .map_err(|e| KubeError::from_kube(e, "failed to list api groups"))?;
    for group in named.groups {
        let version = group
            .preferred_version
            .or_else(|| group.versions.first().cloned());
        let Some(version) = version else {
            warn!("api group {} reports no versions, skipping", group.name);
            continue;
        };
        match client.list_api_group_resources(&version.group_version).await {
            Ok(list) => groups.push(convert(list)),
            Err(err) => {
                warn!(
                    "failed to list resources of group {}: {}, skipping",
                    version.group_version, err
                );
            }
        }
    }
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::APIResource;

    fn resource(name: &str, namespaced: bool) -> APIResource {
        APIResource {
            name: name.to_string(),
            namespaced,
            kind: String::new(),
            singular_name: String::new(),
            verbs: Vec::new(),
            ..APIResource::default()
        }
    }

    #[test]
    fn convert_drops_subresources() {
        let list = APIResourceList {
            group_version: "v1".to_string(),
            resources: vec![
                resource("pods", true),
                resource("pods/log", true),
                resource("nodes", false),
            ],
        };
        let group = convert(list);
        let names: Vec<&str> = group.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["pods", "nodes"]);
        assert!(group.resources[0].namespaced);
        assert!(!group.resources[1].namespaced);
    }
}
