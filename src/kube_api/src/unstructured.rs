use http::header::{ACCEPT, CONTENT_TYPE};
use http::Request;
use kube::Client;
use serde::Deserialize;

use crate::{DynamicObject, GroupVersionResource, KubeError, KubeResult};

/// Accept header selecting the server-side Table rendering of a list.
const TABLE_ACCEPT: &str = "application/json;as=Table;v=v1;g=meta.k8s.io";

/// Query string requesting strict server-side field validation on updates.
const STRICT_FIELD_VALIDATION: &str = "fieldValidation=Strict";

/// Path of a resource collection. The core group (`v1`) lives under `api`,
/// every named group under `apis`.
pub(crate) fn list_path(group_version: &str, resource: &str, namespace: Option<&str>) -> String {
    let prefix = if group_version == "v1" { "api" } else { "apis" };
    match namespace {
        Some(ns) => format!("/{}/{}/namespaces/{}/{}", prefix, group_version, ns, resource),
        None => format!("/{}/{}/{}", prefix, group_version, resource),
    }
}

pub(crate) fn object_path(
    gvr: &GroupVersionResource,
    namespace: Option<&str>,
    name: &str,
) -> String {
    format!(
        "{}/{}",
        list_path(&gvr.group_version(), &gvr.resource, namespace),
        name
    )
}

pub(crate) fn update_path(
    gvr: &GroupVersionResource,
    namespace: Option<&str>,
    name: &str,
) -> String {
    format!("{}?{}", object_path(gvr, namespace, name), STRICT_FIELD_VALIDATION)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Table {
    #[serde(default)]
    column_definitions: Vec<TableColumn>,
    #[serde(default)]
    rows: Vec<TableRow>,
}

#[derive(Deserialize)]
struct TableColumn {
    name: String,
}

#[derive(Deserialize)]
struct TableRow {
    #[serde(default)]
    cells: Vec<serde_json::Value>,
}

fn name_column_index(columns: &[TableColumn]) -> KubeResult<usize> {
    columns
        .iter()
        .position(|col| col.name == "Name")
        .ok_or_else(|| KubeError::Decode("table response has no 'Name' column".to_string()))
}

fn parse_table_names(body: &str) -> KubeResult<Vec<String>> {
    let table: Table = serde_json::from_str(body)
        .map_err(|e| KubeError::Decode(format!("failed to parse table response: {}", e)))?;
    let name_idx = name_column_index(&table.column_definitions)?;
    let mut names = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        match row.cells.get(name_idx) {
            Some(serde_json::Value::String(name)) => names.push(name.clone()),
            other => {
                return Err(KubeError::Decode(format!(
                    "table 'Name' cell was not a string: {:?}",
                    other
                )))
            }
        }
    }
    Ok(names)
}

pub(crate) async fn list_resource_names(
    client: &Client,
    group_version: &str,
    resource: &str,
    namespace: Option<&str>,
) -> KubeResult<Vec<String>> {
    let path = list_path(group_version, resource, namespace);
    let request = Request::get(path.as_str())
        .header(ACCEPT, TABLE_ACCEPT)
        .body(Vec::new())
        .map_err(|e| KubeError::Internal(format!("failed to build request for {}: {}", path, e)))?;
    let body = client
        .request_text(request)
        .await
        .map_err(|e| KubeError::from_kube(e, &format!("failed to list {}", path)))?;
    parse_table_names(&body)
}

pub(crate) async fn get_unstructured_raw(
    client: &Client,
    name: &str,
    namespace: Option<&str>,
    gvr: &GroupVersionResource,
) -> KubeResult<DynamicObject> {
    let path = object_path(gvr, namespace, name);
    let request = Request::get(path.as_str())
        .body(Vec::new())
        .map_err(|e| KubeError::Internal(format!("failed to build request for {}: {}", path, e)))?;
    client
        .request::<DynamicObject>(request)
        .await
        .map_err(|e| KubeError::from_kube(e, &format!("failed to get {}", path)))
}

pub(crate) async fn get_unstructured(
    client: &Client,
    name: &str,
    gvr: &GroupVersionResource,
    namespace: Option<&str>,
) -> KubeResult<Vec<u8>> {
    let obj = get_unstructured_raw(client, name, namespace, gvr).await?;
    serde_json::to_vec_pretty(&obj)
        .map_err(|e| KubeError::Decode(format!("failed to render {} as json: {}", name, e)))
}

pub(crate) async fn write_unstructured(
    client: &Client,
    name: &str,
    namespace: Option<&str>,
    gvr: &GroupVersionResource,
    obj: &DynamicObject,
) -> KubeResult<DynamicObject> {
    let path = update_path(gvr, namespace, name);
    let body = serde_json::to_vec(obj)
        .map_err(|e| KubeError::Decode(format!("failed to encode {}: {}", name, e)))?;
    let request = Request::put(path.as_str())
        .header(CONTENT_TYPE, "application/json")
        .body(body)
        .map_err(|e| KubeError::Internal(format!("failed to build request for {}: {}", path, e)))?;
    client
        .request::<DynamicObject>(request)
        .await
        .map_err(|e| KubeError::from_kube(e, &format!("failed to update {}", path)))
}
