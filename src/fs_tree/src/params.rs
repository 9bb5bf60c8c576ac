use std::sync::Arc;
use std::time::Duration;

use kube_api::{ClusterApi, ContextSource};

use crate::resources::GroupedAPIResource;
use crate::state::StateStore;
use crate::{FsError, FsResult};

/// Default TTL of the per-context API-resource discovery cache.
pub const DEFAULT_DISCOVERY_TTL: Duration = Duration::from_secs(60);

/// The contextual bundle threaded into every node factory. Copied by value
/// down the tree; a parent mutates its copy immediately before
/// constructing a child.
#[derive(Clone)]
pub struct Params {
    pub context_name: String,
    pub group_version: Option<Arc<GroupedAPIResource>>,
    pub name: String,
    pub namespace: String,
    pub namespaced: Option<bool>,
    pub pod: String,
    /// Container name and resolved object name, populated below the
    /// container list and the per-object action dir respectively. `name`
    /// is re-pointed at each lookup, so these keep their own slots; they
    /// are not part of the validated set and factories that need them
    /// check them themselves.
    pub container: String,
    pub object_name: String,

    pub client: Option<Arc<dyn ClusterApi>>,
    pub state: Option<Arc<StateStore>>,
    pub last_error: Option<String>,

    /// Ambient handles, never validated: the context source used to build
    /// per-context clients, and the discovery cache TTL.
    pub contexts: Arc<dyn ContextSource>,
    pub discovery_ttl: Duration,
}

impl Params {
    pub fn new(contexts: Arc<dyn ContextSource>, state: Arc<StateStore>) -> Self {
        Self {
            context_name: String::new(),
            group_version: None,
            name: String::new(),
            namespace: String::new(),
            namespaced: None,
            pod: String::new(),
            container: String::new(),
            object_name: String::new(),
            client: None,
            state: None,
            last_error: None,
            contexts,
            discovery_ttl: DEFAULT_DISCOVERY_TTL,
        }
        .with_state(state)
    }

    fn with_state(mut self, state: Arc<StateStore>) -> Self {
        self.state = Some(state);
        self
    }

    /// Stringified identity of this set of params, for log lines.
    pub fn identifier(&self) -> String {
        let gvr = self
            .group_version
            .as_ref()
            .map(|gv| gv.gvr().to_string())
            .unwrap_or_default();
        format!(
            "{}/{}/{}/{}/{}",
            self.context_name, gvr, self.namespace, self.pod, self.name
        )
    }

    pub fn state(&self) -> FsResult<Arc<StateStore>> {
        self.state
            .clone()
            .ok_or_else(|| FsError::ParamsMissing(vec!["state".to_string()]))
    }
}

/// Declares which params fields a constructor requires to be non-empty.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParamsSpec {
    pub context_name: bool,
    pub group_version: bool,
    pub name: bool,
    pub namespace: bool,
    pub pod: bool,
    pub client: bool,
    pub state: bool,
    pub namespaced: bool,
    pub last_error: bool,
}

/// Collects every missing required field and reports them in one composite
/// error, replacing repeated nil-checks in constructors.
pub fn check_params(spec: &ParamsSpec, params: &Params) -> FsResult<()> {
    let mut missing = Vec::new();

    if spec.context_name && params.context_name.is_empty() {
        missing.push("context_name".to_string());
    }
    if spec.group_version && params.group_version.is_none() {
        missing.push("group_version".to_string());
    }
    if spec.name && params.name.is_empty() {
        missing.push("name".to_string());
    }
    if spec.namespace && params.namespace.is_empty() {
        missing.push("namespace".to_string());
    }
    if spec.pod && params.pod.is_empty() {
        missing.push("pod".to_string());
    }
    if spec.client && params.client.is_none() {
        missing.push("client".to_string());
    }
    if spec.state && params.state.is_none() {
        missing.push("state".to_string());
    }
    if spec.namespaced && params.namespaced.is_none() {
        missing.push("namespaced".to_string());
    }
    if spec.last_error && params.last_error.is_none() {
        missing.push("last_error".to_string());
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(FsError::ParamsMissing(missing))
    }
}

/// Build (and memoize into the params) the per-context client.
pub async fn ensure_client(params: &mut Params) -> FsResult<Arc<dyn ClusterApi>> {
    if let Some(client) = &params.client {
        return Ok(client.clone());
    }
    if params.context_name.is_empty() {
        return Err(FsError::ParamsMissing(vec!["context_name".to_string()]));
    }
    let client = params.contexts.connect(&params.context_name).await?;
    params.client = Some(client.clone());
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{mock_params, MockContextSource};

    fn empty_params() -> Params {
        let contexts = Arc::new(MockContextSource::default());
        let mut params = Params::new(contexts, Arc::new(StateStore::new()));
        params.state = None;
        params
    }

    #[test]
    fn accepts_zero_values() {
        check_params(&ParamsSpec::default(), &empty_params()).expect("empty spec");
    }

    #[test]
    fn reports_a_single_missing_value() {
        let spec = ParamsSpec {
            context_name: true,
            ..ParamsSpec::default()
        };
        let err = check_params(&spec, &empty_params()).expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "params was missing required values [context_name]"
        );
    }

    #[test]
    fn reports_multiple_missing_values_in_field_order() {
        let spec = ParamsSpec {
            context_name: true,
            namespaced: true,
            pod: true,
            ..ParamsSpec::default()
        };
        let mut params = empty_params();
        params.pod = "some-pod".to_string();
        let err = check_params(&spec, &params).expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "params was missing required values [context_name, namespaced]"
        );
    }

    #[test]
    fn full_field_order_is_fixed() {
        let spec = ParamsSpec {
            context_name: true,
            group_version: true,
            name: true,
            namespace: true,
            pod: true,
            client: true,
            state: true,
            namespaced: true,
            last_error: true,
        };
        let err = check_params(&spec, &empty_params()).expect_err("must fail");
        assert_eq!(
            err.to_string(),
            "params was missing required values [context_name, group_version, name, namespace, \
             pod, client, state, namespaced, last_error]"
        );
    }

    #[test]
    fn identifier_renders_the_params_identity() {
        let mut params = mock_params();
        params.context_name = "alpha".to_string();
        params.namespace = "default".to_string();
        params.pod = "pod-1".to_string();
        params.name = "logs".to_string();
        assert_eq!(params.identifier(), "alpha//default/pod-1/logs");

        params.group_version = Some(Arc::new(crate::resources::GroupedAPIResource {
            group: "apps".to_string(),
            version: "v1".to_string(),
            resource_name: "deployments".to_string(),
            short_names: Vec::new(),
            namespaced: true,
        }));
        assert_eq!(
            params.identifier(),
            "alpha/apps/v1/deployments/default/pod-1/logs"
        );
    }

    #[test]
    fn populated_fields_pass() {
        let params = mock_params();
        let spec = ParamsSpec {
            state: true,
            ..ParamsSpec::default()
        };
        check_params(&spec, &params).expect("state is set");
    }
}
