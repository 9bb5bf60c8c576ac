use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, AttachParams};
use kube::Client;
use log::{debug, warn};
use tokio::io::AsyncReadExt;

use crate::{KubeError, KubeResult};

/// Run `cmd` in a container. Exec is a write path into the cluster, so it
/// is gated on an explicit per-context allow-list checked before any
/// cluster contact; an empty list disables exec entirely.
pub(crate) async fn exec_command(
    client: &Client,
    context_name: &str,
    allow: &[String],
    pod_name: &str,
    container: &str,
    namespace: &str,
    cmd: &[String],
) -> KubeResult<(Vec<u8>, Vec<u8>)> {
    if !allow.iter().any(|c| c == context_name) {
        warn!(
            "refusing exec on context {} (not on the allow-list)",
            context_name
        );
        return Err(KubeError::ExecRefused(format!(
            "context {} is not on the exec allow-list",
            context_name
        )));
    }
    if cmd.is_empty() {
        return Err(KubeError::Internal("exec called with an empty command".to_string()));
    }
    debug!(
        "exec {:?} in {}/{}/{} on context {}",
        cmd, namespace, pod_name, container, context_name
    );

    let api: Api<Pod> = Api::namespaced(client.clone(), namespace);
    let params = AttachParams::default()
        .container(container)
        .stdin(false)
        .stdout(true)
        .stderr(true);
    let mut attached = api
        .exec(pod_name, cmd.to_vec(), &params)
        .await
        .map_err(|e| {
            KubeError::from_kube(
                e,
                &format!("failed to exec in {}/{}/{}", namespace, pod_name, container),
            )
        })?;

    let stdout_stream = attached.stdout();
    let stderr_stream = attached.stderr();
    let drain_stdout = async {
        let mut buf = Vec::new();
        if let Some(mut stream) = stdout_stream {
            stream
                .read_to_end(&mut buf)
                .await
                .map_err(|e| KubeError::Remote(format!("failed to read exec stdout: {}", e)))?;
        }
        Ok::<_, KubeError>(buf)
    };
    let drain_stderr = async {
        let mut buf = Vec::new();
        if let Some(mut stream) = stderr_stream {
            stream
                .read_to_end(&mut buf)
                .await
                .map_err(|e| KubeError::Remote(format!("failed to read exec stderr: {}", e)))?;
        }
        Ok::<_, KubeError>(buf)
    };
    let (stdout, stderr) = futures::try_join!(drain_stdout, drain_stderr)?;

    if let Err(err) = attached.join().await {
        warn!("exec join failed: {}", err);
    }
    Ok((stdout, stderr))
}
