use async_trait::async_trait;
use log::{debug, warn};
use std::sync::Arc;
use tokio::sync::Mutex;

use kube_api::ClusterApi;

use crate::bytes_file::{slice_content, FileHandle};
use crate::generic::{
    FileMode, GenericDir, GenericFile, Node, NodeFactory, VirtualDirectory, VirtualFile,
};
use crate::params::{check_params, ensure_client, Params, ParamsSpec};
use crate::pod::pod_base_path;
use crate::state::StateValue;
use crate::util::{join_path, DirEntries};
use crate::{FsError, FsResult};

/// Lists the containers of one pod.
pub(crate) struct RootContainer;

impl RootContainer {
    pub(crate) fn new_node(params: Params) -> FsResult<Node> {
        check_params(
            &ParamsSpec {
                context_name: true,
                namespace: true,
                pod: true,
                state: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        let base_path = pod_base_path(&params);
        Ok(Node::Dir(GenericDir::new(
            Box::new(RootContainer),
            base_path,
            params,
        )))
    }
}

#[async_trait]
impl VirtualDirectory for RootContainer {
    async fn entries(&self, params: &mut Params) -> FsResult<DirEntries> {
        let client = ensure_client(params).await?;
        let containers = client
            .get_containers(&params.namespace, &params.pod)
            .await?;
        Ok(DirEntries::with_directories(containers))
    }

    async fn entry(&self, _name: &str, _params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        Ok((ContainerObjects::new_node, FileMode::Directory))
    }
}

/// The per-container surface: log files and the exec command file.
pub(crate) struct ContainerObjects;

impl ContainerObjects {
    pub(crate) fn new_node(mut params: Params) -> FsResult<Node> {
        params.container = params.name.clone();
        check_params(
            &ParamsSpec {
                context_name: true,
                name: true,
                namespace: true,
                pod: true,
                state: true,
                ..ParamsSpec::default()
            },
            &params,
        )?;
        let base_path = join_path(&pod_base_path(&params), &params.container);
        Ok(Node::Dir(GenericDir::new(
            Box::new(ContainerObjects),
            base_path,
            params,
        )))
    }
}

#[async_trait]
impl VirtualDirectory for ContainerObjects {
    async fn entries(&self, _params: &mut Params) -> FsResult<DirEntries> {
        Ok(DirEntries::with_files(["logs", "logs-previous", "exec"]))
    }

    async fn entry(&self, name: &str, _params: &mut Params) -> FsResult<(NodeFactory, FileMode)> {
        match name {
            "logs" => Ok((new_logs_node, FileMode::Regular)),
            "logs-previous" => Ok((new_previous_logs_node, FileMode::Regular)),
            "exec" => Ok((new_exec_node, FileMode::Regular)),
            _ => Err(FsError::DoesNotExist),
        }
    }
}

fn container_file_params(params: &Params) -> FsResult<()> {
    check_params(
        &ParamsSpec {
            context_name: true,
            namespace: true,
            pod: true,
            state: true,
            ..ParamsSpec::default()
        },
        params,
    )?;
    if params.container.is_empty() {
        return Err(FsError::Internal(
            "container file constructed without a container".to_string(),
        ));
    }
    Ok(())
}

fn container_file_base(params: &Params) -> String {
    join_path(
        &join_path(&pod_base_path(params), &params.container),
        &params.name,
    )
}

/// Read-only container logs, fetched in full at open time.
struct ContainerLogsFile {
    previous: bool,
}

#[async_trait]
impl VirtualFile for ContainerLogsFile {
    async fn open(&self, params: &mut Params, write: bool) -> FsResult<FileHandle> {
        if write {
            return Err(FsError::ReadOnly);
        }
        let client = ensure_client(params).await?;
        match client
            .get_logs(
                &params.pod,
                &params.container,
                &params.namespace,
                self.previous,
            )
            .await
        {
            Ok(logs) => Ok(FileHandle::read_only(logs)),
            Err(err) if err.is_not_found() => Err(FsError::DoesNotExist),
            Err(err) => Ok(FileHandle::read_only(format!("{}\n", err).into_bytes())),
        }
    }
}

fn new_logs_node(params: Params) -> FsResult<Node> {
    container_file_params(&params)?;
    let base_path = container_file_base(&params);
    Ok(Node::File(GenericFile::new(
        Box::new(ContainerLogsFile { previous: false }),
        base_path,
        params,
    )))
}

fn new_previous_logs_node(params: Params) -> FsResult<Node> {
    container_file_params(&params)?;
    let base_path = container_file_base(&params);
    Ok(Node::File(GenericFile::new(
        Box::new(ContainerLogsFile { previous: true }),
        base_path,
        params,
    )))
}

/// The exec command file action. The handle it opens is shared through the
/// state store so a write followed by a read on a fresh open still
/// observes the captured output.
struct ContainerExecAction;

#[async_trait]
impl VirtualFile for ContainerExecAction {
    async fn open(&self, params: &mut Params, _write: bool) -> FsResult<FileHandle> {
        let state = params.state()?;
        let client = ensure_client(params).await?;
        let key = container_file_base(params);
        let file = match state.get_exec_file(&key) {
            Some(file) => {
                debug!("reusing exec file {}", key);
                file
            }
            None => {
                debug!("creating exec file {}", key);
                let file = Arc::new(ContainerExecFile::new(
                    params.pod.clone(),
                    params.container.clone(),
                    params.namespace.clone(),
                    client,
                ));
                state.put(&key, StateValue::ExecFile(file.clone()));
                file
            }
        };
        Ok(FileHandle::Exec(file))
    }
}

fn new_exec_node(params: Params) -> FsResult<Node> {
    container_file_params(&params)?;
    let base_path = container_file_base(&params);
    Ok(Node::File(GenericFile::new(
        Box::new(ContainerExecAction),
        base_path,
        params,
    )))
}

/// Long-lived exec command file. Writing runs the command in the container
/// and replaces the content with its stdout; reading serves the content.
/// The mutex serializes write-then-read sequences.
pub struct ContainerExecFile {
    pod: String,
    container: String,
    namespace: String,
    client: Arc<dyn ClusterApi>,
    content: Mutex<Vec<u8>>,
}

impl ContainerExecFile {
    pub fn new(
        pod: String,
        container: String,
        namespace: String,
        client: Arc<dyn ClusterApi>,
    ) -> Self {
        Self {
            pod,
            container,
            namespace,
            client,
            content: Mutex::new(Vec::new()),
        }
    }

    pub async fn run(&self, offset: i64, data: &[u8]) -> FsResult<usize> {
        if offset != 0 {
            // Offset writes are not supported; treat the chunk as the
            // whole command line.
            warn!("exec write at offset {} on {}", offset, self.pod);
        }
        let text = String::from_utf8_lossy(data);
        let cmd: Vec<String> = text
            .trim()
            .split(' ')
            .filter(|part| !part.is_empty())
            .map(|part| part.to_string())
            .collect();
        if cmd.is_empty() {
            return Err(FsError::RemoteIo("empty exec command".to_string()));
        }

        match self
            .client
            .exec_command(&self.pod, &self.container, &self.namespace, &cmd)
            .await
        {
            Ok((stdout, stderr)) => {
                if !stderr.is_empty() {
                    debug!(
                        "exec on {}/{} produced {} bytes of stderr",
                        self.pod,
                        self.container,
                        stderr.len()
                    );
                }
                let mut content = self.content.lock().await;
                *content = stdout;
                Ok(data.len())
            }
            Err(err) => {
                warn!("exec on {}/{} failed: {}", self.pod, self.container, err);
                let mut content = self.content.lock().await;
                *content = format!("err while executing: {}\n", err).into_bytes();
                Err(FsError::RemoteIo(err.to_string()))
            }
        }
    }

    pub async fn read(&self, offset: i64, size: u32) -> Vec<u8> {
        let content = self.content.lock().await;
        slice_content(&content, offset, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MockCluster;

    fn exec_file(cluster: Arc<MockCluster>) -> ContainerExecFile {
        ContainerExecFile::new(
            "pod-1".to_string(),
            "app".to_string(),
            "default".to_string(),
            cluster,
        )
    }

    #[tokio::test]
    async fn commands_are_trimmed_and_split_on_spaces() {
        let cluster = Arc::new(MockCluster::default().with_exec_result(b"ok\n", b""));
        let file = exec_file(cluster.clone());
        file.run(0, b"  ls   -la /tmp \n").await.expect("run");
        assert_eq!(
            cluster.exec_calls(),
            vec![vec!["ls".to_string(), "-la".to_string(), "/tmp".to_string()]]
        );
        assert_eq!(file.read(0, 64).await, b"ok\n");
    }

    #[tokio::test]
    async fn blank_input_never_reaches_the_cluster() {
        let cluster = Arc::new(MockCluster::default());
        let file = exec_file(cluster.clone());
        let err = file.run(0, b"   \n").await.expect_err("must refuse");
        assert!(matches!(err, FsError::RemoteIo(_)));
        assert!(cluster.exec_calls().is_empty());
    }

    #[tokio::test]
    async fn offset_writes_still_run_the_whole_buffer() {
        let cluster = Arc::new(MockCluster::default().with_exec_result(b"out", b""));
        let file = exec_file(cluster.clone());
        let written = file.run(5, b"ls /").await.expect("run");
        assert_eq!(written, 4);
        assert_eq!(cluster.exec_calls().len(), 1);
    }

    #[tokio::test]
    async fn failures_replace_the_content_with_the_error() {
        let cluster = Arc::new(MockCluster::default().with_exec_error("denied"));
        let file = exec_file(cluster.clone());
        file.run(0, b"id").await.expect_err("must fail");
        let text = String::from_utf8(file.read(0, 256).await).expect("utf8");
        assert!(text.contains("denied"));
    }
}
