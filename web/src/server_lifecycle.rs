
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::net::UnixStream;
use tokio::process::Command;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerProcessState {
    NotStarted,
    Starting,
    Ready,
    Failed,
}

/// Runs the processing server bound to `socket_path` until it exits.
#[async_trait]
pub trait ServerLauncher: Send + Sync {
    async fn launch(&self, socket_path: &Path) -> Result<()>;
}

/// Launches the processing server as a child process.
pub struct CommandLauncher {
    command: Vec<String>,
}

impl CommandLauncher {
    pub fn new(command: Vec<String>) -> Arc<Self> {
        Arc::new(Self { command })
    }
}

#[async_trait]
impl ServerLauncher for CommandLauncher {
    async fn launch(&self, socket_path: &Path) -> Result<()> {
        let Some((program, args)) = self.command.split_first() else {
            bail!("processing server command is empty");
        };
        info!("launching processing server {} {:?}", program, args);
        // the server outlives the invocation, it is never killed on drop
        let mut child = Command::new(program)
            .args(args)
            .env("SERVER_SOCKET_PATH", socket_path)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("spawning {}", program))?;
        let status = child.wait().await.context("waiting for processing server")?;
        if !status.success() {
            bail!("processing server exited with {}", status);
        }
        Ok(())
    }
}

/// Owns the processing server of this execution environment. The server is
/// launched at most once at a time and reused by warm invocations.
pub struct ServerLifecycle {
    socket_path: PathBuf,
    launcher: Arc<dyn ServerLauncher>,
    task: Mutex<Option<JoinHandle<()>>>,
    state: watch::Sender<ServerProcessState>,
}

impl ServerLifecycle {
    pub fn new(socket_path: impl Into<PathBuf>, launcher: Arc<dyn ServerLauncher>) -> Arc<Self> {
        let (state, _) = watch::channel(ServerProcessState::NotStarted);
        let lifecycle = Self {
            socket_path: socket_path.into(),
            launcher,
            task: Mutex::new(None),
            state,
        };
        Arc::new(lifecycle)
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    pub fn state(&self) -> ServerProcessState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ServerProcessState> {
        self.state.subscribe()
    }

    /// Triggers a launch when no server is running. Never waits for readiness
    /// and never fails; launch errors surface through the state channel.
    pub async fn ensure_started(self: &Arc<Self>) {
        let mut task = self.task.lock().await;
        // a FAILED supervisor may still be unwinding, it no longer counts as live
        if Self::is_live(&task) && self.state() != ServerProcessState::Failed {
            debug!("processing server already {:?}", self.state());
            return;
        }
        if self.marker_exists().await {
            if self.marker_accepts().await {
                // a server we did not launch owns the socket
                debug!("adopting processing server at {}", self.socket_path.display());
                self.transition_to_starting();
                return;
            }
            info!("removing stale socket {}", self.socket_path.display());
            self.remove_marker();
        }
        self.transition_to_starting();
        let lifecycle = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            lifecycle.supervise().await;
        }));
    }

    /// Called when the health probes ran out. Without a live launch of ours the
    /// socket is dropped so the next invocation launches again.
    pub async fn mark_unavailable(&self) {
        let task = self.task.lock().await;
        if Self::is_live(&task) {
            return;
        }
        warn!("processing server at {} never became healthy", self.socket_path.display());
        self.remove_marker();
        self.state.send_replace(ServerProcessState::Failed);
    }

    /// Called on the first successful health probe.
    pub fn mark_ready(&self) {
        let changed = self.state.send_if_modified(|state| {
            if *state == ServerProcessState::Starting {
                *state = ServerProcessState::Ready;
                true
            } else {
                false
            }
        });
        if changed {
            info!("processing server ready at {}", self.socket_path.display());
        }
    }

    /// Resolves once the server is ready or its launch failed.
    pub async fn ready(&self) -> ServerProcessState {
        let mut receiver = self.subscribe();
        let result = receiver
            .wait_for(|state| matches!(state, ServerProcessState::Ready | ServerProcessState::Failed))
            .await;
        match result {
            Ok(state) => *state,
            Err(_) => ServerProcessState::Failed,
        }
    }

    async fn supervise(&self) {
        let result = self.launcher.launch(&self.socket_path).await;
        match result {
            Ok(()) => warn!("processing server exited"),
            Err(error) => {
                error!("processing server launch error: {:#}", error);
                error!("processing server launch trace: {:?}", error);
            }
        }
        self.remove_marker();
        self.state.send_replace(ServerProcessState::Failed);
    }

    fn transition_to_starting(&self) {
        self.state.send_if_modified(|state| {
            if matches!(state, ServerProcessState::NotStarted | ServerProcessState::Failed) {
                *state = ServerProcessState::Starting;
                true
            } else {
                false
            }
        });
    }

    fn is_live(task: &Option<JoinHandle<()>>) -> bool {
        task.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    async fn marker_accepts(&self) -> bool {
        UnixStream::connect(&self.socket_path).await.is_ok()
    }

    async fn marker_exists(&self) -> bool {
        tokio::fs::try_exists(&self.socket_path).await.unwrap_or(false)
    }

    fn remove_marker(&self) {
        match std::fs::remove_file(&self.socket_path) {
            Ok(()) => debug!("removed {}", self.socket_path.display()),
            Err(error) if error.kind() == ErrorKind::NotFound => (),
            Err(error) => warn!("failed to remove {}: {}", self.socket_path.display(), error),
        }
    }
}
