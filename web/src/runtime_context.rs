
use std::sync::Arc;

use anyhow::Result;
use cores::settings::Settings;
use tokio_util::task::TaskTracker;

use crate::images::ImageProcess;
use crate::metrics_client::MetricsClient;
use crate::proxy_client::ProxyClient;
use crate::server_lifecycle::{CommandLauncher, ServerLauncher, ServerLifecycle};

/// Everything shared by the invocations of one execution environment.
pub struct RuntimeContext {
    settings: Settings,
    task_tracker: TaskTracker,
    server_lifecycle: Arc<ServerLifecycle>,
    proxy_client: Arc<ProxyClient>,
    image_process: Arc<ImageProcess>,
    metrics_client: Arc<MetricsClient>,
}

impl RuntimeContext {
    pub fn new(settings: Settings) -> Result<Arc<Self>> {
        let launcher = CommandLauncher::new(settings.server.resolved_command());
        Self::with_launcher(settings, launcher)
    }

    pub fn with_launcher(settings: Settings, launcher: Arc<dyn ServerLauncher>) -> Result<Arc<Self>> {
        let server_lifecycle = ServerLifecycle::new(&settings.server.socket_path, launcher);
        let proxy_client = ProxyClient::new(&settings.server, &server_lifecycle);
        let metrics_client = MetricsClient::new(&settings.metrics)?;
        let context = Self {
            settings,
            task_tracker: TaskTracker::new(),
            server_lifecycle,
            proxy_client,
            image_process: ImageProcess::new(),
            metrics_client,
        };
        Ok(Arc::new(context))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn task_tracker(&self) -> &TaskTracker {
        &self.task_tracker
    }

    pub fn server_lifecycle(&self) -> &Arc<ServerLifecycle> {
        &self.server_lifecycle
    }

    pub fn proxy_client(&self) -> &Arc<ProxyClient> {
        &self.proxy_client
    }

    pub fn image_process(&self) -> &Arc<ImageProcess> {
        &self.image_process
    }

    pub fn metrics_client(&self) -> &Arc<MetricsClient> {
        &self.metrics_client
    }
}
