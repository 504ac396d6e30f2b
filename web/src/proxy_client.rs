
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use cores::ipc::{content_path, HEALTHCHECK_PATH};
use cores::settings::ServerConfig;
use hyper::body::Bytes;
use hyper::header::{HeaderName, CACHE_CONTROL, CONTENT_TYPE, DATE, ETAG, EXPIRES};
use hyper::HeaderMap;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info};

use crate::errors::ProxyError;
use crate::server_lifecycle::ServerLifecycle;
use crate::unix_http::{self, UnixHttpResponse};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpstreamHeaders {
    pub content_type: String,
    pub cache_control: String,
    pub expires: String,
    pub etag: String,
    pub date: String,
}

#[derive(Debug)]
pub struct ProxyResponse {
    pub headers: UpstreamHeaders,
    pub body: Bytes,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    pub attempts_remaining: u32,
    pub delay_between_attempts: Duration,
}

pub struct ProxyClient {
    socket_path: PathBuf,
    allow_unsafe_url: bool,
    budget: RetryBudget,
    probe_timeout: Duration,
    upstream_timeout: Duration,
    lifecycle: Arc<ServerLifecycle>,
}

impl ProxyClient {
    pub fn new(config: &ServerConfig, lifecycle: &Arc<ServerLifecycle>) -> Arc<Self> {
        let lifecycle = Arc::clone(lifecycle);
        let client = Self {
            socket_path: lifecycle.socket_path().to_path_buf(),
            allow_unsafe_url: config.allow_unsafe_url,
            budget: RetryBudget {
                attempts_remaining: config.probe_attempts,
                delay_between_attempts: config.probe_interval(),
            },
            probe_timeout: config.probe_timeout(),
            upstream_timeout: config.upstream_timeout(),
            lifecycle,
        };
        Arc::new(client)
    }

    /// Health-gated fetch of `request_path` from the processing server.
    pub async fn fetch(&self, request_path: &str) -> Result<ProxyResponse, ProxyError> {
        self.wait_until_ready(self.budget).await?;
        self.forward(request_path, self.allow_unsafe_url).await
    }

    pub async fn wait_until_ready(&self, budget: RetryBudget) -> Result<(), ProxyError> {
        let attempts = budget.attempts_remaining;
        let mut budget = budget;
        while budget.attempts_remaining > 0 {
            match self.probe().await {
                Ok(200) => {
                    self.lifecycle.mark_ready();
                    return Ok(());
                }
                Ok(status) => debug!(status, "healthcheck not ready"),
                Err(error) => debug!("healthcheck failed: {:#}", error),
            }
            budget.attempts_remaining -= 1;
            if budget.attempts_remaining > 0 {
                sleep(budget.delay_between_attempts).await;
            }
        }
        error!("processing server unavailable after {} healthchecks", attempts);
        self.lifecycle.mark_unavailable().await;
        Err(ProxyError::UpstreamUnavailable { attempts })
    }

    /// Single GET of the content path. Transport failures are not retried.
    pub async fn forward(&self, request_path: &str, allow_unsafe: bool) -> Result<ProxyResponse, ProxyError> {
        let path = content_path(request_path, allow_unsafe);
        info!("forwarding {}", path);
        let response = self.get(&path, self.upstream_timeout).await?;
        if response.status != 200 {
            return Err(ProxyError::UpstreamError(response.status));
        }
        let headers = Self::upstream_headers(&response.headers);
        Ok(ProxyResponse {
            headers,
            body: response.body,
        })
    }

    async fn probe(&self) -> Result<u16> {
        let response = self.get(HEALTHCHECK_PATH, self.probe_timeout).await?;
        Ok(response.status)
    }

    async fn get(&self, path: &str, limit: Duration) -> Result<UnixHttpResponse> {
        match timeout(limit, unix_http::get(&self.socket_path, path)).await {
            Ok(result) => result,
            Err(_) => Err(anyhow!("GET {} timed out after {:?}", path, limit)),
        }
    }

    fn upstream_headers(headers: &HeaderMap) -> UpstreamHeaders {
        let value = |name: HeaderName| -> String {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        UpstreamHeaders {
            content_type: value(CONTENT_TYPE),
            cache_control: value(CACHE_CONTROL),
            expires: value(EXPIRES),
            etag: value(ETAG),
            date: value(DATE),
        }
    }
}
