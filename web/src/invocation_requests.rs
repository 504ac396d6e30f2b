
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::errors::ProxyError;
use crate::events::{HttpMethod, InvocationEvent};
use crate::metrics_client::UsageRecord;
use crate::responses::{self, ResultEnvelope};
use crate::runtime_context::RuntimeContext;

pub struct InvocationHandler {
    runtime_context: Arc<RuntimeContext>,
}

impl InvocationHandler {
    pub fn new(runtime_context: &Arc<RuntimeContext>) -> Arc<Self> {
        let runtime_context = Arc::clone(runtime_context);
        let handler = Self { runtime_context };
        Arc::new(handler)
    }

    /// Never fails: every error is logged and turned into an error envelope.
    pub async fn handle(&self, payload: Value) -> ResultEnvelope {
        let started = Instant::now();
        let event = match InvocationEvent::from_value(payload) {
            Ok(event) => event,
            Err(error) => return self.error_response(ProxyError::Internal(error)),
        };
        let method = event.method();
        if !matches!(method, HttpMethod::Get | HttpMethod::Head) {
            return self.error_response(ProxyError::MethodNotAllowed(method.as_str().to_string()));
        }
        let envelope = match self.proxy(&event).await {
            Ok(envelope) => envelope,
            Err(error) => self.error_response(error),
        };
        if self.runtime_context.settings().send_anonymous_data {
            self.send_metrics(&method, &envelope, started);
        }
        envelope
    }

    async fn proxy(&self, event: &InvocationEvent) -> Result<ResultEnvelope, ProxyError> {
        info!("{} {}", event.request_context.http_method, event.path);
        self.runtime_context.server_lifecycle().ensure_started().await;
        let response = self.runtime_context.proxy_client().fetch(&event.path).await?;
        let image_process = Arc::clone(self.runtime_context.image_process());
        let content_type = response.headers.content_type.clone();
        let body = response.body;
        // decoding is cpu bound
        let encoded = tokio::task::spawn_blocking(move || image_process.encode_body(&content_type, &body))
            .await
            .context("image encoding task")?;
        let encoded = encoded?;
        Ok(responses::success_envelope(encoded, &response.headers))
    }

    fn error_response(&self, error: ProxyError) -> ResultEnvelope {
        match &error {
            ProxyError::MethodNotAllowed(_) | ProxyError::UpstreamError(_) => {
                error!(status = error.status_code(), "invocation rejected: {}", error)
            }
            _ => {
                error!(status = error.status_code(), "invocation error: {}", error);
                error!("invocation trace: {:?}", error);
            }
        }
        responses::from_error(&error)
    }

    // fire and forget, the response never waits for the metrics endpoint
    fn send_metrics(&self, method: &HttpMethod, envelope: &ResultEnvelope, started: Instant) {
        let record = UsageRecord {
            method: method.as_str().to_string(),
            status_code: envelope.status_code,
            elapsed: started.elapsed(),
        };
        let client = Arc::clone(self.runtime_context.metrics_client());
        self.runtime_context.task_tracker().spawn(async move {
            if let Err(error) = client.send(record).await {
                debug!("anonymous metrics dropped {:?}", error);
            }
        });
    }
}
