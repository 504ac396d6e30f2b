
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;

// https://docs.aws.amazon.com/apigateway/latest/developerguide/set-up-lambda-proxy-integrations.html#api-gateway-simple-proxy-for-lambda-input-format
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InvocationEvent {
    pub request_context: RequestContext,
    pub path: String,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub http_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Other(String),
}

impl InvocationEvent {
    pub fn from_value(payload: Value) -> Result<Self> {
        let event: InvocationEvent = serde_json::from_value(payload).context("malformed invocation event")?;
        Ok(event)
    }

    pub fn method(&self) -> HttpMethod {
        match self.request_context.http_method.as_str() {
            "GET" => HttpMethod::Get,
            "HEAD" => HttpMethod::Head,
            other => HttpMethod::Other(other.to_string()),
        }
    }
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Other(method) => method,
        }
    }
}
