
use std::collections::BTreeMap;

use cores::ipc::{
    HEADER_CACHE_CONTROL, HEADER_CONTENT_TYPE, HEADER_DATE, HEADER_ETAG, HEADER_EXPIRES, JSON_CONTENT_TYPE,
};
use serde::Serialize;
use serde_json::{json, Value};

use crate::errors::ProxyError;
use crate::proxy_client::UpstreamHeaders;

/// The result handed back to the gateway for one invocation.
// https://docs.aws.amazon.com/apigateway/latest/developerguide/set-up-lambda-proxy-integrations.html#api-gateway-simple-proxy-for-lambda-output-format
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub status_code: u16,
    pub body: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_base64_encoded: bool,
    pub headers: BTreeMap<String, String>,
}

pub fn default_error_body() -> Value {
    json!({ "message": "error" })
}

// https://docs.aws.amazon.com/apigateway/latest/developerguide/handle-errors-in-lambda-integration.html
pub fn error_envelope(status_code: u16, body: &Value, cache_control: &str, content_type: &str) -> ResultEnvelope {
    let headers = BTreeMap::from([
        (HEADER_CACHE_CONTROL.to_string(), cache_control.to_string()),
        (HEADER_CONTENT_TYPE.to_string(), content_type.to_string()),
    ]);
    ResultEnvelope {
        status_code,
        body: body.to_string(),
        is_base64_encoded: false,
        headers,
    }
}

pub fn status_envelope(status_code: u16, cache_control: &str) -> ResultEnvelope {
    error_envelope(status_code, &default_error_body(), cache_control, JSON_CONTENT_TYPE)
}

pub fn from_error(error: &ProxyError) -> ResultEnvelope {
    status_envelope(error.status_code(), error.cache_control())
}

pub fn success_envelope(body: String, headers: &UpstreamHeaders) -> ResultEnvelope {
    let headers = BTreeMap::from([
        (HEADER_CONTENT_TYPE.to_string(), headers.content_type.clone()),
        (HEADER_EXPIRES.to_string(), headers.expires.clone()),
        (HEADER_ETAG.to_string(), headers.etag.clone()),
        (HEADER_CACHE_CONTROL.to_string(), headers.cache_control.clone()),
        (HEADER_DATE.to_string(), headers.date.clone()),
    ]);
    ResultEnvelope {
        status_code: 200,
        body,
        is_base64_encoded: true,
        headers,
    }
}
