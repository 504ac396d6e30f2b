
use std::path::Path;

use anyhow::{Context, Result};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::header::HOST;
use hyper::{HeaderMap, Method, Request};
use hyper_util::rt::TokioIo;
use tokio::net::UnixStream;
use tracing::debug;

pub struct UnixHttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

// https://docs.rs/hyper/1/hyper/client/conn/http1/index.html
// one connection per request, the processing server is local
pub async fn get(socket_path: &Path, path: &str) -> Result<UnixHttpResponse> {
    let stream = UnixStream::connect(socket_path)
        .await
        .with_context(|| format!("connecting to {}", socket_path.display()))?;
    let (mut sender, connection) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .context("http handshake")?;
    tokio::spawn(async move {
        if let Err(error) = connection.await {
            debug!("unix socket connection error {:?}", error);
        }
    });
    let request = Request::builder()
        .method(Method::GET)
        .uri(path)
        .header(HOST, "localhost")
        .body(Empty::<Bytes>::new())?;
    let response = sender
        .send_request(request)
        .await
        .with_context(|| format!("GET {}", path))?;
    let (parts, body) = response.into_parts();
    let body = body.collect().await.context("reading response body")?.to_bytes();
    Ok(UnixHttpResponse {
        status: parts.status.as_u16(),
        headers: parts.headers,
        body,
    })
}
