pub mod errors;
pub mod events;
pub mod images;
pub mod invocation_requests;
pub mod metrics_client;
pub mod proxy_client;
pub mod responses;
pub mod runtime_context;
pub mod server_lifecycle;
pub mod unix_http;
