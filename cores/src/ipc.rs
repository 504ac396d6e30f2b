

// the processing server listens on a unix socket inside the execution environment
pub const DEFAULT_SERVER_SOCKET_PATH: &str = "/tmp/image-server.sock";
pub const HEALTHCHECK_PATH: &str = "/healthcheck";
// bypasses the processing server's url signing
pub const UNSAFE_PATH_PREFIX: &str = "/unsafe";

pub const DEFAULT_CACHE_CONTROL: &str = "max-age=120,public";
pub const NO_CACHE_CONTROL: &str = "no-cache,no-store";
pub const JSON_CONTENT_TYPE: &str = "application/json";

// headers copied verbatim from the processing server into the success envelope
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_EXPIRES: &str = "Expires";
pub const HEADER_ETAG: &str = "Etag";
pub const HEADER_CACHE_CONTROL: &str = "Cache-Control";
pub const HEADER_DATE: &str = "Date";

pub fn content_path(path: &str, allow_unsafe: bool) -> String {
    if allow_unsafe {
        [UNSAFE_PATH_PREFIX, path].join("")
    } else {
        path.to_string()
    }
}
