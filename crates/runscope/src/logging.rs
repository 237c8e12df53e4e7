//! Request/response logging hooks for the HTTP backend.
//!
//! The backend receives a [`RequestLog`] when it is built. Nothing is
//! registered globally, so two clients in one process can log differently.

/// Receives every request and response the HTTP backend handles.
pub trait RequestLog: Send + Sync {
    /// Called before a request is sent. `body` is the encoded payload, if any.
    fn request(&self, method: &str, url: &str, body: Option<&str>);

    /// Called after a response has been read.
    fn response(&self, method: &str, url: &str, status: u16, body: &str);
}

/// Forwards to the `log` facade at debug level under the `runscope::http` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugLog;

impl RequestLog for DebugLog {
    fn request(&self, method: &str, url: &str, body: Option<&str>) {
        match body {
            Some(body) => log::debug!(target: "runscope::http", "request: {method} {url} {body}"),
            None => log::debug!(target: "runscope::http", "request: {method} {url}"),
        }
    }

    fn response(&self, method: &str, url: &str, status: u16, body: &str) {
        log::debug!(target: "runscope::http", "response: {method} {url} {status} {body}");
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl RequestLog for Silent {
    fn request(&self, _method: &str, _url: &str, _body: Option<&str>) {}

    fn response(&self, _method: &str, _url: &str, _status: u16, _body: &str) {}
}
