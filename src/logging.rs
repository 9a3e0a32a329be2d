use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::{Method, StatusCode};

/// A unique identifier for a particular request to the election service.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Log an outgoing request.
pub fn log_request(id: RequestId, method: &Method, url: &str) {
    info!("->req{id} {method} {url}");
}

/// Log the response to a request, at a level matching its status class.
pub fn log_response(id: RequestId, status: StatusCode, what: &str) {
    let log_msg = format!("<-rsp{id} {status} {what}");
    if status.is_server_error() {
        error!("{log_msg}");
    } else if status.is_client_error() {
        warn!("{log_msg}");
    } else {
        info!("{log_msg}");
    }
}

/// Log a request that never got a response.
pub fn log_failure(id: RequestId, what: &str, err: &reqwest::Error) {
    error!("<-rsp{id} FAILED {what}: {err}");
}
