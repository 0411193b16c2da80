//! In-process stand-in for a VictoriaMetrics insert endpoint.
//!
//! Every request, whatever its path, is recorded and answered with a fixed
//! status code.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode, Uri},
    Router,
};
use tokio::task::JoinHandle;

/// A request received by [`MockVmServer`].
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub query: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Clone)]
struct MockState {
    status: StatusCode,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
}

/// Mock insert server bound to an ephemeral localhost port.
///
/// The server task is aborted when the value is dropped.
pub struct MockVmServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<ReceivedRequest>>>,
    handle: JoinHandle<()>,
}

impl MockVmServer {
    /// Starts a server answering 204 No Content.
    pub async fn start() -> Self {
        Self::start_with_status(204).await
    }

    /// Starts a server answering every request with `status`.
    pub async fn start_with_status(status: u16) -> Self {
        let status = StatusCode::from_u16(status).expect("Invalid mock status code");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            status,
            requests: requests.clone(),
        };

        let app = Router::new().fallback(record_request).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("Mock server has no address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            requests,
            handle,
        }
    }

    /// Full URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Snapshot of all requests received so far.
    pub fn requests(&self) -> Vec<ReceivedRequest> {
        self.requests.lock().expect("mock state poisoned").clone()
    }

    /// Every non-empty body line across all received requests.
    pub fn received_lines(&self) -> Vec<String> {
        self.requests()
            .iter()
            .flat_map(|r| r.body.lines().map(str::to_string).collect::<Vec<_>>())
            .filter(|line| !line.is_empty())
            .collect()
    }
}

impl Drop for MockVmServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn record_request(
    State(state): State<MockState>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> StatusCode {
    let request = ReceivedRequest {
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    };
    if let Ok(mut requests) = state.requests.lock() {
        requests.push(request);
    }
    state.status
}
