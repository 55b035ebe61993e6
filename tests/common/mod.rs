//! Shared utilities for the end-to-end tests: a programmable mock object
//! store and a helper that runs the daemon on its own event-loop thread.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crsh::config::{Config, UrlLayout};

/// One HTTP request as seen by the mock store.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Header names lowercased.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A running mock object store.
pub struct MockStore {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockStore {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Everything the store has seen so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests().iter().map(|r| r.method.clone()).collect()
    }
}

/// Start a mock store whose behaviour is decided per request by `respond`,
/// returning (status, body).
pub async fn start_mock_store<F>(respond: F) -> MockStore
where
    F: Fn(&RecordedRequest) -> (u16, Vec<u8>) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let log = requests.clone();
    let respond = Arc::new(respond);

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            let log = log.clone();
            let respond = respond.clone();
            tokio::spawn(async move {
                serve_connection(socket, log, respond).await;
            });
        }
    });

    MockStore { addr, requests }
}

/// A stateful mock store with real GET/HEAD/PUT/DELETE semantics, for
/// round-trip tests. PUT always stores (the daemon's pre-flight HEAD is
/// what implements the no-overwrite protocol).
pub async fn start_stateful_store() -> MockStore {
    let objects: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::new(Mutex::new(HashMap::new()));
    start_mock_store(move |req| {
        let mut objects = objects.lock().unwrap();
        match req.method.as_str() {
            "GET" => match objects.get(&req.path) {
                Some(value) => (200, value.clone()),
                None => (404, Vec::new()),
            },
            "HEAD" => {
                if objects.contains_key(&req.path) {
                    (200, Vec::new())
                } else {
                    (404, Vec::new())
                }
            }
            "PUT" => {
                objects.insert(req.path.clone(), req.body.clone());
                (201, Vec::new())
            }
            "DELETE" => {
                if objects.remove(&req.path).is_some() {
                    (204, Vec::new())
                } else {
                    (404, Vec::new())
                }
            }
            _ => (405, Vec::new()),
        }
    })
    .await
}

async fn serve_connection(
    mut socket: TcpStream,
    log: Arc<Mutex<Vec<RecordedRequest>>>,
    respond: Arc<dyn Fn(&RecordedRequest) -> (u16, Vec<u8>) + Send + Sync>,
) {
    let mut buf: Vec<u8> = Vec::new();
    loop {
        // Read until the header block is complete.
        let header_end = loop {
            if let Some(pos) = find_header_end(&buf) {
                break pos;
            }
            let mut chunk = [0u8; 4096];
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.split("\r\n");
        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or_default().to_string();

        let mut headers = Vec::new();
        let mut content_length = 0usize;
        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                let name = name.trim().to_ascii_lowercase();
                let value = value.trim().to_string();
                if name == "content-length" {
                    content_length = value.parse().unwrap_or(0);
                }
                headers.push((name, value));
            }
        }

        let body_start = header_end + 4;
        while buf.len() < body_start + content_length {
            let mut chunk = [0u8; 4096];
            match socket.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }
        let body = buf[body_start..body_start + content_length].to_vec();
        buf.drain(..body_start + content_length);

        let request = RecordedRequest {
            method: method.clone(),
            path,
            headers,
            body,
        };
        log.lock().unwrap().push(request.clone());
        let (status, response_body) = respond(&request);

        let reason = match status {
            200 => "OK",
            201 => "Created",
            204 => "No Content",
            404 => "Not Found",
            409 => "Conflict",
            412 => "Precondition Failed",
            _ => "Status",
        };
        // HEAD responses carry headers only.
        let payload: &[u8] = if method == "HEAD" { &[] } else { &response_body };
        let head = format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: keep-alive\r\n\r\n",
            payload.len()
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }
        if socket.write_all(payload).await.is_err() {
            return;
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// A daemon running on a dedicated current-thread runtime.
pub struct Daemon {
    pub socket_path: PathBuf,
    thread: Option<std::thread::JoinHandle<()>>,
    _dir: tempfile::TempDir,
}

/// Start the daemon against `store_url` and wait for its endpoint to
/// appear.
pub async fn start_daemon(store_url: &str, configure: impl FnOnce(&mut Config)) -> Daemon {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("crsh.sock");
    let mut config = Config {
        ipc_endpoint: socket_path.clone(),
        url: store_url.to_string(),
        idle_timeout_seconds: 0,
        bearer_token: None,
        layout: UrlLayout::Subdirs,
        headers: Vec::new(),
    };
    configure(&mut config);

    let thread = std::thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let local = tokio::task::LocalSet::new();
        runtime
            .block_on(local.run_until(crsh::run(config)))
            .unwrap();
    });

    let daemon = Daemon {
        socket_path,
        thread: Some(thread),
        _dir: dir,
    };
    daemon.wait_for_endpoint().await;
    daemon
}

impl Daemon {
    async fn wait_for_endpoint(&self) {
        for _ in 0..200 {
            if self.socket_path.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("daemon did not bind {}", self.socket_path.display());
    }

    /// Wait for the daemon to exit on its own (STOP, idle, framing error).
    pub async fn wait_for_exit(&mut self) {
        let thread = self.thread.take().unwrap();
        for _ in 0..500 {
            if thread.is_finished() {
                thread.join().unwrap();
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("daemon did not shut down");
    }

    pub fn endpoint(&self) -> &Path {
        &self.socket_path
    }
}

impl Drop for Daemon {
    fn drop(&mut self) {
        // Tests that don't stop the daemon explicitly leave the thread
        // behind; it dies with the test process.
        let _ = self.thread.take();
    }
}
