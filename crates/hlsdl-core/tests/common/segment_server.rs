//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a path → body map, answers HEAD with headers only, can be told to
//! fail GETs for a path, and counts every request it sees.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
enum Route {
    Body(Vec<u8>),
    /// HEAD answers 200; GET answers with this status and no body.
    FailGet(u16),
    /// GET announces `total` bytes, then sends `chunk` bytes every `every`.
    Trickle {
        total: usize,
        chunk: usize,
        every: Duration,
    },
}

#[derive(Default)]
struct State {
    routes: Mutex<HashMap<String, Route>>,
    log: Mutex<Vec<(String, String)>>,
}

pub struct SegmentServer {
    base: String,
    state: Arc<State>,
}

#[allow(dead_code)]
impl SegmentServer {
    /// Starts the server on a loopback port. It runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(State::default());
        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    pub fn serve(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.route(path, Route::Body(body.into()));
    }

    pub fn fail_get(&self, path: &str, status: u16) {
        self.route(path, Route::FailGet(status));
    }

    /// A body that arrives slowly enough to be interrupted mid-transfer.
    pub fn trickle(&self, path: &str, total: usize, chunk: usize, every: Duration) {
        self.route(path, Route::Trickle { total, chunk, every });
    }

    fn route(&self, path: &str, route: Route) {
        let key = format!("/{}", path.trim_start_matches('/'));
        self.state.routes.lock().unwrap().insert(key, route);
    }

    pub fn request_count(&self) -> usize {
        self.state.log.lock().unwrap().len()
    }

    /// Requests with `method` for paths ending in `suffix`.
    pub fn count(&self, method: &str, suffix: &str) -> usize {
        self.state
            .log
            .lock()
            .unwrap()
            .iter()
            .filter(|(m, p)| m == method && p.ends_with(suffix))
            .count()
    }

    pub fn clear_log(&self) {
        self.state.log.lock().unwrap().clear();
    }
}

fn handle(mut stream: TcpStream, state: &State) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let mut parts = request.lines().next().unwrap_or("").split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let path = parts.next().unwrap_or("").to_string();
    state.log.lock().unwrap().push((method.clone(), path.clone()));

    let route = state.routes.lock().unwrap().get(&path).cloned();
    let head = method.eq_ignore_ascii_case("HEAD");
    if let Some(Route::Trickle { total, chunk, every }) = route {
        let header = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            total
        );
        if stream.write_all(header.as_bytes()).is_err() || head {
            return;
        }
        let piece = vec![0x47u8; chunk.max(1)];
        let mut sent = 0;
        while sent < total {
            let n = piece.len().min(total - sent);
            if stream.write_all(&piece[..n]).is_err() {
                return;
            }
            sent += n;
            thread::sleep(every);
        }
        return;
    }
    let (status, body): (&str, &[u8]) = match (&route, head) {
        (None, _) => ("404 Not Found", b""),
        (Some(Route::Body(b)), _) => ("200 OK", b.as_slice()),
        (Some(Route::FailGet(_)), true) => ("200 OK", b""),
        (Some(Route::FailGet(500)), false) => ("500 Internal Server Error", b""),
        (Some(Route::FailGet(503)), false) => ("503 Service Unavailable", b""),
        (Some(Route::FailGet(404)), false) => ("404 Not Found", b""),
        (Some(Route::FailGet(_)), false) => ("400 Bad Request", b""),
        (Some(Route::Trickle { .. }), _) => return,
    };
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    let _ = stream.write_all(response.as_bytes());
    if !head {
        let _ = stream.write_all(body);
    }
}
