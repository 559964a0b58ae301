//! In-process fake of the Aomail API for integration testing.
//!
//! Speaks just enough HTTP/1.1 for `reqwest`: one request per connection,
//! `Content-Length` bodies only, and `Connection: close` on every response.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// A request as the fake server saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Default)]
struct State {
    valid_tokens: HashSet<String>,
    refresh_enabled: bool,
    issued: usize,
    seen: Vec<SeenRequest>,
}

pub struct FakeApi {
    port: u16,
    state: Arc<Mutex<State>>,
}

impl FakeApi {
    /// Start a server that accepts `valid_token` and can renew any other token.
    pub async fn start(valid_token: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake api");
        let port = listener.local_addr().expect("local addr").port();
        let state = Arc::new(Mutex::new(State {
            valid_tokens: HashSet::from([valid_token.to_string()]),
            refresh_enabled: true,
            ..Default::default()
        }));

        let shared = state.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = shared.clone();
                tokio::spawn(async move {
                    let _ = handle_connection(stream, state).await;
                });
            }
        });

        Self { port, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}/aomail/", self.port)
    }

    pub fn disable_refresh(&self) {
        self.state.lock().unwrap().refresh_enabled = false;
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.state.lock().unwrap().seen.clone()
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<Mutex<State>>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    let mut content_type = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim().to_string();
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.parse().unwrap_or(0),
                "authorization" => authorization = Some(value),
                "content-type" => content_type = Some(value),
                _ => {}
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;

    let seen = SeenRequest {
        method,
        path,
        authorization,
        content_type,
        body,
    };
    let (status, payload) = route(&seen, &state);
    state.lock().unwrap().seen.push(seen);

    let body = payload.to_string();
    let response = format!(
        "HTTP/1.1 {} Fake\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn route(request: &SeenRequest, state: &Mutex<State>) -> (u16, Value) {
    let mut state = state.lock().unwrap();

    if request.method == "POST" && request.path == "/aomail/token/refresh/" {
        let expired = serde_json::from_slice::<Value>(&request.body)
            .ok()
            .and_then(|v| v.get("accessToken").and_then(Value::as_str).map(str::to_owned));
        return match expired {
            Some(_) if state.refresh_enabled => {
                state.issued += 1;
                let token = format!("renewed-{}", state.issued);
                state.valid_tokens.insert(token.clone());
                (200, json!({ "accessToken": token }))
            }
            Some(_) => (500, json!({ "error": "Internal server error" })),
            None => (400, json!({ "error": "Access token is missing" })),
        };
    }

    let token = request
        .authorization
        .as_deref()
        .and_then(|h| h.strip_prefix("Bearer "));
    if !token.is_some_and(|t| state.valid_tokens.contains(t)) {
        return (401, json!({ "error": "Token is invalid or expired" }));
    }

    match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/aomail/user/categories/") => (200, json!([{ "name": "Work" }, { "name": "Others" }])),
        ("GET", "/aomail/user/statistics/") => (403, json!({ "allowedPlans": ["pro", "team"] })),
        ("GET", "/aomail/is_authenticated/") => (200, json!({ "isAuthenticated": true, "isActive": true })),
        ("POST", "/aomail/user/upload/") => (200, json!({ "received": request.body.len() })),
        _ => (404, json!({ "error": "Not found" })),
    }
}
