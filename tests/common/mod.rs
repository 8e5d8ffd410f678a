#![allow(dead_code)]

use std::convert::Infallible;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix_web::dev::ServerHandle;
use actix_web::web::{self, Bytes};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use futures::StreamExt;
use mcp_flow_probe::client::InitializeOutcome;
use mcp_flow_probe::{ProbeError, Reporter, SseEvent, StreamOutcome};
use reqwest::StatusCode;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// How the mock answers the streaming GET
#[derive(Clone)]
pub enum StreamReply {
    /// 200 with this body, then close
    Events(&'static str),
    /// 200 with this body, then keep the connection open forever
    EventsThenHang(&'static str),
    /// 200 with this body, then abort the connection mid-response
    EventsThenAbort(&'static str),
    Status(u16, &'static str),
}

#[derive(Clone)]
pub struct MockBehavior {
    pub session_id: Option<&'static str>,
    pub initialize_status: u16,
    /// Accept the initialize POST but never answer it
    pub initialize_hangs: bool,
    pub stream: StreamReply,
}

impl MockBehavior {
    pub fn new(session_id: Option<&'static str>, stream: StreamReply) -> Self {
        Self {
            session_id,
            initialize_status: 200,
            initialize_hangs: false,
            stream,
        }
    }

    pub fn hanging_initialize(mut self) -> Self {
        self.initialize_hangs = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

struct MockState {
    behavior: MockBehavior,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
}

pub struct MockMcpServer {
    pub base_url: String,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: ServerHandle,
}

impl MockMcpServer {
    pub async fn start(behavior: MockBehavior) -> io::Result<Self> {
        let recorded = Arc::new(Mutex::new(Vec::new()));
        let state = web::Data::new(MockState {
            behavior,
            recorded: recorded.clone(),
        });

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .route("/mcp/messages", web::post().to(initialize_handler))
                .route("/mcp/messages", web::get().to(stream_handler))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))?;

        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        tokio::spawn(server);

        Ok(Self {
            base_url: format!("http://{addr}"),
            recorded,
            handle,
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn requests_with_method(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

fn record(state: &MockState, req: &HttpRequest, body: &[u8]) {
    let headers = req
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    state.recorded.lock().unwrap().push(RecordedRequest {
        method: req.method().as_str().to_string(),
        headers,
        body: String::from_utf8_lossy(body).into_owned(),
    });
}

async fn initialize_handler(
    req: HttpRequest,
    body: Bytes,
    state: web::Data<MockState>,
) -> HttpResponse {
    record(&state, &req, &body);
    if state.behavior.initialize_hangs {
        futures::future::pending::<()>().await;
    }

    let status = actix_web::http::StatusCode::from_u16(state.behavior.initialize_status)
        .unwrap_or(actix_web::http::StatusCode::OK);
    let mut response = HttpResponse::build(status);
    if let Some(id) = state.behavior.session_id {
        response.insert_header(("mcp-session-id", id));
    }
    response.json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": {
            "protocolVersion": "2024-11-05",
            "capabilities": {"tools": {}},
            "serverInfo": {"name": "mock-proxy", "version": "0.0.1"}
        }
    }))
}

async fn stream_handler(req: HttpRequest, state: web::Data<MockState>) -> HttpResponse {
    record(&state, &req, &[]);

    match state.behavior.stream.clone() {
        StreamReply::Events(body) => HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header(("Cache-Control", "no-cache"))
            .streaming(futures::stream::once(async move {
                Ok::<_, Infallible>(Bytes::from_static(body.as_bytes()))
            })),
        StreamReply::EventsThenHang(body) => {
            let head = futures::stream::once(async move {
                Ok::<_, Infallible>(Bytes::from_static(body.as_bytes()))
            });
            HttpResponse::Ok()
                .content_type("text/event-stream")
                .streaming(head.chain(futures::stream::pending()))
        }
        StreamReply::EventsThenAbort(body) => {
            let head = futures::stream::once(async move {
                Ok::<_, io::Error>(Bytes::from_static(body.as_bytes()))
            });
            // the pause lets the head reach the client before the body fails
            let abort = futures::stream::once(async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Err::<Bytes, _>(io::Error::new(io::ErrorKind::ConnectionReset, "upstream reset"))
            });
            HttpResponse::Ok()
                .content_type("text/event-stream")
                .streaming(head.chain(abort))
        }
        StreamReply::Status(code, body) => {
            let status = actix_web::http::StatusCode::from_u16(code)
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
            HttpResponse::build(status).body(body)
        }
    }
}

/// Keeps everything the flow reported, and can pull the plug after N events
#[derive(Default)]
pub struct RecordingReporter {
    pub initialized: Option<(StatusCode, Option<String>)>,
    pub opened: Option<StatusCode>,
    pub rejected: Option<(StatusCode, String)>,
    pub events: Vec<SseEvent>,
    pub errors: Vec<String>,
    pub finished: Option<StreamOutcome>,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl RecordingReporter {
    pub fn cancelling_after(events: usize, cancel: CancellationToken) -> Self {
        Self {
            cancel_after: Some((events, cancel)),
            ..Default::default()
        }
    }
}

impl Reporter for RecordingReporter {
    fn initializing(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn initialized(&mut self, outcome: &InitializeOutcome) -> io::Result<()> {
        self.initialized = Some((outcome.status, outcome.session_id.clone()));
        Ok(())
    }

    fn connecting(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn stream_opened(&mut self, status: StatusCode) -> io::Result<()> {
        self.opened = Some(status);
        Ok(())
    }

    fn stream_rejected(&mut self, status: StatusCode, body: &str) -> io::Result<()> {
        self.rejected = Some((status, body.to_string()));
        Ok(())
    }

    fn event(&mut self, event: &SseEvent) -> io::Result<()> {
        self.events.push(event.clone());
        if let Some((after, cancel)) = &self.cancel_after {
            if self.events.len() >= *after {
                cancel.cancel();
            }
        }
        Ok(())
    }

    fn error(&mut self, error: &ProbeError) -> io::Result<()> {
        self.errors.push(error.to_string());
        Ok(())
    }

    fn finished(&mut self, outcome: &StreamOutcome) -> io::Result<()> {
        self.finished = Some(outcome.clone());
        Ok(())
    }
}

/// An address nothing listens on
pub fn unused_base_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}

/// Answers exactly one initialize POST, then stops listening so the stream GET
/// cannot connect. Returns the base URL.
pub async fn initialize_only_server(session_id: &'static str) -> io::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        drop(listener);

        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
            if request_complete(&request) {
                break;
            }
        }

        let body = r#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\nmcp-session-id: {session_id}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    Ok(format!("http://{addr}"))
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(head_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..head_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    request.len() >= head_end + 4 + content_length
}
