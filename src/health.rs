//! Minimal HTTP endpoint for health, readiness and metrics

use crate::config::MetricsConfig;
use crate::metrics::Metrics;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Health server state
pub struct HealthServer {
    metrics: Arc<Metrics>,
    ready: AtomicBool,
}

struct Reply {
    status: u16,
    content_type: &'static str,
    body: String,
}

impl Reply {
    fn new(status: u16, content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    fn render(&self) -> String {
        let status_text = match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            503 => "Service Unavailable",
            _ => "Unknown",
        };

        format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            self.status,
            status_text,
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

impl HealthServer {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            ready: AtomicBool::new(false),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    /// Serve HTTP requests until cancelled
    pub async fn run(
        self: Arc<Self>,
        config: MetricsConfig,
        cancel_token: CancellationToken,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(&config.listen_addr).await?;
        info!("Health server listening on {}", config.listen_addr);

        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                result = listener.accept() => match result {
                    Ok((stream, _)) => {
                        let server = Arc::clone(&self);
                        tokio::spawn(async move {
                            if let Err(e) = server.handle_connection(stream).await {
                                debug!("Health connection error: {}", e);
                            }
                        });
                    }
                    Err(e) => error!("Health server accept error: {}", e),
                },
            }
        }

        info!("Health server stopped");
        Ok(())
    }

    async fn handle_connection(&self, stream: TcpStream) -> std::io::Result<()> {
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;

        let reply = self.route(&request_line);
        let mut stream = reader.into_inner();
        stream.write_all(reply.render().as_bytes()).await?;
        stream.shutdown().await
    }

    /// Answer a request line such as `GET /path HTTP/1.1`
    fn route(&self, request_line: &str) -> Reply {
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(path)) = (parts.next(), parts.next()) else {
            return Reply::new(400, "text/plain", "Bad Request");
        };

        if method != "GET" {
            return Reply::new(405, "text/plain", "Method Not Allowed");
        }

        match path {
            "/health" | "/healthz" => {
                Reply::new(200, "application/json", r#"{"status":"healthy"}"#)
            }
            "/ready" | "/readyz" if self.is_ready() => {
                Reply::new(200, "application/json", r#"{"status":"ready"}"#)
            }
            "/ready" | "/readyz" => {
                Reply::new(503, "application/json", r#"{"status":"not ready"}"#)
            }
            "/metrics" => Reply::new(200, "text/plain; version=0.0.4", self.metrics.gather()),
            _ => Reply::new(404, "text/plain", "Not Found"),
        }
    }
}
