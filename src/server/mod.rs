//! TCP server for the line protocol

mod handler;
mod session;

pub use session::Session;

use crate::config::ServerConfig;
use crate::metrics::Metrics;
use crate::storage::Store;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Main server struct
pub struct Server {
    config: ServerConfig,
    store: Arc<dyn Store>,
    metrics: Arc<Metrics>,
    connection_semaphore: Arc<Semaphore>,
    cancel_token: CancellationToken,
}

impl Server {
    /// Create a new server sharing one store across all sessions
    pub fn new(
        config: ServerConfig,
        store: Arc<dyn Store>,
        metrics: Arc<Metrics>,
        cancel_token: CancellationToken,
    ) -> Self {
        let connection_semaphore = Arc::new(Semaphore::new(config.max_connections));

        Self {
            config,
            store,
            metrics,
            connection_semaphore,
            cancel_token,
        }
    }

    /// Bind the configured address and serve until cancelled
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let addr: SocketAddr = self.config.listen_addr.parse()?;
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", addr);

        self.serve(listener).await
    }

    /// Accept connections on `listener`, one task per session.
    ///
    /// Cancellation stops accepting; sessions already running finish on
    /// their own.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> anyhow::Result<()> {
        loop {
            tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("Server shutting down");
                    break;
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            if let Err(e) = stream.set_nodelay(true) {
                                warn!("Failed to set TCP_NODELAY: {}", e);
                            }

                            let Ok(permit) = self.connection_semaphore.clone().try_acquire_owned() else {
                                self.metrics.rejected_connections.inc();
                                warn!("Connection limit reached, rejecting connection from {}", peer_addr);
                                drop(stream);
                                continue;
                            };

                            self.metrics.total_connections.inc();
                            self.metrics.active_connections.inc();

                            let server = Arc::clone(&self);
                            let span = info_span!("session", remote = %peer_addr);
                            tokio::spawn(
                                async move {
                                    info!("Accepted connection");
                                    Session::new(
                                        stream,
                                        Arc::clone(&server.store),
                                        Arc::clone(&server.metrics),
                                        &server.config,
                                    )
                                    .run()
                                    .await;
                                    server.metrics.active_connections.dec();
                                    drop(permit);
                                }
                                .instrument(span),
                            );
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
            }
        }

        debug!("Accept loop stopped");
        Ok(())
    }
}
