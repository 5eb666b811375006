//! Client session: the read, dispatch, respond loop for one connection

use super::handler;
use crate::ProtocolError;
use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::metrics::Metrics;
use crate::protocol::{Command, ResponseWriter, tokenize};
use crate::storage::Store;
use bytes::BytesMut;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info, warn};

/// One client connection
pub struct Session<S> {
    stream: S,
    store: Arc<dyn Store>,
    metrics: Arc<Metrics>,
    read_buf: BytesMut,
    read_buffer_size: usize,
    max_line_length: usize,
    response: ResponseWriter,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        store: Arc<dyn Store>,
        metrics: Arc<Metrics>,
        config: &ServerConfig,
    ) -> Self {
        Self {
            stream,
            store,
            metrics,
            read_buf: BytesMut::with_capacity(config.read_buffer_size),
            read_buffer_size: config.read_buffer_size,
            max_line_length: config.max_line_length,
            response: ResponseWriter::new(config.write_buffer_size),
        }
    }

    /// Serve commands until end-of-stream or the first fatal error,
    /// then close the connection.
    pub async fn run(mut self) {
        loop {
            let line = match self.read_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    error!(error = %e, "Could not read command");
                    break;
                }
            };

            match self.handle_line(&line).await {
                Ok(()) => {}
                Err(SessionError::Io(e)) => {
                    debug!(error = %e, "Could not write response");
                    break;
                }
                Err(e @ SessionError::Malformed(_)) => {
                    warn!(command = %line, error = %e, "Dropping connection");
                    break;
                }
                Err(e) => {
                    error!(command = %line, error = %e, "Could not handle command");
                    break;
                }
            }
        }

        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "Shutdown error");
        }
        info!("Closed connection");
    }

    /// Read the next line without its terminator.
    ///
    /// `Ok(None)` is end-of-stream; an unterminated tail is discarded.
    async fn read_line(&mut self) -> Result<Option<String>, SessionError> {
        loop {
            if let Some(pos) = memchr::memchr(b'\n', &self.read_buf) {
                let mut line = self.read_buf.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }

            if self.read_buf.len() > self.max_line_length {
                self.metrics.protocol_errors.inc();
                return Err(ProtocolError::LineTooLong(self.max_line_length).into());
            }

            if self.read_buf.capacity() == self.read_buf.len() {
                self.read_buf.reserve(self.read_buffer_size);
            }

            let n = self.stream.read_buf(&mut self.read_buf).await?;
            if n == 0 {
                if !self.read_buf.is_empty() {
                    debug!(bytes = self.read_buf.len(), "Discarding unterminated line");
                }
                return Ok(None);
            }
            self.metrics.bytes_read.inc_by(n as u64);
        }
    }

    /// Tokenize, dispatch and answer one line.
    ///
    /// Argument errors are answered and the session goes on. Malformed
    /// quoting is answered and then ends the session, as do store errors.
    async fn handle_line(&mut self, line: &str) -> Result<(), SessionError> {
        let words = match tokenize(line) {
            Ok(words) => words,
            Err(e) => {
                self.metrics.protocol_errors.inc();
                self.response.error(&format!("malformed line: {e}"));
                self.flush().await?;
                return Err(e.into());
            }
        };

        match Command::parse(words) {
            Ok(Some(cmd)) => {
                let started = Instant::now();
                let result =
                    handler::execute(self.store.as_ref(), &self.metrics, cmd, &mut self.response)
                        .await;
                self.metrics
                    .cmd_latency
                    .observe(started.elapsed().as_secs_f64());
                result?;
            }
            Ok(None) => return Ok(()),
            Err(e) => {
                self.metrics.protocol_errors.inc();
                self.response.error(&e.to_string());
            }
        }

        self.flush().await
    }

    async fn flush(&mut self) -> Result<(), SessionError> {
        if self.response.is_empty() {
            return Ok(());
        }
        self.stream.write_all(self.response.buffer()).await?;
        self.metrics
            .bytes_written
            .inc_by(self.response.buffer().len() as u64);
        self.response.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::mock::MockStore;
    use crate::storage::{CachingStore, MemoryStore};

    async fn converse_with(store: Arc<dyn Store>, config: &ServerConfig, input: &str) -> String {
        let (mut client, server) = tokio::io::duplex(64 * 1024);
        client.write_all(input.as_bytes()).await.unwrap();
        client.shutdown().await.unwrap();

        Session::new(server, store, Arc::new(Metrics::new()), config)
            .run()
            .await;

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        out
    }

    async fn converse(store: Arc<MockStore>, input: &str) -> String {
        converse_with(store, &ServerConfig::default(), input).await
    }

    #[tokio::test]
    async fn test_eof_closes_session() {
        assert_eq!(converse(Arc::new(MockStore::new()), "").await, "");
    }

    #[tokio::test]
    async fn test_get_found() {
        let store = Arc::new(MockStore::new());
        store.on_get("bacon", Some("tasty"));

        assert_eq!(converse(store, "GET bacon\n").await, "$5\ntasty\n");
    }

    #[tokio::test]
    async fn test_get_not_found() {
        let store = Arc::new(MockStore::new());
        store.on_get("bacon", None);

        assert_eq!(converse(store, "GET bacon\n").await, "$-1\n");
    }

    #[tokio::test]
    async fn test_get_invalid_args_keeps_session_open() {
        let store = Arc::new(MockStore::new());

        assert_eq!(
            converse(Arc::clone(&store), "GET bacon cabbage\nPING\n").await,
            "-ERR wrong number of arguments for 'get' command\n\"PONG\"\n"
        );
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_get_store_error_closes_session() {
        let store = Arc::new(MockStore::new());
        store.on_get_error("bacon", "store error");

        assert_eq!(converse(store, "GET bacon\nPING\n").await, "");
    }

    #[tokio::test]
    async fn test_ping() {
        let store = Arc::new(MockStore::new());

        assert_eq!(
            converse(store, "PING\nPING \"hello world\"\n").await,
            "\"PONG\"\n\"hello world\"\n"
        );
    }

    #[tokio::test]
    async fn test_ping_invalid_args() {
        let store = Arc::new(MockStore::new());

        assert_eq!(
            converse(store, "PING hello world\n").await,
            "-ERR wrong number of arguments for 'ping' command\n"
        );
    }

    #[tokio::test]
    async fn test_set_ok() {
        let store = Arc::new(MockStore::new());

        assert_eq!(converse(Arc::clone(&store), "SET bacon tasty\n").await, "+OK\n");
        assert_eq!(store.calls(), vec!["set bacon tasty"]);
    }

    #[tokio::test]
    async fn test_set_invalid_args() {
        let store = Arc::new(MockStore::new());

        assert_eq!(
            converse(store, "SET bacon\n").await,
            "-ERR wrong number of arguments for 'set' command\n"
        );
    }

    #[tokio::test]
    async fn test_set_store_error_closes_session() {
        let store = Arc::new(MockStore::new());
        store.on_set_error("bacon", "store error");

        assert_eq!(converse(store, "SET bacon tasty\nPING\n").await, "");
    }

    #[tokio::test]
    async fn test_unknown_command() {
        let store = Arc::new(MockStore::new());

        assert_eq!(
            converse(store, "BACON test\n").await,
            "-ERR unknown command `BACON`, with args beginning with [test]\n"
        );
    }

    #[tokio::test]
    async fn test_malformed_line_closes_session() {
        let store = Arc::new(MockStore::new());

        assert_eq!(
            converse(store, "BACON \"test\nPING\n").await,
            "-ERR malformed line: EOF found when expecting closing quote\n"
        );
    }

    #[tokio::test]
    async fn test_blank_lines_are_ignored() {
        let store = Arc::new(MockStore::new());

        assert_eq!(converse(store, "\n   \nPING\n").await, "\"PONG\"\n");
    }

    #[tokio::test]
    async fn test_crlf_terminated_lines() {
        let store = Arc::new(MockStore::new());
        store.on_get("bacon", Some("tasty"));

        assert_eq!(
            converse(store, "PING\r\nGET bacon\r\n").await,
            "\"PONG\"\n$5\ntasty\n"
        );
    }

    #[tokio::test]
    async fn test_unterminated_tail_is_discarded() {
        let store = Arc::new(MockStore::new());

        assert_eq!(converse(store, "PING\nPING").await, "\"PONG\"\n");
    }

    #[tokio::test]
    async fn test_line_too_long_closes_session() {
        let config = ServerConfig {
            max_line_length: 8,
            ..ServerConfig::default()
        };

        let out = converse_with(
            Arc::new(MockStore::new()),
            &config,
            "GET aaaaaaaaaaaaaaaaaaaa",
        )
        .await;
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn test_write_failure_ends_session() {
        let (mut client, server) = tokio::io::duplex(64);
        client.write_all(b"PING\n").await.unwrap();
        drop(client);

        Session::new(
            server,
            Arc::new(MockStore::new()),
            Arc::new(Metrics::new()),
            &ServerConfig::default(),
        )
        .run()
        .await;
    }

    #[tokio::test]
    async fn test_over_caching_store() {
        let store = Arc::new(CachingStore::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryStore::new()),
        ));

        let out = converse_with(
            store,
            &ServerConfig::default(),
            "GET bacon\nSET bacon \"very tasty\"\nGET bacon\n",
        )
        .await;
        assert_eq!(out, "$-1\n+OK\n$10\nvery tasty\n");
    }
}
