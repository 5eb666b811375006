//! Command handlers for the line protocol

use crate::error::SessionError;
use crate::metrics::Metrics;
use crate::protocol::{Command, ResponseWriter};
use crate::storage::Store;

/// Execute a parsed command, writing its response.
///
/// Store failures are returned instead of being answered; the session
/// ends on them.
pub async fn execute(
    store: &dyn Store,
    metrics: &Metrics,
    cmd: Command,
    response: &mut ResponseWriter,
) -> Result<(), SessionError> {
    metrics.record_command(cmd.kind());

    match cmd {
        Command::Get { key } => handle_get(store, metrics, &key, response).await,
        Command::Set { key, value } => handle_set(store, metrics, &key, &value, response).await,
        Command::Ping { message } => {
            response.quoted(message.as_deref().unwrap_or("PONG"));
            Ok(())
        }
        Command::Unknown { name, args } => {
            response.unknown_command(&name, &args);
            Ok(())
        }
    }
}

/// Handle GET command
async fn handle_get(
    store: &dyn Store,
    metrics: &Metrics,
    key: &str,
    response: &mut ResponseWriter,
) -> Result<(), SessionError> {
    match store.get(key).await {
        Ok(Some(value)) => {
            metrics.get_hits.inc();
            response.bulk(&value);
            Ok(())
        }
        Ok(None) => {
            metrics.get_misses.inc();
            response.nil();
            Ok(())
        }
        Err(e) => {
            metrics.store_errors.inc();
            Err(SessionError::StoreRead(e))
        }
    }
}

/// Handle SET command
async fn handle_set(
    store: &dyn Store,
    metrics: &Metrics,
    key: &str,
    value: &str,
    response: &mut ResponseWriter,
) -> Result<(), SessionError> {
    match store.set(key, value).await {
        Ok(()) => {
            response.ok();
            Ok(())
        }
        Err(e) => {
            metrics.store_errors.inc();
            Err(SessionError::StoreWrite(e))
        }
    }
}
