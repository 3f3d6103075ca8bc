//! Stdin/stdout JSON bridge for the catalog host.
//!
//! Reads newline-delimited JSON `CommandEnvelope` messages, handles each one
//! on its own task, and writes `ResponseEnvelope` messages as newline-delimited
//! JSON. Responses may be written in a different order than requests arrive;
//! clients correlate them by `request_id`.
//!
//! Stdout is exclusively reserved for the JSON protocol; all diagnostic
//! output (tracing, logs) must be routed to stderr.

use gourmet_query::QueryExecutor;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::{HostError, Result};
use crate::host::contract::{CommandEnvelope, CommandName, ResponseEnvelope};
use crate::host::handler::CatalogHandler;

type SharedWriter<W> = Arc<Mutex<BufWriter<W>>>;

/// Run the bridge over the process's stdin and stdout.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or stdout cannot be written.
pub async fn run_stdio_bridge<E: QueryExecutor + 'static>(
    handler: CatalogHandler<E>,
    max_in_flight: usize,
    shutdown: CancellationToken,
) -> Result<()> {
    run_bridge(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        handler,
        max_in_flight,
        shutdown,
    )
    .await
}

/// Run the bridge until the input closes, `runtime.stop` arrives, or
/// `shutdown` is cancelled.
///
/// At most `max_in_flight` requests run at once; the reader waits for a free
/// slot before accepting the next line. On input EOF in-flight requests run
/// to completion. On `runtime.stop` or `shutdown` they are cancelled and
/// answer with a `cancelled` error.
///
/// # Errors
///
/// Returns an error if the input cannot be read or the output cannot be
/// written.
pub async fn run_bridge<R, W, E>(
    mut reader: R,
    writer: W,
    handler: CatalogHandler<E>,
    max_in_flight: usize,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    E: QueryExecutor + 'static,
{
    let writer: SharedWriter<W> = Arc::new(Mutex::new(BufWriter::new(writer)));
    let slots = Arc::new(Semaphore::new(max_in_flight.max(1)));
    let mut tasks = JoinSet::new();
    let mut buf = Vec::new();

    let stop = loop {
        buf.clear();
        let bytes_read = tokio::select! {
            () = shutdown.cancelled() => {
                tracing::info!("shutdown requested; stopping bridge");
                break None;
            }
            read = reader.read_until(b'\n', &mut buf) => read
                .map_err(|e| HostError::Channel(format!("failed to read from input: {e}")))?,
        };

        if bytes_read == 0 {
            tracing::info!("input closed (EOF); draining in-flight requests");
            break None;
        }

        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line,
            Err(e) => {
                tracing::warn!(error = %e, bytes = bytes_read, "input line is not valid UTF-8");
                let response = ResponseEnvelope::error(
                    "parse-error",
                    "invalid_envelope",
                    format!("command line is not valid UTF-8: {e}"),
                );
                write_response(&writer, &response).await?;
                continue;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let envelope: CommandEnvelope = match serde_json::from_str(trimmed) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    raw_line = %trimmed,
                    "failed to parse command envelope"
                );
                let response = ResponseEnvelope::error(
                    "parse-error",
                    "invalid_envelope",
                    format!("failed to parse command envelope: {e}"),
                );
                write_response(&writer, &response).await?;
                continue;
            }
        };

        if envelope.command == CommandName::RuntimeStop {
            break Some(envelope);
        }

        while let Some(joined) = tasks.try_join_next() {
            log_join(joined);
        }

        let permit = Arc::clone(&slots)
            .acquire_owned()
            .await
            .map_err(|e| HostError::Channel(format!("request slots closed: {e}")))?;
        let handler = handler.clone();
        let writer = Arc::clone(&writer);
        let cancel = shutdown.child_token();
        tracing::debug!(
            request_id = %envelope.request_id,
            command = envelope.command.as_str(),
            "dispatching command"
        );
        tasks.spawn(async move {
            let response = handler.handle(envelope, cancel).await;
            drop(permit);
            write_response(&writer, &response).await
        });
    };

    if stop.is_some() {
        tracing::info!("runtime.stop received; cancelling in-flight requests");
        shutdown.cancel();
    }
    while let Some(joined) = tasks.join_next().await {
        log_join(joined);
    }

    if let Some(envelope) = stop {
        let response = handler.handle(envelope, CancellationToken::new()).await;
        write_response(&writer, &response).await?;
    }

    Ok(())
}

fn log_join(joined: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "failed to write response"),
        Err(e) => tracing::error!(error = %e, "request task failed"),
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &SharedWriter<W>,
    response: &ResponseEnvelope,
) -> Result<()> {
    let json = serde_json::to_string(response)
        .map_err(|e| HostError::Channel(format!("failed to serialize response envelope: {e}")))?;
    let mut w = writer.lock().await;
    write_line(&mut w, &json).await
}

/// Write a single JSON line to the buffered writer and flush.
async fn write_line<W: AsyncWrite + Unpin>(writer: &mut BufWriter<W>, json: &str) -> Result<()> {
    writer
        .write_all(json.as_bytes())
        .await
        .map_err(|e| HostError::Channel(format!("failed to write output: {e}")))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| HostError::Channel(format!("failed to write newline: {e}")))?;
    writer
        .flush()
        .await
        .map_err(|e| HostError::Channel(format!("failed to flush output: {e}")))?;
    Ok(())
}
