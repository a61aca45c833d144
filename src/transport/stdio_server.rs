//! Line-delimited stream listener
//!
//! Reads one request envelope per line and writes one response per line.
//! Each request runs on its own task, so responses are written in completion
//! order rather than arrival order.

use futures::{ SinkExt, StreamExt };
use std::sync::Arc;
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::sync::{ Semaphore, mpsc };
use tokio_util::codec::{ FramedRead, FramedWrite, LinesCodec, LinesCodecError };
use tracing::{ debug, error, info, warn };

use super::MAX_LINE_LENGTH;
use crate::errors::{ Error, error_codes };
use crate::messages::{ RequestId, Response };
use crate::server::Server;

/// Requests handled at once; reading pauses while all slots are busy
const MAX_IN_FLIGHT: usize = 64;

/// Serve requests from `reader` until it reaches end of input
pub async fn serve_stream<R, W>(server: Arc<Server>, reader: R, writer: W) -> Result<(), Error>
    where R: AsyncRead + Unpin, W: AsyncWrite + Send + Unpin + 'static
{
    serve_stream_with_limit(server, reader, writer, MAX_LINE_LENGTH).await
}

/// Like `serve_stream`, rejecting request lines longer than `max_line_length`
pub async fn serve_stream_with_limit<R, W>(
    server: Arc<Server>,
    reader: R,
    writer: W,
    max_line_length: usize
) -> Result<(), Error>
    where R: AsyncRead + Unpin, W: AsyncWrite + Send + Unpin + 'static
{
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(max_line_length));
    let mut sink = FramedWrite::new(writer, LinesCodec::new());
    let slots = Arc::new(Semaphore::new(MAX_IN_FLIGHT));
    let (tx, mut rx) = mpsc::channel::<Response>(64);

    let writer_task = tokio::spawn(async move {
        while let Some(response) = rx.recv().await {
            let line = match serde_json::to_string(&response) {
                Ok(line) => line,
                Err(e) => {
                    error!("Failed to encode response {}: {}", response.id, e);
                    continue;
                }
            };
            if let Err(e) = sink.send(line).await {
                warn!("Failed to write response: {}", e);
                break;
            }
        }
    });

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(LinesCodecError::MaxLineLengthExceeded) => {
                warn!("Rejected request line longer than {} bytes", max_line_length);
                let error = Error::Protocol {
                    code: error_codes::INVALID_REQUEST,
                    message: format!("Request exceeds {} bytes", max_line_length),
                    data: None,
                };
                if tx.send(Response::from_error(RequestId::Null, &error)).await.is_err() {
                    break;
                }
                continue;
            }
            Err(e) => {
                warn!("Stream read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let permit = match slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => break,
        };
        let server = server.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let response = server.handle_raw(&line).await;
            drop(permit);
            if tx.send(response).await.is_err() {
                debug!("Response dropped; writer has stopped");
            }
        });
    }

    // in-flight requests hold their own sender, so the writer drains them first
    drop(tx);
    writer_task.await.map_err(|e| Error::Transport(format!("Writer task failed: {}", e)))?;
    info!("Input stream closed");
    Ok(())
}

/// Serve requests over the process's stdin and stdout
pub async fn serve_stdio(server: Arc<Server>) -> Result<(), Error> {
    info!("Serving requests on stdio");
    serve_stream(server, tokio::io::stdin(), tokio::io::stdout()).await
}
