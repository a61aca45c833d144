//! Line-delimited stream transport
//!
//! Writes one JSON envelope per line and reads responses on a background
//! task. Responses are matched to waiting callers by request id, so any number
//! of requests can be outstanding and they may complete in any order.

use async_trait::async_trait;
use futures::{ SinkExt, StreamExt };
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{ AsyncRead, AsyncWrite };
use tokio::process::{ Child, Command };
use tokio::sync::{ Mutex, oneshot };
use tokio::task::JoinHandle;
use tokio_util::codec::{ FramedRead, FramedWrite, LinesCodec };
use tracing::{ debug, info, warn };

use super::{ MAX_LINE_LENGTH, Transport };
use crate::errors::Error;
use crate::messages::{ Request, RequestId, Response };

type Writer = FramedWrite<Box<dyn AsyncWrite + Send + Unpin>, LinesCodec>;

type Reply = Result<Response, Error>;

#[derive(Default)]
struct Waiters {
    senders: HashMap<RequestId, oneshot::Sender<Reply>>,
    /// Set once the reader has stopped; nothing can be answered after that
    closed: bool,
}

/// Callers waiting for a response, by request id
#[derive(Default)]
struct PendingRequests {
    waiting: Mutex<Waiters>,
}

impl PendingRequests {
    async fn register(&self, id: RequestId) -> Result<oneshot::Receiver<Reply>, Error> {
        let mut waiting = self.waiting.lock().await;
        if waiting.closed {
            return Err(Error::Transport("Connection is closed".to_string()));
        }
        if waiting.senders.contains_key(&id) {
            return Err(Error::Transport(format!("request id {} is already in flight", id)));
        }
        let (tx, rx) = oneshot::channel();
        waiting.senders.insert(id, tx);
        Ok(rx)
    }

    async fn resolve(&self, id: &RequestId, reply: Reply) {
        let sender = self.waiting.lock().await.senders.remove(id);
        match sender {
            Some(sender) => {
                if sender.send(reply).is_err() {
                    debug!("Caller stopped waiting before the response arrived");
                }
            }
            None => warn!("Received response for unknown request id {}", id),
        }
    }

    async fn complete(&self, response: Response) {
        let id = response.id.clone();
        self.resolve(&id, Ok(response)).await;
    }

    async fn forget(&self, id: &RequestId) {
        self.waiting.lock().await.senders.remove(id);
    }

    /// Refuse new requests and drop every waiter; their receivers observe a
    /// closed channel
    async fn close(&self) {
        let mut waiting = self.waiting.lock().await;
        waiting.closed = true;
        waiting.senders.clear();
    }
}

/// Id of a reply that could not be decoded as a response, if it has one
fn reply_id(line: &str) -> Option<RequestId> {
    let value: Value = serde_json::from_str(line).ok()?;
    match serde_json::from_value::<RequestId>(value.get("id")?.clone()).ok()? {
        RequestId::Null => None,
        id => Some(id),
    }
}

pub struct StreamTransport {
    writer: Mutex<Writer>,
    pending: Arc<PendingRequests>,
    reader: JoinHandle<()>,
    child: Mutex<Option<Child>>,
    timeout: Duration,
}

impl StreamTransport {
    pub fn new<R, W>(reader: R, writer: W, timeout: Duration) -> Self
        where R: AsyncRead + Send + Unpin + 'static, W: AsyncWrite + Send + Unpin + 'static
    {
        let pending = Arc::new(PendingRequests::default());
        let reader = tokio::spawn(read_responses(reader, pending.clone()));
        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);

        Self {
            writer: Mutex::new(FramedWrite::new(writer, LinesCodec::new_with_max_length(MAX_LINE_LENGTH))),
            pending,
            reader,
            child: Mutex::new(None),
            timeout,
        }
    }

    /// Start a server process and talk to it over its stdin/stdout
    pub fn spawn_process(program: &str, args: &[&str], timeout: Duration) -> Result<Self, Error> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Transport(format!("Failed to spawn {}: {}", program, e)))?;

        let stdin = child.stdin
            .take()
            .ok_or_else(|| Error::Transport("Failed to capture stdin".to_string()))?;
        let stdout = child.stdout
            .take()
            .ok_or_else(|| Error::Transport("Failed to capture stdout".to_string()))?;

        info!("Spawned server process {}", program);
        let mut transport = Self::new(stdout, stdin, timeout);
        transport.child = Mutex::new(Some(child));
        Ok(transport)
    }
}

async fn read_responses<R: AsyncRead + Unpin>(reader: R, pending: Arc<PendingRequests>) {
    let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) if line.trim().is_empty() => {}
            Ok(line) =>
                match serde_json::from_str::<Response>(&line) {
                    Ok(response) => pending.complete(response).await,
                    Err(e) =>
                        match reply_id(&line) {
                            Some(id) => {
                                warn!("Malformed reply to request {}: {}", id, e);
                                let error = Error::Transport(format!("Malformed reply: {}", e));
                                pending.resolve(&id, Err(error)).await;
                            }
                            None => warn!("Discarding malformed reply: {}", e),
                        }
                }
            Err(e) => {
                warn!("Stream read failed: {}", e);
                break;
            }
        }
    }
    debug!("Response stream closed");
    pending.close().await;
}

#[async_trait]
impl Transport for StreamTransport {
    async fn send(&self, request: Request) -> Result<Response, Error> {
        let id = request.id.clone();
        let method = request.method.clone();
        let line = serde_json::to_string(&request)?;

        let rx = self.pending.register(id.clone()).await?;
        if let Err(e) = self.writer.lock().await.send(line).await {
            self.pending.forget(&id).await;
            return Err(Error::Transport(format!("Failed to write request: {}", e)));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(Error::Transport("Connection closed before a response arrived".to_string())),
            Err(_) => {
                self.pending.forget(&id).await;
                Err(Error::Timeout(format!("{} timed out after {:?}", method, self.timeout)))
            }
        }
    }

    async fn close(&self) -> Result<(), Error> {
        let _ = SinkExt::<String>::close(&mut *self.writer.lock().await).await;
        self.reader.abort();
        self.pending.close().await;
        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.kill().await;
        }
        Ok(())
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::JSONRPC_VERSION;
    use serde_json::json;
    use tokio::io::{ AsyncBufReadExt, AsyncWriteExt, BufReader };

    #[tokio::test]
    async fn out_of_order_responses_reach_their_callers() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (server_read, mut server_write) = tokio::io::split(server_io);
        let transport = Arc::new(StreamTransport::new(client_read, client_write, Duration::from_secs(5)));

        // A fake server that answers the two requests in reverse order
        let fake = tokio::spawn(async move {
            let mut lines = BufReader::new(server_read).lines();
            let first: Request = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
            let second: Request = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
            for request in [second, first] {
                let reply = json!({
                    "jsonrpc": JSONRPC_VERSION,
                    "id": request.id,
                    "result": { "echo": request.method }
                });
                server_write.write_all(format!("{}\n", reply).as_bytes()).await.unwrap();
            }
        });

        let a = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.call(Request::new(1, "tools/list", None)).await })
        };
        // make sure request 1 is written first
        tokio::time::sleep(Duration::from_millis(50)).await;
        let b = transport.call(Request::new(2, "prompts/list", None)).await.unwrap();
        let a = a.await.unwrap().unwrap();

        assert_eq!(a["echo"], "tools/list");
        assert_eq!(b["echo"], "prompts/list");
        fake.await.unwrap();
    }

    #[tokio::test]
    async fn closed_stream_fails_waiting_callers() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let transport = StreamTransport::new(client_read, client_write, Duration::from_secs(5));

        let closer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(server_io);
        });
        let err = transport.send(Request::new(1, "initialize", None)).await.unwrap_err();
        assert!(err.is_transport());
        closer.await.unwrap();
    }

    #[tokio::test]
    async fn unanswered_requests_time_out() {
        let (client_io, _server_io) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let transport = StreamTransport::new(client_read, client_write, Duration::from_millis(50));

        let err = transport.send(Request::new(1, "initialize", None)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        // the id is free again
        let err = transport.send(Request::new(1, "initialize", None)).await.unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
    }

    #[tokio::test]
    async fn malformed_reply_is_a_transport_error() {
        let (client_io, server_io) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (server_read, mut server_write) = tokio::io::split(server_io);
        let transport = StreamTransport::new(client_read, client_write, Duration::from_secs(5));

        // answers with both a result and an error
        let fake = tokio::spawn(async move {
            let mut lines = BufReader::new(server_read).lines();
            let request: Request = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
            let reply = json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": request.id,
                "result": {},
                "error": { "code": -32603, "message": "both" }
            });
            server_write.write_all(format!("{}\n", reply).as_bytes()).await.unwrap();
            (lines, server_write)
        });

        let started = std::time::Instant::now();
        let err = transport.send(Request::new(1, "initialize", None)).await.unwrap_err();
        assert!(matches!(err, Error::Transport(ref m) if m.contains("Malformed reply")));
        assert!(started.elapsed() < Duration::from_secs(1));
        let _open = fake.await.unwrap();
    }

    #[tokio::test]
    async fn requests_after_the_stream_ends_fail_fast() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let transport = StreamTransport::new(client_read, client_write, Duration::from_secs(5));
        drop(server_io);

        // let the reader observe end of input
        for _ in 0..50 {
            if transport.pending.waiting.lock().await.closed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let started = std::time::Instant::now();
        let err = transport.send(Request::new(1, "initialize", None)).await.unwrap_err();
        assert!(err.is_transport());
        assert!(!matches!(err, Error::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
