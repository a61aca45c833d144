//! Transport adapters and server listeners
//!
//! Client-side adapters implement `Transport`: they carry one request envelope
//! to a server and bring back its response. Failing to get a usable response
//! is a transport error (`Error::Transport` / `Error::Timeout`); a response
//! carrying an `error` member becomes `Error::Protocol` in `Transport::call`.
//!
//! The listener modules expose a `Server` over HTTP or a line-delimited
//! stream.

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::Error;
use crate::messages::{ Request, Response };

pub mod http;
pub mod http_server;
pub mod local;
pub mod stdio_server;
pub mod stream;

pub use http::HttpTransport;
pub use local::LocalTransport;
pub use stream::StreamTransport;

/// Longest envelope accepted on a line-delimited stream, in bytes
pub const MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;

#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver one request and wait for its response
    async fn send(&self, request: Request) -> Result<Response, Error>;

    /// Release the underlying channel
    async fn close(&self) -> Result<(), Error> {
        Ok(())
    }

    /// Send a request and split the response into its result or error
    async fn call(&self, request: Request) -> Result<Value, Error> {
        let id = request.id.clone();
        let response = self.send(request).await?;
        if response.id != id {
            return Err(
                Error::Transport(
                    format!("response id {} does not match request id {}", response.id, id)
                )
            );
        }
        response.into_result()
    }
}
