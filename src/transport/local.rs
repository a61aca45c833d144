//! In-process transport
//!
//! Hands envelopes straight to a `Server` without crossing any boundary.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::Transport;
use crate::errors::Error;
use crate::messages::{ Request, Response };
use crate::server::Server;

pub struct LocalTransport {
    server: Arc<Server>,
    timeout: Duration,
}

impl LocalTransport {
    pub fn new(server: Arc<Server>, timeout: Duration) -> Self {
        Self { server, timeout }
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, request: Request) -> Result<Response, Error> {
        let method = request.method.clone();
        tokio::time
            ::timeout(self.timeout, self.server.handle_request(request)).await
            .map_err(|_| Error::Timeout(format!("{} timed out after {:?}", method, self.timeout)))
    }
}
