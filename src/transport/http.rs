//! HTTP transport
//!
//! POSTs each envelope to a server's `/rpc` endpoint with reqwest.

use async_trait::async_trait;
use std::time::Duration;
use tracing::{ debug, warn };

use super::Transport;
use crate::errors::Error;
use crate::messages::{ Request, Response };

pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: url::Url,
    timeout: Duration,
    bearer_token: Option<String>,
}

impl HttpTransport {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, Error> {
        let endpoint = url::Url
            ::parse(endpoint)
            .map_err(|e| Error::Transport(format!("Invalid endpoint '{}': {}", endpoint, e)))?;
        let client = reqwest::Client
            ::builder()
            .build()
            .map_err(|e| Error::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            timeout,
            bearer_token: None,
        })
    }

    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, Error> {
        debug!("POST {} {} (id {})", self.endpoint, request.method, request.id);

        let mut builder = self.client.post(self.endpoint.clone()).timeout(self.timeout).json(&request);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{} timed out after {:?}", request.method, self.timeout))
            } else {
                Error::Transport(format!("Request to {} failed: {}", self.endpoint, e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} answered HTTP {}", self.endpoint, status);
            return Err(Error::Transport(format!("Server answered HTTP {}", status)));
        }

        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("{} timed out after {:?}", request.method, self.timeout))
            } else {
                Error::Transport(format!("Failed to read reply: {}", e))
            }
        })?;

        serde_json
            ::from_slice::<Response>(&body)
            .map_err(|e| Error::Transport(format!("Malformed reply: {}", e)))
    }
}
