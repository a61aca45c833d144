//! COP Error Types
//!
//! This module defines the error type shared by every layer of the crate. Two
//! channels are kept apart: transport failures (the server could not be
//! reached, timed out, or sent garbage) and protocol errors (the server
//! answered, and the answer was an `error` envelope). Soft tool and resource
//! errors never appear here; they travel inside a successful result with
//! `isError` set.

use schemars::JsonSchema;
use serde::{ Deserialize, Serialize };
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Error payload carried in the `error` field of a response envelope
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct ErrorData {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Optional additional data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// The three independent capability catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    Tool,
    Resource,
    Prompt,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityKind::Tool => write!(f, "Tool"),
            CapabilityKind::Resource => write!(f, "Resource"),
            CapabilityKind::Prompt => write!(f, "Prompt"),
        }
    }
}

/// The main Error type for the COP library
#[derive(Error, Debug)]
pub enum Error {
    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request never reached the server or the reply was unusable
    #[error("Transport error: {0}")]
    Transport(String),

    /// The caller stopped waiting for a response
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// A well-formed `error` envelope received from a server
    #[error("Protocol error {code}: {message}")]
    Protocol {
        code: i32,
        message: String,
        data: Option<Value>,
    },

    /// Method outside the fixed method surface
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Registry lookup miss
    #[error("{kind} not found: {key}")]
    NotFound {
        kind: CapabilityKind,
        key: String,
    },

    /// Client used before `connect()` completed
    #[error("Not connected")]
    NotConnected,

    /// Tool missing from the client's cached catalog
    #[error("Tool not found in session cache: {0}")]
    ToolNotFound(String),

    /// An executor failed to carry out an operation
    #[error("Execution failed: {0}")]
    Execution(String),

    /// Arguments rejected by a tool's input schema
    #[error("Validation error: {0}")]
    Validation(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// JSON-RPC 2.0 error codes plus the protocol's own range
pub mod error_codes {
    /// Parse error
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid request
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error
    pub const INTERNAL_ERROR: i32 = -32603;
    /// Capability lookup miss (unknown prompt name)
    pub const NOT_FOUND: i32 = -32002;
    /// Client-side only: session not connected
    pub const NOT_CONNECTED: i32 = -32003;
    /// Client-side only: request timed out
    pub const REQUEST_TIMEOUT: i32 = -32004;
}

impl Error {
    /// Convert an error to a JSON-RPC error code
    pub fn to_code(&self) -> i32 {
        use error_codes::*;
        match self {
            Error::Json(_) => PARSE_ERROR,
            Error::Protocol { code, .. } => *code,
            Error::MethodNotFound(_) => METHOD_NOT_FOUND,
            Error::InvalidParams(_) | Error::Validation(_) => INVALID_PARAMS,
            Error::NotFound { .. } | Error::ToolNotFound(_) => NOT_FOUND,
            Error::NotConnected => NOT_CONNECTED,
            Error::Timeout(_) => REQUEST_TIMEOUT,
            Error::Io(_) | Error::Transport(_) | Error::Execution(_) | Error::Other(_) =>
                INTERNAL_ERROR,
        }
    }

    /// True when the failure happened before a usable server answer was
    /// obtained, including a reply that could not be decoded
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Timeout(_) | Error::Io(_) | Error::Json(_))
    }

    /// True when a server answered with an `error` envelope
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            Error::Protocol { .. } |
                Error::MethodNotFound(_) |
                Error::NotFound { .. } |
                Error::InvalidParams(_)
        )
    }

    /// Build the `error` payload of a response envelope
    pub fn to_error_data(&self) -> ErrorData {
        match self {
            Error::Protocol { code, message, data } =>
                ErrorData {
                    code: *code,
                    message: message.clone(),
                    data: data.clone(),
                },
            Error::NotFound { kind, key } =>
                ErrorData {
                    code: self.to_code(),
                    message: self.to_string(),
                    data: Some(serde_json::json!({ "kind": kind.to_string(), "key": key })),
                },
            _ =>
                ErrorData {
                    code: self.to_code(),
                    message: self.to_string(),
                    data: None,
                },
        }
    }

    /// Lift a received `error` payload into an error value
    pub fn from_error_data(error: ErrorData) -> Self {
        Error::Protocol {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}
