//! COP Message Types
//!
//! This module defines the request and response envelopes exchanged between an
//! orchestration client and a capability server, the request identifier used
//! for correlation, and the closed set of methods a server understands.

use crate::errors::{ Error, ErrorData };
use serde::{ Deserialize, Deserializer, Serialize };
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Protocol version tag carried on every envelope
pub const JSONRPC_VERSION: &str = "2.0";

/// Identifier correlating a response with its request
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    /// Only used on error responses to requests whose id could not be read
    Null,
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{}", n),
            RequestId::String(s) => write!(f, "{}", s),
            RequestId::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::String(id.to_string())
    }
}

/// The fixed method surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Initialize,
    ListTools,
    CallTool,
    ListResources,
    ReadResource,
    ListPrompts,
    GetPrompt,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Initialize => "initialize",
            Method::ListTools => "tools/list",
            Method::CallTool => "tools/call",
            Method::ListResources => "resources/list",
            Method::ReadResource => "resources/read",
            Method::ListPrompts => "prompts/list",
            Method::GetPrompt => "prompts/get",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initialize" => Ok(Method::Initialize),
            "tools/list" => Ok(Method::ListTools),
            "tools/call" => Ok(Method::CallTool),
            "resources/list" => Ok(Method::ListResources),
            "resources/read" => Ok(Method::ReadResource),
            "prompts/list" => Ok(Method::ListPrompts),
            "prompts/get" => Ok(Method::GetPrompt),
            other => Err(Error::MethodNotFound(other.to_string())),
        }
    }
}

/// Request envelope
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Request {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Caller-generated correlator, unique per in-flight request
    pub id: RequestId,
    /// Method name (e.g., "tools/call")
    pub method: String,
    /// Structured arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: id.into(),
            method: method.into(),
            params,
        }
    }
}

/// Exactly one of a result or an error
#[derive(Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum ResponseOutcome {
    /// Success case with a result
    Success {
        result: Value,
    },
    /// Error case with error details
    Error {
        error: ErrorData,
    },
}

/// Response envelope
#[derive(Serialize, Debug, Clone)]
pub struct Response {
    /// Always "2.0"
    pub jsonrpc: String,
    /// Same correlator as the request
    pub id: RequestId,
    /// Either a result or an error
    #[serde(flatten)]
    pub outcome: ResponseOutcome,
}

impl Response {
    /// Build a success response
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: ResponseOutcome::Success { result },
        }
    }

    /// Build an error response from an error value
    pub fn from_error(id: RequestId, error: &Error) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            outcome: ResponseOutcome::Error { error: error.to_error_data() },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Error { .. })
    }

    /// Split into the result value or a protocol error
    pub fn into_result(self) -> Result<Value, Error> {
        match self.outcome {
            ResponseOutcome::Success { result } => Ok(result),
            ResponseOutcome::Error { error } => Err(Error::from_error_data(error)),
        }
    }
}

// Decoded by hand so that a reply carrying both or neither of `result` and
// `error` is rejected instead of silently picking one.
impl<'de> Deserialize<'de> for Response {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error> where D: Deserializer<'de> {
        use serde::de::Error as _;

        let mut value = Value::deserialize(deserializer)?;
        let object = value
            .as_object_mut()
            .ok_or_else(|| D::Error::custom("response must be a JSON object"))?;

        let jsonrpc = match object.remove("jsonrpc") {
            Some(Value::String(version)) => version,
            _ => {
                return Err(D::Error::custom("missing jsonrpc field"));
            }
        };

        let id = object.remove("id").ok_or_else(|| D::Error::custom("missing id field"))?;
        let id: RequestId = serde_json::from_value(id).map_err(D::Error::custom)?;

        let outcome = match (object.remove("result"), object.remove("error")) {
            (Some(result), None) => ResponseOutcome::Success { result },
            (None, Some(error)) => {
                let error: ErrorData = serde_json::from_value(error).map_err(D::Error::custom)?;
                ResponseOutcome::Error { error }
            }
            (Some(_), Some(_)) => {
                return Err(D::Error::custom("response carries both result and error"));
            }
            (None, None) => {
                return Err(D::Error::custom("response carries neither result nor error"));
            }
        };

        Ok(Response { jsonrpc, id, outcome })
    }
}
