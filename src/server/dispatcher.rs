//! Request dispatcher
//!
//! Routes a `(method, params)` pair over the fixed method surface. Tool and
//! resource misses, argument validation failures and executor failures
//! (including panics) come back as soft `isError` results. Unknown prompts,
//! unknown methods and methods for capabilities the server does not advertise
//! are hard errors.

use futures::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{ debug, warn };

use crate::errors::Error;
use crate::messages::Method;
use crate::registry::CapabilityRegistry;
use crate::types::{
    CallToolParams,
    CallToolResult,
    GetPromptParams,
    ListPromptsResult,
    ListResourcesResult,
    ListToolsResult,
    ReadResourceParams,
    ServerIdentity,
};
use crate::validation::validate_arguments;

pub struct Dispatcher {
    identity: ServerIdentity,
    registry: Arc<CapabilityRegistry>,
}

fn parse_params<P: DeserializeOwned>(method: Method, params: Option<Value>) -> Result<P, Error> {
    let params = params.ok_or_else(||
        Error::InvalidParams(format!("Missing parameters for {}", method))
    )?;
    serde_json
        ::from_value(params)
        .map_err(|e| Error::InvalidParams(format!("{}: {}", method, e)))
}

fn to_result<T: Serialize>(value: T) -> Result<Value, Error> {
    Ok(serde_json::to_value(value)?)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Soft error result whose text is never empty
fn failure(subject: &str, error: &Error) -> CallToolResult {
    let message = error.to_string();
    if message.trim().is_empty() {
        CallToolResult::error(format!("{} failed", subject))
    } else {
        CallToolResult::error(message)
    }
}

impl Dispatcher {
    pub fn new(identity: ServerIdentity, registry: Arc<CapabilityRegistry>) -> Self {
        Self { identity, registry }
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    fn check_capability(&self, method: Method) -> Result<(), Error> {
        let capabilities = &self.identity.capabilities;
        let advertised = match method {
            Method::Initialize => true,
            Method::ListTools | Method::CallTool => capabilities.supports_tools(),
            Method::ListResources | Method::ReadResource => capabilities.supports_resources(),
            Method::ListPrompts | Method::GetPrompt => capabilities.supports_prompts(),
        };
        if advertised { Ok(()) } else { Err(Error::MethodNotFound(method.to_string())) }
    }

    /// Handle one call and produce its result payload
    pub async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value, Error> {
        let method: Method = method.parse()?;
        self.check_capability(method)?;

        match method {
            Method::Initialize => to_result(&self.identity),
            Method::ListTools => to_result(ListToolsResult { tools: self.registry.list_tools() }),
            Method::CallTool => {
                let params: CallToolParams = parse_params(method, params)?;
                to_result(self.call_tool(params).await)
            }
            Method::ListResources =>
                to_result(ListResourcesResult { resources: self.registry.list_resources() }),
            Method::ReadResource => {
                let params: ReadResourceParams = parse_params(method, params)?;
                to_result(self.read_resource(params).await)
            }
            Method::ListPrompts =>
                to_result(ListPromptsResult { prompts: self.registry.list_prompts() }),
            Method::GetPrompt => {
                let params: GetPromptParams = parse_params(method, params)?;
                let template = self.registry.prompt(&params.name)?;
                to_result(template.render(&params.arguments)?)
            }
        }
    }

    pub async fn call_tool(&self, params: CallToolParams) -> CallToolResult {
        let entry = match self.registry.tool(&params.name) {
            Ok(entry) => entry,
            Err(_) => {
                warn!("Call to unknown tool '{}'", params.name);
                return CallToolResult::error(format!("Tool not found: {}", params.name));
            }
        };

        let arguments = Value::Object(params.arguments);
        if let Err(e) = validate_arguments(&entry.tool, &arguments) {
            debug!("Rejected arguments for '{}': {}", params.name, e);
            return failure(&params.name, &e);
        }

        debug!("Calling '{}' on {} executor", params.name, entry.executor.family());
        let run = entry.executor.execute(&entry.tool.name, arguments);
        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                warn!("Tool '{}' failed: {}", params.name, e);
                failure(&params.name, &e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                warn!("Tool '{}' panicked: {}", params.name, message);
                CallToolResult::error(format!("Tool '{}' panicked: {}", params.name, message))
            }
        }
    }

    pub async fn read_resource(&self, params: ReadResourceParams) -> CallToolResult {
        let entry = match self.registry.resource(&params.uri) {
            Ok(entry) => entry,
            Err(_) => {
                warn!("Read of unknown resource '{}'", params.uri);
                return CallToolResult::error(format!("Resource not found: {}", params.uri));
            }
        };

        let read = entry.provider.read(&entry.resource);
        match AssertUnwindSafe(read).catch_unwind().await {
            Ok(Ok(content)) => CallToolResult::success(content),
            Ok(Err(e)) => {
                warn!("Reading '{}' failed: {}", params.uri, e);
                failure(&params.uri, &e)
            }
            Err(panic) => {
                CallToolResult::error(
                    format!("Reading '{}' panicked: {}", params.uri, panic_message(panic.as_ref()))
                )
            }
        }
    }
}
