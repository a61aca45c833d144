//! Executors
//!
//! An executor performs the side-effecting work behind one operation family.
//! It declares the operations it serves, runs them, and releases any live
//! resource it holds when `cleanup()` is called. Failures are returned as
//! errors; the dispatcher turns them into soft `isError` results.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::errors::Error;
use crate::types::{ CallToolResult, Tool };

pub mod browser;
pub mod codegen;
pub mod data;
pub mod files;
pub mod lazy;
pub mod search;
pub mod shell;

pub use browser::{ BrowserDriver, BrowserExecutor, BrowserSession, HttpBrowserDriver };
pub use codegen::CodegenExecutor;
pub use data::{ DataExecutor, DataStore, MemoryStore };
pub use files::FileExecutor;
pub use lazy::LazyResource;
pub use search::SearchExecutor;
pub use shell::ShellExecutor;

/// The work behind a family of named operations
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Family name used in logs
    fn family(&self) -> &str;

    /// Operations this executor serves
    fn operations(&self) -> Vec<Tool> {
        Vec::new()
    }

    /// Run one operation with arguments already checked against its schema
    async fn execute(&self, operation: &str, arguments: Value) -> Result<CallToolResult, Error>;

    /// Release held resources. Safe to call any number of times.
    async fn cleanup(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Deserialize an operation's typed parameters
pub fn parse_arguments<P: DeserializeOwned>(operation: &str, arguments: Value) -> Result<P, Error> {
    serde_json
        ::from_value(arguments)
        .map_err(|e| Error::InvalidParams(format!("{}: {}", operation, e)))
}

type Handler = Arc<dyn (Fn(Value) -> BoxFuture<'static, Result<CallToolResult, Error>>) + Send + Sync>;

/// In-process executor backed by a closure
#[derive(Clone)]
pub struct FnExecutor {
    family: String,
    handler: Handler,
}

impl FnExecutor {
    pub fn new<F, Fut>(family: impl Into<String>, handler: F) -> Self
        where
            F: Fn(Value) -> Fut + Send + Sync + 'static,
            Fut: Future<Output = Result<CallToolResult, Error>> + Send + 'static
    {
        Self {
            family: family.into(),
            handler: Arc::new(move |arguments| Box::pin(handler(arguments))),
        }
    }
}

#[async_trait]
impl ToolExecutor for FnExecutor {
    fn family(&self) -> &str {
        &self.family
    }

    async fn execute(&self, _operation: &str, arguments: Value) -> Result<CallToolResult, Error> {
        (self.handler)(arguments).await
    }
}

/// Executors for every built-in operation family
pub fn builtin_executors(config: &ServerConfig) -> Result<Vec<Arc<dyn ToolExecutor>>, Error> {
    let executors: Vec<Arc<dyn ToolExecutor>> = vec![
        Arc::new(ShellExecutor::new(config.workspace_root.clone(), config.shell_timeout)),
        Arc::new(BrowserExecutor::new(Arc::new(HttpBrowserDriver::new(config.http_timeout)))),
        Arc::new(FileExecutor::new(config.workspace_root.clone())),
        Arc::new(CodegenExecutor),
        Arc::new(SearchExecutor::new(config.search_endpoint.clone(), config.http_timeout)?),
        Arc::new(DataExecutor::new(Arc::new(MemoryStore::new())))
    ];
    Ok(executors)
}
