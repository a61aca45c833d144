//! COP Server
//!
//! The `Server` owns the capability registry, the dispatcher and every
//! executor registered with it. Listeners hand it request envelopes (or raw
//! text) and write back whatever response it produces. `shutdown()` runs each
//! executor's cleanup.

use serde_json::Value;
use std::sync::{ Arc, PoisonError, RwLock };
use tracing::{ debug, error, info };

use crate::config::ServerConfig;
use crate::errors::{ Error, error_codes };
use crate::executors::{ ToolExecutor, builtin_executors };
use crate::messages::{ Request, RequestId, Response };
use crate::registry::CapabilityRegistry;
use crate::resources::ResourceProvider;
use crate::server::dispatcher::Dispatcher;
use crate::types::{ PromptTemplate, Resource, ServerIdentity, Tool };

pub struct Server {
    config: ServerConfig,
    registry: Arc<CapabilityRegistry>,
    dispatcher: Dispatcher,
    executors: RwLock<Vec<Arc<dyn ToolExecutor>>>,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        let identity = ServerIdentity {
            protocol_version: config.protocol_version.clone(),
            capabilities: config.capabilities.clone(),
            server_info: config.server_info(),
            instructions: config.instructions.clone(),
        };
        let registry = Arc::new(CapabilityRegistry::new());
        let dispatcher = Dispatcher::new(identity, registry.clone());

        Self {
            config,
            registry,
            dispatcher,
            executors: RwLock::new(Vec::new()),
        }
    }

    /// Register every built-in operation family
    pub fn with_builtin_tools(self) -> Result<Self, Error> {
        for executor in builtin_executors(&self.config)? {
            self.register_executor(executor);
        }
        Ok(self)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn identity(&self) -> &ServerIdentity {
        self.dispatcher.identity()
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Register all operations an executor declares
    pub fn register_executor(&self, executor: Arc<dyn ToolExecutor>) {
        for tool in executor.operations() {
            self.register_tool(tool, executor.clone());
        }
        self.track(executor);
    }

    /// Register (or replace) one operation
    pub fn register_tool(&self, tool: Tool, executor: Arc<dyn ToolExecutor>) {
        self.registry.register_tool(tool, executor.clone());
        self.track(executor);
    }

    pub fn register_resource(&self, resource: Resource, provider: Arc<dyn ResourceProvider>) {
        self.registry.register_resource(resource, provider);
    }

    pub fn register_prompt(&self, template: PromptTemplate) {
        self.registry.register_prompt(template);
    }

    fn track(&self, executor: Arc<dyn ToolExecutor>) {
        let mut executors = self.executors.write().unwrap_or_else(PoisonError::into_inner);
        let address = Arc::as_ptr(&executor) as *const ();
        if !executors.iter().any(|known| Arc::as_ptr(known) as *const () == address) {
            executors.push(executor);
        }
    }

    /// Dispatch one request and wrap the outcome in a response envelope
    pub async fn handle_request(&self, request: Request) -> Response {
        debug!("Request {} {}", request.id, request.method);
        match self.dispatcher.dispatch(&request.method, request.params).await {
            Ok(result) => Response::success(request.id, result),
            Err(e) => {
                debug!("Request {} failed: {}", request.id, e);
                Response::from_error(request.id, &e)
            }
        }
    }

    /// Decode and handle a raw request; undecodable input gets an error reply
    pub async fn handle_raw(&self, text: &str) -> Response {
        let value: Value = match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                return Response::from_error(RequestId::Null, &Error::Json(e));
            }
        };

        let id = value
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok())
            .unwrap_or(RequestId::Null);

        match serde_json::from_value::<Request>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) =>
                Response::from_error(id, &(Error::Protocol {
                    code: error_codes::INVALID_REQUEST,
                    message: format!("Invalid request: {}", e),
                    data: None,
                })),
        }
    }

    /// Release every executor's held resources
    pub async fn shutdown(&self) -> Result<(), Error> {
        info!("Initiating server shutdown");
        let executors: Vec<_> = self.executors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut failures = Vec::new();
        for executor in executors {
            if let Err(e) = executor.cleanup().await {
                error!("Cleanup of {} executor failed: {}", executor.family(), e);
                failures.push(format!("{}: {}", executor.family(), e));
            }
        }

        info!("Server shutdown complete");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Other(format!("cleanup failed for {}", failures.join(", "))))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::FnExecutor;
    use crate::types::CallToolResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    struct Counting {
        cleanups: AtomicUsize,
    }

    #[async_trait]
    impl ToolExecutor for Counting {
        fn family(&self) -> &str {
            "counting"
        }

        fn operations(&self) -> Vec<Tool> {
            vec![
                crate::types::ToolBuilder::new("one", "first").build(),
                crate::types::ToolBuilder::new("two", "second").build()
            ]
        }

        async fn execute(&self, operation: &str, _arguments: Value) -> Result<CallToolResult, Error> {
            Ok(CallToolResult::text(operation))
        }

        async fn cleanup(&self) -> Result<(), Error> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn executor_operations_are_registered_and_cleaned_once() {
        let server = Server::new(ServerConfig::default());
        let counting = Arc::new(Counting { cleanups: AtomicUsize::new(0) });
        server.register_executor(counting.clone());

        let response = server.handle_request(
            Request::new(1, "tools/call", Some(json!({ "name": "two" })))
        ).await;
        assert_eq!(response.into_result().unwrap()["content"][0]["text"], "two");

        server.shutdown().await.unwrap();
        server.shutdown().await.unwrap();
        assert_eq!(counting.cleanups.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn raw_input_errors_keep_the_id_when_possible() {
        let server = Server::new(ServerConfig::default());

        let garbage = server.handle_raw("{not json").await;
        assert_eq!(garbage.id, RequestId::Null);
        assert_eq!(garbage.into_result().unwrap_err().to_code(), error_codes::PARSE_ERROR);

        let no_method = server.handle_raw(r#"{"jsonrpc":"2.0","id":9}"#).await;
        assert_eq!(no_method.id, RequestId::Number(9));
        assert_eq!(no_method.into_result().unwrap_err().to_code(), error_codes::INVALID_REQUEST);

        let ok = server.handle_raw(r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#).await;
        assert_eq!(ok.id, RequestId::from("a"));
        assert!(!ok.is_error());
    }

    #[tokio::test]
    async fn unknown_method_names_the_method() {
        let server = Server::new(ServerConfig::default());
        let response = server.handle_request(Request::new(3, "tools/delete", None)).await;
        let err = response.into_result().unwrap_err();
        assert_eq!(err.to_code(), error_codes::METHOD_NOT_FOUND);
        assert!(err.to_string().contains("tools/delete"));
    }

    #[tokio::test]
    async fn builtin_tools_are_listed() {
        let server = Server::new(ServerConfig::default()).with_builtin_tools().unwrap();
        let tools = server.registry().list_tools();
        assert!(tools.iter().any(|t| t.name == "execute_command"));
        assert!(tools.iter().any(|t| t.name == "generate_code"));

        let closure = Arc::new(FnExecutor::new("x", |_| async { Ok(CallToolResult::text("")) }));
        server.register_tool(crate::types::ToolBuilder::new("x", "x").build(), closure.clone());
        server.register_tool(crate::types::ToolBuilder::new("y", "y").build(), closure);
        assert_eq!(server.executors.read().unwrap().len(), 7);
        server.shutdown().await.unwrap();
    }
}
