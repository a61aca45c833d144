//! Shared fixtures

use serde_json::{ Value, json };
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ ClientConfig, ServerConfig };
use crate::client::Client;
use crate::errors::Error;
use crate::executors::FnExecutor;
use crate::resources::StaticResource;
use crate::server::Server;
use crate::transport::LocalTransport;
use crate::types::{
    CallToolResult,
    PromptArgument,
    PromptTemplate,
    Resource,
    ServerCapabilities,
    ToolBuilder,
    ToolParameterBuilder,
    ToolParameterType,
};

/// Server with `echo`, `sleep`, `boom`, one resource and one prompt
pub fn test_server(capabilities: ServerCapabilities) -> Server {
    let server = Server::new(ServerConfig::new("test-server").with_capabilities(capabilities));

    server.register_tool(
        ToolBuilder::new("echo", "Echo a message back")
            .add_parameter(
                ToolParameterBuilder::new("message", ToolParameterType::String)
                    .required(true)
                    .build()
            )
            .build(),
        Arc::new(
            FnExecutor::new("echo", |args: Value| async move {
                let message = args["message"].as_str().unwrap_or_default().to_string();
                Ok(CallToolResult::text(message))
            })
        )
    );

    server.register_tool(
        ToolBuilder::new("sleep", "Wait, then report the label")
            .add_parameter(
                ToolParameterBuilder::new("millis", ToolParameterType::Integer)
                    .required(true)
                    .build()
            )
            .add_parameter(ToolParameterBuilder::new("label", ToolParameterType::String).build())
            .build(),
        Arc::new(
            FnExecutor::new("sleep", |args: Value| async move {
                let millis = args["millis"].as_u64().unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(millis)).await;
                Ok(CallToolResult::text(args["label"].as_str().unwrap_or("done").to_string()))
            })
        )
    );

    server.register_tool(
        ToolBuilder::new("boom", "Always fails").build(),
        Arc::new(
            FnExecutor::new("boom", |_args: Value| async move {
                Err::<CallToolResult, _>(Error::Execution("disk on fire".to_string()))
            })
        )
    );

    server.register_resource(
        Resource::new("project://notes", "Notes").with_mime_type("text/plain"),
        Arc::new(StaticResource::new("remember the milk"))
    );

    server.register_prompt(
        PromptTemplate::new("greet", "Say hello to {{name}}.")
            .description("Greeting")
            .argument(PromptArgument::required("name", "Who to greet"))
    );

    server
}

pub fn local_client(server: Server) -> Client {
    let transport = LocalTransport::new(Arc::new(server), Duration::from_secs(5));
    Client::new(Arc::new(transport), ClientConfig::default())
}

pub fn echo_args(message: &str) -> Value {
    json!({ "message": message })
}
