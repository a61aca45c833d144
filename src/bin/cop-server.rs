//! Capability server binary
//!
//! Serves the built-in executors, the workspace as a resource and a few prompt
//! templates. Listens on HTTP by default; `--stdio` switches to line-delimited
//! requests on stdin and stdout.

use anyhow::{ Context, Result };
use cop_rs::resources::{ DirectoryResource, StaticResource };
use cop_rs::transport::{ http_server, stdio_server };
use cop_rs::types::{ PromptArgument, PromptTemplate, Resource };
use cop_rs::{ Server, ServerConfig };
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{ info, warn };
use tracing_subscriber::EnvFilter;

const ABOUT: &str =
    "This server exposes shell, browser, file, code generation, web search and data tools. \
Call tools/list to see their argument schemas.";

fn build_server(config: ServerConfig) -> Result<Server> {
    let workspace = config.workspace_root.clone();
    let server = Server::new(config).with_builtin_tools().context("failed to start executors")?;

    server.register_resource(
        Resource::new("project://workspace", "Workspace")
            .with_description("Listing of the workspace root")
            .with_mime_type("text/plain"),
        Arc::new(DirectoryResource::new(workspace))
    );
    server.register_resource(
        Resource::new("project://about", "About").with_mime_type("text/plain"),
        Arc::new(StaticResource::new(ABOUT))
    );

    server.register_prompt(
        PromptTemplate::new(
            "code_review",
            "Review the following {{language}} code for bugs and readability:\n\n{{code}}"
        )
            .description("Ask for a review of a code snippet")
            .argument(PromptArgument::required("code", "Code to review"))
            .argument(PromptArgument::optional("language", "Language of the snippet"))
    );
    server.register_prompt(
        PromptTemplate::new("summarize", "Summarize the following text in {{style}} form:\n\n{{text}}")
            .description("Summarize a block of text")
            .argument(PromptArgument::required("text", "Text to summarize"))
            .argument(PromptArgument::optional("style", "Summary style, e.g. bullet"))
    );

    Ok(server)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber
        ::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let stdio = std::env::args().skip(1).any(|arg| arg == "--stdio");
    let config = ServerConfig::from_env().context("invalid configuration")?;
    let bind_address = config.bind_address.clone();
    let server = Arc::new(build_server(config)?);

    if stdio {
        stdio_server::serve_stdio(server.clone()).await?;
    } else {
        let listener = TcpListener::bind(&bind_address).await.with_context(||
            format!("failed to bind {}", bind_address)
        )?;
        http_server::serve(server.clone(), listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for ctrl-c: {}", e);
            }
        }).await?;
    }

    info!("Shutting down");
    server.shutdown().await?;
    Ok(())
}
