//! Capability Orchestration Protocol
//!
//! A request/response protocol through which an agent discovers and invokes
//! capabilities hosted by a server. The server keeps three catalogs (tools,
//! resources and prompts), dispatches a closed set of methods against them and
//! delegates tool work to pluggable executors. The client performs the
//! handshake, caches what the server advertises and offers typed calls over a
//! local or remote transport.

pub mod client;
pub mod config;
pub mod errors;
pub mod executors;
pub mod messages;
pub mod registry;
pub mod resources;
pub mod server;
pub mod transport;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use client::{ Client, ClientBuilder, ConnectionState };
pub use config::{ ClientConfig, ServerConfig, TransportKind };
pub use errors::Error;
pub use executors::{ FnExecutor, ToolExecutor };
pub use messages::{ Method, Request, RequestId, Response };
pub use registry::CapabilityRegistry;
pub use resources::ResourceProvider;
pub use server::{ Dispatcher, Server };
pub use transport::Transport;
