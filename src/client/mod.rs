//! Orchestration client: the agent-facing side of the protocol

#[allow(clippy::module_inception)]
pub mod client;
pub mod session;

pub use client::{ Client, ClientBuilder };
pub use session::{ ConnectionState, Session };

#[cfg(test)]
mod tests;
