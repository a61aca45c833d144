//! Server side of the protocol: the dispatcher and the `Server` that owns it

pub mod dispatcher;
#[allow(clippy::module_inception)]
pub mod server;

pub use dispatcher::Dispatcher;
pub use server::Server;
