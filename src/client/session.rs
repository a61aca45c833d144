//! Client-side session state
//!
//! The session holds the server identity and the three capability caches. It
//! is filled in one step when `connect()` succeeds and emptied in one step on
//! `disconnect()`; it is never updated piecemeal.

use std::collections::HashMap;

use crate::types::{ Prompt, Resource, ServerIdentity, Tool };

/// Connection lifecycle of a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug)]
pub struct Session {
    pub state: ConnectionState,
    pub identity: Option<ServerIdentity>,
    pub tools: HashMap<String, Tool>,
    pub resources: HashMap<String, Resource>,
    pub prompts: HashMap<String, Prompt>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            identity: None,
            tools: HashMap::new(),
            resources: HashMap::new(),
            prompts: HashMap::new(),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Replace everything with a freshly discovered catalog
    pub fn populate(
        &mut self,
        identity: ServerIdentity,
        tools: Vec<Tool>,
        resources: Vec<Resource>,
        prompts: Vec<Prompt>
    ) {
        self.identity = Some(identity);
        self.tools = tools
            .into_iter()
            .map(|t| (t.name.clone(), t))
            .collect();
        self.resources = resources
            .into_iter()
            .map(|r| (r.uri.clone(), r))
            .collect();
        self.prompts = prompts
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();
        self.state = ConnectionState::Connected;
    }

    /// Back to the never-connected state
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ Implementation, ServerCapabilities, ToolBuilder };

    #[test]
    fn populate_then_clear() {
        let mut session = Session::new();
        session.populate(
            ServerIdentity {
                protocol_version: "2024-11-05".to_string(),
                capabilities: ServerCapabilities::all(),
                server_info: Implementation {
                    name: "s".to_string(),
                    version: "1".to_string(),
                },
                instructions: None,
            },
            vec![ToolBuilder::new("echo", "echo").build()],
            vec![Resource::new("project://a", "a")],
            vec![]
        );
        assert!(session.is_connected());
        assert!(session.tools.contains_key("echo"));
        assert!(session.resources.contains_key("project://a"));

        session.clear();
        assert_eq!(session.state, ConnectionState::Disconnected);
        assert!(session.identity.is_none());
        assert!(session.tools.is_empty() && session.resources.is_empty() && session.prompts.is_empty());
    }
}
