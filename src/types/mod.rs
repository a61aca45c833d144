//! COP Type Definitions
//!
//! This module re-exports the type definitions used by the protocol, organized
//! into submodules: content blocks, initialization, prompts, resources, and
//! tools.

pub mod content;
pub mod initialize;
pub mod prompts;
pub mod resources;
pub mod tools;

pub use content::{ CallToolResult, Content, ResourceContents };
pub use initialize::{
    Implementation,
    InitializeParams,
    PROTOCOL_VERSION,
    ServerCapabilities,
    ServerIdentity,
};
pub use prompts::{
    GetPromptParams,
    GetPromptResult,
    ListPromptsResult,
    Prompt,
    PromptArgument,
    PromptMessage,
    PromptTemplate,
    Role,
};
pub use resources::{ ListResourcesResult, ReadResourceParams, Resource };
pub use tools::{
    CallToolParams,
    ListToolsResult,
    Tool,
    ToolBuilder,
    ToolParameter,
    ToolParameterBuilder,
    ToolParameterType,
};
