//! COP Resource Types
//!
//! This module defines the resource descriptor and the payloads of
//! `resources/list` and `resources/read`.

use schemars::JsonSchema;
use serde::{ Deserialize, Serialize };

/// Addressable data resource, immutable once registered
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct Resource {
    /// Unique key, opaque scheme + path (e.g. `project://source`)
    pub uri: String,
    /// Human-readable name for the resource
    pub name: String,
    /// Optional description of the resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Media type of the resource content (e.g., "text/plain")
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl Resource {
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }
}

/// Result of `resources/list`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ListResourcesResult {
    pub resources: Vec<Resource>,
}

/// Parameters of `resources/read`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ReadResourceParams {
    /// URI of the resource to read
    pub uri: String,
}
