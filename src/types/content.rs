//! Content blocks and the uniform invocation result
//!
//! Every tool call, resource read and prompt render returns an ordered list of
//! tagged content blocks. Callers must not assume there is only one.

use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use schemars::JsonSchema;
use serde::{ Deserialize, Serialize };

/// Contents of an addressable resource, inline as text or base64 blob
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct ResourceContents {
    /// URI the contents were read from
    pub uri: String,
    /// Media type of the contents
    #[serde(rename = "mimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Text payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Base64 encoded binary payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>,
}

impl ResourceContents {
    pub fn text(uri: impl Into<String>, mime_type: Option<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type,
            text: Some(text.into()),
            blob: None,
        }
    }

    pub fn blob(uri: impl Into<String>, mime_type: Option<String>, bytes: &[u8]) -> Self {
        Self {
            uri: uri.into(),
            mime_type,
            text: None,
            blob: Some(BASE64_STANDARD.encode(bytes)),
        }
    }
}

/// A single tagged block of a result
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    /// Plain text
    Text {
        text: String,
    },
    /// Base64 encoded image
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    /// Embedded resource contents
    Resource {
        resource: ResourceContents,
    },
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text { text: text.into() }
    }

    pub fn image(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Content::Image {
            data: BASE64_STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    pub fn resource(resource: ResourceContents) -> Self {
        Content::Resource { resource }
    }

    /// Text of a text block, or of an embedded text resource
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Content::Text { text } => Some(text),
            Content::Resource { resource } => resource.text.as_deref(),
            Content::Image { .. } => None,
        }
    }
}

/// Result of invoking an operation or reading a resource
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct CallToolResult {
    /// Ordered content blocks
    pub content: Vec<Content>,

    /// Soft error flag; callers must check it on every result
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

impl CallToolResult {
    pub fn success(content: Vec<Content>) -> Self {
        Self { content, is_error: false }
    }

    /// Successful result with a single text block
    pub fn text(text: impl Into<String>) -> Self {
        Self::success(vec![Content::text(text)])
    }

    /// Soft error with a single human-readable text block
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
        }
    }

    /// Text of the first block that has any
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(Content::as_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blocks_are_tagged_by_type() {
        let result = CallToolResult::success(
            vec![
                Content::text("hi"),
                Content::resource(
                    ResourceContents::text("project://source", Some("text/plain".into()), "fn main() {}")
                )
            ]
        );
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["content"][0], json!({ "type": "text", "text": "hi" }));
        assert_eq!(value["content"][1]["type"], "resource");
        assert_eq!(value["content"][1]["resource"]["mimeType"], "text/plain");
        assert_eq!(value["isError"], false);
    }

    #[test]
    fn missing_is_error_defaults_to_false() {
        let result: CallToolResult = serde_json
            ::from_value(json!({ "content": [{ "type": "text", "text": "ok" }] }))
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.first_text(), Some("ok"));
    }

    #[test]
    fn image_blocks_are_base64() {
        let block = Content::image(b"\x89PNG", "image/png");
        match block {
            Content::Image { data, mime_type } => {
                assert_eq!(mime_type, "image/png");
                assert_eq!(BASE64_STANDARD.decode(data).unwrap(), b"\x89PNG");
            }
            other => panic!("unexpected block {:?}", other),
        }
    }
}
