//! COP Prompt Types
//!
//! This module defines prompt template descriptors, the payloads of
//! `prompts/list` and `prompts/get`, and the `PromptTemplate` that renders
//! `{{argument}}` placeholders into a message sequence.

use schemars::JsonSchema;
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value };
use std::collections::HashMap;

use crate::errors::Error;
use crate::types::content::Content;

/// Role of a message sender
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A declared template argument
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct PromptArgument {
    /// Name of the argument
    pub name: String,
    /// Description of the argument
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument is required
    #[serde(default)]
    pub required: bool,
}

impl PromptArgument {
    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: true,
        }
    }

    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            required: false,
        }
    }
}

/// Prompt template descriptor, immutable once registered
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct Prompt {
    /// Unique name for the prompt
    pub name: String,
    /// Description of the prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered argument declarations
    #[serde(default)]
    pub arguments: Vec<PromptArgument>,
}

/// A rendered message
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, JsonSchema)]
pub struct PromptMessage {
    pub role: Role,
    pub content: Content,
}

/// Result of `prompts/list`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ListPromptsResult {
    pub prompts: Vec<Prompt>,
}

/// Parameters of `prompts/get`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GetPromptParams {
    /// Name of the prompt to render
    pub name: String,
    /// Values for the template placeholders
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Result of `prompts/get`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GetPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// A prompt descriptor together with the text it renders
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    pub prompt: Prompt,
    /// Body with `{{argument}}` placeholders
    pub template: String,
}

impl PromptTemplate {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            prompt: Prompt {
                name: name.into(),
                description: None,
                arguments: Vec::new(),
            },
            template: template.into(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.prompt.description = Some(description.into());
        self
    }

    pub fn argument(mut self, argument: PromptArgument) -> Self {
        self.prompt.arguments.push(argument);
        self
    }

    /// Substitute declared arguments into the template.
    ///
    /// Absent optional arguments render as an empty string. Arguments that
    /// were not declared are ignored.
    pub fn render(&self, arguments: &Map<String, Value>) -> Result<GetPromptResult, Error> {
        let mut values = HashMap::new();
        for declared in &self.prompt.arguments {
            let value = match arguments.get(&declared.name) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => {
                    if declared.required {
                        return Err(
                            Error::InvalidParams(
                                format!(
                                    "missing required argument '{}' for prompt '{}'",
                                    declared.name,
                                    self.prompt.name
                                )
                            )
                        );
                    }
                    String::new()
                }
                Some(other) => other.to_string(),
            };
            values.insert(declared.name.as_str(), value);
        }

        // single pass: substituted values are never scanned again
        let mut text = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find("{{") {
            text.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            match after.find("}}") {
                Some(close) => {
                    let name = &after[..close];
                    match values.get(name) {
                        Some(value) => text.push_str(value),
                        None => text.push_str(&rest[open..open + close + 4]),
                    }
                    rest = &after[close + 2..];
                }
                None => {
                    text.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        text.push_str(rest);

        Ok(GetPromptResult {
            description: self.prompt.description.clone(),
            messages: vec![PromptMessage {
                role: Role::User,
                content: Content::text(text),
            }],
        })
    }
}
