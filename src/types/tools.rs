//! COP Tool Types
//!
//! This module defines the operation descriptor (`Tool`), the builders used to
//! declare its `inputSchema`, and the parameter/result payloads of
//! `tools/list` and `tools/call`.

use schemars::JsonSchema;
use serde::{ Deserialize, Serialize };
use serde_json::{ Map, Value, json };

/// JSON type of a declared tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolParameterType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ToolParameterType {
    fn as_str(&self) -> &'static str {
        match self {
            ToolParameterType::String => "string",
            ToolParameterType::Number => "number",
            ToolParameterType::Integer => "integer",
            ToolParameterType::Boolean => "boolean",
            ToolParameterType::Object => "object",
            ToolParameterType::Array => "array",
        }
    }
}

/// A parameter declared through the `ToolBuilder`
#[derive(Debug, Clone)]
pub struct ToolParameter {
    /// Name of the parameter
    pub name: String,
    /// Type of the parameter
    pub type_name: ToolParameterType,
    /// Description of the parameter
    pub description: Option<String>,
    /// Whether the parameter is required
    pub required: bool,
    /// Allowed values (for string parameters)
    pub enum_values: Option<Vec<String>>,
}

/// Operation descriptor, immutable once registered
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Tool {
    /// Unique name of the tool
    pub name: String,
    /// Description of what the tool does
    pub description: String,
    /// JSON Schema of the accepted arguments
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl Tool {
    /// Descriptor whose input schema is derived from a parameter type
    pub fn for_params<P: JsonSchema>(name: impl Into<String>, description: impl Into<String>) -> Self {
        let root = schemars::schema_for!(P);
        let mut input_schema = serde_json
            ::to_value(root)
            .unwrap_or_else(|_| json!({ "type": "object", "properties": {} }));
        if let Some(object) = input_schema.as_object_mut() {
            object.remove("$schema");
            object.remove("title");
        }

        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Names listed under the schema's `required` key
    pub fn required_parameters(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Builder for a tool parameter
pub struct ToolParameterBuilder {
    parameter: ToolParameter,
}

impl ToolParameterBuilder {
    pub fn new(name: impl Into<String>, type_name: ToolParameterType) -> Self {
        Self {
            parameter: ToolParameter {
                name: name.into(),
                type_name,
                description: None,
                required: false,
                enum_values: None,
            },
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.parameter.description = Some(description.into());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.parameter.required = required;
        self
    }

    pub fn enum_values(mut self, values: Vec<&str>) -> Self {
        self.parameter.enum_values = Some(
            values
                .into_iter()
                .map(|v| v.to_string())
                .collect()
        );
        self
    }

    pub fn build(self) -> ToolParameter {
        self.parameter
    }
}

/// Builder for hand-declared tools
pub struct ToolBuilder {
    name: String,
    description: String,
    parameters: Vec<ToolParameter>,
}

impl ToolBuilder {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn add_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn build(self) -> Tool {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut schema = Map::new();
            schema.insert("type".to_string(), json!(param.type_name.as_str()));
            if let Some(description) = &param.description {
                schema.insert("description".to_string(), json!(description));
            }
            if let Some(values) = &param.enum_values {
                schema.insert("enum".to_string(), json!(values));
            }
            properties.insert(param.name.clone(), Value::Object(schema));

            if param.required {
                required.push(param.name.clone());
            }
        }

        Tool {
            name: self.name,
            description: self.description,
            input_schema: json!({
                "type": "object",
                "properties": properties,
                "required": required
            }),
        }
    }
}

/// Result of `tools/list`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
}

/// Parameters of `tools/call`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CallToolParams {
    /// Name of the tool to call
    pub name: String,
    /// Arguments to pass to the tool
    #[serde(default)]
    pub arguments: Map<String, Value>,
}
