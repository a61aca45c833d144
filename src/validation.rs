//! Argument validation against a tool's `inputSchema`

use jsonschema::JSONSchema;
use serde_json::Value;

use crate::errors::Error;
use crate::types::Tool;

/// Check `arguments` against the tool's declared schema.
///
/// The error message lists every violation, separated by `; `.
pub fn validate_arguments(tool: &Tool, arguments: &Value) -> Result<(), Error> {
    let compiled = JSONSchema::compile(&tool.input_schema).map_err(|e|
        Error::Validation(format!("invalid input schema for '{}': {}", tool.name, e))
    )?;

    let violations: Vec<String> = match compiled.validate(arguments) {
        Ok(()) => return Ok(()),
        Err(errors) =>
            errors
                .map(|e| {
                    let path = e.instance_path.to_string();
                    if path.is_empty() { e.to_string() } else { format!("{}: {}", path, e) }
                })
                .collect(),
    };

    Err(Error::Validation(format!("invalid arguments for '{}': {}", tool.name, violations.join("; "))))
}
