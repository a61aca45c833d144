//! Deterministic code scaffolding
//!
//! `generate_code` renders a struct, function or test skeleton for Rust,
//! TypeScript or Python. The same input always yields the same text.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use super::{ ToolExecutor, parse_arguments };
use crate::errors::Error;
use crate::types::{ CallToolResult, Tool };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Rust,
    Typescript,
    Python,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CodeKind {
    Struct,
    Function,
    Test,
}

/// A field of a generated struct, or a parameter of a function
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FieldSpec {
    pub name: String,
    /// Type name in the target language
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GenerateCodeParams {
    pub language: Language,
    pub kind: CodeKind,
    /// Identifier of the generated item, in any casing
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

pub struct CodegenExecutor;

fn words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn snake_case(name: &str) -> String {
    words(name).join("_")
}

pub fn pascal_case(name: &str) -> String {
    words(name)
        .iter()
        .map(|w| capitalize(w))
        .collect()
}

pub fn camel_case(name: &str) -> String {
    let pascal = pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn params_list(fields: &[FieldSpec], sep: &str, case: fn(&str) -> String) -> String {
    fields
        .iter()
        .map(|f| format!("{}{}{}", case(&f.name), sep, f.type_name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn rust(kind: CodeKind, name: &str, fields: &[FieldSpec]) -> String {
    match kind {
        CodeKind::Struct => {
            let mut out = format!("#[derive(Debug, Clone)]\npub struct {} {{\n", pascal_case(name));
            for field in fields {
                out.push_str(&format!("    pub {}: {},\n", snake_case(&field.name), field.type_name));
            }
            out.push_str("}\n");
            out
        }
        CodeKind::Function =>
            format!(
                "pub fn {}({}) {{\n    todo!()\n}}\n",
                snake_case(name),
                params_list(fields, ": ", snake_case)
            ),
        CodeKind::Test =>
            format!(
                "#[cfg(test)]\nmod tests {{\n    use super::*;\n\n    #[test]\n    fn {}() {{\n        todo!()\n    }}\n}}\n",
                snake_case(name)
            ),
    }
}

fn typescript(kind: CodeKind, name: &str, fields: &[FieldSpec]) -> String {
    match kind {
        CodeKind::Struct => {
            let mut out = format!("export interface {} {{\n", pascal_case(name));
            for field in fields {
                out.push_str(&format!("  {}: {};\n", camel_case(&field.name), field.type_name));
            }
            out.push_str("}\n");
            out
        }
        CodeKind::Function =>
            format!(
                "export function {}({}): void {{\n  throw new Error(\"not implemented\");\n}}\n",
                camel_case(name),
                params_list(fields, ": ", camel_case)
            ),
        CodeKind::Test =>
            format!(
                "describe(\"{}\", () => {{\n  it(\"works\", () => {{\n    expect(true).toBe(true);\n  }});\n}});\n",
                camel_case(name)
            ),
    }
}

fn python(kind: CodeKind, name: &str, fields: &[FieldSpec]) -> String {
    match kind {
        CodeKind::Struct => {
            let mut out = format!(
                "from dataclasses import dataclass\n\n\n@dataclass\nclass {}:\n",
                pascal_case(name)
            );
            if fields.is_empty() {
                out.push_str("    pass\n");
            }
            for field in fields {
                out.push_str(&format!("    {}: {}\n", snake_case(&field.name), field.type_name));
            }
            out
        }
        CodeKind::Function =>
            format!(
                "def {}({}):\n    raise NotImplementedError\n",
                snake_case(name),
                params_list(fields, ": ", snake_case)
            ),
        CodeKind::Test => format!("def test_{}():\n    assert True\n", snake_case(name)),
    }
}

impl CodegenExecutor {
    fn generate(&self, params: GenerateCodeParams) -> Result<CallToolResult, Error> {
        if words(&params.name).is_empty() {
            return Err(Error::InvalidParams("name must contain at least one word".to_string()));
        }
        let code = match params.language {
            Language::Rust => rust(params.kind, &params.name, &params.fields),
            Language::Typescript => typescript(params.kind, &params.name, &params.fields),
            Language::Python => python(params.kind, &params.name, &params.fields),
        };
        Ok(CallToolResult::text(code))
    }
}

#[async_trait]
impl ToolExecutor for CodegenExecutor {
    fn family(&self) -> &str {
        "codegen"
    }

    fn operations(&self) -> Vec<Tool> {
        vec![
            Tool::for_params::<GenerateCodeParams>(
                "generate_code",
                "Generate a struct, function or test skeleton in Rust, TypeScript or Python"
            )
        ]
    }

    async fn execute(&self, operation: &str, arguments: Value) -> Result<CallToolResult, Error> {
        match operation {
            "generate_code" => self.generate(parse_arguments(operation, arguments)?),
            other => Err(Error::Execution(format!("codegen executor has no operation '{}'", other))),
        }
    }
}
