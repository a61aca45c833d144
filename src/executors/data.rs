//! Structured data queries
//!
//! `query_data` runs select/insert/update/delete against a `DataStore`.
//! Filters are field equality checks, all of which must hold. Update and
//! delete refuse to run without a filter.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{ Map, Value, json };
use std::collections::HashMap;
use std::sync::{ Arc, PoisonError, RwLock };
use tracing::debug;
use uuid::Uuid;

use super::{ ToolExecutor, parse_arguments };
use crate::errors::Error;
use crate::types::{ CallToolResult, Tool };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DataOperation {
    Select,
    Insert,
    Update,
    Delete,
}

/// Parameters of `query_data`
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DataQuery {
    pub table: String,
    pub operation: DataOperation,
    /// Field values a row must equal to match
    #[serde(default)]
    pub filters: Map<String, Value>,
    /// Row to insert, or fields to overwrite on update
    pub payload: Option<Map<String, Value>>,
}

/// Backing store for `query_data`
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Run the query; returns the selected, inserted, updated or deleted rows
    async fn query(&self, query: DataQuery) -> Result<Vec<Value>, Error>;
}

/// Tables of JSON rows held in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Map<String, Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn matches(row: &Map<String, Value>, filters: &Map<String, Value>) -> bool {
    filters.iter().all(|(field, expected)| row.get(field) == Some(expected))
}

#[async_trait]
impl DataStore for MemoryStore {
    async fn query(&self, query: DataQuery) -> Result<Vec<Value>, Error> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);

        match query.operation {
            DataOperation::Select => {
                let rows = tables.get(&query.table).map(Vec::as_slice).unwrap_or_default();
                Ok(
                    rows
                        .iter()
                        .filter(|row| matches(row, &query.filters))
                        .cloned()
                        .map(Value::Object)
                        .collect()
                )
            }
            DataOperation::Insert => {
                let mut row = query.payload.ok_or_else(||
                    Error::InvalidParams("insert requires a payload".to_string())
                )?;
                row.entry("id").or_insert_with(|| json!(Uuid::new_v4().to_string()));
                tables.entry(query.table).or_default().push(row.clone());
                Ok(vec![Value::Object(row)])
            }
            DataOperation::Update => {
                if query.filters.is_empty() {
                    return Err(Error::InvalidParams("update requires filters".to_string()));
                }
                let changes = query.payload.ok_or_else(||
                    Error::InvalidParams("update requires a payload".to_string())
                )?;
                let rows = tables.entry(query.table).or_default();
                let mut updated = Vec::new();
                for row in rows.iter_mut().filter(|row| matches(row, &query.filters)) {
                    for (field, value) in &changes {
                        row.insert(field.clone(), value.clone());
                    }
                    updated.push(Value::Object(row.clone()));
                }
                Ok(updated)
            }
            DataOperation::Delete => {
                if query.filters.is_empty() {
                    return Err(Error::InvalidParams("delete requires filters".to_string()));
                }
                let rows = tables.entry(query.table).or_default();
                let (removed, kept): (Vec<_>, Vec<_>) = rows
                    .drain(..)
                    .partition(|row| matches(row, &query.filters));
                *rows = kept;
                Ok(removed.into_iter().map(Value::Object).collect())
            }
        }
    }
}

pub struct DataExecutor {
    store: Arc<dyn DataStore>,
}

impl DataExecutor {
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ToolExecutor for DataExecutor {
    fn family(&self) -> &str {
        "data"
    }

    fn operations(&self) -> Vec<Tool> {
        vec![
            Tool::for_params::<DataQuery>(
                "query_data",
                "Select, insert, update or delete rows of a table"
            )
        ]
    }

    async fn execute(&self, operation: &str, arguments: Value) -> Result<CallToolResult, Error> {
        if operation != "query_data" {
            return Err(Error::Execution(format!("data executor has no operation '{}'", operation)));
        }
        let query: DataQuery = parse_arguments(operation, arguments)?;
        debug!("Data {:?} on {}", query.operation, query.table);

        let rows = self.store.query(query).await?;
        Ok(CallToolResult::text(serde_json::to_string_pretty(&rows)?))
    }
}
