//! Capability Registry
//!
//! Three independent catalogs (tools, resources, prompt templates), each keyed
//! by a unique name or URI and guarded by its own read-write lock. Registering
//! under an existing key replaces the entry. Keys may repeat across catalogs.

use std::collections::HashMap;
use std::sync::{ Arc, PoisonError, RwLock };
use tracing::info;

use crate::errors::{ CapabilityKind, Error };
use crate::executors::ToolExecutor;
use crate::resources::ResourceProvider;
use crate::types::{ Prompt, PromptTemplate, Resource, Tool };

/// One keyed catalog
pub struct Catalog<T> {
    kind: CapabilityKind,
    entries: RwLock<HashMap<String, Arc<T>>>,
}

impl<T> Catalog<T> {
    pub fn new(kind: CapabilityKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert or replace; returns the replaced entry
    pub fn register(&self, key: impl Into<String>, entry: T) -> Option<Arc<T>> {
        let key = key.into();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = entries.insert(key.clone(), Arc::new(entry));
        if replaced.is_some() {
            info!("Replaced {} '{}'", self.kind, key);
        } else {
            info!("Registered {} '{}'", self.kind, key);
        }
        replaced
    }

    pub fn lookup(&self, key: &str) -> Result<Arc<T>, Error> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                kind: self.kind,
                key: key.to_string(),
            })
    }

    /// Snapshot of every entry, in no particular order
    pub fn list(&self) -> Vec<Arc<T>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A tool descriptor and the executor that runs it
pub struct ToolEntry {
    pub tool: Tool,
    pub executor: Arc<dyn ToolExecutor>,
}

/// A resource descriptor and the provider of its contents
pub struct ResourceEntry {
    pub resource: Resource,
    pub provider: Arc<dyn ResourceProvider>,
}

pub struct CapabilityRegistry {
    tools: Catalog<ToolEntry>,
    resources: Catalog<ResourceEntry>,
    prompts: Catalog<PromptTemplate>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self {
            tools: Catalog::new(CapabilityKind::Tool),
            resources: Catalog::new(CapabilityKind::Resource),
            prompts: Catalog::new(CapabilityKind::Prompt),
        }
    }

    pub fn register_tool(&self, tool: Tool, executor: Arc<dyn ToolExecutor>) {
        let key = tool.name.clone();
        self.tools.register(key, ToolEntry { tool, executor });
    }

    pub fn register_resource(&self, resource: Resource, provider: Arc<dyn ResourceProvider>) {
        let key = resource.uri.clone();
        self.resources.register(key, ResourceEntry { resource, provider });
    }

    pub fn register_prompt(&self, template: PromptTemplate) {
        let key = template.prompt.name.clone();
        self.prompts.register(key, template);
    }

    pub fn tool(&self, name: &str) -> Result<Arc<ToolEntry>, Error> {
        self.tools.lookup(name)
    }

    pub fn resource(&self, uri: &str) -> Result<Arc<ResourceEntry>, Error> {
        self.resources.lookup(uri)
    }

    pub fn prompt(&self, name: &str) -> Result<Arc<PromptTemplate>, Error> {
        self.prompts.lookup(name)
    }

    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools
            .list()
            .iter()
            .map(|entry| entry.tool.clone())
            .collect()
    }

    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources
            .list()
            .iter()
            .map(|entry| entry.resource.clone())
            .collect()
    }

    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts
            .list()
            .iter()
            .map(|template| template.prompt.clone())
            .collect()
    }
}

impl Default for CapabilityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
