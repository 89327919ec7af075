use crate::AgentHandler;
use std::collections::HashMap;
use std::sync::Arc;
use steward_core::{StewardError, StewardResult};
use tracing::info;

/// Central registry for all available agent handlers.
///
/// Built once at startup; duplicate ids are rejected at registration so a
/// misconfigured deployment fails early rather than dispatching under the
/// wrong identity. Lookups of unknown ids return `None` — the dispatcher
/// fails closed on those instead of falling back to a default handler.
pub struct AgentRegistry {
    handlers: HashMap<String, Arc<dyn AgentHandler>>,
}

impl AgentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under its own id.
    pub fn register(&mut self, handler: Arc<dyn AgentHandler>) -> StewardResult<()> {
        let id = handler.id().to_string();
        if self.handlers.contains_key(&id) {
            return Err(StewardError::Validation(format!(
                "agent id already registered: {id}"
            )));
        }
        info!(agent = %id, "registered agent handler");
        self.handlers.insert(id, handler);
        Ok(())
    }

    /// Look up a handler by id.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn AgentHandler>> {
        self.handlers.get(id)
    }

    /// All registered agent ids, unordered.
    pub fn ids(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// A registry preloaded with the builtin capability set.
    pub fn with_builtins() -> StewardResult<Self> {
        use crate::builtins::*;
        let mut registry = Self::new();
        registry.register(Arc::new(DocumentConverter::new()))?;
        registry.register(Arc::new(Localizer::new()))?;
        registry.register(Arc::new(GrantWriter::new()))?;
        registry.register(Arc::new(BusinessPlanWriter::new()))?;
        registry.register(Arc::new(SafetyLogWriter::new()))?;
        registry.register(Arc::new(Navigator::new()))?;
        Ok(registry)
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
