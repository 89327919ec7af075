//! Agent handler trait, registry, and the builtin capability set.
//!
//! An agent is a registered capability identified by a string key and
//! invoked uniformly by the dispatcher. Handlers classify their own
//! failures as retryable or permanent via
//! [`steward_core::StewardError::Agent`], which is what the dispatcher's
//! retry budget keys off.
//!
//! # Main types
//!
//! - [`AgentHandler`] — The trait every capability implements.
//! - [`AgentRegistry`] — String-keyed registry resolved at startup.
//! - [`AgentContext`] / [`AgentOutput`] — The uniform dispatch contract.

/// Builtin capability handlers.
pub mod builtins;
/// String-keyed handler registry.
pub mod registry;

pub use registry::AgentRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use steward_core::{Intent, StewardResult, WorkflowRun};

/// The accumulated workflow context handed to a handler at dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContext {
    /// Correlation id of the run being executed.
    pub correlation_id: String,
    /// Tenant the run belongs to.
    pub organization_id: String,
    /// The (sanitized) user query.
    pub user_query: String,
    /// Intent the classifier resolved.
    pub intent: Intent,
    /// Stage annotations accumulated so far.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl AgentContext {
    /// Build the dispatch context from a run snapshot.
    pub fn from_run(run: &WorkflowRun) -> Self {
        Self {
            correlation_id: run.correlation_id.clone(),
            organization_id: run.organization_id.clone(),
            user_query: run.user_query.clone(),
            intent: run.intent,
            metadata: run.metadata.clone(),
        }
    }
}

/// What a handler returns on success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentOutput {
    /// The produced result, surfaced as the run's final output.
    pub output: String,
    /// What the execution actually cost.
    pub actual_cost: f64,
}

/// Trait that every agent capability implements.
///
/// Failures must be raised as [`steward_core::StewardError::Agent`] with an
/// honest `retryable` flag: transient upstream conditions (network, timeout)
/// are retryable, business-rule failures are not.
#[async_trait]
pub trait AgentHandler: Send + Sync {
    /// Stable identifier this handler is registered under.
    fn id(&self) -> &str;

    /// Execute the capability against the workflow's context.
    async fn execute(&self, context: &AgentContext) -> StewardResult<AgentOutput>;
}
