//! Builtin capability handlers.
//!
//! The real business logic behind each capability (conversion pipelines,
//! translation backends, drafting models) lives with external collaborators;
//! these handlers provide the deterministic placeholder behavior that makes
//! the engine exercisable end-to-end, and they model the dispatch contract —
//! output plus actual cost, failures classified retryable or permanent.

use crate::{AgentContext, AgentHandler, AgentOutput};
use async_trait::async_trait;
use steward_core::{StewardError, StewardResult};
use tracing::info;

fn query_kilobytes(query: &str) -> f64 {
    query.len() as f64 / 1024.0
}

/// Converts documents between formats.
pub struct DocumentConverter;

impl DocumentConverter {
    /// Create the handler.
    pub fn new() -> Self {
        Self
    }
}

impl Default for DocumentConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentHandler for DocumentConverter {
    fn id(&self) -> &str {
        "doc_converter"
    }

    async fn execute(&self, context: &AgentContext) -> StewardResult<AgentOutput> {
        info!(correlation_id = %context.correlation_id, "converting document");
        Ok(AgentOutput {
            output: format!(
                "Converted document as requested: {}",
                context.user_query.trim()
            ),
            actual_cost: 0.02 + 0.01 * query_kilobytes(&context.user_query),
        })
    }
}

/// Translates and localizes content.
pub struct Localizer;

impl Localizer {
    /// Create the handler.
    pub fn new() -> Self {
        Self
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentHandler for Localizer {
    fn id(&self) -> &str {
        "localizer"
    }

    async fn execute(&self, context: &AgentContext) -> StewardResult<AgentOutput> {
        info!(correlation_id = %context.correlation_id, "localizing content");
        Ok(AgentOutput {
            output: format!("Localized content for: {}", context.user_query.trim()),
            actual_cost: 0.05 + 0.02 * query_kilobytes(&context.user_query),
        })
    }
}

/// Drafts grant proposals for submission. High-stakes; always behind the
/// approval gate.
pub struct GrantWriter;

impl GrantWriter {
    /// Create the handler.
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrantWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentHandler for GrantWriter {
    fn id(&self) -> &str {
        "grant_writer"
    }

    async fn execute(&self, context: &AgentContext) -> StewardResult<AgentOutput> {
        info!(correlation_id = %context.correlation_id, "drafting grant proposal");
        if context.user_query.trim().is_empty() {
            return Err(StewardError::agent_permanent(
                "cannot draft a proposal from an empty brief",
            ));
        }
        Ok(AgentOutput {
            output: format!(
                "Grant proposal draft\n\nBrief: {}\n\nSections: summary, narrative, budget.",
                context.user_query.trim()
            ),
            actual_cost: 2.5 + 0.5 * query_kilobytes(&context.user_query),
        })
    }
}

/// Generates formal business plans. High-stakes; always behind the approval
/// gate.
pub struct BusinessPlanWriter;

impl BusinessPlanWriter {
    /// Create the handler.
    pub fn new() -> Self {
        Self
    }
}

impl Default for BusinessPlanWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentHandler for BusinessPlanWriter {
    fn id(&self) -> &str {
        "plan_writer"
    }

    async fn execute(&self, context: &AgentContext) -> StewardResult<AgentOutput> {
        info!(correlation_id = %context.correlation_id, "drafting business plan");
        Ok(AgentOutput {
            output: format!(
                "Business plan outline\n\nObjective: {}\n\nSections: market, operations, financials.",
                context.user_query.trim()
            ),
            actual_cost: 3.0 + 0.5 * query_kilobytes(&context.user_query),
        })
    }
}

/// Produces safety and incident logs.
pub struct SafetyLogWriter;

impl SafetyLogWriter {
    /// Create the handler.
    pub fn new() -> Self {
        Self
    }
}

impl Default for SafetyLogWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentHandler for SafetyLogWriter {
    fn id(&self) -> &str {
        "safety_logger"
    }

    async fn execute(&self, context: &AgentContext) -> StewardResult<AgentOutput> {
        info!(correlation_id = %context.correlation_id, "generating safety log");
        Ok(AgentOutput {
            output: format!("Safety log entry recorded for: {}", context.user_query.trim()),
            actual_cost: 0.1,
        })
    }
}

/// Routing fallback. Answers with guidance instead of executing work, so an
/// unclassifiable request still gets a useful, cheap response.
pub struct Navigator;

impl Navigator {
    /// Create the handler.
    pub fn new() -> Self {
        Self
    }
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentHandler for Navigator {
    fn id(&self) -> &str {
        "navigator"
    }

    async fn execute(&self, context: &AgentContext) -> StewardResult<AgentOutput> {
        info!(correlation_id = %context.correlation_id, "navigator fallback");
        Ok(AgentOutput {
            output: format!(
                "I couldn't match that to a specific capability. I can convert documents, \
                 localize content, draft grant proposals or business plans, and generate \
                 safety logs. You asked: {}",
                context.user_query.trim()
            ),
            actual_cost: 0.0,
        })
    }
}
