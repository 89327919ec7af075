//! Boundary types between the (external) transport layer and the engine.

use crate::error::{StewardError, StewardResult};
use crate::run::WorkflowRun;
use serde::{Deserialize, Serialize};

/// An inbound request as handed over by the transport layer.
///
/// The orchestrator never authenticates; if `organization_id` is absent the
/// collaborator resolving the current user's organization must fill it in
/// before the engine is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeRequest {
    /// Raw user text. Size-capped.
    pub user_query: String,
    /// Tenant scope. Must be present by the time the engine runs.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Caller-supplied correlation id, if the transport already assigned one.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl IntakeRequest {
    /// A request with the organization already resolved.
    pub fn new(organization_id: impl Into<String>, user_query: impl Into<String>) -> Self {
        Self {
            user_query: user_query.into(),
            organization_id: Some(organization_id.into()),
            correlation_id: None,
        }
    }

    /// Validate the request before any stage runs.
    ///
    /// Rejections here persist no state: an empty or oversized query is a
    /// [`StewardError::Validation`], a missing organization is a
    /// [`StewardError::Authorization`].
    pub fn validate(&self, max_query_bytes: usize) -> StewardResult<&str> {
        if self.user_query.trim().is_empty() {
            return Err(StewardError::Validation("user query is empty".to_string()));
        }
        if self.user_query.len() > max_query_bytes {
            return Err(StewardError::Validation(format!(
                "user query is {} bytes, cap is {max_query_bytes}",
                self.user_query.len()
            )));
        }
        match self.organization_id.as_deref() {
            Some(org) if !org.is_empty() => Ok(org),
            _ => Err(StewardError::Authorization(
                "no organization context resolved for this request".to_string(),
            )),
        }
    }
}

/// The outbound response returned to the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutcome {
    /// False only when the run ended in `failed`.
    pub success: bool,
    /// Correlation id of the run.
    pub correlation_id: String,
    /// Latest full run snapshot.
    pub state: WorkflowRun,
    /// Handler output, empty when none was produced.
    pub output: String,
    /// Agent the run resolved to.
    pub agent: String,
    /// Cost estimate from the cost-check stage.
    pub estimated_cost: f64,
    /// Actual cost, zero until completion.
    pub actual_cost: f64,
    /// Sanitized error message when the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkflowOutcome {
    /// Build the response from the run's terminal (or suspended) snapshot.
    pub fn from_run(run: WorkflowRun) -> Self {
        Self {
            success: run.status != crate::run::WorkflowStatus::Failed,
            correlation_id: run.correlation_id.clone(),
            output: run.final_output.clone().unwrap_or_default(),
            agent: run.current_agent.clone(),
            estimated_cost: run.estimated_cost,
            actual_cost: run.actual_cost.unwrap_or(0.0),
            error: run.error.clone(),
            state: run,
        }
    }
}
