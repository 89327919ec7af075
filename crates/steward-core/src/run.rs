use crate::error::{StewardError, StewardResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Agent id used when no intent can be resolved.
pub const NAVIGATOR_AGENT: &str = "navigator";

/// Lifecycle status of a [`WorkflowRun`].
///
/// Transitions are monotonic and one-directional; the only resumption edge
/// is `awaiting_approval -> executing`, taken when a human approves the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Accepted at intake, nothing has run yet.
    Pending,
    /// Intent classification in progress.
    Routing,
    /// Cost estimation and approval gating in progress.
    CostCheck,
    /// Suspended, waiting on an external human decision.
    AwaitingApproval,
    /// The resolved agent handler is running.
    Executing,
    /// Terminal: the handler produced output.
    Completed,
    /// Terminal: the run failed or was rejected.
    Failed,
}

impl WorkflowStatus {
    /// Whether the fixed transition table permits moving to `to`.
    ///
    /// Any non-terminal status may also fail, covering the unhandled-error
    /// edge of the state machine.
    pub fn can_transition(self, to: WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        match (self, to) {
            (Pending, Routing) => true,
            (Routing, CostCheck) => true,
            (CostCheck, Executing) | (CostCheck, AwaitingApproval) => true,
            (AwaitingApproval, Executing) => true,
            (Executing, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Whether no further transitions are accepted from this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Routing => "routing",
            WorkflowStatus::CostCheck => "cost_check",
            WorkflowStatus::AwaitingApproval => "awaiting_approval",
            WorkflowStatus::Executing => "executing",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Closed enumeration of recognized request intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Convert a document between formats.
    DocumentConversion,
    /// Translate or localize content.
    Localization,
    /// Draft a grant proposal for submission.
    GrantProposal,
    /// Generate a formal business plan.
    BusinessPlan,
    /// Produce a safety or incident log.
    SafetyLog,
    /// No recognized intent; routed to the navigator.
    Unknown,
}

impl Intent {
    /// The agent that handles this intent by default.
    pub fn default_agent(self) -> &'static str {
        match self {
            Intent::DocumentConversion => "doc_converter",
            Intent::Localization => "localizer",
            Intent::GrantProposal => "grant_writer",
            Intent::BusinessPlan => "plan_writer",
            Intent::SafetyLog => "safety_logger",
            Intent::Unknown => NAVIGATOR_AGENT,
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Intent::DocumentConversion => "document_conversion",
            Intent::Localization => "localization",
            Intent::GrantProposal => "grant_proposal",
            Intent::BusinessPlan => "business_plan",
            Intent::SafetyLog => "safety_log",
            Intent::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// One request's full lifecycle record, from intake to a terminal status.
///
/// The orchestrator owns this value in memory for the duration of one
/// execution; the store is the system of record that concurrent readers
/// observe. The correlation id is immutable once assigned and ties every
/// log and audit entry for the run together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRun {
    /// Opaque, globally unique id assigned at intake. Never reused.
    pub correlation_id: String,
    /// Tenant scope for every resource access and rate-limit bucket.
    pub organization_id: String,
    /// Raw user input, size-capped at intake.
    pub user_query: String,
    /// Classified intent, or [`Intent::Unknown`].
    pub intent: Intent,
    /// Classification confidence in `[0, 1]`.
    pub confidence: f64,
    /// Identifier of the resolved handler.
    pub current_agent: String,
    /// Ordered, append-only list of agents actually dispatched.
    pub agent_history: Vec<String>,
    /// Estimated execution cost, set during `cost_check`.
    pub estimated_cost: f64,
    /// Actual cost reported by the handler. Only set on completion.
    pub actual_cost: Option<f64>,
    /// True once the cost passed the threshold or a human approved it.
    pub budget_approved: bool,
    /// Whether the approval gate suspended this run.
    pub requires_hitl: bool,
    /// Set by the external approval event; required to leave
    /// `awaiting_approval` for `executing`.
    pub hitl_approved: bool,
    /// Current lifecycle status.
    pub status: WorkflowStatus,
    /// Handler output, set on completion.
    pub final_output: Option<String>,
    /// Sanitized failure description, set on failure.
    pub error: Option<String>,
    /// Intake timestamp.
    pub started_at: DateTime<Utc>,
    /// Set when a terminal status is reached.
    pub completed_at: Option<DateTime<Utc>>,
    /// Open key-value bag for stage-specific annotations.
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl WorkflowRun {
    /// Create a pending run with a fresh correlation id.
    pub fn new(organization_id: impl Into<String>, user_query: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4().to_string(),
            organization_id: organization_id.into(),
            user_query: user_query.into(),
            intent: Intent::Unknown,
            confidence: 0.0,
            current_agent: NAVIGATOR_AGENT.to_string(),
            agent_history: Vec::new(),
            estimated_cost: 0.0,
            actual_cost: None,
            budget_approved: false,
            requires_hitl: false,
            hitl_approved: false,
            status: WorkflowStatus::Pending,
            final_output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
            metadata: HashMap::new(),
        }
    }

    /// Use a caller-supplied correlation id instead of a generated one.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Move the run to `to`, enforcing the transition table.
    ///
    /// Terminal statuses stamp `completed_at`.
    pub fn transition(&mut self, to: WorkflowStatus) -> StewardResult<()> {
        if !self.status.can_transition(to) {
            return Err(StewardError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        if to.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Append a dispatched agent to the history and make it current.
    pub fn record_agent(&mut self, agent: impl Into<String>) {
        let agent = agent.into();
        self.agent_history.push(agent.clone());
        self.current_agent = agent;
    }

    /// Mark the run failed with a sanitized, user-visible message.
    pub fn fail(&mut self, message: impl Into<String>) -> StewardResult<()> {
        self.error = Some(message.into());
        self.transition(WorkflowStatus::Failed)
    }
}
