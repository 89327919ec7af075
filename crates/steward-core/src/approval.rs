//! Human-in-the-loop approval types.
//!
//! An [`ApprovalRequest`] is created when the gate suspends a run; it is
//! resolved exactly once by an authorized reviewer, and that resolution is
//! the only external event that can unblock the suspended run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolution state of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    /// Waiting on a reviewer.
    Pending,
    /// The reviewer approved; the run may resume at dispatch.
    Approved,
    /// The reviewer rejected; the run terminates as failed.
    Rejected,
}

/// A request sent to a human reviewer when a run is suspended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique id of this approval request.
    pub id: String,
    /// Back-reference to the suspended run. Not an ownership edge.
    pub workflow_correlation_id: String,
    /// Tenant that owns both the run and this request.
    pub organization_id: String,
    /// Agent the run resolved to.
    pub agent: String,
    /// Cost estimate that triggered (or accompanied) the suspension.
    pub estimated_cost: f64,
    /// Why the gate suspended the run, for the reviewer.
    pub reason: String,
    /// Current resolution state.
    pub status: ApprovalStatus,
    /// Note left by the reviewer at resolution.
    pub reviewer_note: Option<String>,
    /// When the request was created.
    pub created_at: DateTime<Utc>,
    /// When the request was resolved, if it has been.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    /// Create a pending request for a suspended run.
    pub fn new(
        workflow_correlation_id: impl Into<String>,
        organization_id: impl Into<String>,
        agent: impl Into<String>,
        estimated_cost: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workflow_correlation_id: workflow_correlation_id.into(),
            organization_id: organization_id.into(),
            agent: agent.into(),
            estimated_cost,
            reason: reason.into(),
            status: ApprovalStatus::Pending,
            reviewer_note: None,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Whether this request has already been resolved.
    pub fn is_resolved(&self) -> bool {
        self.status != ApprovalStatus::Pending
    }
}

/// The decision made by a human reviewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// True to resume the run, false to terminate it.
    pub approved: bool,
    /// Optional note, preserved verbatim on the run when rejecting.
    pub reviewer_note: Option<String>,
    /// Identity of the reviewer, for the audit trail.
    pub reviewer: String,
}

impl ApprovalDecision {
    /// An approval with no note.
    pub fn approve(reviewer: impl Into<String>) -> Self {
        Self {
            approved: true,
            reviewer_note: None,
            reviewer: reviewer.into(),
        }
    }

    /// A rejection carrying the reviewer's note.
    pub fn reject(reviewer: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            approved: false,
            reviewer_note: Some(note.into()),
            reviewer: reviewer.into(),
        }
    }
}
