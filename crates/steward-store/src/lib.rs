//! Workflow persistence and audit trail for Steward.
//!
//! The store is the system of record: every status transition of a run is
//! appended as a full snapshot, keyed by tenant and correlation id, so the
//! chronological history survives alongside the latest state. The approval
//! flow depends on re-reading a suspended run's exact prior snapshot, which
//! is why history is retained and not just the head.
//!
//! # Main types
//!
//! - [`WorkflowStore`] — The persistence trait both backends implement.
//! - [`MemoryStore`] — In-process store for tests and single-instance use.
//! - [`FileStore`] — JSONL append-per-run store on disk.

/// Append-only JSONL store on disk.
pub mod file;
/// In-memory store behind an async `RwLock`.
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use steward_core::{ApprovalDecision, ApprovalRequest, StewardResult, WorkflowRun};

/// Durable record of workflow runs and their approval requests.
///
/// All reads and writes are scoped by organization; asking one tenant's
/// store scope for another tenant's run returns nothing. That scoping is a
/// programming contract, not the security boundary — access control lives
/// with the caller.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Append a snapshot of the run. Idempotent: re-saving the same
    /// snapshot, or saving a later status under the same correlation id,
    /// never corrupts the history.
    async fn save(&self, run: &WorkflowRun) -> StewardResult<()>;

    /// Load the most recent complete snapshot for a run.
    async fn load(
        &self,
        organization_id: &str,
        correlation_id: &str,
    ) -> StewardResult<Option<WorkflowRun>>;

    /// Full chronological snapshot history for a run, oldest first.
    async fn history(
        &self,
        organization_id: &str,
        correlation_id: &str,
    ) -> StewardResult<Vec<WorkflowRun>>;

    /// Record a new approval request.
    async fn create_approval(&self, request: &ApprovalRequest) -> StewardResult<()>;

    /// Load an approval request by id.
    async fn load_approval(
        &self,
        organization_id: &str,
        approval_id: &str,
    ) -> StewardResult<Option<ApprovalRequest>>;

    /// Resolve a pending approval request exactly once.
    ///
    /// Errors with [`steward_core::StewardError::Approval`] if the request
    /// is unknown or already resolved.
    async fn resolve_approval(
        &self,
        organization_id: &str,
        approval_id: &str,
        decision: &ApprovalDecision,
    ) -> StewardResult<ApprovalRequest>;
}

pub(crate) fn apply_decision(request: &mut ApprovalRequest, decision: &ApprovalDecision) {
    use steward_core::ApprovalStatus;
    request.status = if decision.approved {
        ApprovalStatus::Approved
    } else {
        ApprovalStatus::Rejected
    };
    request.reviewer_note = decision.reviewer_note.clone();
    request.resolved_at = Some(chrono::Utc::now());
}
