use crate::{apply_decision, WorkflowStore};
use async_trait::async_trait;
use std::collections::HashMap;
use steward_core::{ApprovalDecision, ApprovalRequest, StewardError, StewardResult, WorkflowRun};
use tokio::sync::RwLock;
use tracing::debug;

type RunKey = (String, String); // (organization_id, correlation_id)

/// In-memory workflow store.
///
/// Histories are plain vectors behind an async `RwLock`; good enough for a
/// single-instance deployment and the default for tests.
#[derive(Default)]
pub struct MemoryStore {
    runs: RwLock<HashMap<RunKey, Vec<WorkflowRun>>>,
    approvals: RwLock<HashMap<RunKey, ApprovalRequest>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn save(&self, run: &WorkflowRun) -> StewardResult<()> {
        let key = (run.organization_id.clone(), run.correlation_id.clone());
        let mut runs = self.runs.write().await;
        let history = runs.entry(key).or_default();
        debug!(
            correlation_id = %run.correlation_id,
            status = %run.status,
            snapshot = history.len() + 1,
            "saving run snapshot"
        );
        history.push(run.clone());
        Ok(())
    }

    async fn load(
        &self,
        organization_id: &str,
        correlation_id: &str,
    ) -> StewardResult<Option<WorkflowRun>> {
        let runs = self.runs.read().await;
        Ok(runs
            .get(&(organization_id.to_string(), correlation_id.to_string()))
            .and_then(|history| history.last().cloned()))
    }

    async fn history(
        &self,
        organization_id: &str,
        correlation_id: &str,
    ) -> StewardResult<Vec<WorkflowRun>> {
        let runs = self.runs.read().await;
        Ok(runs
            .get(&(organization_id.to_string(), correlation_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_approval(&self, request: &ApprovalRequest) -> StewardResult<()> {
        let key = (request.organization_id.clone(), request.id.clone());
        let mut approvals = self.approvals.write().await;
        approvals.insert(key, request.clone());
        Ok(())
    }

    async fn load_approval(
        &self,
        organization_id: &str,
        approval_id: &str,
    ) -> StewardResult<Option<ApprovalRequest>> {
        let approvals = self.approvals.read().await;
        Ok(approvals
            .get(&(organization_id.to_string(), approval_id.to_string()))
            .cloned())
    }

    async fn resolve_approval(
        &self,
        organization_id: &str,
        approval_id: &str,
        decision: &ApprovalDecision,
    ) -> StewardResult<ApprovalRequest> {
        let mut approvals = self.approvals.write().await;
        let request = approvals
            .get_mut(&(organization_id.to_string(), approval_id.to_string()))
            .ok_or_else(|| {
                StewardError::Approval(format!("unknown approval request: {approval_id}"))
            })?;
        if request.is_resolved() {
            return Err(StewardError::Approval(format!(
                "approval request {approval_id} already resolved"
            )));
        }
        apply_decision(request, decision);
        Ok(request.clone())
    }
}
