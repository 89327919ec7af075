use crate::{apply_decision, WorkflowStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use steward_core::{ApprovalDecision, ApprovalRequest, StewardError, StewardResult, WorkflowRun};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// File-backed workflow store.
///
/// Each run is one JSONL file under `dir/{org}/runs/{correlation_id}.jsonl`
/// with one snapshot per line, appended in order; approvals are single JSON
/// files rewritten at resolution. Append-only run files keep the full audit
/// history on disk, so a process crash after a suspension loses nothing.
pub struct FileStore {
    dir: PathBuf,
}

/// Ids become path segments, so anything that could climb out of the store
/// root is rejected before touching the filesystem.
fn component(value: &str) -> StewardResult<&str> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(StewardError::Validation(format!(
            "path-unsafe id component: {value:?}"
        )));
    }
    Ok(value)
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub async fn new(dir: impl Into<PathBuf>) -> StewardResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn run_path(&self, organization_id: &str, correlation_id: &str) -> StewardResult<PathBuf> {
        Ok(self
            .dir
            .join(component(organization_id)?)
            .join("runs")
            .join(format!("{}.jsonl", component(correlation_id)?)))
    }

    fn approval_path(&self, organization_id: &str, approval_id: &str) -> StewardResult<PathBuf> {
        Ok(self
            .dir
            .join(component(organization_id)?)
            .join("approvals")
            .join(format!("{}.json", component(approval_id)?)))
    }

    async fn read_history(&self, path: &Path) -> StewardResult<Vec<WorkflowRun>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = tokio::fs::read_to_string(path).await?;
        let mut snapshots = Vec::new();
        for line in data.lines().filter(|l| !l.trim().is_empty()) {
            let run: WorkflowRun = serde_json::from_str(line).map_err(|e| {
                StewardError::Persistence(format!("corrupt run snapshot in {path:?}: {e}"))
            })?;
            snapshots.push(run);
        }
        Ok(snapshots)
    }

    async fn write_approval(&self, request: &ApprovalRequest) -> StewardResult<()> {
        let path = self.approval_path(&request.organization_id, &request.id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(request)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

#[async_trait]
impl WorkflowStore for FileStore {
    async fn save(&self, run: &WorkflowRun) -> StewardResult<()> {
        let path = self.run_path(&run.organization_id, &run.correlation_id)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let line = format!("{}\n", serde_json::to_string(run)?);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        debug!(
            correlation_id = %run.correlation_id,
            status = %run.status,
            "appended run snapshot"
        );
        Ok(())
    }

    async fn load(
        &self,
        organization_id: &str,
        correlation_id: &str,
    ) -> StewardResult<Option<WorkflowRun>> {
        let path = self.run_path(organization_id, correlation_id)?;
        Ok(self.read_history(&path).await?.pop())
    }

    async fn history(
        &self,
        organization_id: &str,
        correlation_id: &str,
    ) -> StewardResult<Vec<WorkflowRun>> {
        let path = self.run_path(organization_id, correlation_id)?;
        self.read_history(&path).await
    }

    async fn create_approval(&self, request: &ApprovalRequest) -> StewardResult<()> {
        self.write_approval(request).await
    }

    async fn load_approval(
        &self,
        organization_id: &str,
        approval_id: &str,
    ) -> StewardResult<Option<ApprovalRequest>> {
        let path = self.approval_path(organization_id, approval_id)?;
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(path).await?;
        let request: ApprovalRequest = serde_json::from_str(&data)
            .map_err(|e| StewardError::Persistence(format!("corrupt approval record: {e}")))?;
        Ok(Some(request))
    }

    async fn resolve_approval(
        &self,
        organization_id: &str,
        approval_id: &str,
        decision: &ApprovalDecision,
    ) -> StewardResult<ApprovalRequest> {
        let mut request = self
            .load_approval(organization_id, approval_id)
            .await?
            .ok_or_else(|| {
                StewardError::Approval(format!("unknown approval request: {approval_id}"))
            })?;
        if request.is_resolved() {
            return Err(StewardError::Approval(format!(
                "approval request {approval_id} already resolved"
            )));
        }
        apply_decision(&mut request, decision);
        self.write_approval(&request).await?;
        Ok(request)
    }
}
