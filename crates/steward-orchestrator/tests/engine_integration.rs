#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use steward_agents::{AgentContext, AgentHandler, AgentOutput, AgentRegistry};
use steward_core::{
    ApprovalDecision, IntakeRequest, StewardError, StewardResult, WorkflowStatus,
};
use steward_orchestrator::{Orchestrator, RateBudget, StewardConfig, APPROVAL_REQUEST_KEY};
use steward_store::{FileStore, MemoryStore, WorkflowStore};

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

/// Handler that sleeps past any test deadline.
struct SleepyHandler {
    id: String,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl AgentHandler for SleepyHandler {
    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, _context: &AgentContext) -> StewardResult<AgentOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(AgentOutput {
            output: "never".to_string(),
            actual_cost: 0.0,
        })
    }
}

/// Handler that fails retryably once, then succeeds.
struct FlakyHandler {
    id: String,
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl AgentHandler for FlakyHandler {
    fn id(&self) -> &str {
        &self.id
    }

    async fn execute(&self, _context: &AgentContext) -> StewardResult<AgentOutput> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(StewardError::agent_retryable("upstream connection reset"))
        } else {
            Ok(AgentOutput {
                output: "recovered".to_string(),
                actual_cost: 0.2,
            })
        }
    }
}

fn fast_config() -> StewardConfig {
    let mut config = StewardConfig::default();
    config.dispatch_timeout_ms = 50;
    config.retry.backoff_base_ms = 1;
    config.retry.backoff_max_ms = 2;
    config.rate_limit = 1_000;
    config
}

fn engine_with(
    config: StewardConfig,
    registry: AgentRegistry,
) -> (Orchestrator, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = Orchestrator::new(config, Arc::new(registry), store.clone());
    (engine, store)
}

fn default_engine() -> (Orchestrator, Arc<MemoryStore>) {
    engine_with(fast_config(), AgentRegistry::with_builtins().unwrap())
}

fn statuses(history: &[steward_core::WorkflowRun]) -> Vec<WorkflowStatus> {
    history.iter().map(|r| r.status).collect()
}

// ---------------------------------------------------------------------------
// Scenario A: low-cost, non-allow-listed request completes without approval
// ---------------------------------------------------------------------------

#[tokio::test]
async fn low_cost_conversion_completes_without_approval() {
    let (engine, store) = default_engine();

    let outcome = engine
        .start(IntakeRequest::new("acme", "Convert this document to PDF"))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.state.status, WorkflowStatus::Completed);
    assert_eq!(outcome.agent, "doc_converter");
    assert!(outcome.actual_cost > 0.0);
    assert!(!outcome.output.is_empty());

    let history = store.history("acme", &outcome.correlation_id).await.unwrap();
    assert!(!statuses(&history).contains(&WorkflowStatus::AwaitingApproval));
    assert_eq!(
        statuses(&history),
        vec![
            WorkflowStatus::Pending,
            WorkflowStatus::Routing,
            WorkflowStatus::CostCheck,
            WorkflowStatus::Executing,
            WorkflowStatus::Completed,
        ]
    );
    assert_eq!(outcome.state.agent_history, vec!["doc_converter"]);
}

// ---------------------------------------------------------------------------
// Scenario B: allow-listed agent suspends; rejection preserves the note
// ---------------------------------------------------------------------------

#[tokio::test]
async fn allow_listed_agent_suspends_and_rejection_is_terminal() {
    let (engine, store) = default_engine();

    let outcome = engine
        .start(IntakeRequest::new(
            "acme",
            "Draft a grant proposal for our literacy program",
        ))
        .await
        .unwrap();

    assert_eq!(outcome.state.status, WorkflowStatus::AwaitingApproval);
    assert_eq!(outcome.agent, "grant_writer");
    assert!(outcome.state.requires_hitl);
    // Nothing dispatched while suspended
    assert!(outcome.state.agent_history.is_empty());

    let rejected = engine
        .resume(
            "acme",
            &outcome.correlation_id,
            ApprovalDecision::reject("lead@acme", "budget frozen until Q3"),
        )
        .await
        .unwrap();

    assert!(!rejected.success);
    assert_eq!(rejected.state.status, WorkflowStatus::Failed);
    assert_eq!(rejected.error.as_deref(), Some("budget frozen until Q3"));

    // Terminal: a second resolution attempt is refused
    let again = engine
        .resume(
            "acme",
            &outcome.correlation_id,
            ApprovalDecision::approve("lead@acme"),
        )
        .await;
    assert!(again.is_err());

    let history = store.history("acme", &outcome.correlation_id).await.unwrap();
    assert_eq!(history.last().unwrap().status, WorkflowStatus::Failed);
}

// ---------------------------------------------------------------------------
// Scenario C: approval resumes exactly at dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn approval_resumes_at_dispatch_without_reclassification() {
    let (engine, store) = default_engine();

    let suspended = engine
        .start(IntakeRequest::new(
            "acme",
            "Write a grant application for youth coding workshops",
        ))
        .await
        .unwrap();
    assert_eq!(suspended.state.status, WorkflowStatus::AwaitingApproval);

    let resumed = engine
        .resume(
            "acme",
            &suspended.correlation_id,
            ApprovalDecision::approve("cfo@acme"),
        )
        .await
        .unwrap();

    assert!(resumed.success);
    assert_eq!(resumed.state.status, WorkflowStatus::Completed);
    assert!(resumed.state.hitl_approved);
    assert!(resumed.actual_cost > 0.0);
    // Estimate survives from the original pass
    assert_eq!(resumed.estimated_cost, suspended.estimated_cost);

    let history = store
        .history("acme", &suspended.correlation_id)
        .await
        .unwrap();
    let all = statuses(&history);
    // Approval gate honored: awaiting_approval strictly precedes executing
    let awaiting = all
        .iter()
        .position(|s| *s == WorkflowStatus::AwaitingApproval)
        .unwrap();
    let executing = all
        .iter()
        .position(|s| *s == WorkflowStatus::Executing)
        .unwrap();
    assert!(awaiting < executing);
    // Classification and estimation ran exactly once
    assert_eq!(
        all.iter().filter(|s| **s == WorkflowStatus::Routing).count(),
        1
    );
    assert_eq!(
        all.iter().filter(|s| **s == WorkflowStatus::CostCheck).count(),
        1
    );
}

// ---------------------------------------------------------------------------
// Scenario D: unregistered agent ids fail closed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unregistered_agent_fails_closed() {
    // A registry without the localizer the classifier will route to
    let mut registry = AgentRegistry::new();
    registry
        .register(Arc::new(steward_agents::builtins::Navigator::new()))
        .unwrap();
    let (engine, _store) = engine_with(fast_config(), registry);

    let outcome = engine
        .start(IntakeRequest::new("acme", "translate this into Spanish"))
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.state.status, WorkflowStatus::Failed);
    // Descriptive but sanitized: names the missing id, nothing else
    assert!(outcome.error.unwrap().contains("localizer"));
    // No handler ran, so no agent was ever recorded
    assert!(outcome.state.agent_history.is_empty());
    assert!(outcome.state.actual_cost.is_none());
}

// ---------------------------------------------------------------------------
// Scenario E: timeouts exhaust the retry budget
// ---------------------------------------------------------------------------

#[tokio::test]
async fn repeated_timeouts_exhaust_retries_and_fail() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut registry = AgentRegistry::new();
    registry
        .register(Arc::new(SleepyHandler {
            id: "doc_converter".to_string(),
            calls: calls.clone(),
        }))
        .unwrap();
    let (engine, _store) = engine_with(fast_config(), registry);

    let outcome = engine
        .start(IntakeRequest::new("acme", "Convert this document to PDF"))
        .await
        .unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.state.status, WorkflowStatus::Failed);
    assert!(outcome.state.actual_cost.is_none());
    // One attempt plus exactly one automatic retry
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Transient failures recover within the retry budget
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transient_failure_recovers_with_one_retry() {
    let calls = Arc::new(AtomicU32::new(0));
    let mut registry = AgentRegistry::new();
    registry
        .register(Arc::new(FlakyHandler {
            id: "doc_converter".to_string(),
            calls: calls.clone(),
        }))
        .unwrap();
    let (engine, _store) = engine_with(fast_config(), registry);

    let outcome = engine
        .start(IntakeRequest::new("acme", "Convert this document to PDF"))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.output, "recovered");
    assert_eq!(outcome.actual_cost, 0.2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

// ---------------------------------------------------------------------------
// Intake rejections persist no state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_failures_persist_nothing() {
    let (engine, store) = default_engine();

    let mut request = IntakeRequest::new("acme", "");
    request.correlation_id = Some("corr-empty".to_string());
    let err = engine.start(request).await.unwrap_err();
    assert!(matches!(err, StewardError::Validation(_)));
    assert!(store.history("acme", "corr-empty").await.unwrap().is_empty());

    let mut request = IntakeRequest::new("acme", "x".repeat(20_000));
    request.correlation_id = Some("corr-big".to_string());
    let err = engine.start(request).await.unwrap_err();
    assert!(matches!(err, StewardError::Validation(_)));
    assert!(store.history("acme", "corr-big").await.unwrap().is_empty());

    let request = IntakeRequest {
        user_query: "hello".to_string(),
        organization_id: None,
        correlation_id: Some("corr-noorg".to_string()),
    };
    let err = engine.start(request).await.unwrap_err();
    assert!(matches!(err, StewardError::Authorization(_)));
}

// ---------------------------------------------------------------------------
// Correlation ids are single-use
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reused_correlation_id_is_rejected_before_any_state() {
    let (engine, store) = default_engine();

    let mut request = IntakeRequest::new("acme", "Convert this document to PDF");
    request.correlation_id = Some("corr-reuse".to_string());
    let first = engine.start(request).await.unwrap();
    assert_eq!(first.state.status, WorkflowStatus::Completed);
    let history = store.history("acme", "corr-reuse").await.unwrap();
    assert_eq!(history.len(), 5);

    // The same id names a terminal run; a second start must not extend it
    let mut request = IntakeRequest::new("acme", "Convert this other document to PDF");
    request.correlation_id = Some("corr-reuse".to_string());
    let err = engine.start(request).await.unwrap_err();
    assert!(matches!(err, StewardError::Validation(_)));

    let history = store.history("acme", "corr-reuse").await.unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history.last().unwrap().status, WorkflowStatus::Completed);

    // A suspended (non-terminal) run holds its id just as firmly
    let mut request = IntakeRequest::new("acme", "Draft a grant proposal for the shelter");
    request.correlation_id = Some("corr-held".to_string());
    let suspended = engine.start(request).await.unwrap();
    assert_eq!(suspended.state.status, WorkflowStatus::AwaitingApproval);
    let mut request = IntakeRequest::new("acme", "Convert this document to PDF");
    request.correlation_id = Some("corr-held".to_string());
    assert!(engine.start(request).await.is_err());
}

// ---------------------------------------------------------------------------
// Rate limiting at intake
// ---------------------------------------------------------------------------

#[tokio::test]
async fn orchestrator_bucket_rejects_over_budget_tenants() {
    let mut config = fast_config();
    config.rate_limit = 2;
    let (engine, _store) = engine_with(config, AgentRegistry::with_builtins().unwrap());

    for _ in 0..2 {
        engine
            .start(IntakeRequest::new("acme", "Convert this to PDF"))
            .await
            .unwrap();
    }
    let err = engine
        .start(IntakeRequest::new("acme", "Convert this to PDF"))
        .await
        .unwrap_err();
    assert!(matches!(err, StewardError::RateLimited(_)));

    // Another tenant is unaffected
    engine
        .start(IntakeRequest::new("globex", "Convert this to PDF"))
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Dedicated agent budgets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dedicated_agent_budget_fails_the_run_terminally() {
    let mut config = fast_config();
    config.agent_rates.insert(
        "doc_converter".to_string(),
        RateBudget {
            limit: 1,
            window_secs: 60,
        },
    );
    let (engine, store) = engine_with(config, AgentRegistry::with_builtins().unwrap());

    let first = engine
        .start(IntakeRequest::new("acme", "Convert this document to PDF"))
        .await
        .unwrap();
    assert_eq!(first.state.status, WorkflowStatus::Completed);

    // The bucket is empty mid-run, past intake: the run fails terminally
    // with the sanitized message, nothing dispatched.
    let second = engine
        .start(IntakeRequest::new("acme", "Convert this one to PDF too"))
        .await
        .unwrap();
    assert!(!second.success);
    assert_eq!(second.state.status, WorkflowStatus::Failed);
    assert_eq!(second.error.as_deref(), Some("Rate limit exceeded, slow down"));
    assert!(second.state.agent_history.is_empty());
    assert!(second.state.actual_cost.is_none());
    let history = store.history("acme", &second.correlation_id).await.unwrap();
    assert_eq!(history.last().unwrap().status, WorkflowStatus::Failed);

    // Agents without a dedicated budget still share the orchestrator bucket
    let other = engine
        .start(IntakeRequest::new("acme", "translate this into Spanish"))
        .await
        .unwrap();
    assert_eq!(other.state.status, WorkflowStatus::Completed);
}

// ---------------------------------------------------------------------------
// Resume guards
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resume_requires_a_suspended_run() {
    let (engine, _store) = default_engine();

    // Unknown correlation id
    let err = engine
        .resume("acme", "no-such-run", ApprovalDecision::approve("lead@acme"))
        .await
        .unwrap_err();
    assert!(matches!(err, StewardError::Validation(_)));

    // A completed run accepts no further transitions
    let done = engine
        .start(IntakeRequest::new("acme", "Convert this document to PDF"))
        .await
        .unwrap();
    assert_eq!(done.state.status, WorkflowStatus::Completed);
    let err = engine
        .resume(
            "acme",
            &done.correlation_id,
            ApprovalDecision::approve("lead@acme"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, StewardError::InvalidTransition { .. }));
}

// ---------------------------------------------------------------------------
// Resume replays an approval resolved before the run snapshot landed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn resume_recovers_from_an_already_resolved_approval() {
    let (engine, store) = default_engine();

    let suspended = engine
        .start(IntakeRequest::new(
            "acme",
            "Draft a grant proposal for the food bank",
        ))
        .await
        .unwrap();
    assert_eq!(suspended.state.status, WorkflowStatus::AwaitingApproval);
    let approval_id = suspended.state.metadata[APPROVAL_REQUEST_KEY]
        .as_str()
        .unwrap()
        .to_string();

    // The approval resolved durably, but the run never advanced — as after
    // a crash between the two writes.
    store
        .resolve_approval("acme", &approval_id, &ApprovalDecision::approve("cfo@acme"))
        .await
        .unwrap();
    let stuck = store
        .load("acme", &suspended.correlation_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stuck.status, WorkflowStatus::AwaitingApproval);

    // Resume picks up the stored resolution instead of refusing it
    let resumed = engine
        .resume(
            "acme",
            &suspended.correlation_id,
            ApprovalDecision::approve("cfo@acme"),
        )
        .await
        .unwrap();
    assert!(resumed.success);
    assert_eq!(resumed.state.status, WorkflowStatus::Completed);

    // The stored decision wins even when the retry disagrees
    let rejected_first = engine
        .start(IntakeRequest::new(
            "acme",
            "Draft a grant proposal for the library",
        ))
        .await
        .unwrap();
    let approval_id = rejected_first.state.metadata[APPROVAL_REQUEST_KEY]
        .as_str()
        .unwrap()
        .to_string();
    store
        .resolve_approval(
            "acme",
            &approval_id,
            &ApprovalDecision::reject("cfo@acme", "out of budget"),
        )
        .await
        .unwrap();
    let resumed = engine
        .resume(
            "acme",
            &rejected_first.correlation_id,
            ApprovalDecision::approve("cfo@acme"),
        )
        .await
        .unwrap();
    assert!(!resumed.success);
    assert_eq!(resumed.state.status, WorkflowStatus::Failed);
    assert_eq!(resumed.error.as_deref(), Some("out of budget"));
}

// ---------------------------------------------------------------------------
// Unclassifiable input routes to the navigator and still completes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_intent_falls_back_to_navigator() {
    let (engine, _store) = default_engine();

    let outcome = engine
        .start(IntakeRequest::new("acme", "hmm, not sure what I want"))
        .await
        .unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.state.status, WorkflowStatus::Completed);
    assert_eq!(outcome.state.agent_history, vec!["navigator"]);
}

// ---------------------------------------------------------------------------
// Suspension is durable across a process restart
// ---------------------------------------------------------------------------

#[tokio::test]
async fn suspended_run_survives_engine_restart() {
    let tmp = tempfile::tempdir().unwrap();

    let suspended = {
        let store = Arc::new(FileStore::new(tmp.path()).await.unwrap());
        let engine = Orchestrator::new(
            fast_config(),
            Arc::new(AgentRegistry::with_builtins().unwrap()),
            store,
        );
        engine
            .start(IntakeRequest::new(
                "acme",
                "Draft a grant proposal for river cleanup",
            ))
            .await
            .unwrap()
    };
    assert_eq!(suspended.state.status, WorkflowStatus::AwaitingApproval);

    // A fresh engine over the same directory picks the run back up
    let store = Arc::new(FileStore::new(tmp.path()).await.unwrap());
    let engine = Orchestrator::new(
        fast_config(),
        Arc::new(AgentRegistry::with_builtins().unwrap()),
        store,
    );
    let resumed = engine
        .resume(
            "acme",
            &suspended.correlation_id,
            ApprovalDecision::approve("cfo@acme"),
        )
        .await
        .unwrap();
    assert_eq!(resumed.state.status, WorkflowStatus::Completed);
    assert!(resumed.state.actual_cost.is_some());
}

// ---------------------------------------------------------------------------
// Concurrent runs are independent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_runs_do_not_interfere() {
    let (engine, store) = default_engine();
    let engine = Arc::new(engine);

    let mut handles = Vec::new();
    for i in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            engine
                .start(IntakeRequest::new(
                    format!("org-{}", i % 2),
                    "Convert this document to PDF",
                ))
                .await
                .unwrap()
        }));
    }

    let mut correlation_ids = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.state.status, WorkflowStatus::Completed);
        correlation_ids.push((outcome.state.organization_id.clone(), outcome.correlation_id));
    }

    // All distinct, each with its own complete history
    correlation_ids.sort();
    correlation_ids.dedup();
    assert_eq!(correlation_ids.len(), 8);
    for (org, correlation_id) in &correlation_ids {
        let history = store.history(org, correlation_id).await.unwrap();
        assert_eq!(history.last().unwrap().status, WorkflowStatus::Completed);
    }
}
