use crate::classify::{Classifier, IntentModel};
use crate::config::StewardConfig;
use std::collections::HashMap;
use std::sync::Arc;
use steward_agents::{AgentContext, AgentRegistry};
use steward_core::{
    ApprovalDecision, ApprovalRequest, ApprovalStatus, IntakeRequest, StewardError, StewardResult,
    WorkflowOutcome, WorkflowRun, WorkflowStatus,
};
use steward_security::{rate_key, retry, sanitize_query, with_timeout, RateLimiter};
use steward_store::WorkflowStore;
use tracing::{error, info, warn};

/// Metadata key the engine uses to find a suspended run's approval request.
pub const APPROVAL_REQUEST_KEY: &str = "approval_request_id";

/// The workflow orchestration engine.
///
/// Governs a single request's lifecycle from intake to a terminal status:
/// classification, cost estimation, the human-approval gate, dispatch, and
/// durable recording of every transition. One engine instance serves many
/// concurrent runs across tenants; there is no global lock — the only
/// shared mutable state is the rate limiter's bucket map and the store.
///
/// Suspension and resumption are two independent entry points into the same
/// state machine: [`start`](Self::start) drives a run until it completes or
/// suspends, and [`resume`](Self::resume) re-enters at dispatch when the
/// external approval event arrives. No task is held while a human reviews.
pub struct Orchestrator {
    config: StewardConfig,
    registry: Arc<AgentRegistry>,
    store: Arc<dyn WorkflowStore>,
    limiter: RateLimiter,
    agent_limiters: HashMap<String, RateLimiter>,
    classifier: Classifier,
}

impl Orchestrator {
    /// Create an engine with the in-process heuristic classification tier.
    pub fn new(
        config: StewardConfig,
        registry: Arc<AgentRegistry>,
        store: Arc<dyn WorkflowStore>,
    ) -> Self {
        let classifier = Classifier::with_default_model(config.classify_timeout());
        Self::with_classifier(config, registry, store, classifier)
    }

    /// Create an engine with a custom probabilistic classification tier.
    pub fn with_model(
        config: StewardConfig,
        registry: Arc<AgentRegistry>,
        store: Arc<dyn WorkflowStore>,
        model: Arc<dyn IntentModel>,
    ) -> Self {
        let classifier = Classifier::new(model, config.classify_timeout());
        Self::with_classifier(config, registry, store, classifier)
    }

    fn with_classifier(
        config: StewardConfig,
        registry: Arc<AgentRegistry>,
        store: Arc<dyn WorkflowStore>,
        classifier: Classifier,
    ) -> Self {
        let limiter = RateLimiter::per_window(config.rate_limit, config.rate_window());
        // Agents without a dedicated budget share the orchestrator limiter.
        let agent_limiters = config
            .agent_rates
            .iter()
            .map(|(id, budget)| {
                (
                    id.clone(),
                    RateLimiter::per_window(budget.limit, budget.window()),
                )
            })
            .collect();
        Self {
            config,
            registry,
            store,
            limiter,
            agent_limiters,
            classifier,
        }
    }

    /// Read access to the store, for callers serving dashboards or audits.
    pub fn store(&self) -> &Arc<dyn WorkflowStore> {
        &self.store
    }

    /// Entry point one: run a fresh request until it completes, fails, or
    /// suspends for approval.
    ///
    /// Validation, authorization, and rate-limit rejections happen before
    /// any state is persisted. Every later error path persists a terminal
    /// `failed` snapshot before returning.
    pub async fn start(&self, request: IntakeRequest) -> StewardResult<WorkflowOutcome> {
        let organization_id = request.validate(self.config.max_query_bytes)?.to_string();

        let bucket = rate_key("orchestrator", &organization_id);
        if !self.limiter.check(&bucket).await {
            return Err(StewardError::RateLimited(bucket));
        }

        let mut run = WorkflowRun::new(&organization_id, sanitize_query(&request.user_query));
        if let Some(correlation_id) = request.correlation_id {
            // Correlation ids are never reused: a caller-supplied id that
            // already names a run is rejected before any state is persisted.
            if self
                .store
                .load(&organization_id, &correlation_id)
                .await?
                .is_some()
            {
                return Err(StewardError::Validation(format!(
                    "correlation id {correlation_id} is already in use"
                )));
            }
            run = run.with_correlation_id(correlation_id);
        }
        info!(
            correlation_id = %run.correlation_id,
            org = %organization_id,
            "workflow accepted"
        );
        self.store.save(&run).await?;

        // Routing: classification never fails the run, it degrades.
        run.transition(WorkflowStatus::Routing)?;
        let classification = self.classifier.classify(&run.user_query).await;
        run.intent = classification.intent;
        run.confidence = classification.confidence;
        run.current_agent = classification.agent;
        run.metadata.insert(
            "classification_reason".to_string(),
            serde_json::Value::String(classification.reason),
        );
        info!(
            correlation_id = %run.correlation_id,
            intent = %run.intent,
            agent = %run.current_agent,
            confidence = run.confidence,
            "request classified"
        );
        self.store.save(&run).await?;

        // Cost check: estimation failure is fatal to the run.
        run.transition(WorkflowStatus::CostCheck)?;
        match self.config.cost.estimate(&run.current_agent, &run.user_query) {
            Ok(cost) => run.estimated_cost = cost,
            Err(err) => {
                error!(
                    correlation_id = %run.correlation_id,
                    error = %err,
                    "cost estimation failed"
                );
                run.fail(err.sanitized())?;
                self.store.save(&run).await?;
                return Ok(WorkflowOutcome::from_run(run));
            }
        }
        self.store.save(&run).await?;

        // Approval gate.
        if self
            .config
            .hitl
            .requires_approval(&run.current_agent, run.estimated_cost)
        {
            return self.suspend(run).await;
        }

        run.budget_approved = true;
        self.dispatch(run).await
    }

    /// Entry point two: resume a suspended run with an external approval
    /// decision. Re-enters the state machine at dispatch; classification and
    /// cost estimation are not re-run.
    pub async fn resume(
        &self,
        organization_id: &str,
        correlation_id: &str,
        decision: ApprovalDecision,
    ) -> StewardResult<WorkflowOutcome> {
        let mut run = self
            .store
            .load(organization_id, correlation_id)
            .await?
            .ok_or_else(|| {
                StewardError::Validation(format!("no run for correlation id {correlation_id}"))
            })?;

        if run.status != WorkflowStatus::AwaitingApproval {
            return Err(StewardError::InvalidTransition {
                from: run.status.to_string(),
                to: WorkflowStatus::Executing.to_string(),
            });
        }

        let approval_id = run
            .metadata
            .get(APPROVAL_REQUEST_KEY)
            .and_then(|v| v.as_str())
            .map(ToString::to_string)
            .ok_or_else(|| {
                StewardError::Approval(format!(
                    "suspended run {correlation_id} has no approval request recorded"
                ))
            })?;

        let stored = self
            .store
            .load_approval(organization_id, &approval_id)
            .await?
            .ok_or_else(|| {
                StewardError::Approval(format!("unknown approval request: {approval_id}"))
            })?;

        // The approval record is written before the run snapshot, so a crash
        // between the two leaves a resolved approval on a still-suspended run.
        // Replay from the stored resolution; the new decision is ignored.
        let resolved = if stored.is_resolved() {
            warn!(
                correlation_id = %correlation_id,
                approval_id = %approval_id,
                status = ?stored.status,
                "approval already resolved, replaying stored decision"
            );
            stored
        } else {
            // Exactly-once: the store rejects a second resolution.
            self.store
                .resolve_approval(organization_id, &approval_id, &decision)
                .await?
        };
        let approved = resolved.status == ApprovalStatus::Approved;
        info!(
            correlation_id = %correlation_id,
            approval_id = %approval_id,
            approved,
            reviewer = %decision.reviewer,
            "approval resolved"
        );

        if approved {
            run.hitl_approved = true;
            run.budget_approved = true;
            run.metadata.insert(
                "approved_by".to_string(),
                serde_json::Value::String(decision.reviewer),
            );
            self.dispatch(run).await
        } else {
            // Rejection is terminal; the reviewer note is preserved verbatim.
            let note = resolved
                .reviewer_note
                .unwrap_or_else(|| "rejected by reviewer".to_string());
            run.metadata.insert(
                "rejected_by".to_string(),
                serde_json::Value::String(decision.reviewer),
            );
            run.fail(note)?;
            self.store.save(&run).await?;
            Ok(WorkflowOutcome::from_run(run))
        }
    }

    /// Suspend a run for human approval.
    ///
    /// The approval record and the `awaiting_approval` snapshot are both
    /// durable before this returns, so a process crash between suspension
    /// and resumption loses no state.
    async fn suspend(&self, mut run: WorkflowRun) -> StewardResult<WorkflowOutcome> {
        run.requires_hitl = true;
        let approval = ApprovalRequest::new(
            &run.correlation_id,
            &run.organization_id,
            &run.current_agent,
            run.estimated_cost,
            self.config
                .hitl
                .suspension_reason(&run.current_agent, run.estimated_cost),
        );
        run.metadata.insert(
            APPROVAL_REQUEST_KEY.to_string(),
            serde_json::Value::String(approval.id.clone()),
        );
        run.transition(WorkflowStatus::AwaitingApproval)?;

        self.store.create_approval(&approval).await?;
        self.store.save(&run).await?;

        info!(
            correlation_id = %run.correlation_id,
            agent = %run.current_agent,
            approval_id = %approval.id,
            estimated_cost = run.estimated_cost,
            "workflow suspended for human approval"
        );
        Ok(WorkflowOutcome::from_run(run))
    }

    /// Execute the resolved agent. Shared by both entry points.
    async fn dispatch(&self, mut run: WorkflowRun) -> StewardResult<WorkflowOutcome> {
        // A suspended run may only execute once a human approved it.
        if run.status == WorkflowStatus::AwaitingApproval && !run.hitl_approved {
            return Err(StewardError::Authorization(
                "run is awaiting approval and cannot execute".to_string(),
            ));
        }

        let agent = run.current_agent.clone();
        let agent_bucket = rate_key(&agent, &run.organization_id);
        let agent_limiter = self.agent_limiters.get(&agent).unwrap_or(&self.limiter);
        if !agent_limiter.check(&agent_bucket).await {
            warn!(correlation_id = %run.correlation_id, bucket = %agent_bucket, "agent bucket exhausted");
            run.fail(StewardError::RateLimited(agent_bucket).sanitized())?;
            self.store.save(&run).await?;
            return Ok(WorkflowOutcome::from_run(run));
        }

        // Unknown agents fail closed: no default execution.
        let Some(handler) = self.registry.get(&agent).cloned() else {
            error!(correlation_id = %run.correlation_id, agent = %agent, "unregistered agent id");
            run.fail(format!("no registered agent named {agent}"))?;
            self.store.save(&run).await?;
            return Ok(WorkflowOutcome::from_run(run));
        };

        run.transition(WorkflowStatus::Executing)?;
        run.record_agent(&agent);
        self.store.save(&run).await?;

        let context = AgentContext::from_run(&run);
        let timeout = self.config.dispatch_timeout();
        let result = retry(&self.config.retry, || {
            let handler = handler.clone();
            let context = context.clone();
            async move { with_timeout(timeout, handler.execute(&context)).await }
        })
        .await;

        match result {
            Ok(output) => {
                run.final_output = Some(output.output);
                run.actual_cost = Some(output.actual_cost.max(0.0));
                run.transition(WorkflowStatus::Completed)?;
                self.store.save(&run).await?;
                info!(
                    correlation_id = %run.correlation_id,
                    agent = %agent,
                    actual_cost = run.actual_cost,
                    "workflow completed"
                );
                Ok(WorkflowOutcome::from_run(run))
            }
            Err(err) => {
                // Raw detail stays out-of-band; the run gets the sanitized form.
                error!(
                    correlation_id = %run.correlation_id,
                    agent = %agent,
                    error = %err,
                    "agent execution failed"
                );
                run.fail(err.sanitized())?;
                self.store.save(&run).await?;
                Ok(WorkflowOutcome::from_run(run))
            }
        }
    }
}
