use crate::cost::CostTable;
use crate::hitl::HitlPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use steward_core::{StewardError, StewardResult};
use steward_security::RetryPolicy;

/// A call-volume budget: `limit` requests per `window_secs`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateBudget {
    /// Requests allowed per window.
    pub limit: u32,
    /// Window length, in seconds.
    pub window_secs: u64,
}

impl RateBudget {
    /// The window as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Engine configuration.
///
/// Cost table, approval allow-list, rate budgets, timeouts, and the retry
/// policy are all deployment policy; the defaults here suit a single
/// instance embedding the in-memory store. Multi-instance deployments must
/// move rate-limit state to a shared counter store, which is a deliberate
/// configuration choice rather than something this struct hides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StewardConfig {
    /// Byte cap on `user_query` at intake.
    #[serde(default = "default_max_query_bytes")]
    pub max_query_bytes: usize,
    /// Deadline for the probabilistic classification tier, in milliseconds.
    #[serde(default = "default_classify_timeout_ms")]
    pub classify_timeout_ms: u64,
    /// Deadline for one agent execution attempt, in milliseconds.
    #[serde(default = "default_dispatch_timeout_ms")]
    pub dispatch_timeout_ms: u64,
    /// Requests allowed per tenant per window on the `orchestrator` key.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: u32,
    /// Rate-limit window, in seconds.
    #[serde(default = "default_rate_window_secs")]
    pub rate_window_secs: u64,
    /// Call-volume budgets for agents with their own limits. Agents not
    /// listed here share the orchestrator budget.
    #[serde(default)]
    pub agent_rates: HashMap<String, RateBudget>,
    /// Automatic retry budget for transient dispatch failures.
    #[serde(default = "default_retry")]
    pub retry: RetryPolicy,
    /// Per-agent cost estimation table.
    #[serde(default)]
    pub cost: CostTable,
    /// Human approval policy.
    #[serde(default)]
    pub hitl: HitlPolicy,
}

fn default_max_query_bytes() -> usize {
    10_000
}

fn default_classify_timeout_ms() -> u64 {
    2_000
}

fn default_dispatch_timeout_ms() -> u64 {
    30_000
}

fn default_rate_limit() -> u32 {
    60
}

fn default_rate_window_secs() -> u64 {
    60
}

fn default_retry() -> RetryPolicy {
    // One automatic retry per dispatch, per the execution contract
    RetryPolicy {
        max_retries: 1,
        backoff_base_ms: 250,
        backoff_max_ms: 5_000,
    }
}

impl Default for StewardConfig {
    fn default() -> Self {
        Self {
            max_query_bytes: default_max_query_bytes(),
            classify_timeout_ms: default_classify_timeout_ms(),
            dispatch_timeout_ms: default_dispatch_timeout_ms(),
            rate_limit: default_rate_limit(),
            rate_window_secs: default_rate_window_secs(),
            agent_rates: HashMap::new(),
            retry: default_retry(),
            cost: CostTable::default(),
            hitl: HitlPolicy::default(),
        }
    }
}

impl StewardConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> StewardResult<Self> {
        toml::from_str(content)
            .map_err(|e| StewardError::Validation(format!("invalid configuration: {e}")))
    }

    /// Classification deadline as a [`Duration`].
    pub fn classify_timeout(&self) -> Duration {
        Duration::from_millis(self.classify_timeout_ms)
    }

    /// Dispatch deadline as a [`Duration`].
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_millis(self.dispatch_timeout_ms)
    }

    /// Rate-limit window as a [`Duration`].
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window_secs)
    }
}
