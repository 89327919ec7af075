use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use steward_core::{StewardError, StewardResult};

/// Per-agent cost table with a conservative default for unknown agents.
///
/// Estimation is pure: a base price per agent plus a size heuristic on the
/// query. The table is policy, not mechanism — deployments override it in
/// configuration rather than editing code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostTable {
    /// Base cost per agent id.
    #[serde(default)]
    pub per_agent: HashMap<String, f64>,
    /// Base cost for agents not in the table. Non-zero so an unlisted agent
    /// never bypasses cost gating.
    #[serde(default = "default_unknown_cost")]
    pub default_cost: f64,
    /// Additional cost per kilobyte of query text.
    #[serde(default = "default_per_kilobyte")]
    pub per_kilobyte: f64,
}

fn default_unknown_cost() -> f64 {
    5.0
}

fn default_per_kilobyte() -> f64 {
    0.05
}

impl Default for CostTable {
    fn default() -> Self {
        let per_agent = HashMap::from([
            ("navigator".to_string(), 0.0),
            ("doc_converter".to_string(), 0.05),
            ("localizer".to_string(), 0.10),
            ("safety_logger".to_string(), 0.15),
            ("grant_writer".to_string(), 4.0),
            ("plan_writer".to_string(), 5.0),
        ]);
        Self {
            per_agent,
            default_cost: default_unknown_cost(),
            per_kilobyte: default_per_kilobyte(),
        }
    }
}

impl CostTable {
    /// Estimate the execution cost for an agent/query pair.
    ///
    /// Never performs the actual work. A malformed table (negative entries)
    /// is a [`StewardError::CostEstimation`], which is fatal to the run.
    pub fn estimate(&self, agent: &str, query: &str) -> StewardResult<f64> {
        let base = self.per_agent.get(agent).copied().unwrap_or(self.default_cost);
        if base < 0.0 || self.per_kilobyte < 0.0 {
            return Err(StewardError::CostEstimation(format!(
                "negative cost configured for agent {agent}"
            )));
        }
        let size_cost = (query.len() as f64 / 1024.0) * self.per_kilobyte;
        Ok(base + size_cost)
    }
}
