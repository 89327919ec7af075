use serde::{Deserialize, Serialize};

/// Policy deciding which runs must pause for human approval.
///
/// Two independent triggers: membership in the mandatory allow-list
/// (high-stakes categories suspend regardless of estimated cost), and an
/// estimated cost above the configured threshold for any agent. Both are
/// policy and live in configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitlPolicy {
    /// Agents that always require human review.
    #[serde(default = "default_mandatory_agents")]
    pub mandatory_agents: Vec<String>,
    /// Estimated-cost ceiling above which any agent is suspended.
    #[serde(default = "default_cost_threshold")]
    pub cost_threshold: f64,
}

fn default_mandatory_agents() -> Vec<String> {
    vec![
        "grant_writer".to_string(),
        "plan_writer".to_string(),
    ]
}

fn default_cost_threshold() -> f64 {
    1.0
}

impl Default for HitlPolicy {
    fn default() -> Self {
        Self {
            mandatory_agents: default_mandatory_agents(),
            cost_threshold: default_cost_threshold(),
        }
    }
}

impl HitlPolicy {
    /// Whether this agent/cost pair must pause for approval.
    pub fn requires_approval(&self, agent: &str, estimated_cost: f64) -> bool {
        self.is_mandatory(agent) || estimated_cost > self.cost_threshold
    }

    /// Whether the agent is on the mandatory review list.
    pub fn is_mandatory(&self, agent: &str) -> bool {
        self.mandatory_agents.iter().any(|a| a == agent)
    }

    /// Reviewer-facing explanation of why a run was suspended.
    pub fn suspension_reason(&self, agent: &str, estimated_cost: f64) -> String {
        if self.is_mandatory(agent) {
            format!("agent {agent} requires mandatory human review")
        } else {
            format!(
                "estimated cost {estimated_cost:.2} exceeds threshold {:.2}",
                self.cost_threshold
            )
        }
    }
}
