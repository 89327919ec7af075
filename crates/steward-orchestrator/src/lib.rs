//! The Steward workflow orchestration engine.
//!
//! Routes a free-form user request to one of several registered agent
//! capabilities: classify intent, estimate cost, pause for human approval on
//! high-stakes work, dispatch the chosen handler, and durably record every
//! transition for audit. Suspension is durable — no task waits while a human
//! reviews — and resumption re-enters the state machine at dispatch.
//!
//! # Main types
//!
//! - [`Orchestrator`] — The engine; `start` and `resume` entry points.
//! - [`Classifier`] — Two-tier intent classification.
//! - [`CostTable`] — Per-agent cost estimation policy.
//! - [`HitlPolicy`] — Approval allow-list and cost threshold.
//! - [`StewardConfig`] — Deployment configuration.

/// Two-tier intent classification.
pub mod classify;
/// Engine configuration.
pub mod config;
/// Cost estimation policy.
pub mod cost;
/// The orchestration engine.
pub mod engine;
/// Human-approval gating policy.
pub mod hitl;

pub use classify::{Classification, Classifier, HeuristicModel, IntentModel};
pub use config::{RateBudget, StewardConfig};
pub use cost::CostTable;
pub use engine::{Orchestrator, APPROVAL_REQUEST_KEY};
pub use hitl::HitlPolicy;
