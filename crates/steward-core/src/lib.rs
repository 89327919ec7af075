//! Core types and error definitions for the Steward workflow engine.
//!
//! This crate provides the foundational types shared across all Steward
//! crates: the workflow run record and its status state machine, the
//! human-approval types, the intake/outcome boundary types, and the unified
//! error enum.
//!
//! # Main types
//!
//! - [`StewardError`] — Unified error enum for all Steward subsystems.
//! - [`StewardResult`] — Convenience alias for `Result<T, StewardError>`.
//! - [`WorkflowRun`] — One request's full lifecycle record.
//! - [`WorkflowStatus`] — The fixed status state machine.
//! - [`Intent`] — Closed enumeration of recognized request intents.
//! - [`ApprovalRequest`] / [`ApprovalDecision`] — Human-in-the-loop types.
//! - [`IntakeRequest`] / [`WorkflowOutcome`] — The transport boundary.

/// Approval types for human-in-the-loop suspension and resumption.
pub mod approval;
/// Unified error enum and result alias.
pub mod error;
/// Inbound request and outbound outcome boundary types.
pub mod intake;
/// Workflow run record, intent enumeration, and status state machine.
pub mod run;

pub use approval::{ApprovalDecision, ApprovalRequest, ApprovalStatus};
pub use error::{StewardError, StewardResult};
pub use intake::{IntakeRequest, WorkflowOutcome};
pub use run::{Intent, WorkflowRun, WorkflowStatus, NAVIGATOR_AGENT};
