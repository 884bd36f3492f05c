//! Approval workflow: requests queue up pending in submission order and are
//! decided exactly once.

#![warn(missing_docs, clippy::pedantic)]

mod request;
mod workflow;

/// Approval requests and their lifecycle states.
pub use request::{ApprovalKind, ApprovalRequest, ApprovalStatus};
/// The workflow manager and its errors.
pub use workflow::{ApprovalError, ApprovalResult, ApprovalWorkflow};
