//! Core shared types for the organization governance runtime.

#![warn(missing_docs, clippy::pedantic)]

mod context;
mod error;
mod ids;
mod tier;

/// Typed evaluation context passed to access and escalation checks.
pub use context::GovernanceContext;
/// Error type and result alias shared across the runtime.
pub use error::{Error, Result};
/// Unique identifiers for entities, departments, escalations, and approvals.
pub use ids::{ApprovalId, DepartmentId, EntityId, EscalationId};
/// Permission tiers and error severity ordering.
pub use tier::{PermissionTier, Severity};
