//! Multi-agent organization governance SDK facade.
//!
//! Depend on this crate via `cargo add org-governance`. It bundles the
//! governance crates behind feature flags so deployments can enable only the
//! managers they need.

#![warn(missing_docs, clippy::pedantic)]

/// Re-export shared primitives for convenience.
pub use org_primitives as primitives;

/// Event vocabulary and publication (enabled by `events` feature).
#[cfg(feature = "events")]
pub use org_events as events;

/// Departments, roles, and chain-of-command queries (enabled by `hierarchy`
/// feature).
#[cfg(feature = "hierarchy")]
pub use org_hierarchy as hierarchy;

/// Rule-based access control (enabled by `access` feature).
#[cfg(feature = "access")]
pub use org_access as access;

/// Escalation rules and state machine (enabled by `escalation` feature).
#[cfg(feature = "escalation")]
pub use org_escalation as escalation;

/// FIFO approval workflow (enabled by `approvals` feature).
#[cfg(feature = "approvals")]
pub use org_approvals as approvals;

/// Conversational supervisory channel (enabled by `channel` feature).
#[cfg(feature = "channel")]
pub use org_channel as channel;
