//! Governance event types and the publication seam between managers and
//! whatever observability plumbing surrounds them.
//!
//! Publication is fire-and-forget by contract: a publisher must never block
//! or fail the operation that emitted the event.

#![warn(missing_docs, clippy::pedantic)]

mod bus;
mod event;

/// Subscriber-based fan-out bus and built-in publishers.
pub use bus::{CollectingPublisher, EventBus, NullPublisher};
/// Typed governance events and the publisher trait.
pub use event::{EventPublisher, OrgEvent};
