//! Escalation handling: rules that detect trouble lazily from caller-supplied
//! context, and a small state machine that routes unresolved issues to higher
//! authority.

#![warn(missing_docs, clippy::pedantic)]

mod engine;
mod record;
mod rule;

/// The engine and its errors.
pub use engine::{EscalationEngine, EscalationError, EscalationResult};
/// Escalation records and their state machine.
pub use record::{Escalation, EscalationSource, EscalationStatus};
/// Escalation rules and trigger taxonomy.
pub use rule::{EscalationAction, EscalationRule, ScopeFilter, SourceKind, TargetKind, Trigger};
