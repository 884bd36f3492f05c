//! Access control for governed organizations: an ordered rule set with
//! contextual conditions, evaluated as a pure function of the request.

#![warn(missing_docs, clippy::pedantic)]

mod engine;
mod rule;

/// The engine, its decisions, and its errors.
pub use engine::{AccessControlEngine, AccessDecision, AccessError, AccessResult};
/// Rules, matchers, and conditions.
pub use rule::{AccessRule, BudgetCeiling, Effect, Matcher, RuleConditions, Subject, TimeWindow};
