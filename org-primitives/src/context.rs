//! Typed evaluation context shared by access and escalation checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Severity;

/// Snapshot of everything a caller knows about the situation under
/// evaluation.
///
/// Every field is optional: callers populate what they know and the engines
/// treat missing fields as "condition not satisfiable". The runtime never
/// reads the wall clock on its own; `current_time` is always caller-supplied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GovernanceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    current_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    elapsed_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    budget_used: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proposed_spend: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retry_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    secs_since_progress: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    severity: Option<Severity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actions_today: Option<u32>,
    #[serde(default)]
    approval_granted: bool,
}

impl GovernanceContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the caller-observed current time.
    #[must_use]
    pub fn with_current_time(mut self, time: DateTime<Utc>) -> Self {
        self.current_time = Some(time);
        self
    }

    /// Sets the elapsed run time of the work being evaluated, in seconds.
    #[must_use]
    pub fn with_elapsed_secs(mut self, secs: u64) -> Self {
        self.elapsed_secs = Some(secs);
        self
    }

    /// Sets the budget consumed so far.
    #[must_use]
    pub fn with_budget_used(mut self, amount: f64) -> Self {
        self.budget_used = Some(amount);
        self
    }

    /// Sets the spend the evaluated action would incur.
    #[must_use]
    pub fn with_proposed_spend(mut self, amount: f64) -> Self {
        self.proposed_spend = Some(amount);
        self
    }

    /// Sets the number of attempts made so far.
    #[must_use]
    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    /// Sets the time since the work last made progress, in seconds.
    #[must_use]
    pub fn with_secs_since_progress(mut self, secs: u64) -> Self {
        self.secs_since_progress = Some(secs);
        self
    }

    /// Sets the severity of the most recent error.
    #[must_use]
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Sets the number of times this action ran today.
    #[must_use]
    pub fn with_actions_today(mut self, count: u32) -> Self {
        self.actions_today = Some(count);
        self
    }

    /// Marks that a human approval has already been granted for the action.
    #[must_use]
    pub fn with_approval_granted(mut self) -> Self {
        self.approval_granted = true;
        self
    }

    /// Returns the caller-observed current time.
    #[must_use]
    pub fn current_time(&self) -> Option<DateTime<Utc>> {
        self.current_time
    }

    /// Returns the elapsed run time in seconds.
    #[must_use]
    pub fn elapsed_secs(&self) -> Option<u64> {
        self.elapsed_secs
    }

    /// Returns the budget consumed so far.
    #[must_use]
    pub fn budget_used(&self) -> Option<f64> {
        self.budget_used
    }

    /// Returns the spend the evaluated action would incur.
    #[must_use]
    pub fn proposed_spend(&self) -> Option<f64> {
        self.proposed_spend
    }

    /// Returns the number of attempts made so far.
    #[must_use]
    pub fn retry_count(&self) -> Option<u32> {
        self.retry_count
    }

    /// Returns the time since last progress in seconds.
    #[must_use]
    pub fn secs_since_progress(&self) -> Option<u64> {
        self.secs_since_progress
    }

    /// Returns the severity of the most recent error.
    #[must_use]
    pub fn severity(&self) -> Option<Severity> {
        self.severity
    }

    /// Returns the number of times this action ran today.
    #[must_use]
    pub fn actions_today(&self) -> Option<u32> {
        self.actions_today
    }

    /// Returns `true` when a human approval was already granted.
    #[must_use]
    pub fn approval_granted(&self) -> bool {
        self.approval_granted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_populates_fields() {
        let ctx = GovernanceContext::new()
            .with_elapsed_secs(120)
            .with_severity(Severity::Error)
            .with_approval_granted();

        assert_eq!(ctx.elapsed_secs(), Some(120));
        assert_eq!(ctx.severity(), Some(Severity::Error));
        assert!(ctx.approval_granted());
        assert!(ctx.budget_used().is_none());
    }

    #[test]
    fn empty_context_serializes_compactly() {
        let json = serde_json::to_value(GovernanceContext::new()).unwrap();
        assert_eq!(json, serde_json::json!({ "approval_granted": false }));
    }
}
