//! Access rules, matchers, and conditions.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// A concrete principal or resource under evaluation: a type label plus an
/// identifier within that type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subject {
    kind: String,
    id: String,
}

impl Subject {
    /// Creates a subject of the given type and id.
    #[must_use]
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Returns the type label.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns a `kind:id` key used for ledgers and event payloads.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }
}

/// Matches subjects by type and id, where `*` matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    kind: String,
    id: String,
}

impl Matcher {
    /// Matches any subject of any type.
    #[must_use]
    pub fn any() -> Self {
        Self {
            kind: "*".into(),
            id: "*".into(),
        }
    }

    /// Matches any subject of the given type.
    #[must_use]
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: "*".into(),
        }
    }

    /// Matches exactly one subject.
    #[must_use]
    pub fn exact(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Returns `true` when the matcher admits the subject.
    #[must_use]
    pub fn matches(&self, subject: &Subject) -> bool {
        (self.kind == "*" || self.kind == subject.kind())
            && (self.id == "*" || self.id == subject.id())
    }
}

/// Whether a matched rule permits or rejects the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    /// Permit the action.
    Allow,
    /// Reject the action.
    Deny,
}

/// Hour-of-day range plus weekday set, both in the caller-supplied clock's
/// timezone (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    start_hour: u32,
    end_hour: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    weekdays: Vec<Weekday>,
}

impl TimeWindow {
    /// Creates a window covering `[start_hour, end_hour)` on every weekday.
    ///
    /// A start hour greater than the end hour wraps past midnight.
    #[must_use]
    pub fn hours(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
            weekdays: Vec::new(),
        }
    }

    /// Restricts the window to the given weekday (additive).
    #[must_use]
    pub fn on(mut self, weekday: Weekday) -> Self {
        if !self.weekdays.contains(&weekday) {
            self.weekdays.push(weekday);
        }
        self
    }

    /// Returns `true` when `instant` falls inside the window.
    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        if !self.weekdays.is_empty() && !self.weekdays.contains(&instant.weekday()) {
            return false;
        }
        let hour = instant.hour();
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

/// Budget limits applied by a rule condition.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BudgetCeiling {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_per_action: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_cumulative: Option<f64>,
}

impl BudgetCeiling {
    /// Limits the spend of a single action.
    #[must_use]
    pub fn per_action(mut self, ceiling: f64) -> Self {
        self.max_per_action = Some(ceiling);
        self
    }

    /// Limits the cumulative recorded spend.
    #[must_use]
    pub fn cumulative(mut self, ceiling: f64) -> Self {
        self.max_cumulative = Some(ceiling);
        self
    }

    /// Returns the per-action ceiling, if any.
    #[must_use]
    pub fn max_per_action(&self) -> Option<f64> {
        self.max_per_action
    }

    /// Returns the cumulative ceiling, if any.
    #[must_use]
    pub fn max_cumulative(&self) -> Option<f64> {
        self.max_cumulative
    }
}

/// Optional conditions attached to a rule. A condition that cannot be
/// verified from the supplied context counts as failed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time_window: Option<TimeWindow>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    budget: Option<BudgetCeiling>,
    #[serde(default)]
    requires_approval: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    daily_limit: Option<u32>,
}

impl RuleConditions {
    /// Creates an empty condition set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the rule to a time window.
    #[must_use]
    pub fn within(mut self, window: TimeWindow) -> Self {
        self.time_window = Some(window);
        self
    }

    /// Adds budget limits.
    #[must_use]
    pub fn budget(mut self, ceiling: BudgetCeiling) -> Self {
        self.budget = Some(ceiling);
        self
    }

    /// Requires that a human approval has been granted.
    #[must_use]
    pub fn approval_required(mut self) -> Self {
        self.requires_approval = true;
        self
    }

    /// Limits how often the action may run per day.
    #[must_use]
    pub fn daily_limit(mut self, limit: u32) -> Self {
        self.daily_limit = Some(limit);
        self
    }

    /// Returns the time window, if any.
    #[must_use]
    pub fn time_window(&self) -> Option<&TimeWindow> {
        self.time_window.as_ref()
    }

    /// Returns the budget limits, if any.
    #[must_use]
    pub fn budget_ceiling(&self) -> Option<&BudgetCeiling> {
        self.budget.as_ref()
    }

    /// Returns `true` when an approval must have been granted.
    #[must_use]
    pub fn requires_approval(&self) -> bool {
        self.requires_approval
    }

    /// Returns the daily action limit, if any.
    #[must_use]
    pub fn daily_limit_count(&self) -> Option<u32> {
        self.daily_limit
    }
}

/// A single access rule. Higher priority wins; registration order breaks
/// ties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRule {
    name: String,
    principal: Matcher,
    resource: Matcher,
    action: String,
    effect: Effect,
    priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    conditions: Option<RuleConditions>,
}

impl AccessRule {
    /// Creates a rule matching the given principal, resource, and action
    /// (where action `"*"` matches any action).
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        principal: Matcher,
        resource: Matcher,
        action: impl Into<String>,
        effect: Effect,
        priority: i32,
    ) -> Self {
        Self {
            name: name.into(),
            principal,
            resource,
            action: action.into(),
            effect,
            priority,
            conditions: None,
        }
    }

    /// Attaches conditions to the rule.
    #[must_use]
    pub fn with_conditions(mut self, conditions: RuleConditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Returns the unique rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the rule's effect.
    #[must_use]
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Returns the rule's priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns the rule's conditions, if any.
    #[must_use]
    pub fn conditions(&self) -> Option<&RuleConditions> {
        self.conditions.as_ref()
    }

    pub(crate) fn matches(&self, principal: &Subject, resource: &Subject, action: &str) -> bool {
        self.principal.matches(principal)
            && self.resource.matches(resource)
            && (self.action == "*" || self.action == action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wildcard_matcher_admits_everything() {
        let any = Matcher::any();
        assert!(any.matches(&Subject::new("agent", "a1")));
        assert!(any.matches(&Subject::new("tool", "trade")));

        let kind_only = Matcher::of_kind("tool");
        assert!(kind_only.matches(&Subject::new("tool", "trade")));
        assert!(!kind_only.matches(&Subject::new("agent", "trade")));
    }

    #[test]
    fn exact_matcher_requires_both_parts() {
        let exact = Matcher::exact("agent", "a1");
        assert!(exact.matches(&Subject::new("agent", "a1")));
        assert!(!exact.matches(&Subject::new("agent", "a2")));
    }

    #[test]
    fn time_window_wraps_past_midnight() {
        let window = TimeWindow::hours(22, 6);
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 23, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 1, 1, 5, 0, 0).unwrap();
        let noon = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        assert!(window.contains(late));
        assert!(window.contains(early));
        assert!(!window.contains(noon));
    }

    #[test]
    fn time_window_weekday_filter() {
        // 2024-01-01 is a Monday.
        let monday = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
        let tuesday = Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap();
        let window = TimeWindow::hours(9, 17).on(Weekday::Mon);

        assert!(window.contains(monday));
        assert!(!window.contains(tuesday));
    }

    #[test]
    fn action_wildcard() {
        let rule = AccessRule::new(
            "any-action",
            Matcher::any(),
            Matcher::any(),
            "*",
            Effect::Allow,
            0,
        );
        let principal = Subject::new("agent", "a1");
        let resource = Subject::new("tool", "t1");
        assert!(rule.matches(&principal, &resource, "read"));
        assert!(rule.matches(&principal, &resource, "execute"));
    }
}
