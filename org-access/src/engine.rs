//! Rule evaluation and the spend ledger.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use org_events::{EventPublisher, NullPublisher, OrgEvent};
use org_primitives::GovernanceContext;
use thiserror::Error;
use tracing::debug;

use crate::rule::{AccessRule, Effect, RuleConditions, Subject};

/// Result alias for access-control operations.
pub type AccessResult<T> = Result<T, AccessError>;

/// Errors surfaced by the access-control engine.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Rule configuration error.
    #[error("invalid access rule: {0}")]
    InvalidRule(&'static str),
    /// A rule with the same name is already registered.
    #[error("access rule `{name}` already registered")]
    DuplicateRule {
        /// The conflicting rule name.
        name: String,
    },
}

/// Outcome of an access evaluation.
///
/// Denials are everyday outcomes a caller branches on, so they are carried
/// here as values rather than errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    allowed: bool,
    reason: String,
    matched_rule: Option<String>,
}

impl AccessDecision {
    fn allow(reason: impl Into<String>, rule: &AccessRule) -> Self {
        Self {
            allowed: true,
            reason: reason.into(),
            matched_rule: Some(rule.name().to_owned()),
        }
    }

    fn deny(reason: impl Into<String>, rule: Option<&AccessRule>) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            matched_rule: rule.map(|r| r.name().to_owned()),
        }
    }

    /// Returns `true` when the action may proceed.
    #[must_use]
    pub fn allowed(&self) -> bool {
        self.allowed
    }

    /// Returns the human-readable reason for the outcome.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the name of the rule that produced the outcome, if any rule
    /// matched at all.
    #[must_use]
    pub fn matched_rule(&self) -> Option<&str> {
        self.matched_rule.as_deref()
    }
}

#[derive(Default)]
struct EngineState {
    rules: Vec<AccessRule>,
    names: HashSet<String>,
    ledger: HashMap<String, f64>,
}

/// Rule-based, in-memory access-control engine.
///
/// Evaluation is a pure function of the rule set and the request: it never
/// mutates the spend ledger. Callers record spend explicitly through
/// [`register_spend`](Self::register_spend) after acting on an allow.
pub struct AccessControlEngine {
    state: RwLock<EngineState>,
    publisher: Arc<dyn EventPublisher>,
}

impl AccessControlEngine {
    /// Constructs an engine that publishes nowhere.
    #[must_use]
    pub fn new() -> Self {
        Self::with_publisher(Arc::new(NullPublisher))
    }

    /// Constructs an engine emitting events to the supplied publisher.
    #[must_use]
    pub fn with_publisher(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            publisher,
        }
    }

    /// Registers a rule.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::InvalidRule`] when the rule name is empty and
    /// [`AccessError::DuplicateRule`] when the name is already taken.
    ///
    /// # Panics
    ///
    /// Panics if the rule store lock has been poisoned.
    pub fn add_rule(&self, rule: AccessRule) -> AccessResult<()> {
        if rule.name().trim().is_empty() {
            return Err(AccessError::InvalidRule("rule name cannot be empty"));
        }

        let mut state = self.state.write().expect("access rules poisoned");
        if !state.names.insert(rule.name().to_owned()) {
            return Err(AccessError::DuplicateRule {
                name: rule.name().to_owned(),
            });
        }

        debug!(rule = rule.name(), priority = rule.priority(), "access rule registered");
        self.publisher.publish(&OrgEvent::RuleRegistered {
            name: rule.name().to_owned(),
            engine: "access".into(),
        });
        state.rules.push(rule);
        Ok(())
    }

    /// Evaluates an access request.
    ///
    /// Matching rules are ranked by priority descending with registration
    /// order breaking ties; only the highest-ranked rule decides. A failed
    /// condition flips the outcome to deny with a reason naming the
    /// condition. No matching rule means deny.
    ///
    /// # Panics
    ///
    /// Panics if the rule store lock has been poisoned.
    #[must_use]
    pub fn evaluate(
        &self,
        principal: &Subject,
        resource: &Subject,
        action: &str,
        context: &GovernanceContext,
    ) -> AccessDecision {
        let state = self.state.read().expect("access rules poisoned");

        // Stable max-by keeps the first-registered rule on priority ties.
        let best = state
            .rules
            .iter()
            .filter(|rule| rule.matches(principal, resource, action))
            .enumerate()
            .min_by_key(|(index, rule)| (std::cmp::Reverse(rule.priority()), *index))
            .map(|(_, rule)| rule);

        let decision = match best {
            None => AccessDecision::deny("no matching rule", None),
            Some(rule) => {
                if let Some(failed) = rule
                    .conditions()
                    .and_then(|conditions| self.failed_condition(&state, principal, conditions, context))
                {
                    AccessDecision::deny(
                        format!("rule `{}` condition failed: {failed}", rule.name()),
                        Some(rule),
                    )
                } else {
                    match rule.effect() {
                        Effect::Allow => {
                            AccessDecision::allow(format!("rule `{}`", rule.name()), rule)
                        }
                        Effect::Deny => {
                            AccessDecision::deny(format!("rule `{}`", rule.name()), Some(rule))
                        }
                    }
                }
            }
        };

        debug!(
            principal = %principal.key(),
            resource = %resource.key(),
            action,
            allowed = decision.allowed(),
            reason = decision.reason(),
            "access evaluated"
        );
        let event = if decision.allowed() {
            OrgEvent::AccessAllowed {
                principal: principal.key(),
                resource: resource.key(),
                action: action.to_owned(),
            }
        } else {
            OrgEvent::AccessDenied {
                principal: principal.key(),
                resource: resource.key(),
                action: action.to_owned(),
                reason: decision.reason().to_owned(),
            }
        };
        self.publisher.publish(&event);

        decision
    }

    /// Records spend against a principal's cumulative ledger. Callers invoke
    /// this after acting on an allow; evaluation itself never writes here.
    ///
    /// # Panics
    ///
    /// Panics if the rule store lock has been poisoned.
    pub fn register_spend(&self, principal: &Subject, amount: f64) {
        let mut state = self.state.write().expect("access rules poisoned");
        let total = state.ledger.entry(principal.key()).or_insert(0.0);
        *total += amount;
        debug!(principal = %principal.key(), amount, total = *total, "spend registered");
    }

    /// Returns the cumulative recorded spend for a principal.
    ///
    /// # Panics
    ///
    /// Panics if the rule store lock has been poisoned.
    #[must_use]
    pub fn spent(&self, principal: &Subject) -> f64 {
        let state = self.state.read().expect("access rules poisoned");
        state.ledger.get(&principal.key()).copied().unwrap_or(0.0)
    }

    /// Returns the name of the first condition the context fails, if any.
    fn failed_condition(
        &self,
        state: &EngineState,
        principal: &Subject,
        conditions: &RuleConditions,
        context: &GovernanceContext,
    ) -> Option<String> {
        if let Some(window) = conditions.time_window() {
            match context.current_time() {
                Some(now) if window.contains(now) => {}
                _ => return Some("time window".into()),
            }
        }

        if let Some(ceiling) = conditions.budget_ceiling() {
            let proposed = context.proposed_spend().unwrap_or(0.0);
            if ceiling
                .max_per_action()
                .is_some_and(|max| proposed > max)
            {
                return Some("per-action budget ceiling".into());
            }
            if let Some(max) = ceiling.max_cumulative() {
                let recorded = state.ledger.get(&principal.key()).copied().unwrap_or(0.0);
                if recorded + proposed > max {
                    return Some("cumulative budget ceiling".into());
                }
            }
        }

        if conditions.requires_approval() && !context.approval_granted() {
            return Some("approval required".into());
        }

        if let Some(limit) = conditions.daily_limit_count() {
            if context.actions_today().unwrap_or(0) >= limit {
                return Some("daily count ceiling".into());
            }
        }

        None
    }
}

impl Default for AccessControlEngine {
    fn default() -> Self {
        Self::new()
    }
}
