//! Escalation rules: when to fire, where to route, what to do.

use org_primitives::{EntityId, GovernanceContext, Severity};
use serde::{Deserialize, Serialize};

/// Condition under which a rule fires, checked against caller-supplied
/// context. The engine never observes time on its own.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires when elapsed run time reaches the threshold.
    Timeout {
        /// Threshold in seconds.
        secs: u64,
    },
    /// Fires when an error of at least this severity was reported.
    Error {
        /// Minimum severity.
        at_least: Severity,
    },
    /// Fires when the consumed budget reaches the threshold.
    BudgetExceeded {
        /// Budget threshold.
        amount: f64,
    },
    /// Fires when the attempt count reaches the threshold.
    RetryCount {
        /// Attempt threshold.
        attempts: u32,
    },
    /// Fires when no progress has been made for the threshold duration.
    Stagnation {
        /// Threshold in seconds.
        secs: u64,
    },
    /// Never fires automatically; used for escalations raised by hand.
    Manual,
}

impl Trigger {
    /// Returns `true` when the context satisfies the trigger.
    ///
    /// `Manual` is never satisfied: manual escalations are created directly,
    /// not detected.
    #[must_use]
    pub fn is_satisfied(&self, context: &GovernanceContext) -> bool {
        match self {
            Self::Timeout { secs } => context
                .elapsed_secs()
                .is_some_and(|elapsed| elapsed >= *secs),
            Self::Error { at_least } => context
                .severity()
                .is_some_and(|severity| severity >= *at_least),
            Self::BudgetExceeded { amount } => context
                .budget_used()
                .is_some_and(|used| used >= *amount),
            Self::RetryCount { attempts } => context
                .retry_count()
                .is_some_and(|count| count >= *attempts),
            Self::Stagnation { secs } => context
                .secs_since_progress()
                .is_some_and(|idle| idle >= *secs),
            Self::Manual => false,
        }
    }
}

/// Where a fired escalation should be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetKind {
    /// The source's direct manager.
    DirectManager,
    /// The highest authority inside the source's department.
    DepartmentHead,
    /// Any board-tier entity.
    ExecutiveBoard,
    /// A fixed entity, used verbatim.
    Specific {
        /// The target entity.
        id: EntityId,
    },
    /// One hop past the source's previous escalation target.
    NextInChain,
}

/// What the organization should do once the escalation is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    /// Inform the target, nothing else.
    Notify,
    /// Hand the work to the target.
    Reassign,
    /// Stop the work until resolution.
    Halt,
    /// Raise an approval request for the target to decide.
    RequestApproval,
    /// Continue the work while the target investigates.
    ParallelExecute,
}

/// Classification of the entity a context originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// A whole department.
    Department,
    /// A crew of agents.
    Crew,
    /// A single agent.
    Agent,
}

/// Restricts which sources a rule is considered for at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeFilter {
    /// Considered for any source.
    All,
    /// Only department sources.
    Department,
    /// Only crew sources.
    Crew,
    /// Only agent sources.
    Agent,
}

impl ScopeFilter {
    /// Returns `true` when the filter admits the source classification.
    #[must_use]
    pub fn admits(self, source: SourceKind) -> bool {
        matches!(
            (self, source),
            (Self::All, _)
                | (Self::Department, SourceKind::Department)
                | (Self::Crew, SourceKind::Crew)
                | (Self::Agent, SourceKind::Agent)
        )
    }
}

/// A single escalation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationRule {
    name: String,
    trigger: Trigger,
    target: TargetKind,
    action: EscalationAction,
    scope: ScopeFilter,
    priority: i32,
    active: bool,
}

impl EscalationRule {
    /// Creates an active rule considered for all sources.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        trigger: Trigger,
        target: TargetKind,
        action: EscalationAction,
        priority: i32,
    ) -> Self {
        Self {
            name: name.into(),
            trigger,
            target,
            action,
            scope: ScopeFilter::All,
            priority,
            active: true,
        }
    }

    /// Restricts the rule to a source classification.
    #[must_use]
    pub fn scoped_to(mut self, scope: ScopeFilter) -> Self {
        self.scope = scope;
        self
    }

    /// Deactivates the rule without removing it.
    #[must_use]
    pub fn deactivated(mut self) -> Self {
        self.active = false;
        self
    }

    /// Returns the rule name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the trigger.
    #[must_use]
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    /// Returns the routing target kind.
    #[must_use]
    pub fn target(&self) -> TargetKind {
        self.target
    }

    /// Returns the action to take on firing.
    #[must_use]
    pub fn action(&self) -> EscalationAction {
        self.action
    }

    /// Returns the scope filter.
    #[must_use]
    pub fn scope(&self) -> ScopeFilter {
        self.scope
    }

    /// Returns the rule priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Returns `true` when the rule participates in trigger checks.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }
}
