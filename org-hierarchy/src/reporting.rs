//! Reporting lines between subordinates and managers.

use chrono::{DateTime, Utc};
use org_primitives::{DepartmentId, EntityId};
use serde::{Deserialize, Serialize};

/// Kind of reporting relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// The single authoritative management link. At most one may be active
    /// per subordinate at a time.
    Direct,
    /// A secondary functional relationship (e.g. a matrix assignment).
    Functional,
    /// An advisory, dotted-line relationship.
    Dotted,
}

/// A reporting-line edge from a subordinate to a manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportingLine {
    subordinate: EntityId,
    manager: EntityId,
    department: DepartmentId,
    kind: LinkKind,
    active_from: DateTime<Utc>,
    active_until: Option<DateTime<Utc>>,
}

impl ReportingLine {
    /// Creates an open-ended reporting line starting at `active_from`.
    #[must_use]
    pub fn new(
        subordinate: EntityId,
        manager: EntityId,
        department: DepartmentId,
        kind: LinkKind,
        active_from: DateTime<Utc>,
    ) -> Self {
        Self {
            subordinate,
            manager,
            department,
            kind,
            active_from,
            active_until: None,
        }
    }

    /// Bounds the line's activity window.
    #[must_use]
    pub fn until(mut self, active_until: DateTime<Utc>) -> Self {
        self.active_until = Some(active_until);
        self
    }

    /// Returns the subordinate entity.
    #[must_use]
    pub fn subordinate(&self) -> EntityId {
        self.subordinate
    }

    /// Returns the manager entity.
    #[must_use]
    pub fn manager(&self) -> EntityId {
        self.manager
    }

    /// Returns the department the line belongs to.
    #[must_use]
    pub fn department(&self) -> DepartmentId {
        self.department
    }

    /// Returns the link kind.
    #[must_use]
    pub fn kind(&self) -> LinkKind {
        self.kind
    }

    /// Returns the start of the activity window.
    #[must_use]
    pub fn active_from(&self) -> DateTime<Utc> {
        self.active_from
    }

    /// Returns the end of the activity window, if bounded.
    #[must_use]
    pub fn active_until(&self) -> Option<DateTime<Utc>> {
        self.active_until
    }

    /// Returns `true` when the line is active at `instant`.
    #[must_use]
    pub fn is_active_at(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.active_from
            && self.active_until.is_none_or(|until| instant < until)
    }

    /// Returns `true` when the line is open-ended or ends in the future
    /// relative to `instant`.
    #[must_use]
    pub fn is_open_at(&self, instant: DateTime<Utc>) -> bool {
        self.active_until.is_none_or(|until| instant < until)
    }
}
