//! Approval requests and their lifecycle states.

use chrono::{DateTime, Utc};
use org_primitives::{ApprovalId, EntityId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classification of what the approval is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalKind {
    /// A directive that needs sign-off before it is dispatched.
    Directive,
    /// An escalation whose action requires a supervisor's decision.
    Escalation,
    /// A spend above someone's budget ceiling.
    Budget,
    /// A strategic decision outside normal operating bounds.
    Strategy,
}

impl ApprovalKind {
    /// Returns a short lowercase label for the kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Directive => "directive",
            Self::Escalation => "escalation",
            Self::Budget => "budget",
            Self::Strategy => "strategy",
        }
    }
}

/// State of an approval request. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Submitted and awaiting a decision.
    Pending,
    /// Granted; the requested action may proceed.
    Approved,
    /// Refused; the requested action must not proceed.
    Rejected,
}

impl ApprovalStatus {
    /// Returns `true` once a decision has been made.
    #[must_use]
    pub fn is_decided(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A single approval request.
///
/// Records are never deleted; a decided request keeps its decision note and
/// timestamp for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    id: ApprovalId,
    kind: ApprovalKind,
    description: String,
    requester: EntityId,
    requester_name: String,
    detail: Map<String, Value>,
    status: ApprovalStatus,
    submitted_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
    decision_note: Option<String>,
}

impl ApprovalRequest {
    pub(crate) fn new(
        kind: ApprovalKind,
        description: String,
        requester: EntityId,
        requester_name: String,
        detail: Map<String, Value>,
    ) -> Self {
        Self {
            id: ApprovalId::random(),
            kind,
            description,
            requester,
            requester_name,
            detail,
            status: ApprovalStatus::Pending,
            submitted_at: Utc::now(),
            decided_at: None,
            decision_note: None,
        }
    }

    /// Returns the request id.
    #[must_use]
    pub fn id(&self) -> ApprovalId {
        self.id
    }

    /// Returns the request classification.
    #[must_use]
    pub fn kind(&self) -> ApprovalKind {
        self.kind
    }

    /// Returns what is being approved.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the requesting entity.
    #[must_use]
    pub fn requester(&self) -> EntityId {
        self.requester
    }

    /// Returns the requester's display name.
    #[must_use]
    pub fn requester_name(&self) -> &str {
        &self.requester_name
    }

    /// Returns the free-form payload attached at submission.
    #[must_use]
    pub fn detail(&self) -> &Map<String, Value> {
        &self.detail
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> ApprovalStatus {
        self.status
    }

    /// Returns when the request was submitted.
    #[must_use]
    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    /// Returns when the request was decided, once it has been.
    #[must_use]
    pub fn decided_at(&self) -> Option<DateTime<Utc>> {
        self.decided_at
    }

    /// Returns the note attached to the decision, once there is one.
    #[must_use]
    pub fn decision_note(&self) -> Option<&str> {
        self.decision_note.as_deref()
    }

    pub(crate) fn decide(&mut self, status: ApprovalStatus, note: String) {
        self.status = status;
        self.decided_at = Some(Utc::now());
        self.decision_note = Some(note);
    }
}
