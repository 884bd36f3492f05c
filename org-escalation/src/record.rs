//! Escalation records and their state machine data.

use org_primitives::{EntityId, EscalationId, GovernanceContext};
use serde::{Deserialize, Serialize};

use crate::rule::SourceKind;

/// The entity an escalation originated from, with its classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationSource {
    id: EntityId,
    kind: SourceKind,
}

impl EscalationSource {
    /// Creates a source reference.
    #[must_use]
    pub fn new(id: EntityId, kind: SourceKind) -> Self {
        Self { id, kind }
    }

    /// Returns the source entity id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the source classification.
    #[must_use]
    pub fn kind(&self) -> SourceKind {
        self.kind
    }
}

/// State of an escalation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationStatus {
    /// Created and awaiting a claim.
    New,
    /// Claimed by an owner who is working on it.
    InProgress,
    /// Terminally resolved; the record is immutable from here on.
    Resolved,
}

impl EscalationStatus {
    /// Returns `true` for the terminal state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved)
    }
}

/// A routed, never-deleted escalation record.
///
/// Mutated only through the engine's state machine; forwarding keeps the
/// original id and reason while appending to the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Escalation {
    id: EscalationId,
    source: EscalationSource,
    rule: Option<String>,
    reason: String,
    context: GovernanceContext,
    status: EscalationStatus,
    target: Option<EntityId>,
    owner: Option<EntityId>,
    resolution: Option<String>,
    audit_trail: Vec<String>,
}

impl Escalation {
    pub(crate) fn new(
        source: EscalationSource,
        rule: Option<String>,
        reason: String,
        context: GovernanceContext,
        target: Option<EntityId>,
    ) -> Self {
        Self {
            id: EscalationId::random(),
            source,
            rule,
            reason,
            context,
            status: EscalationStatus::New,
            target,
            owner: None,
            resolution: None,
            audit_trail: Vec::new(),
        }
    }

    /// Returns the record id.
    #[must_use]
    pub fn id(&self) -> EscalationId {
        self.id
    }

    /// Returns the source the escalation originated from.
    #[must_use]
    pub fn source(&self) -> EscalationSource {
        self.source
    }

    /// Returns the name of the rule that fired, or `None` for manual
    /// escalations.
    #[must_use]
    pub fn rule(&self) -> Option<&str> {
        self.rule.as_deref()
    }

    /// Returns the reason the escalation was raised.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the context snapshot taken at creation.
    #[must_use]
    pub fn context(&self) -> &GovernanceContext {
        &self.context
    }

    /// Returns the current status.
    #[must_use]
    pub fn status(&self) -> EscalationStatus {
        self.status
    }

    /// Returns the routed target, if resolution succeeded.
    #[must_use]
    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    /// Returns the claiming owner, if any.
    #[must_use]
    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    /// Returns the resolution note once resolved.
    #[must_use]
    pub fn resolution(&self) -> Option<&str> {
        self.resolution.as_deref()
    }

    /// Returns the audit trail entries, oldest first.
    #[must_use]
    pub fn audit_trail(&self) -> &[String] {
        &self.audit_trail
    }

    pub(crate) fn set_status(&mut self, status: EscalationStatus) {
        self.status = status;
    }

    pub(crate) fn set_owner(&mut self, owner: Option<EntityId>) {
        self.owner = owner;
    }

    pub(crate) fn set_target(&mut self, target: EntityId) {
        self.target = Some(target);
    }

    pub(crate) fn set_resolution(&mut self, note: String) {
        self.resolution = Some(note);
    }

    pub(crate) fn push_audit(&mut self, entry: String) {
        self.audit_trail.push(entry);
    }
}
