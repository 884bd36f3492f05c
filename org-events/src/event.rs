//! Typed events emitted after governance state transitions.

use org_primitives::{ApprovalId, EntityId, EscalationId};
use serde::{Deserialize, Serialize};

/// Event emitted by a governance manager after a state transition.
///
/// Field shapes mirror what the supervisory side needs for audit display:
/// ids, names, and human-readable reasons, never whole records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OrgEvent {
    /// An access or escalation rule was registered.
    RuleRegistered {
        /// Unique rule name.
        name: String,
        /// Which engine the rule belongs to (`access` or `escalation`).
        engine: String,
    },
    /// An access request was allowed.
    AccessAllowed {
        /// Principal that requested the action.
        principal: String,
        /// Resource the action targeted.
        resource: String,
        /// Action verb that was evaluated.
        action: String,
    },
    /// An access request was denied.
    AccessDenied {
        /// Principal that requested the action.
        principal: String,
        /// Resource the action targeted.
        resource: String,
        /// Action verb that was evaluated.
        action: String,
        /// Human-readable denial reason.
        reason: String,
    },
    /// A directive was issued through the supervisory channel.
    DirectiveIssued {
        /// Issuing entity.
        from: EntityId,
        /// Receiving entity.
        to: EntityId,
        /// Directive title.
        title: String,
    },
    /// An escalation was created, automatically or manually.
    EscalationTriggered {
        /// Escalation record id.
        id: EscalationId,
        /// Name of the rule that fired, if any.
        rule: Option<String>,
        /// Reason attached to the escalation.
        reason: String,
        /// Resolved target entity, if resolution succeeded.
        target: Option<EntityId>,
    },
    /// An escalation was claimed by an owner.
    EscalationClaimed {
        /// Escalation record id.
        id: EscalationId,
        /// Entity that claimed the escalation.
        owner: EntityId,
    },
    /// An escalation was forwarded to a new target.
    EscalationForwarded {
        /// Escalation record id.
        id: EscalationId,
        /// New target entity.
        target: EntityId,
    },
    /// An escalation reached its terminal state.
    EscalationResolved {
        /// Escalation record id.
        id: EscalationId,
        /// Resolution note.
        note: String,
    },
    /// An approval request was submitted and awaits a decision.
    ApprovalRequired {
        /// Approval request id.
        id: ApprovalId,
        /// Request kind label (`directive`, `escalation`, `budget`, `strategy`).
        #[serde(rename = "request_kind")]
        kind: String,
        /// What is being approved.
        description: String,
        /// Requesting entity.
        requester: EntityId,
        /// Display name of the requester.
        requester_name: String,
    },
    /// An approval request was granted.
    ApprovalGranted {
        /// Approval request id.
        id: ApprovalId,
        /// Decision note.
        note: String,
    },
    /// An approval request was rejected.
    ApprovalRejected {
        /// Approval request id.
        id: ApprovalId,
        /// Decision note.
        note: String,
    },
    /// A line of operator input was processed by the supervisory channel.
    ChannelMessage {
        /// The raw input line.
        input: String,
        /// The intent label the parser settled on.
        intent: String,
    },
}

impl OrgEvent {
    /// Returns a short label identifying the event variant.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::RuleRegistered { .. } => "rule_registered",
            Self::AccessAllowed { .. } => "access_allowed",
            Self::AccessDenied { .. } => "access_denied",
            Self::DirectiveIssued { .. } => "directive_issued",
            Self::EscalationTriggered { .. } => "escalation_triggered",
            Self::EscalationClaimed { .. } => "escalation_claimed",
            Self::EscalationForwarded { .. } => "escalation_forwarded",
            Self::EscalationResolved { .. } => "escalation_resolved",
            Self::ApprovalRequired { .. } => "approval_required",
            Self::ApprovalGranted { .. } => "approval_granted",
            Self::ApprovalRejected { .. } => "approval_rejected",
            Self::ChannelMessage { .. } => "channel_message",
        }
    }
}

/// Trait implemented by event sinks.
///
/// Implementations must swallow their own failures; the emitting manager has
/// already committed its state transition by the time `publish` runs.
pub trait EventPublisher: Send + Sync {
    /// Delivers a single event. Must not block on external I/O.
    fn publish(&self, event: &OrgEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = OrgEvent::AccessDenied {
            principal: "agent:1".into(),
            resource: "tool:trade".into(),
            action: "execute".into(),
            reason: "no matching rule".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "access_denied");
        assert_eq!(json["reason"], "no matching rule");
    }

    #[test]
    fn labels_match_variants() {
        let event = OrgEvent::ChannelMessage {
            input: "status?".into(),
            intent: "status_query".into(),
        };
        assert_eq!(event.label(), "channel_message");
    }
}
