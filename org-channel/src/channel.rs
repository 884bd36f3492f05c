//! The conversational entry point over the governance managers.

use std::sync::Arc;

use org_access::{AccessControlEngine, Subject};
use org_approvals::{ApprovalRequest, ApprovalWorkflow};
use org_events::{EventPublisher, NullPublisher, OrgEvent};
use org_hierarchy::OrganizationHierarchy;
use org_primitives::{EntityId, GovernanceContext};
use tracing::{debug, warn};

use crate::collaborators::{
    DirectiveDispatcher, DirectiveDraft, DirectivePriority, EmptyInbox, EmptyRegistry,
    NameRegistry, ReportReader, UnconfiguredDispatcher,
};
use crate::intent::Intent;

/// Action verb evaluated against the access engine before a directive is
/// dispatched.
pub const DIRECTIVE_ACTION: &str = "directive.issue";

const UNKNOWN_RESPONSE: &str = "Message not understood. Use:\n\
    - @<name>: <text> to issue a directive\n\
    - status? for a status summary\n\
    - akkoord/afwijzen [#id] to decide approvals";

/// Human-facing command router over the shared governance managers.
///
/// Every line of input produces a response string; errors from managers and
/// collaborators are rendered into the response, never propagated. Multiple
/// channels may share the same managers.
pub struct SupervisoryChannel {
    operator: EntityId,
    hierarchy: Arc<OrganizationHierarchy>,
    access: Arc<AccessControlEngine>,
    approvals: Arc<ApprovalWorkflow>,
    registry: Arc<dyn NameRegistry>,
    dispatcher: Arc<dyn DirectiveDispatcher>,
    reports: Arc<dyn ReportReader>,
    publisher: Arc<dyn EventPublisher>,
}

impl SupervisoryChannel {
    /// Starts building a channel for the given operator entity.
    #[must_use]
    pub fn builder(
        operator: EntityId,
        hierarchy: Arc<OrganizationHierarchy>,
        access: Arc<AccessControlEngine>,
        approvals: Arc<ApprovalWorkflow>,
    ) -> ChannelBuilder {
        ChannelBuilder {
            channel: SupervisoryChannel {
                operator,
                hierarchy,
                access,
                approvals,
                registry: Arc::new(EmptyRegistry),
                dispatcher: Arc::new(UnconfiguredDispatcher),
                reports: Arc::new(EmptyInbox),
                publisher: Arc::new(NullPublisher),
            },
        }
    }

    /// Returns the operator entity this channel acts as.
    #[must_use]
    pub fn operator(&self) -> EntityId {
        self.operator
    }

    /// Processes one line of operator input and returns the response text.
    ///
    /// Never panics on input and never lets a manager or collaborator error
    /// escape; every outcome is a response string.
    #[must_use]
    pub fn process(&self, input: &str) -> String {
        let intent = Intent::parse(input);
        debug!(intent = intent.label(), "channel input parsed");
        self.publisher.publish(&OrgEvent::ChannelMessage {
            input: input.to_owned(),
            intent: intent.label().to_owned(),
        });

        match intent {
            Intent::Directive { target, text } => self.handle_directive(&target, &text),
            Intent::StatusQuery => self.handle_status(),
            Intent::Approve { id } => self.handle_decision(id.as_deref(), true),
            Intent::Reject { id } => self.handle_decision(id.as_deref(), false),
            Intent::Unknown => UNKNOWN_RESPONSE.to_owned(),
        }
    }

    fn handle_directive(&self, target: &str, text: &str) -> String {
        let Some(to) = self.registry.resolve(target) else {
            let names = self.registry.names();
            let listing = if names.is_empty() {
                "none".to_owned()
            } else {
                names.join(", ")
            };
            return format!("Unknown target `{target}`. Registered names: {listing}.");
        };

        if !self.hierarchy.may_issue_directive(self.operator, to) {
            warn!(operator = %self.operator, target = %to, "directive refused by hierarchy");
            return format!(
                "Directive to `{target}` refused: the operator role does not \
                 outrank the target or lacks directive authority."
            );
        }

        let decision = self.access.evaluate(
            &Subject::new("entity", self.operator.to_string()),
            &Subject::new("entity", to.to_string()),
            DIRECTIVE_ACTION,
            &GovernanceContext::new(),
        );
        if !decision.allowed() {
            warn!(operator = %self.operator, target = %to, reason = decision.reason(), "directive refused by access engine");
            return format!("Directive to `{target}` refused: {}.", decision.reason());
        }

        let draft = DirectiveDraft {
            from: self.operator,
            to,
            title: excerpt(text, 60),
            body: text.to_owned(),
            priority: DirectivePriority::High,
            deadline: None,
            requires_approval: false,
        };
        match self.dispatcher.create(&draft) {
            Ok(directive_id) => {
                self.publisher.publish(&OrgEvent::DirectiveIssued {
                    from: self.operator,
                    to,
                    title: draft.title.clone(),
                });
                format!("Directive issued to {target} ({directive_id}).")
            }
            Err(error) => format!("Directive to `{target}` failed: {error}."),
        }
    }

    fn handle_status(&self) -> String {
        let pending = self.approvals.pending();
        let mut lines = vec![
            "=== Organization status ===".to_owned(),
            format!("Unread reports: {}", self.reports.unread_count(self.operator)),
            format!("Urgent reports: {}", self.reports.urgent_count(self.operator)),
            format!("Pending approvals: {}", pending.len()),
            format!("Registered entities: {}", self.registry.names().len()),
        ];

        if !pending.is_empty() {
            lines.push(String::new());
            lines.push("=== Pending approvals ===".to_owned());
            for request in pending.iter().take(5) {
                lines.push(format!(
                    "- [{}] {}: {}",
                    short_id(request),
                    request.kind().as_str(),
                    excerpt(request.description(), 50),
                ));
            }
        }

        lines.join("\n")
    }

    fn handle_decision(&self, reference: Option<&str>, approve: bool) -> String {
        let request = match reference {
            Some(prefix) => {
                let Some(request) = self.approvals.find_pending_by_prefix(prefix) else {
                    return format!("No pending approval request matches `#{prefix}`.");
                };
                request
            }
            None => {
                let Some(request) = self.approvals.oldest_pending() else {
                    return "No pending approval request found.".to_owned();
                };
                request
            }
        };

        let outcome = if approve {
            self.approvals
                .approve(request.id(), "Approved via supervisory channel")
        } else {
            self.approvals
                .reject(request.id(), "Rejected via supervisory channel")
        };
        match outcome {
            Ok(decided) => format!(
                "{}: {}",
                if approve { "Approved" } else { "Rejected" },
                excerpt(decided.description(), 50),
            ),
            // The request was decided between lookup and decision.
            Err(error) => format!("Could not decide request [{}]: {error}.", short_id(&request)),
        }
    }
}

/// Builder for [`SupervisoryChannel`]; collaborators default to inert
/// implementations.
pub struct ChannelBuilder {
    channel: SupervisoryChannel,
}

impl ChannelBuilder {
    /// Sets the name registry consulted for directive targets.
    #[must_use]
    pub fn registry(mut self, registry: Arc<dyn NameRegistry>) -> Self {
        self.channel.registry = registry;
        self
    }

    /// Sets the directive dispatcher.
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<dyn DirectiveDispatcher>) -> Self {
        self.channel.dispatcher = dispatcher;
        self
    }

    /// Sets the report reader used for status summaries.
    #[must_use]
    pub fn reports(mut self, reports: Arc<dyn ReportReader>) -> Self {
        self.channel.reports = reports;
        self
    }

    /// Sets the event publisher.
    #[must_use]
    pub fn publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.channel.publisher = publisher;
        self
    }

    /// Finalises the channel.
    #[must_use]
    pub fn build(self) -> SupervisoryChannel {
        self.channel
    }
}

fn short_id(request: &ApprovalRequest) -> String {
    request.id().to_string().chars().take(8).collect()
}

fn excerpt(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use org_access::{AccessRule, Effect, Matcher};
    use org_approvals::ApprovalKind;
    use org_events::CollectingPublisher;
    use org_hierarchy::Role;
    use org_primitives::PermissionTier;
    use serde_json::Map;

    use crate::collaborators::{CollaboratorError, StaticRegistry};

    #[derive(Default)]
    struct RecordingDispatcher {
        drafts: Mutex<Vec<DirectiveDraft>>,
    }

    impl RecordingDispatcher {
        fn drafts(&self) -> Vec<DirectiveDraft> {
            self.drafts.lock().unwrap().clone()
        }
    }

    impl DirectiveDispatcher for RecordingDispatcher {
        fn create(&self, draft: &DirectiveDraft) -> Result<String, CollaboratorError> {
            self.drafts.lock().unwrap().push(draft.clone());
            Ok("d-1".to_owned())
        }
    }

    struct FixedInbox {
        unread: usize,
        urgent: usize,
    }

    impl ReportReader for FixedInbox {
        fn unread_count(&self, _recipient: EntityId) -> usize {
            self.unread
        }

        fn urgent_count(&self, _recipient: EntityId) -> usize {
            self.urgent
        }
    }

    struct Fixture {
        operator: EntityId,
        worker: EntityId,
        access: Arc<AccessControlEngine>,
        approvals: Arc<ApprovalWorkflow>,
        dispatcher: Arc<RecordingDispatcher>,
        channel: SupervisoryChannel,
    }

    fn fixture() -> Fixture {
        let hierarchy = Arc::new(OrganizationHierarchy::new());
        let operator = EntityId::random();
        let worker = EntityId::random();
        hierarchy.bind_role(
            operator,
            Role::builder("supervisor", PermissionTier::Board)
                .issues_directives()
                .approves()
                .build(),
        );
        hierarchy.bind_role(worker, Role::builder("worker", PermissionTier::Operational).build());

        let access = Arc::new(AccessControlEngine::new());
        access
            .add_rule(AccessRule::new(
                "allow-directives",
                Matcher::any(),
                Matcher::any(),
                DIRECTIVE_ACTION,
                Effect::Allow,
                0,
            ))
            .unwrap();

        let approvals = Arc::new(ApprovalWorkflow::new());
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let registry = StaticRegistry::new().with("trading", worker);

        let channel = SupervisoryChannel::builder(
            operator,
            Arc::clone(&hierarchy),
            Arc::clone(&access),
            Arc::clone(&approvals),
        )
        .registry(Arc::new(registry))
        .dispatcher(Arc::clone(&dispatcher) as Arc<dyn DirectiveDispatcher>)
        .reports(Arc::new(FixedInbox { unread: 4, urgent: 1 }))
        .build();

        Fixture {
            operator,
            worker,
            access,
            approvals,
            dispatcher,
            channel,
        }
    }

    #[test]
    fn directive_dispatched_for_known_target() {
        let fix = fixture();
        let response = fix.channel.process("@trading: stop alle BTC posities");

        assert!(response.contains("Directive issued to trading"), "{response}");
        let drafts = fix.dispatcher.drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].from, fix.operator);
        assert_eq!(drafts[0].to, fix.worker);
        assert_eq!(drafts[0].body, "stop alle BTC posities");
    }

    #[test]
    fn unknown_target_lists_registered_names() {
        let fix = fixture();
        let response = fix.channel.process("@finance: doe iets");

        assert!(response.contains("Unknown target `finance`"), "{response}");
        assert!(response.contains("trading"), "{response}");
        assert!(fix.dispatcher.drafts().is_empty());
    }

    #[test]
    fn directive_refused_without_rank() {
        let fix = fixture();
        // Demote the operator below the worker's tier.
        let hierarchy = Arc::clone(&fix.channel.hierarchy);
        hierarchy.bind_role(
            fix.operator,
            Role::builder("observer", PermissionTier::Operational).build(),
        );

        let response = fix.channel.process("@trading: toch doen");
        assert!(response.contains("refused"), "{response}");
        assert!(fix.dispatcher.drafts().is_empty());
    }

    #[test]
    fn directive_refused_by_access_rule() {
        let fix = fixture();
        fix.access
            .add_rule(AccessRule::new(
                "freeze",
                Matcher::any(),
                Matcher::any(),
                DIRECTIVE_ACTION,
                Effect::Deny,
                100,
            ))
            .unwrap();

        let response = fix.channel.process("@trading: stop");
        assert!(response.contains("refused"), "{response}");
        assert!(fix.dispatcher.drafts().is_empty());
    }

    #[test]
    fn status_summary_composes_counts() {
        let fix = fixture();
        fix.approvals.submit(
            ApprovalKind::Budget,
            "extra GPU budget for the research crew",
            fix.worker,
            "trading",
            Map::new(),
        );

        let response = fix.channel.process("status?");
        assert!(response.contains("Unread reports: 4"), "{response}");
        assert!(response.contains("Urgent reports: 1"), "{response}");
        assert!(response.contains("Pending approvals: 1"), "{response}");
        assert!(response.contains("Registered entities: 1"), "{response}");
        assert!(response.contains("budget: extra GPU budget"), "{response}");
    }

    #[test]
    fn approve_without_id_takes_oldest_pending() {
        let fix = fixture();
        let first = fix.approvals.submit(
            ApprovalKind::Budget,
            "first request",
            fix.worker,
            "trading",
            Map::new(),
        );
        fix.approvals.submit(
            ApprovalKind::Strategy,
            "second request",
            fix.worker,
            "trading",
            Map::new(),
        );

        let response = fix.channel.process("akkoord");
        assert!(response.contains("Approved: first request"), "{response}");
        assert!(fix.approvals.get(first.id()).unwrap().status().is_decided());
        assert_eq!(fix.approvals.pending().len(), 1);
    }

    #[test]
    fn reject_by_id_prefix() {
        let fix = fixture();
        fix.approvals.submit(
            ApprovalKind::Budget,
            "keep me",
            fix.worker,
            "trading",
            Map::new(),
        );
        let target = fix.approvals.submit(
            ApprovalKind::Escalation,
            "reject me",
            fix.worker,
            "trading",
            Map::new(),
        );
        let prefix: String = target.id().to_string().chars().take(8).collect();

        let response = fix.channel.process(&format!("nee #{prefix}"));
        assert!(response.contains("Rejected: reject me"), "{response}");
        assert_eq!(fix.approvals.pending().len(), 1);
    }

    #[test]
    fn decision_without_pending_requests_is_informative() {
        let fix = fixture();
        let response = fix.channel.process("ja");
        assert_eq!(response, "No pending approval request found.");

        let response = fix.channel.process("afwijzen #deadbeef");
        assert!(response.contains("No pending approval request matches"), "{response}");
    }

    #[test]
    fn unknown_input_has_no_side_effects() {
        let fix = fixture();
        let response = fix.channel.process("hallo daar");
        assert!(response.contains("not understood"), "{response}");
        assert!(fix.dispatcher.drafts().is_empty());
        assert!(fix.approvals.pending().is_empty());
    }

    #[test]
    fn every_line_publishes_a_channel_event() {
        let hierarchy = Arc::new(OrganizationHierarchy::new());
        let collector = Arc::new(CollectingPublisher::new());
        let channel = SupervisoryChannel::builder(
            EntityId::random(),
            hierarchy,
            Arc::new(AccessControlEngine::new()),
            Arc::new(ApprovalWorkflow::new()),
        )
        .publisher(Arc::clone(&collector) as Arc<dyn EventPublisher>)
        .build();

        let _ = channel.process("status?");
        let _ = channel.process("onzin");

        let intents: Vec<String> = collector
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                OrgEvent::ChannelMessage { intent, .. } => Some(intent),
                _ => None,
            })
            .collect();
        assert_eq!(intents, ["status_query", "unknown"]);
    }
}
