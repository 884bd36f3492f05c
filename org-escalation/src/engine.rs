//! Trigger evaluation, target resolution, and the escalation state machine.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use org_events::{EventPublisher, NullPublisher, OrgEvent};
use org_hierarchy::OrganizationHierarchy;
use org_primitives::{EntityId, EscalationId, GovernanceContext, PermissionTier};
use thiserror::Error;
use tracing::{debug, info};

use crate::record::{Escalation, EscalationSource, EscalationStatus};
use crate::rule::{EscalationRule, SourceKind, TargetKind, Trigger};

/// Result alias for escalation operations.
pub type EscalationResult<T> = Result<T, EscalationError>;

/// Errors surfaced by the escalation engine.
#[derive(Debug, Error)]
pub enum EscalationError {
    /// Rule configuration error.
    #[error("invalid escalation rule: {0}")]
    InvalidRule(&'static str),
    /// A rule with the same name is already registered.
    #[error("escalation rule `{name}` already registered")]
    DuplicateRule {
        /// The conflicting rule name.
        name: String,
    },
    /// The referenced record does not exist.
    #[error("unknown escalation {id}")]
    NotFound {
        /// The offending record id.
        id: EscalationId,
    },
    /// The requested transition is not legal from the record's state.
    #[error("cannot {operation} escalation {id} in state {state:?}")]
    InvalidState {
        /// The record id.
        id: EscalationId,
        /// The record's current state.
        state: EscalationStatus,
        /// The attempted operation.
        operation: &'static str,
    },
}

#[derive(Default)]
struct EngineState {
    rules: Vec<EscalationRule>,
    rule_names: HashSet<String>,
    records: HashMap<EscalationId, Escalation>,
    order: Vec<EscalationId>,
    last_target: HashMap<EntityId, EntityId>,
}

/// Rule store plus escalation record store.
///
/// Triggers are evaluated lazily against caller-supplied context; the engine
/// holds no timers and never observes the clock.
pub struct EscalationEngine {
    state: RwLock<EngineState>,
    hierarchy: Arc<OrganizationHierarchy>,
    publisher: Arc<dyn EventPublisher>,
}

impl EscalationEngine {
    /// Constructs an engine routing targets through the supplied hierarchy.
    #[must_use]
    pub fn new(hierarchy: Arc<OrganizationHierarchy>) -> Self {
        Self::with_publisher(hierarchy, Arc::new(NullPublisher))
    }

    /// Constructs an engine emitting events to the supplied publisher.
    #[must_use]
    pub fn with_publisher(
        hierarchy: Arc<OrganizationHierarchy>,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
            hierarchy,
            publisher,
        }
    }

    /// Registers a rule.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::InvalidRule`] when the rule name is empty
    /// and [`EscalationError::DuplicateRule`] when the name is already taken.
    ///
    /// # Panics
    ///
    /// Panics if the engine lock has been poisoned.
    pub fn add_rule(&self, rule: EscalationRule) -> EscalationResult<()> {
        if rule.name().trim().is_empty() {
            return Err(EscalationError::InvalidRule("rule name cannot be empty"));
        }

        let mut state = self.state.write().expect("escalation state poisoned");
        if !state.rule_names.insert(rule.name().to_owned()) {
            return Err(EscalationError::DuplicateRule {
                name: rule.name().to_owned(),
            });
        }

        debug!(rule = rule.name(), priority = rule.priority(), "escalation rule registered");
        self.publisher.publish(&OrgEvent::RuleRegistered {
            name: rule.name().to_owned(),
            engine: "escalation".into(),
        });
        state.rules.push(rule);
        Ok(())
    }

    /// Returns the active rules whose scope admits the source and whose
    /// trigger the context satisfies, highest priority first. Registration
    /// order breaks priority ties. `Manual` rules are never returned.
    ///
    /// # Panics
    ///
    /// Panics if the engine lock has been poisoned.
    #[must_use]
    pub fn check_triggers(
        &self,
        source: SourceKind,
        context: &GovernanceContext,
    ) -> Vec<EscalationRule> {
        let state = self.state.read().expect("escalation state poisoned");
        let mut fired: Vec<(usize, &EscalationRule)> = state
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| {
                rule.is_active()
                    && rule.scope().admits(source)
                    && rule.trigger().is_satisfied(context)
            })
            .collect();
        fired.sort_by_key(|(index, rule)| (std::cmp::Reverse(rule.priority()), *index));
        fired.into_iter().map(|(_, rule)| rule.clone()).collect()
    }

    /// Creates an escalation in state `New`, resolving its target through
    /// the hierarchy. Pass `None` as the rule for manual escalations.
    ///
    /// # Panics
    ///
    /// Panics if the engine lock has been poisoned.
    pub fn escalate(
        &self,
        source: EscalationSource,
        rule: Option<&EscalationRule>,
        reason: impl Into<String>,
        context: GovernanceContext,
    ) -> Escalation {
        let reason = reason.into();
        let target_kind = rule.map(EscalationRule::target);
        let target = self.resolve_target(source, target_kind);

        let mut record = Escalation::new(
            source,
            rule.map(|r| r.name().to_owned()),
            reason.clone(),
            context,
            target,
        );
        record.push_audit(match rule {
            Some(rule) => format!("created by rule `{}`", rule.name()),
            None => "created manually".to_owned(),
        });

        info!(
            escalation = %record.id(),
            source = %source.id(),
            rule = rule.map(EscalationRule::name),
            target = target.map(|t| t.to_string()),
            "escalation created"
        );
        self.publisher.publish(&OrgEvent::EscalationTriggered {
            id: record.id(),
            rule: rule.map(|r| r.name().to_owned()),
            reason,
            target,
        });

        let mut state = self.state.write().expect("escalation state poisoned");
        if let Some(target) = target {
            state.last_target.insert(source.id(), target);
        }
        state.order.push(record.id());
        state.records.insert(record.id(), record.clone());
        record
    }

    /// Claims a `New` escalation for an owner, moving it to `InProgress`.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::NotFound`] for unknown ids and
    /// [`EscalationError::InvalidState`] when the record was already claimed
    /// or resolved.
    ///
    /// # Panics
    ///
    /// Panics if the engine lock has been poisoned.
    pub fn claim(&self, id: EscalationId, owner: EntityId) -> EscalationResult<Escalation> {
        let mut state = self.state.write().expect("escalation state poisoned");
        let record = state
            .records
            .get_mut(&id)
            .ok_or(EscalationError::NotFound { id })?;

        if record.status() != EscalationStatus::New {
            return Err(EscalationError::InvalidState {
                id,
                state: record.status(),
                operation: "claim",
            });
        }

        record.set_status(EscalationStatus::InProgress);
        record.set_owner(Some(owner));
        record.push_audit(format!("claimed by {owner}"));
        debug!(escalation = %id, owner = %owner, "escalation claimed");
        self.publisher
            .publish(&OrgEvent::EscalationClaimed { id, owner });
        Ok(record.clone())
    }

    /// Resolves an `InProgress` escalation with a note, reaching the
    /// terminal state. A claim is mandatory first: resolving a `New` record
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::NotFound`] for unknown ids and
    /// [`EscalationError::InvalidState`] for unclaimed or already-resolved
    /// records.
    ///
    /// # Panics
    ///
    /// Panics if the engine lock has been poisoned.
    pub fn resolve(
        &self,
        id: EscalationId,
        note: impl Into<String>,
    ) -> EscalationResult<Escalation> {
        let mut state = self.state.write().expect("escalation state poisoned");
        let record = state
            .records
            .get_mut(&id)
            .ok_or(EscalationError::NotFound { id })?;

        if record.status() != EscalationStatus::InProgress {
            return Err(EscalationError::InvalidState {
                id,
                state: record.status(),
                operation: "resolve",
            });
        }

        let note = note.into();
        record.set_status(EscalationStatus::Resolved);
        record.set_resolution(note.clone());
        record.push_audit(format!("resolved: {note}"));
        info!(escalation = %id, "escalation resolved");
        self.publisher
            .publish(&OrgEvent::EscalationResolved { id, note });
        Ok(record.clone())
    }

    /// Forwards an `InProgress` escalation to a new target: ownership is
    /// cleared, the target replaced, and the record returns to `New` with
    /// its original id and reason intact.
    ///
    /// # Errors
    ///
    /// Returns [`EscalationError::NotFound`] for unknown ids and
    /// [`EscalationError::InvalidState`] unless the record is `InProgress`.
    ///
    /// # Panics
    ///
    /// Panics if the engine lock has been poisoned.
    pub fn forward(
        &self,
        id: EscalationId,
        new_target: EntityId,
    ) -> EscalationResult<Escalation> {
        let mut state = self.state.write().expect("escalation state poisoned");
        let record = state
            .records
            .get_mut(&id)
            .ok_or(EscalationError::NotFound { id })?;

        if record.status() != EscalationStatus::InProgress {
            return Err(EscalationError::InvalidState {
                id,
                state: record.status(),
                operation: "forward",
            });
        }

        let previous_owner = record.owner();
        record.set_status(EscalationStatus::New);
        record.set_owner(None);
        record.set_target(new_target);
        record.push_audit(match previous_owner {
            Some(owner) => format!("forwarded to {new_target} by {owner}"),
            None => format!("forwarded to {new_target}"),
        });
        let source = record.source().id();
        state.last_target.insert(source, new_target);
        debug!(escalation = %id, target = %new_target, "escalation forwarded");
        self.publisher.publish(&OrgEvent::EscalationForwarded {
            id,
            target: new_target,
        });
        Ok(state.records[&id].clone())
    }

    /// Returns an escalation by id.
    ///
    /// # Panics
    ///
    /// Panics if the engine lock has been poisoned.
    #[must_use]
    pub fn get(&self, id: EscalationId) -> Option<Escalation> {
        let state = self.state.read().expect("escalation state poisoned");
        state.records.get(&id).cloned()
    }

    /// Returns all escalations in creation order.
    ///
    /// # Panics
    ///
    /// Panics if the engine lock has been poisoned.
    #[must_use]
    pub fn all(&self) -> Vec<Escalation> {
        let state = self.state.read().expect("escalation state poisoned");
        state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .cloned()
            .collect()
    }

    /// Resolves the routing target for a new escalation. `None` when the
    /// hierarchy cannot produce one (e.g. no manager bound).
    fn resolve_target(
        &self,
        source: EscalationSource,
        kind: Option<TargetKind>,
    ) -> Option<EntityId> {
        match kind {
            // Manual escalations route to the direct manager by default.
            None | Some(TargetKind::DirectManager) => {
                self.hierarchy.direct_manager(source.id())
            }
            Some(TargetKind::Specific { id }) => Some(id),
            Some(TargetKind::DepartmentHead) => self.department_head(source.id()),
            Some(TargetKind::ExecutiveBoard) => self.board_member(),
            Some(TargetKind::NextInChain) => self.next_in_chain(source.id()),
        }
    }

    /// Highest-tier role-bound entity in the source's department.
    fn department_head(&self, source: EntityId) -> Option<EntityId> {
        let department = self.hierarchy.department_of(source)?;
        self.hierarchy
            .bound_entities()
            .into_iter()
            .filter(|entity| self.hierarchy.department_of(*entity) == Some(department))
            .max_by_key(|entity| {
                self.hierarchy
                    .role(*entity)
                    .map_or(0, |role| role.tier().ordinal())
            })
    }

    /// Lowest-id entity bound at board tier.
    fn board_member(&self) -> Option<EntityId> {
        self.hierarchy
            .bound_entities()
            .into_iter()
            .find(|entity| {
                self.hierarchy
                    .role(*entity)
                    .is_some_and(|role| role.tier() == PermissionTier::Board)
            })
    }

    /// One management hop past the source's previous escalation target.
    /// Falls back to the direct manager when there is no previous target,
    /// and stays at the top of the chain once it is exhausted.
    fn next_in_chain(&self, source: EntityId) -> Option<EntityId> {
        let previous = {
            let state = self.state.read().expect("escalation state poisoned");
            state.last_target.get(&source).copied()
        };
        let Some(previous) = previous else {
            return self.hierarchy.direct_manager(source);
        };

        let chain = self.hierarchy.management_chain(source).ok()?;
        match chain.iter().position(|entity| *entity == previous) {
            Some(index) => chain.get(index + 1).or(chain.last()).copied(),
            None => chain.first().copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use org_events::CollectingPublisher;
    use org_hierarchy::{Department, IsolationPolicy, LinkKind, ReportingLine, Role};

    use crate::rule::{EscalationAction, ScopeFilter};

    fn timeout_rule(name: &str, secs: u64, priority: i32) -> EscalationRule {
        EscalationRule::new(
            name,
            Trigger::Timeout { secs },
            TargetKind::DirectManager,
            EscalationAction::Notify,
            priority,
        )
    }

    fn org_with_chain() -> (Arc<OrganizationHierarchy>, EntityId, EntityId, EntityId) {
        let org = Arc::new(OrganizationHierarchy::new());
        let dept = org
            .add_department(Department::new("ops", IsolationPolicy::Open))
            .unwrap();
        let worker = EntityId::random();
        let lead = EntityId::random();
        let director = EntityId::random();
        let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        org.add_reporting_line(ReportingLine::new(worker, lead, dept, LinkKind::Direct, epoch))
            .unwrap();
        org.add_reporting_line(ReportingLine::new(lead, director, dept, LinkKind::Direct, epoch))
            .unwrap();
        (org, worker, lead, director)
    }

    #[test]
    fn fired_rules_sorted_by_priority() {
        let (org, ..) = org_with_chain();
        let engine = EscalationEngine::new(org);
        engine.add_rule(timeout_rule("r3", 3600, 3)).unwrap();
        engine.add_rule(timeout_rule("r9", 3600, 9)).unwrap();

        let ctx = GovernanceContext::new().with_elapsed_secs(4000);
        let fired = engine.check_triggers(SourceKind::Agent, &ctx);
        let names: Vec<&str> = fired.iter().map(EscalationRule::name).collect();
        assert_eq!(names, ["r9", "r3"]);
    }

    #[test]
    fn inactive_and_out_of_scope_rules_skipped() {
        let (org, ..) = org_with_chain();
        let engine = EscalationEngine::new(org);
        engine
            .add_rule(timeout_rule("dormant", 10, 5).deactivated())
            .unwrap();
        engine
            .add_rule(timeout_rule("crews-only", 10, 5).scoped_to(ScopeFilter::Crew))
            .unwrap();

        let ctx = GovernanceContext::new().with_elapsed_secs(60);
        assert!(engine.check_triggers(SourceKind::Agent, &ctx).is_empty());
        assert_eq!(engine.check_triggers(SourceKind::Crew, &ctx).len(), 1);
    }

    #[test]
    fn escalation_routes_to_direct_manager() {
        let (org, worker, lead, _) = org_with_chain();
        let engine = EscalationEngine::new(org);
        let rule = timeout_rule("slow", 3600, 1);
        engine.add_rule(rule.clone()).unwrap();

        let record = engine.escalate(
            EscalationSource::new(worker, SourceKind::Agent),
            Some(&rule),
            "task overran",
            GovernanceContext::new().with_elapsed_secs(4000),
        );

        assert_eq!(record.status(), EscalationStatus::New);
        assert_eq!(record.target(), Some(lead));
        assert_eq!(record.rule(), Some("slow"));
    }

    #[test]
    fn claim_resolve_happy_path() {
        let (org, worker, lead, _) = org_with_chain();
        let engine = EscalationEngine::new(org);
        let record = engine.escalate(
            EscalationSource::new(worker, SourceKind::Agent),
            None,
            "manual concern",
            GovernanceContext::new(),
        );

        let claimed = engine.claim(record.id(), lead).unwrap();
        assert_eq!(claimed.status(), EscalationStatus::InProgress);
        assert_eq!(claimed.owner(), Some(lead));

        let resolved = engine.resolve(record.id(), "handled").unwrap();
        assert_eq!(resolved.status(), EscalationStatus::Resolved);
        assert_eq!(resolved.resolution(), Some("handled"));
    }

    #[test]
    fn resolve_without_claim_fails() {
        let (org, worker, ..) = org_with_chain();
        let engine = EscalationEngine::new(org);
        let record = engine.escalate(
            EscalationSource::new(worker, SourceKind::Agent),
            None,
            "unclaimed",
            GovernanceContext::new(),
        );

        let err = engine
            .resolve(record.id(), "too soon")
            .expect_err("claim is mandatory");
        assert!(matches!(err, EscalationError::InvalidState { .. }));
    }

    #[test]
    fn double_claim_fails() {
        let (org, worker, lead, director) = org_with_chain();
        let engine = EscalationEngine::new(org);
        let record = engine.escalate(
            EscalationSource::new(worker, SourceKind::Agent),
            None,
            "contested",
            GovernanceContext::new(),
        );

        engine.claim(record.id(), lead).unwrap();
        let err = engine
            .claim(record.id(), director)
            .expect_err("already claimed");
        assert!(matches!(err, EscalationError::InvalidState { .. }));
    }

    #[test]
    fn forward_returns_to_new_with_audit_trail() {
        let (org, worker, lead, director) = org_with_chain();
        let engine = EscalationEngine::new(org);
        let record = engine.escalate(
            EscalationSource::new(worker, SourceKind::Agent),
            None,
            "needs higher authority",
            GovernanceContext::new(),
        );
        let original_id = record.id();

        engine.claim(original_id, lead).unwrap();
        let forwarded = engine.forward(original_id, director).unwrap();

        assert_eq!(forwarded.id(), original_id);
        assert_eq!(forwarded.status(), EscalationStatus::New);
        assert_eq!(forwarded.target(), Some(director));
        assert!(forwarded.owner().is_none());
        assert_eq!(forwarded.reason(), "needs higher authority");
        assert!(forwarded
            .audit_trail()
            .iter()
            .any(|entry| entry.contains("forwarded")));

        // Forwarded records can be claimed again.
        engine.claim(original_id, director).unwrap();
    }

    #[test]
    fn next_in_chain_climbs_one_hop_per_escalation() {
        let (org, worker, lead, director) = org_with_chain();
        let engine = EscalationEngine::new(org);
        let rule = EscalationRule::new(
            "climb",
            Trigger::Manual,
            TargetKind::NextInChain,
            EscalationAction::Reassign,
            1,
        );
        engine.add_rule(rule.clone()).unwrap();
        let source = EscalationSource::new(worker, SourceKind::Agent);

        let first = engine.escalate(source, Some(&rule), "first", GovernanceContext::new());
        assert_eq!(first.target(), Some(lead));

        let second = engine.escalate(source, Some(&rule), "second", GovernanceContext::new());
        assert_eq!(second.target(), Some(director));

        // Chain exhausted: stays at the top.
        let third = engine.escalate(source, Some(&rule), "third", GovernanceContext::new());
        assert_eq!(third.target(), Some(director));
    }

    #[test]
    fn board_target_resolves_to_board_tier_entity() {
        let (org, worker, ..) = org_with_chain();
        let chair = EntityId::random();
        org.bind_role(chair, Role::builder("chair", PermissionTier::Board).approves().build());

        let engine = EscalationEngine::new(Arc::clone(&org));
        let rule = EscalationRule::new(
            "to-board",
            Trigger::Manual,
            TargetKind::ExecutiveBoard,
            EscalationAction::RequestApproval,
            1,
        );
        let record = engine.escalate(
            EscalationSource::new(worker, SourceKind::Agent),
            Some(&rule),
            "board matter",
            GovernanceContext::new(),
        );
        assert_eq!(record.target(), Some(chair));
    }

    #[test]
    fn transitions_publish_events() {
        let (org, worker, lead, _) = org_with_chain();
        let collector = Arc::new(CollectingPublisher::new());
        let engine = EscalationEngine::with_publisher(
            org,
            Arc::clone(&collector) as Arc<dyn EventPublisher>,
        );

        let record = engine.escalate(
            EscalationSource::new(worker, SourceKind::Agent),
            None,
            "observed",
            GovernanceContext::new(),
        );
        engine.claim(record.id(), lead).unwrap();
        engine.resolve(record.id(), "done").unwrap();

        let labels: Vec<&str> = collector.drain().iter().map(OrgEvent::label).collect();
        assert_eq!(
            labels,
            [
                "escalation_triggered",
                "escalation_claimed",
                "escalation_resolved"
            ]
        );
    }
}
