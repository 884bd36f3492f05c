//! The approval workflow manager.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use org_events::{EventPublisher, NullPublisher, OrgEvent};
use org_primitives::{ApprovalId, EntityId};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::request::{ApprovalKind, ApprovalRequest, ApprovalStatus};

/// Result alias for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;

/// Errors surfaced by the approval workflow.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The referenced request does not exist.
    #[error("unknown approval request {id}")]
    NotFound {
        /// The offending request id.
        id: ApprovalId,
    },
    /// The request has already been decided; decisions are terminal.
    #[error("approval request {id} was already decided ({status:?})")]
    InvalidState {
        /// The request id.
        id: ApprovalId,
        /// The decision already on record.
        status: ApprovalStatus,
    },
}

#[derive(Default)]
struct WorkflowState {
    records: HashMap<ApprovalId, ApprovalRequest>,
    order: Vec<ApprovalId>,
}

/// FIFO approval queue with terminal-once decisions.
///
/// Requests wait in submission order; each is approved or rejected exactly
/// once and kept on record afterwards.
pub struct ApprovalWorkflow {
    state: RwLock<WorkflowState>,
    publisher: Arc<dyn EventPublisher>,
}

impl Default for ApprovalWorkflow {
    fn default() -> Self {
        Self::new()
    }
}

impl ApprovalWorkflow {
    /// Creates an empty workflow.
    #[must_use]
    pub fn new() -> Self {
        Self::with_publisher(Arc::new(NullPublisher))
    }

    /// Creates a workflow emitting events to the supplied publisher.
    #[must_use]
    pub fn with_publisher(publisher: Arc<dyn EventPublisher>) -> Self {
        Self {
            state: RwLock::new(WorkflowState::default()),
            publisher,
        }
    }

    /// Submits a request, returning it in `Pending` state.
    ///
    /// # Panics
    ///
    /// Panics if the workflow lock has been poisoned.
    pub fn submit(
        &self,
        kind: ApprovalKind,
        description: impl Into<String>,
        requester: EntityId,
        requester_name: impl Into<String>,
        detail: Map<String, Value>,
    ) -> ApprovalRequest {
        let request = ApprovalRequest::new(
            kind,
            description.into(),
            requester,
            requester_name.into(),
            detail,
        );

        info!(
            approval = %request.id(),
            kind = kind.as_str(),
            requester = %requester,
            "approval request submitted"
        );
        self.publisher.publish(&OrgEvent::ApprovalRequired {
            id: request.id(),
            kind: kind.as_str().to_owned(),
            description: request.description().to_owned(),
            requester,
            requester_name: request.requester_name().to_owned(),
        });

        let mut state = self.state.write().expect("approval state poisoned");
        state.order.push(request.id());
        state.records.insert(request.id(), request.clone());
        request
    }

    /// Grants a pending request.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::NotFound`] for unknown ids and
    /// [`ApprovalError::InvalidState`] when the request is no longer
    /// pending.
    ///
    /// # Panics
    ///
    /// Panics if the workflow lock has been poisoned.
    pub fn approve(
        &self,
        id: ApprovalId,
        note: impl Into<String>,
    ) -> ApprovalResult<ApprovalRequest> {
        let note = note.into();
        let request = self.decide(id, ApprovalStatus::Approved, note.clone())?;
        self.publisher
            .publish(&OrgEvent::ApprovalGranted { id, note });
        Ok(request)
    }

    /// Refuses a pending request.
    ///
    /// # Errors
    ///
    /// Returns [`ApprovalError::NotFound`] for unknown ids and
    /// [`ApprovalError::InvalidState`] when the request is no longer
    /// pending.
    ///
    /// # Panics
    ///
    /// Panics if the workflow lock has been poisoned.
    pub fn reject(
        &self,
        id: ApprovalId,
        note: impl Into<String>,
    ) -> ApprovalResult<ApprovalRequest> {
        let note = note.into();
        let request = self.decide(id, ApprovalStatus::Rejected, note.clone())?;
        self.publisher
            .publish(&OrgEvent::ApprovalRejected { id, note });
        Ok(request)
    }

    fn decide(
        &self,
        id: ApprovalId,
        status: ApprovalStatus,
        note: String,
    ) -> ApprovalResult<ApprovalRequest> {
        let mut state = self.state.write().expect("approval state poisoned");
        let request = state
            .records
            .get_mut(&id)
            .ok_or(ApprovalError::NotFound { id })?;

        if request.status().is_decided() {
            return Err(ApprovalError::InvalidState {
                id,
                status: request.status(),
            });
        }

        request.decide(status, note);
        debug!(approval = %id, status = ?status, "approval request decided");
        Ok(request.clone())
    }

    /// Returns a request by id.
    ///
    /// # Panics
    ///
    /// Panics if the workflow lock has been poisoned.
    #[must_use]
    pub fn get(&self, id: ApprovalId) -> Option<ApprovalRequest> {
        let state = self.state.read().expect("approval state poisoned");
        state.records.get(&id).cloned()
    }

    /// Returns the pending requests, oldest submission first.
    ///
    /// # Panics
    ///
    /// Panics if the workflow lock has been poisoned.
    #[must_use]
    pub fn pending(&self) -> Vec<ApprovalRequest> {
        let state = self.state.read().expect("approval state poisoned");
        state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|request| request.status() == ApprovalStatus::Pending)
            .cloned()
            .collect()
    }

    /// Returns the oldest pending request, if any.
    ///
    /// # Panics
    ///
    /// Panics if the workflow lock has been poisoned.
    #[must_use]
    pub fn oldest_pending(&self) -> Option<ApprovalRequest> {
        let state = self.state.read().expect("approval state poisoned");
        state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .find(|request| request.status() == ApprovalStatus::Pending)
            .cloned()
    }

    /// Finds the pending request whose id starts with `prefix`, when exactly
    /// one does. Returns `None` for no match or an ambiguous prefix.
    ///
    /// # Panics
    ///
    /// Panics if the workflow lock has been poisoned.
    #[must_use]
    pub fn find_pending_by_prefix(&self, prefix: &str) -> Option<ApprovalRequest> {
        let state = self.state.read().expect("approval state poisoned");
        let mut matches = state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .filter(|request| {
                request.status() == ApprovalStatus::Pending
                    && request.id().to_string().starts_with(prefix)
            });
        let first = matches.next()?;
        if matches.next().is_some() {
            return None;
        }
        Some(first.clone())
    }

    /// Returns all requests in submission order, decided ones included.
    ///
    /// # Panics
    ///
    /// Panics if the workflow lock has been poisoned.
    #[must_use]
    pub fn all(&self) -> Vec<ApprovalRequest> {
        let state = self.state.read().expect("approval state poisoned");
        state
            .order
            .iter()
            .filter_map(|id| state.records.get(id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submit(workflow: &ApprovalWorkflow, description: &str) -> ApprovalRequest {
        workflow.submit(
            ApprovalKind::Budget,
            description,
            EntityId::random(),
            "tester",
            Map::new(),
        )
    }

    #[test]
    fn pending_lists_oldest_first() {
        let workflow = ApprovalWorkflow::new();
        let first = submit(&workflow, "first");
        let second = submit(&workflow, "second");
        let third = submit(&workflow, "third");

        let pending: Vec<ApprovalId> =
            workflow.pending().iter().map(ApprovalRequest::id).collect();
        assert_eq!(pending, vec![first.id(), second.id(), third.id()]);
        assert_eq!(workflow.oldest_pending().map(|r| r.id()), Some(first.id()));

        workflow.approve(first.id(), "fine").unwrap();
        assert_eq!(workflow.oldest_pending().map(|r| r.id()), Some(second.id()));
    }

    #[test]
    fn decisions_are_terminal() {
        let workflow = ApprovalWorkflow::new();
        let request = submit(&workflow, "one-shot");

        let approved = workflow.approve(request.id(), "go ahead").unwrap();
        assert_eq!(approved.status(), ApprovalStatus::Approved);
        assert_eq!(approved.decision_note(), Some("go ahead"));
        assert!(approved.decided_at().is_some());

        let err = workflow
            .reject(request.id(), "changed my mind")
            .expect_err("decision is terminal");
        assert!(matches!(
            err,
            ApprovalError::InvalidState {
                status: ApprovalStatus::Approved,
                ..
            }
        ));
    }

    #[test]
    fn unknown_id_reported() {
        let workflow = ApprovalWorkflow::new();
        let err = workflow
            .approve(ApprovalId::random(), "nothing there")
            .expect_err("unknown id");
        assert!(matches!(err, ApprovalError::NotFound { .. }));
    }

    #[test]
    fn decided_requests_stay_on_record() {
        let workflow = ApprovalWorkflow::new();
        let request = submit(&workflow, "kept");
        workflow.reject(request.id(), "no").unwrap();

        assert!(workflow.pending().is_empty());
        let stored = workflow.get(request.id()).unwrap();
        assert_eq!(stored.status(), ApprovalStatus::Rejected);
        assert_eq!(workflow.all().len(), 1);
    }

    #[test]
    fn prefix_lookup_requires_unambiguous_match() {
        let workflow = ApprovalWorkflow::new();
        let request = submit(&workflow, "findable");
        let full = request.id().to_string();

        let found = workflow.find_pending_by_prefix(&full[..8]).unwrap();
        assert_eq!(found.id(), request.id());
        assert!(workflow.find_pending_by_prefix("zzzz").is_none());
        // Every id shares the empty prefix; with two pending that is ambiguous.
        submit(&workflow, "second");
        assert!(workflow.find_pending_by_prefix("").is_none());
    }

    #[test]
    fn submission_and_decisions_publish_events() {
        let collector = Arc::new(org_events::CollectingPublisher::new());
        let workflow =
            ApprovalWorkflow::with_publisher(Arc::clone(&collector) as Arc<dyn EventPublisher>);

        let request = submit(&workflow, "observed");
        workflow.approve(request.id(), "ok").unwrap();

        let labels: Vec<&str> = collector.drain().iter().map(OrgEvent::label).collect();
        assert_eq!(labels, ["approval_required", "approval_granted"]);
    }
}
