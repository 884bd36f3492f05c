//! Collaborator seams the channel delegates to.
//!
//! Directive execution, report storage, and name registration live outside
//! the governance core; the channel consumes them through these traits.

use chrono::{DateTime, Utc};
use org_primitives::EntityId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Urgency attached to a dispatched directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectivePriority {
    /// Background work.
    Low,
    /// Default urgency.
    Normal,
    /// Work the operator is waiting on.
    High,
    /// Drop everything.
    Critical,
}

/// A fully specified work order, ready for dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectiveDraft {
    /// Issuing entity.
    pub from: EntityId,
    /// Receiving entity.
    pub to: EntityId,
    /// Short title.
    pub title: String,
    /// Full directive text.
    pub body: String,
    /// Urgency.
    pub priority: DirectivePriority,
    /// Optional completion deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Whether execution must wait for an approval decision.
    pub requires_approval: bool,
}

/// Raised by a collaborator that cannot complete a delegated operation.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The directive could not be created or dispatched.
    #[error("directive dispatch failed: {reason}")]
    Dispatch {
        /// Human-readable failure reason.
        reason: String,
    },
    /// No collaborator is wired for the requested operation.
    #[error("no {collaborator} collaborator configured")]
    NotConfigured {
        /// Which seam is missing.
        collaborator: &'static str,
    },
}

/// Creates directives in the execution runtime.
pub trait DirectiveDispatcher: Send + Sync {
    /// Dispatches a draft, returning an identifier for the created directive.
    ///
    /// # Errors
    ///
    /// Returns [`CollaboratorError`] when the directive cannot be created.
    fn create(&self, draft: &DirectiveDraft) -> Result<String, CollaboratorError>;
}

/// Read-only view over an entity's report inbox.
pub trait ReportReader: Send + Sync {
    /// Number of unread reports addressed to the entity.
    fn unread_count(&self, recipient: EntityId) -> usize;
    /// Number of unread urgent reports addressed to the entity.
    fn urgent_count(&self, recipient: EntityId) -> usize;
}

/// Maps operator-facing names to entity ids.
pub trait NameRegistry: Send + Sync {
    /// Resolves a name to an entity id. Matching is exact and case-sensitive.
    fn resolve(&self, name: &str) -> Option<EntityId>;
    /// Returns every registered name, for "unknown target" responses.
    fn names(&self) -> Vec<String>;
}

/// Dispatcher used when no execution runtime is wired up; every dispatch
/// fails with [`CollaboratorError::NotConfigured`].
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredDispatcher;

impl DirectiveDispatcher for UnconfiguredDispatcher {
    fn create(&self, _draft: &DirectiveDraft) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::NotConfigured {
            collaborator: "directive dispatch",
        })
    }
}

/// Report reader with nothing to read.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyInbox;

impl ReportReader for EmptyInbox {
    fn unread_count(&self, _recipient: EntityId) -> usize {
        0
    }

    fn urgent_count(&self, _recipient: EntityId) -> usize {
        0
    }
}

/// Registry with no names in it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyRegistry;

impl NameRegistry for EmptyRegistry {
    fn resolve(&self, _name: &str) -> Option<EntityId> {
        None
    }

    fn names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Fixed name table built up front, for deployments where the entity set is
/// known at wiring time.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    entries: Vec<(String, EntityId)>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a name, replacing any previous binding of the same name.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, id: EntityId) -> Self {
        let name = name.into();
        self.entries.retain(|(existing, _)| *existing != name);
        self.entries.push((name, id));
        self
    }
}

impl NameRegistry for StaticRegistry {
    fn resolve(&self, name: &str) -> Option<EntityId> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, id)| *id)
    }

    fn names(&self) -> Vec<String> {
        self.entries.iter().map(|(name, _)| name.clone()).collect()
    }
}
