//! Supervisory channel: a text-command router that lets a human operator
//! issue directives, query status, and decide approvals through fixed
//! conversational patterns.

#![warn(missing_docs, clippy::pedantic)]

mod channel;
mod collaborators;
mod intent;

/// The channel and its builder.
pub use channel::{ChannelBuilder, SupervisoryChannel, DIRECTIVE_ACTION};
/// Collaborator seams and inert default implementations.
pub use collaborators::{
    CollaboratorError, DirectiveDispatcher, DirectiveDraft, DirectivePriority, EmptyInbox,
    EmptyRegistry, NameRegistry, ReportReader, StaticRegistry, UnconfiguredDispatcher,
};
/// Input parsing.
pub use intent::Intent;
