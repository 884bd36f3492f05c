//! Organization structure: departments, roles, reporting lines, and the
//! chain-of-command queries built on top of them.

#![warn(missing_docs, clippy::pedantic)]

mod department;
mod hierarchy;
mod reporting;
mod role;

/// Departments with isolation policies and resource ceilings.
pub use department::{Department, IsolationPolicy, ResourceCeiling};
/// The hierarchy manager, its errors, and permission queries.
pub use hierarchy::{HierarchyError, HierarchyResult, OrganizationHierarchy};
/// Reporting lines between subordinates and managers.
pub use reporting::{LinkKind, ReportingLine};
/// Role bindings and their builder.
pub use role::{Role, RoleBuilder};
