//! Role bindings: the authority and capabilities granted to an entity.

use std::collections::BTreeSet;

use org_primitives::{EntityId, PermissionTier};
use serde::{Deserialize, Serialize};

/// The authority, capabilities, and ceilings bound to a single entity.
///
/// Exactly one role may be bound to an entity at a time; rebinding replaces
/// the previous role wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    name: String,
    tier: PermissionTier,
    can_delegate: bool,
    can_escalate: bool,
    can_approve: bool,
    can_issue_directives: bool,
    can_receive_reports: bool,
    allowed_tools: BTreeSet<String>,
    denied_tools: BTreeSet<String>,
    directive_sources: Vec<EntityId>,
    escalation_targets: Vec<EntityId>,
    budget_ceiling: Option<f64>,
    max_concurrent_tasks: Option<u32>,
}

impl Role {
    /// Starts building a role at the given tier.
    #[must_use]
    pub fn builder(name: impl Into<String>, tier: PermissionTier) -> RoleBuilder {
        RoleBuilder {
            role: Self {
                name: name.into(),
                tier,
                can_delegate: false,
                can_escalate: false,
                can_approve: false,
                can_issue_directives: false,
                can_receive_reports: false,
                allowed_tools: BTreeSet::new(),
                denied_tools: BTreeSet::new(),
                directive_sources: Vec::new(),
                escalation_targets: Vec::new(),
                budget_ceiling: None,
                max_concurrent_tasks: None,
            },
        }
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the permission tier.
    #[must_use]
    pub fn tier(&self) -> PermissionTier {
        self.tier
    }

    /// Returns `true` when the role may delegate work downward.
    #[must_use]
    pub fn can_delegate(&self) -> bool {
        self.can_delegate
    }

    /// Returns `true` when the role may raise escalations.
    #[must_use]
    pub fn can_escalate(&self) -> bool {
        self.can_escalate
    }

    /// Returns `true` when the role may resolve approval requests.
    #[must_use]
    pub fn can_approve(&self) -> bool {
        self.can_approve
    }

    /// Returns `true` when the role may issue directives.
    #[must_use]
    pub fn can_issue_directives(&self) -> bool {
        self.can_issue_directives
    }

    /// Returns `true` when the role may receive reports.
    #[must_use]
    pub fn can_receive_reports(&self) -> bool {
        self.can_receive_reports
    }

    /// Returns `true` when the role may use the named tool.
    ///
    /// The deny list wins over the allow list; an empty allow list means any
    /// tool not explicitly denied.
    #[must_use]
    pub fn may_use_tool(&self, tool: &str) -> bool {
        if self.denied_tools.contains(tool) {
            return false;
        }
        self.allowed_tools.is_empty() || self.allowed_tools.contains(tool)
    }

    /// Entities this role accepts directives from.
    #[must_use]
    pub fn directive_sources(&self) -> &[EntityId] {
        &self.directive_sources
    }

    /// Entities this role escalates to.
    #[must_use]
    pub fn escalation_targets(&self) -> &[EntityId] {
        &self.escalation_targets
    }

    /// Budget ceiling for work performed under this role.
    #[must_use]
    pub fn budget_ceiling(&self) -> Option<f64> {
        self.budget_ceiling
    }

    /// Concurrency ceiling for work performed under this role.
    #[must_use]
    pub fn max_concurrent_tasks(&self) -> Option<u32> {
        self.max_concurrent_tasks
    }
}

/// Builder for [`Role`].
pub struct RoleBuilder {
    role: Role,
}

impl RoleBuilder {
    /// Allows delegating work downward.
    #[must_use]
    pub fn delegates(mut self) -> Self {
        self.role.can_delegate = true;
        self
    }

    /// Allows raising escalations.
    #[must_use]
    pub fn escalates(mut self) -> Self {
        self.role.can_escalate = true;
        self
    }

    /// Allows resolving approval requests.
    #[must_use]
    pub fn approves(mut self) -> Self {
        self.role.can_approve = true;
        self
    }

    /// Allows issuing directives.
    #[must_use]
    pub fn issues_directives(mut self) -> Self {
        self.role.can_issue_directives = true;
        self
    }

    /// Allows receiving reports.
    #[must_use]
    pub fn receives_reports(mut self) -> Self {
        self.role.can_receive_reports = true;
        self
    }

    /// Restricts the role to the named tool (additive).
    #[must_use]
    pub fn allow_tool(mut self, tool: impl Into<String>) -> Self {
        self.role.allowed_tools.insert(tool.into());
        self
    }

    /// Forbids the named tool regardless of the allow list.
    #[must_use]
    pub fn deny_tool(mut self, tool: impl Into<String>) -> Self {
        self.role.denied_tools.insert(tool.into());
        self
    }

    /// Adds an upstream entity the role accepts directives from.
    #[must_use]
    pub fn directive_source(mut self, source: EntityId) -> Self {
        self.role.directive_sources.push(source);
        self
    }

    /// Adds an entity the role escalates to.
    #[must_use]
    pub fn escalation_target(mut self, target: EntityId) -> Self {
        self.role.escalation_targets.push(target);
        self
    }

    /// Sets the budget ceiling.
    #[must_use]
    pub fn budget_ceiling(mut self, ceiling: f64) -> Self {
        self.role.budget_ceiling = Some(ceiling);
        self
    }

    /// Sets the concurrency ceiling.
    #[must_use]
    pub fn max_concurrent_tasks(mut self, ceiling: u32) -> Self {
        self.role.max_concurrent_tasks = Some(ceiling);
        self
    }

    /// Finalises the role.
    #[must_use]
    pub fn build(self) -> Role {
        self.role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deny_list_wins_over_allow_list() {
        let role = Role::builder("trader", PermissionTier::Operational)
            .allow_tool("market.read")
            .allow_tool("market.trade")
            .deny_tool("market.trade")
            .build();

        assert!(role.may_use_tool("market.read"));
        assert!(!role.may_use_tool("market.trade"));
        assert!(!role.may_use_tool("admin.wipe"));
    }

    #[test]
    fn empty_allow_list_permits_undenied_tools() {
        let role = Role::builder("lead", PermissionTier::Team)
            .deny_tool("admin.wipe")
            .build();

        assert!(role.may_use_tool("market.read"));
        assert!(!role.may_use_tool("admin.wipe"));
    }

    #[test]
    fn builder_sets_flags() {
        let role = Role::builder("board", PermissionTier::Board)
            .delegates()
            .approves()
            .issues_directives()
            .receives_reports()
            .build();

        assert!(role.can_delegate());
        assert!(role.can_approve());
        assert!(role.can_issue_directives());
        assert!(role.can_receive_reports());
        assert!(!role.can_escalate());
    }
}
