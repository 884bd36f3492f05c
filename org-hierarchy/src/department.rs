//! Department records and their communication isolation policies.

use std::collections::BTreeSet;

use org_primitives::DepartmentId;
use serde::{Deserialize, Serialize};

/// Restriction on cross-department communication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationPolicy {
    /// No restriction; entities may communicate across any department.
    Open,
    /// Communication limited to the same department plus an explicit
    /// allow-list of peer departments.
    DepartmentScoped,
    /// Communication limited to the same department. The allow-list is
    /// ignored and parent/child departments are not exempt.
    Strict,
}

/// Resource ceiling applied to a department.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceCeiling {
    max_requests_per_interval: Option<u32>,
    budget_ceiling: Option<f64>,
    budget_used: f64,
}

impl ResourceCeiling {
    /// Creates an unbounded ceiling with no spend recorded.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            max_requests_per_interval: None,
            budget_ceiling: None,
            budget_used: 0.0,
        }
    }

    /// Sets the request-rate ceiling.
    #[must_use]
    pub fn with_max_requests(mut self, per_interval: u32) -> Self {
        self.max_requests_per_interval = Some(per_interval);
        self
    }

    /// Sets the budget ceiling.
    #[must_use]
    pub fn with_budget_ceiling(mut self, ceiling: f64) -> Self {
        self.budget_ceiling = Some(ceiling);
        self
    }

    /// Returns the request-rate ceiling, if any.
    #[must_use]
    pub fn max_requests_per_interval(&self) -> Option<u32> {
        self.max_requests_per_interval
    }

    /// Returns the budget ceiling, if any.
    #[must_use]
    pub fn budget_ceiling(&self) -> Option<f64> {
        self.budget_ceiling
    }

    /// Returns the running spend total.
    #[must_use]
    pub fn budget_used(&self) -> f64 {
        self.budget_used
    }

    pub(crate) fn register_spend(&mut self, amount: f64) {
        self.budget_used += amount;
    }
}

impl Default for ResourceCeiling {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// A department in the organization tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    id: DepartmentId,
    name: String,
    parent: Option<DepartmentId>,
    isolation: IsolationPolicy,
    allowed_peers: BTreeSet<DepartmentId>,
    ceiling: ResourceCeiling,
}

impl Department {
    /// Creates a new department with the supplied isolation policy.
    #[must_use]
    pub fn new(name: impl Into<String>, isolation: IsolationPolicy) -> Self {
        Self {
            id: DepartmentId::random(),
            name: name.into(),
            parent: None,
            isolation,
            allowed_peers: BTreeSet::new(),
            ceiling: ResourceCeiling::unbounded(),
        }
    }

    /// Sets the parent department, making this one a child in the tree.
    #[must_use]
    pub fn with_parent(mut self, parent: DepartmentId) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Adds a peer department to the allow-list.
    ///
    /// Only consulted under [`IsolationPolicy::DepartmentScoped`].
    #[must_use]
    pub fn with_allowed_peer(mut self, peer: DepartmentId) -> Self {
        self.allowed_peers.insert(peer);
        self
    }

    /// Sets the resource ceiling.
    #[must_use]
    pub fn with_ceiling(mut self, ceiling: ResourceCeiling) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Returns the department identifier.
    #[must_use]
    pub fn id(&self) -> DepartmentId {
        self.id
    }

    /// Returns the department name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parent department id, if any.
    #[must_use]
    pub fn parent(&self) -> Option<DepartmentId> {
        self.parent
    }

    /// Returns the isolation policy.
    #[must_use]
    pub fn isolation(&self) -> IsolationPolicy {
        self.isolation
    }

    /// Returns `true` when `peer` is on the allow-list.
    #[must_use]
    pub fn allows_peer(&self, peer: DepartmentId) -> bool {
        self.allowed_peers.contains(&peer)
    }

    /// Returns the resource ceiling.
    #[must_use]
    pub fn ceiling(&self) -> &ResourceCeiling {
        &self.ceiling
    }

    pub(crate) fn ceiling_mut(&mut self) -> &mut ResourceCeiling {
        &mut self.ceiling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_allow_list_membership() {
        let peer = DepartmentId::random();
        let dept = Department::new("risk", IsolationPolicy::DepartmentScoped)
            .with_allowed_peer(peer);

        assert!(dept.allows_peer(peer));
        assert!(!dept.allows_peer(DepartmentId::random()));
    }

    #[test]
    fn ceiling_tracks_spend() {
        let mut ceiling = ResourceCeiling::unbounded().with_budget_ceiling(100.0);
        ceiling.register_spend(40.0);
        ceiling.register_spend(10.0);

        assert!((ceiling.budget_used() - 50.0).abs() < f64::EPSILON);
        assert_eq!(ceiling.budget_ceiling(), Some(100.0));
    }
}
