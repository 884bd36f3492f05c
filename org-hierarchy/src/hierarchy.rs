//! The hierarchy manager: structure storage and chain-of-command queries.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use org_primitives::{DepartmentId, EntityId};
use thiserror::Error;
use tracing::debug;

use crate::department::{Department, IsolationPolicy};
use crate::reporting::{LinkKind, ReportingLine};
use crate::role::Role;

/// Result alias for hierarchy operations.
pub type HierarchyResult<T> = Result<T, HierarchyError>;

/// Errors surfaced by the hierarchy manager.
#[derive(Debug, Error)]
pub enum HierarchyError {
    /// A structural rule was violated while mutating the hierarchy.
    #[error("invalid hierarchy mutation: {reason}")]
    Validation {
        /// Human-readable reason for rejection.
        reason: String,
    },
    /// An id referenced something the hierarchy does not know about.
    #[error("unknown {kind} `{id}`")]
    NotFound {
        /// What kind of record was looked up.
        kind: &'static str,
        /// The offending identifier.
        id: String,
    },
    /// A reporting-line cycle was found while walking a management chain.
    #[error("reporting cycle detected at entity {entity}")]
    CycleDetected {
        /// The entity whose chain walk revisited an id.
        entity: EntityId,
    },
}

impl HierarchyError {
    fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }
}

#[derive(Default)]
struct HierarchyState {
    departments: HashMap<DepartmentId, Department>,
    department_names: HashMap<String, DepartmentId>,
    roles: HashMap<EntityId, Role>,
    lines: Vec<ReportingLine>,
    membership: HashMap<EntityId, DepartmentId>,
}

impl HierarchyState {
    /// Picks the direct line currently governing `subordinate`: the
    /// open-ended one if present, otherwise the most recently started.
    fn current_direct_line(&self, subordinate: EntityId) -> Option<&ReportingLine> {
        let mut candidates: Vec<&ReportingLine> = self
            .lines
            .iter()
            .filter(|line| {
                line.subordinate() == subordinate && line.kind() == LinkKind::Direct
            })
            .collect();
        candidates.sort_by_key(|line| (line.active_until().is_some(), std::cmp::Reverse(line.active_from())));
        candidates.first().copied()
    }

    fn management_chain(&self, entity: EntityId) -> HierarchyResult<Vec<EntityId>> {
        let mut chain = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(entity);

        let mut current = entity;
        while let Some(line) = self.current_direct_line(current) {
            let manager = line.manager();
            if !visited.insert(manager) {
                return Err(HierarchyError::CycleDetected { entity });
            }
            chain.push(manager);
            current = manager;
        }

        Ok(chain)
    }

    fn department_of(&self, entity: EntityId) -> Option<&Department> {
        self.membership
            .get(&entity)
            .and_then(|id| self.departments.get(id))
    }

    fn may_communicate(&self, from: EntityId, to: EntityId) -> bool {
        let Some(from_dept) = self.department_of(from) else {
            // Entities outside any department are not gated.
            return true;
        };
        let to_dept = self.membership.get(&to).copied();

        match from_dept.isolation() {
            IsolationPolicy::Open => true,
            IsolationPolicy::DepartmentScoped => to_dept.is_some_and(|dept| {
                dept == from_dept.id() || from_dept.allows_peer(dept)
            }),
            IsolationPolicy::Strict => to_dept == Some(from_dept.id()),
        }
    }
}

/// Shared, lock-guarded view of the organization structure.
///
/// Reads proceed concurrently; mutations take a short write lock bounded by
/// collection size. No operation performs I/O or reads the wall clock.
#[derive(Default)]
pub struct OrganizationHierarchy {
    state: RwLock<HierarchyState>,
}

impl OrganizationHierarchy {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a department.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Validation`] when the name is empty or
    /// already taken, or the parent department is unknown.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    pub fn add_department(&self, department: Department) -> HierarchyResult<DepartmentId> {
        let mut state = self.state.write().expect("hierarchy poisoned");

        if department.name().trim().is_empty() {
            return Err(HierarchyError::validation("department name cannot be empty"));
        }
        if state.department_names.contains_key(department.name()) {
            return Err(HierarchyError::validation(format!(
                "department name `{}` already registered",
                department.name()
            )));
        }
        if let Some(parent) = department.parent() {
            if !state.departments.contains_key(&parent) {
                return Err(HierarchyError::NotFound {
                    kind: "department",
                    id: parent.to_string(),
                });
            }
        }

        let id = department.id();
        debug!(department = %id, name = department.name(), "department registered");
        state
            .department_names
            .insert(department.name().to_owned(), id);
        state.departments.insert(id, department);
        Ok(id)
    }

    /// Returns a department by id.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn department(&self, id: DepartmentId) -> Option<Department> {
        let state = self.state.read().expect("hierarchy poisoned");
        state.departments.get(&id).cloned()
    }

    /// Returns a department by its unique name.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn department_by_name(&self, name: &str) -> Option<Department> {
        let state = self.state.read().expect("hierarchy poisoned");
        state
            .department_names
            .get(name)
            .and_then(|id| state.departments.get(id))
            .cloned()
    }

    /// Places an entity in a department, replacing any previous membership.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NotFound`] when the department is unknown.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    pub fn assign_department(
        &self,
        entity: EntityId,
        department: DepartmentId,
    ) -> HierarchyResult<()> {
        let mut state = self.state.write().expect("hierarchy poisoned");
        if !state.departments.contains_key(&department) {
            return Err(HierarchyError::NotFound {
                kind: "department",
                id: department.to_string(),
            });
        }
        state.membership.insert(entity, department);
        Ok(())
    }

    /// Returns the department an entity belongs to, if any.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn department_of(&self, entity: EntityId) -> Option<DepartmentId> {
        let state = self.state.read().expect("hierarchy poisoned");
        state.membership.get(&entity).copied()
    }

    /// Adds to a department's running spend total.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::NotFound`] when the department is unknown.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    pub fn register_department_spend(
        &self,
        department: DepartmentId,
        amount: f64,
    ) -> HierarchyResult<()> {
        let mut state = self.state.write().expect("hierarchy poisoned");
        let dept = state.departments.get_mut(&department).ok_or_else(|| {
            HierarchyError::NotFound {
                kind: "department",
                id: department.to_string(),
            }
        })?;
        dept.ceiling_mut().register_spend(amount);
        Ok(())
    }

    /// Binds a role to an entity, replacing any previous binding.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    pub fn bind_role(&self, entity: EntityId, role: Role) {
        let mut state = self.state.write().expect("hierarchy poisoned");
        debug!(entity = %entity, role = role.name(), tier = %role.tier(), "role bound");
        state.roles.insert(entity, role);
    }

    /// Returns the role bound to an entity.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn role(&self, entity: EntityId) -> Option<Role> {
        let state = self.state.read().expect("hierarchy poisoned");
        state.roles.get(&entity).cloned()
    }

    /// Removes the role bound to an entity, returning it if present.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    pub fn remove_role(&self, entity: EntityId) -> Option<Role> {
        let mut state = self.state.write().expect("hierarchy poisoned");
        state.roles.remove(&entity)
    }

    /// Adds a reporting line.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::Validation`] when the line is a `Direct`
    /// link and another `Direct` link with an overlapping activity window
    /// already exists for the same subordinate, or when an entity reports to
    /// itself.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    pub fn add_reporting_line(&self, line: ReportingLine) -> HierarchyResult<()> {
        let mut state = self.state.write().expect("hierarchy poisoned");

        if line.subordinate() == line.manager() {
            return Err(HierarchyError::validation(
                "an entity cannot report to itself",
            ));
        }

        if line.kind() == LinkKind::Direct {
            let conflict = state.lines.iter().any(|existing| {
                existing.subordinate() == line.subordinate()
                    && existing.kind() == LinkKind::Direct
                    && windows_overlap(existing, &line)
            });
            if conflict {
                return Err(HierarchyError::validation(format!(
                    "entity {} already has an active direct reporting line",
                    line.subordinate()
                )));
            }
        }

        debug!(
            subordinate = %line.subordinate(),
            manager = %line.manager(),
            kind = ?line.kind(),
            "reporting line added"
        );
        state.lines.push(line);
        Ok(())
    }

    /// Computes the management chain for an entity by walking `Direct` lines
    /// upward, nearest manager first.
    ///
    /// # Errors
    ///
    /// Returns [`HierarchyError::CycleDetected`] when the walk revisits an
    /// entity.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    pub fn management_chain(&self, entity: EntityId) -> HierarchyResult<Vec<EntityId>> {
        let state = self.state.read().expect("hierarchy poisoned");
        state.management_chain(entity)
    }

    /// Returns the entities reporting to `manager` through any link kind.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn subordinates_of(&self, manager: EntityId) -> Vec<EntityId> {
        let state = self.state.read().expect("hierarchy poisoned");
        let mut seen = HashSet::new();
        state
            .lines
            .iter()
            .filter(|line| line.manager() == manager)
            .map(ReportingLine::subordinate)
            .filter(|subordinate| seen.insert(*subordinate))
            .collect()
    }

    /// Returns the first hop of an entity's management chain.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn direct_manager(&self, entity: EntityId) -> Option<EntityId> {
        let state = self.state.read().expect("hierarchy poisoned");
        state.current_direct_line(entity).map(ReportingLine::manager)
    }

    /// Returns `true` when `from` may issue a directive to `to`: the role
    /// grants directive authority, `from`'s tier strictly outranks `to`'s,
    /// and isolation does not block communication.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn may_issue_directive(&self, from: EntityId, to: EntityId) -> bool {
        let state = self.state.read().expect("hierarchy poisoned");
        let (Some(from_role), Some(to_role)) = (state.roles.get(&from), state.roles.get(&to))
        else {
            return false;
        };
        from_role.can_issue_directives()
            && from_role.tier().outranks(to_role.tier())
            && state.may_communicate(from, to)
    }

    /// Returns `true` when `from` reports to `to` through any link kind or
    /// `to` appears in `from`'s management chain.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn may_report_to(&self, from: EntityId, to: EntityId) -> bool {
        let state = self.state.read().expect("hierarchy poisoned");
        let linked = state
            .lines
            .iter()
            .any(|line| line.subordinate() == from && line.manager() == to);
        if linked {
            return true;
        }
        state
            .management_chain(from)
            .map(|chain| chain.contains(&to))
            .unwrap_or(false)
    }

    /// Returns `true` when `to` is one of `from`'s configured escalation
    /// targets or appears in `from`'s management chain.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn may_escalate_to(&self, from: EntityId, to: EntityId) -> bool {
        let state = self.state.read().expect("hierarchy poisoned");
        if let Some(role) = state.roles.get(&from) {
            if role.escalation_targets().contains(&to) {
                return true;
            }
        }
        state
            .management_chain(from)
            .map(|chain| chain.contains(&to))
            .unwrap_or(false)
    }

    /// Returns `true` when department isolation permits `from` to contact
    /// `to`. Strict isolation is never relaxed, not even between parent and
    /// child departments.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn may_communicate(&self, from: EntityId, to: EntityId) -> bool {
        let state = self.state.read().expect("hierarchy poisoned");
        state.may_communicate(from, to)
    }

    /// Walks all reporting lines and role bindings, returning human-readable
    /// defect descriptions without failing. Callers decide severity.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn check_structure(&self) -> Vec<String> {
        let state = self.state.read().expect("hierarchy poisoned");
        let mut defects = Vec::new();

        for line in &state.lines {
            if !state.roles.contains_key(&line.manager()) {
                defects.push(format!(
                    "reporting line for {} references manager {} with no role binding",
                    line.subordinate(),
                    line.manager()
                ));
            }
            if !state.departments.contains_key(&line.department()) {
                defects.push(format!(
                    "reporting line for {} references unknown department {}",
                    line.subordinate(),
                    line.department()
                ));
            }
        }

        let subordinates: HashSet<EntityId> = state
            .lines
            .iter()
            .map(ReportingLine::subordinate)
            .collect();
        for subordinate in subordinates {
            if let Err(HierarchyError::CycleDetected { entity }) =
                state.management_chain(subordinate)
            {
                defects.push(format!("cyclic management chain at entity {entity}"));
            }
        }

        for (entity, role) in &state.roles {
            for target in role.escalation_targets() {
                if !state.roles.contains_key(target) {
                    defects.push(format!(
                        "role `{}` on {entity} escalates to unbound entity {target}",
                        role.name()
                    ));
                }
            }
            for source in role.directive_sources() {
                if !state.roles.contains_key(source) {
                    defects.push(format!(
                        "role `{}` on {entity} accepts directives from unbound entity {source}",
                        role.name()
                    ));
                }
            }
        }

        defects
    }

    /// Returns the entity ids with a bound role, lowest tier first.
    ///
    /// # Panics
    ///
    /// Panics if the hierarchy lock has been poisoned.
    #[must_use]
    pub fn bound_entities(&self) -> Vec<EntityId> {
        let state = self.state.read().expect("hierarchy poisoned");
        let mut entities: Vec<(EntityId, u8)> = state
            .roles
            .iter()
            .map(|(id, role)| (*id, role.tier().ordinal()))
            .collect();
        entities.sort_by_key(|(id, tier)| (*tier, *id));
        entities.into_iter().map(|(id, _)| id).collect()
    }
}

fn windows_overlap(a: &ReportingLine, b: &ReportingLine) -> bool {
    let a_ends_before_b = a
        .active_until()
        .is_some_and(|until| until <= b.active_from());
    let b_ends_before_a = b
        .active_until()
        .is_some_and(|until| until <= a.active_from());
    !(a_ends_before_b || b_ends_before_a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use org_primitives::PermissionTier;

    use crate::department::ResourceCeiling;

    fn epoch() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn direct(sub: EntityId, mgr: EntityId, dept: DepartmentId) -> ReportingLine {
        ReportingLine::new(sub, mgr, dept, LinkKind::Direct, epoch())
    }

    fn basic_role(tier: PermissionTier) -> Role {
        Role::builder("role", tier).issues_directives().build()
    }

    #[test]
    fn second_direct_line_rejected() {
        let org = OrganizationHierarchy::new();
        let dept = org
            .add_department(Department::new("ops", IsolationPolicy::Open))
            .unwrap();
        let sub = EntityId::random();

        org.add_reporting_line(direct(sub, EntityId::random(), dept))
            .unwrap();
        let err = org
            .add_reporting_line(direct(sub, EntityId::random(), dept))
            .expect_err("second direct line must fail");
        assert!(matches!(err, HierarchyError::Validation { .. }));
    }

    #[test]
    fn non_overlapping_direct_lines_allowed() {
        let org = OrganizationHierarchy::new();
        let dept = org
            .add_department(Department::new("ops", IsolationPolicy::Open))
            .unwrap();
        let sub = EntityId::random();
        let cutover = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();

        org.add_reporting_line(
            direct(sub, EntityId::random(), dept).until(cutover),
        )
        .unwrap();
        org.add_reporting_line(ReportingLine::new(
            sub,
            EntityId::random(),
            dept,
            LinkKind::Direct,
            cutover,
        ))
        .unwrap();
    }

    #[test]
    fn management_chain_walks_upward() {
        let org = OrganizationHierarchy::new();
        let dept = org
            .add_department(Department::new("ops", IsolationPolicy::Open))
            .unwrap();
        let worker = EntityId::random();
        let lead = EntityId::random();
        let director = EntityId::random();

        org.add_reporting_line(direct(worker, lead, dept)).unwrap();
        org.add_reporting_line(direct(lead, director, dept)).unwrap();

        assert_eq!(org.management_chain(worker).unwrap(), vec![lead, director]);
        assert_eq!(org.direct_manager(worker), Some(lead));
        assert_eq!(org.subordinates_of(director), vec![lead]);
    }

    #[test]
    fn cycle_detected_instead_of_looping() {
        let org = OrganizationHierarchy::new();
        let dept = org
            .add_department(Department::new("ops", IsolationPolicy::Open))
            .unwrap();
        let a = EntityId::random();
        let b = EntityId::random();
        let c = EntityId::random();

        org.add_reporting_line(direct(a, b, dept)).unwrap();
        org.add_reporting_line(direct(b, c, dept)).unwrap();
        org.add_reporting_line(direct(c, a, dept)).unwrap();

        let err = org.management_chain(a).expect_err("cycle must be reported");
        assert!(matches!(err, HierarchyError::CycleDetected { .. }));
    }

    #[test]
    fn directive_requires_rank_and_flag() {
        let org = OrganizationHierarchy::new();
        let boss = EntityId::random();
        let worker = EntityId::random();
        org.bind_role(boss, basic_role(PermissionTier::Management));
        org.bind_role(worker, basic_role(PermissionTier::Operational));

        assert!(org.may_issue_directive(boss, worker));
        // Same tier or inverted rank is refused.
        assert!(!org.may_issue_directive(worker, boss));
        assert!(!org.may_issue_directive(worker, worker));

        // Without the flag the rank alone is not enough.
        org.bind_role(boss, Role::builder("silent", PermissionTier::Management).build());
        assert!(!org.may_issue_directive(boss, worker));
    }

    #[test]
    fn strict_isolation_ignores_parentage() {
        let org = OrganizationHierarchy::new();
        let parent = org
            .add_department(Department::new("hq", IsolationPolicy::Open))
            .unwrap();
        let child = org
            .add_department(
                Department::new("vault", IsolationPolicy::Strict).with_parent(parent),
            )
            .unwrap();

        let inside = EntityId::random();
        let outside = EntityId::random();
        org.assign_department(inside, child).unwrap();
        org.assign_department(outside, parent).unwrap();

        assert!(!org.may_communicate(inside, outside));
        // The open parent may still initiate toward the strict child.
        assert!(org.may_communicate(outside, inside));
    }

    #[test]
    fn scoped_isolation_honours_allow_list() {
        let org = OrganizationHierarchy::new();
        let trading = Department::new("trading", IsolationPolicy::DepartmentScoped);
        let risk = Department::new("risk", IsolationPolicy::Open);
        let risk_id = risk.id();
        let trading = trading.with_allowed_peer(risk_id);
        let trading_id = org.add_department(trading).unwrap();
        org.add_department(risk).unwrap();
        let legal_id = org
            .add_department(Department::new("legal", IsolationPolicy::Open))
            .unwrap();

        let trader = EntityId::random();
        let analyst = EntityId::random();
        let lawyer = EntityId::random();
        org.assign_department(trader, trading_id).unwrap();
        org.assign_department(analyst, risk_id).unwrap();
        org.assign_department(lawyer, legal_id).unwrap();

        assert!(org.may_communicate(trader, analyst));
        assert!(!org.may_communicate(trader, lawyer));
    }

    #[test]
    fn escalation_targets_and_chain_both_count() {
        let org = OrganizationHierarchy::new();
        let dept = org
            .add_department(Department::new("ops", IsolationPolicy::Open))
            .unwrap();
        let worker = EntityId::random();
        let lead = EntityId::random();
        let auditor = EntityId::random();

        org.add_reporting_line(direct(worker, lead, dept)).unwrap();
        org.bind_role(
            worker,
            Role::builder("worker", PermissionTier::Operational)
                .escalation_target(auditor)
                .build(),
        );

        assert!(org.may_escalate_to(worker, lead));
        assert!(org.may_escalate_to(worker, auditor));
        assert!(!org.may_escalate_to(worker, EntityId::random()));
    }

    #[test]
    fn structure_check_reports_defects_without_raising() {
        let org = OrganizationHierarchy::new();
        let dept = org
            .add_department(Department::new("ops", IsolationPolicy::Open))
            .unwrap();
        let a = EntityId::random();
        let b = EntityId::random();

        // Manager without a role binding.
        org.add_reporting_line(direct(a, b, dept)).unwrap();
        // Role escalating to an unbound entity.
        org.bind_role(
            a,
            Role::builder("a", PermissionTier::Operational)
                .escalation_target(EntityId::random())
                .build(),
        );

        let defects = org.check_structure();
        assert_eq!(defects.len(), 2);
        assert!(defects.iter().any(|d| d.contains("no role binding")));
        assert!(defects.iter().any(|d| d.contains("unbound entity")));
    }

    #[test]
    fn rebinding_replaces_role() {
        let org = OrganizationHierarchy::new();
        let entity = EntityId::random();
        org.bind_role(entity, basic_role(PermissionTier::Team));
        org.bind_role(entity, basic_role(PermissionTier::Director));

        assert_eq!(
            org.role(entity).map(|role| role.tier()),
            Some(PermissionTier::Director)
        );
        assert!(org.remove_role(entity).is_some());
        assert!(org.role(entity).is_none());
    }

    #[test]
    fn duplicate_department_name_rejected() {
        let org = OrganizationHierarchy::new();
        org.add_department(Department::new("ops", IsolationPolicy::Open))
            .unwrap();
        let err = org
            .add_department(Department::new("ops", IsolationPolicy::Strict))
            .expect_err("duplicate name");
        assert!(matches!(err, HierarchyError::Validation { .. }));
    }

    #[test]
    fn department_spend_accumulates() {
        let org = OrganizationHierarchy::new();
        let dept = org
            .add_department(
                Department::new("ops", IsolationPolicy::Open)
                    .with_ceiling(ResourceCeiling::unbounded().with_budget_ceiling(500.0)),
            )
            .unwrap();

        org.register_department_spend(dept, 120.0).unwrap();
        org.register_department_spend(dept, 30.0).unwrap();
        let stored = org.department(dept).unwrap();
        assert!((stored.ceiling().budget_used() - 150.0).abs() < f64::EPSILON);

        assert!(org
            .register_department_spend(DepartmentId::random(), 1.0)
            .is_err());
    }
}
