//! A small wired-up organization driven through the supervisory channel.
//!
//! Run with `cargo run --example supervisory_session`.

use std::sync::Arc;

use org_governance::access::{AccessControlEngine, AccessRule, Effect, Matcher};
use org_governance::approvals::{ApprovalKind, ApprovalWorkflow};
use org_governance::channel::{
    CollaboratorError, DirectiveDispatcher, DirectiveDraft, StaticRegistry, SupervisoryChannel,
    DIRECTIVE_ACTION,
};
use org_governance::hierarchy::{
    Department, IsolationPolicy, LinkKind, OrganizationHierarchy, ReportingLine, Role,
};
use org_governance::primitives::{EntityId, PermissionTier};
use serde_json::Map;

struct PrintingDispatcher;

impl DirectiveDispatcher for PrintingDispatcher {
    fn create(&self, draft: &DirectiveDraft) -> Result<String, CollaboratorError> {
        println!("  [dispatch] {} -> {}: {}", draft.from, draft.to, draft.title);
        Ok(format!("directive-{}", draft.to))
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let hierarchy = Arc::new(OrganizationHierarchy::new());
    let dept = hierarchy
        .add_department(Department::new("trading", IsolationPolicy::Open))
        .expect("fresh department");

    let chair = EntityId::random();
    let lead = EntityId::random();
    let desk = EntityId::random();
    hierarchy.bind_role(
        chair,
        Role::builder("chair", PermissionTier::Board)
            .issues_directives()
            .approves()
            .receives_reports()
            .build(),
    );
    hierarchy.bind_role(
        lead,
        Role::builder("desk-lead", PermissionTier::Team)
            .escalates()
            .receives_reports()
            .build(),
    );
    hierarchy.bind_role(
        desk,
        Role::builder("desk", PermissionTier::Operational).build(),
    );
    for entity in [chair, lead, desk] {
        hierarchy
            .assign_department(entity, dept)
            .expect("department exists");
    }
    hierarchy
        .add_reporting_line(ReportingLine::new(
            desk,
            lead,
            dept,
            LinkKind::Direct,
            chrono::DateTime::UNIX_EPOCH,
        ))
        .expect("first direct line");

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
        .expect("unique rule name");

    let approvals = Arc::new(ApprovalWorkflow::new());
    approvals.submit(
        ApprovalKind::Budget,
        "raise the desk's daily trading cap to 50k",
        lead,
        "desk-lead",
        Map::new(),
    );

    let channel = SupervisoryChannel::builder(chair, hierarchy, access, approvals)
        .registry(Arc::new(StaticRegistry::new().with("desk", desk)))
        .dispatcher(Arc::new(PrintingDispatcher))
        .build();

    for line in [
        "status?",
        "@desk: sluit alle open posities voor het weekend",
        "akkoord",
        "@finance: kwartaalrapport graag",
        "doe maar iets",
    ] {
        println!("> {line}");
        println!("{}\n", channel.process(line));
    }
}
