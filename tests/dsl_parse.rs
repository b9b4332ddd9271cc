use gavel::{
    AccessContext, Attributes, BuildError, Check, CheckRegistry, EvaluationMode, GavelError,
    Policy, Verdict,
};

const POLICY_TEXT: &str = "\
# Article access policy.
permit read:   public OR is_admin OR is_owner
permit write:  is_owner AND NOT suspended
permit delete: is_admin
";

fn registry() -> CheckRegistry {
    let mut registry = CheckRegistry::new();
    registry
        .register(Check::user("is_admin", |p| p.flag("admin")))
        .unwrap();
    registry
        .register(Check::user("suspended", |p| p.flag("suspended")))
        .unwrap();
    registry
        .register(Check::operation("is_owner", |ctx, _| {
            Ok(ctx
                .entity()
                .is_some_and(|e| e.get("owner") == ctx.principal().get("name")))
        }))
        .unwrap();
    registry
        .register(Check::filter("public", "visibility = 'public'", |ctx, _| {
            Ok(ctx.entity().is_some_and(|e| e.flag("public")))
        }))
        .unwrap();
    registry
}

fn ctx(name: &str, owner: &str, public: bool) -> AccessContext {
    AccessContext::for_entity(
        Attributes::new().with("name", name),
        Attributes::new().with("owner", owner).with("public", public),
    )
}

#[test]
fn owner_can_read_and_write() {
    let policy = Policy::from_dsl(POLICY_TEXT).unwrap();
    let registry = registry();
    let ctx = ctx("alice", "alice", false);

    let read = policy
        .decide("read", &registry, &ctx, EvaluationMode::PerObject)
        .unwrap();
    let write = policy
        .decide("write", &registry, &ctx, EvaluationMode::PerObject)
        .unwrap();
    assert_eq!(read, Verdict::Pass);
    assert_eq!(write, Verdict::Pass);
}

#[test]
fn stranger_reads_public_articles_only() {
    let policy = Policy::from_dsl(POLICY_TEXT).unwrap();
    let registry = registry();

    let public = ctx("mallory", "alice", true);
    let private = ctx("mallory", "alice", false);

    assert_eq!(
        policy
            .decide("read", &registry, &public, EvaluationMode::PerObject)
            .unwrap(),
        Verdict::Pass
    );
    assert_eq!(
        policy
            .decide("read", &registry, &private, EvaluationMode::PerObject)
            .unwrap(),
        Verdict::Fail
    );
}

#[test]
fn suspended_owner_cannot_write() {
    let policy = Policy::from_dsl(POLICY_TEXT).unwrap();
    let registry = registry();

    let ctx = AccessContext::for_entity(
        Attributes::new().with("name", "alice").with("suspended", true),
        Attributes::new().with("owner", "alice"),
    );
    assert_eq!(
        policy
            .decide("write", &registry, &ctx, EvaluationMode::PerObject)
            .unwrap(),
        Verdict::Fail
    );
}

#[test]
fn admin_permission_needs_no_entity() {
    let policy = Policy::from_dsl(POLICY_TEXT).unwrap();
    let registry = registry();

    let ctx = AccessContext::for_collection(Attributes::new().with("admin", true));
    assert_eq!(
        policy
            .decide("delete", &registry, &ctx, EvaluationMode::Prefetch)
            .unwrap(),
        Verdict::Pass
    );
}

#[test]
fn unknown_permission_fails_closed() {
    let policy = Policy::from_dsl(POLICY_TEXT).unwrap();
    let registry = registry();
    let ctx = ctx("alice", "alice", false);

    let err = policy
        .decide("publish", &registry, &ctx, EvaluationMode::PerObject)
        .unwrap_err();
    assert!(matches!(
        err,
        GavelError::Build(BuildError::UnknownPermission { name }) if name == "publish"
    ));
}

#[test]
fn unknown_check_fails_closed() {
    let policy = Policy::from_dsl("permit read: no_such_check").unwrap();
    let registry = registry();
    let ctx = ctx("alice", "alice", false);

    let err = policy
        .decide("read", &registry, &ctx, EvaluationMode::PerObject)
        .unwrap_err();
    assert!(matches!(
        err,
        GavelError::Build(BuildError::UnknownCheck { .. })
    ));
}

#[test]
fn duplicate_permission_is_rejected_at_parse() {
    let result = Policy::from_dsl("permit read: a\npermit read: b");
    assert!(matches!(
        result,
        Err(GavelError::Build(BuildError::DuplicatePermission { name })) if name == "read"
    ));
}

#[test]
fn malformed_text_is_rejected() {
    assert!(matches!(
        Policy::from_dsl("permit read"),
        Err(GavelError::Parse(_))
    ));
    assert!(matches!(
        Policy::from_dsl("permit read: AND x"),
        Err(GavelError::Parse(_))
    ));
}

#[test]
fn detailed_report_shows_the_folded_rule() {
    let policy = Policy::from_dsl(POLICY_TEXT).unwrap();
    let registry = registry();

    // Admin principal: `delete` folds to a constant before evaluation.
    let admin_ctx = AccessContext::for_collection(Attributes::new().with("admin", true));
    let report = policy
        .decide_detailed("delete", &registry, &admin_ctx, EvaluationMode::Prefetch)
        .unwrap();

    assert_eq!(report.verdict(), Verdict::Pass);
    assert_eq!(report.expression(), "PASS");

    // Non-admin reading a private object: the deferred leaves survive, and
    // the failed admin arm stays behind as a right operand (only a failing
    // left arm is folded out of an OR).
    let ctx = ctx("mallory", "alice", false);
    let report = policy
        .decide_detailed("read", &registry, &ctx, EvaluationMode::PerObject)
        .unwrap();
    assert_eq!(report.verdict(), Verdict::Fail);
    assert_eq!(report.expression(), "((public OR FAIL) OR is_owner)");
}

#[test]
fn policy_loads_from_a_file() {
    let path = std::env::temp_dir().join("gavel_dsl_parse_policy.gavel");
    std::fs::write(&path, POLICY_TEXT).unwrap();

    let policy = Policy::from_file(&path).unwrap();
    assert_eq!(policy.permission_names(), vec!["read", "write", "delete"]);

    std::fs::remove_file(&path).ok();
}
