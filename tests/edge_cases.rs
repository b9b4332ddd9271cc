use gavel::{
    check, AccessContext, Attributes, Check, CheckRegistry, EvalError, EvaluationMode, Expression,
    ExpressionBuilder, FilterPushdown, GavelError, Policy, RuleNode, Verdict,
};

#[test]
fn deeply_chained_and_rule() {
    let mut registry = CheckRegistry::new();
    for i in 0..26 {
        registry
            .register(Check::operation(format!("c{i}"), |_, _| Ok(true)))
            .unwrap();
    }

    let mut rule = check("c0");
    for i in 1..26 {
        rule = rule.and(check(&format!("c{i}")));
    }

    let principal = Attributes::new();
    let expr = ExpressionBuilder::new(&registry, &principal).build(&rule).unwrap();
    let ctx = AccessContext::for_entity(Attributes::new(), Attributes::new());
    assert_eq!(
        expr.evaluate(&ctx, EvaluationMode::PerObject).unwrap(),
        Verdict::Pass
    );
}

#[test]
fn wide_or_of_failing_user_checks_folds_to_fail() {
    let mut registry = CheckRegistry::new();
    for i in 0..16 {
        registry
            .register(Check::user(format!("u{i}"), |_| false))
            .unwrap();
    }

    let mut rule = check("u0");
    for i in 1..16 {
        rule = rule.or(check(&format!("u{i}")));
    }

    let principal = Attributes::new();
    let expr = ExpressionBuilder::new(&registry, &principal).build(&rule).unwrap();
    assert!(matches!(expr, Expression::AlwaysFail));

    let ctx = AccessContext::for_collection(Attributes::new());
    assert_eq!(
        expr.evaluate(&ctx, EvaluationMode::Prefetch).unwrap(),
        Verdict::Fail
    );
}

#[test]
fn predicate_error_surfaces_through_decide() {
    let mut registry = CheckRegistry::new();
    registry
        .register(Check::operation("broken", |_, _| {
            Err("lookup timed out".into())
        }))
        .unwrap();

    let policy = Policy::from_dsl("permit read: broken").unwrap();
    let ctx = AccessContext::for_entity(Attributes::new(), Attributes::new());

    let err = policy
        .decide("read", &registry, &ctx, EvaluationMode::PerObject)
        .unwrap_err();
    match err {
        GavelError::Eval(EvalError::CheckFailed { check, .. }) => assert_eq!(check, "broken"),
        other => panic!("expected a check failure, got {other:?}"),
    }
}

#[test]
fn same_check_reused_across_permissions() {
    let mut registry = CheckRegistry::new();
    registry
        .register(Check::operation("is_owner", |ctx, _| {
            Ok(ctx
                .entity()
                .is_some_and(|e| e.get("owner") == ctx.principal().get("name")))
        }))
        .unwrap();

    let policy =
        Policy::from_dsl("permit read: is_owner\npermit write: is_owner\npermit share: is_owner")
            .unwrap();

    let ctx = AccessContext::for_entity(
        Attributes::new().with("name", "alice"),
        Attributes::new().with("owner", "alice"),
    );
    for permission in ["read", "write", "share"] {
        assert_eq!(
            policy
                .decide(permission, &registry, &ctx, EvaluationMode::PerObject)
                .unwrap(),
            Verdict::Pass
        );
    }
}

#[test]
fn empty_policy_has_no_permissions() {
    let policy = Policy::from_dsl("# nothing here yet\n").unwrap();
    assert!(policy.is_empty());
    assert_eq!(policy.permission("read"), None);
}

#[test]
fn mode_aware_check_defers_to_the_per_object_stage() {
    let mut registry = CheckRegistry::new();
    registry
        .register(Check::operation("entity_gate", |ctx, mode| {
            Ok(match mode {
                // Nothing fetched yet: let the query proceed.
                EvaluationMode::Prefetch => true,
                EvaluationMode::PerObject => ctx.entity().is_some_and(|e| e.flag("open")),
            })
        }))
        .unwrap();

    let policy = Policy::from_dsl("permit read: entity_gate").unwrap();

    let coll = AccessContext::for_collection(Attributes::new());
    assert_eq!(
        policy
            .decide("read", &registry, &coll, EvaluationMode::Prefetch)
            .unwrap(),
        Verdict::Pass
    );

    let closed = AccessContext::for_entity(Attributes::new(), Attributes::new());
    assert_eq!(
        policy
            .decide("read", &registry, &closed, EvaluationMode::PerObject)
            .unwrap(),
        Verdict::Fail
    );
}

#[test]
fn evaluation_is_deterministic_across_repeats() {
    let mut registry = CheckRegistry::new();
    registry
        .register(Check::operation("is_owner", |ctx, _| {
            Ok(ctx
                .entity()
                .is_some_and(|e| e.get("owner") == ctx.principal().get("name")))
        }))
        .unwrap();
    registry
        .register(Check::filter("published", "published = true", |ctx, _| {
            Ok(ctx.entity().is_some_and(|e| e.flag("published")))
        }))
        .unwrap();

    let rule = check("published").and(!check("is_owner"));
    let ctx = AccessContext::for_entity(
        Attributes::new().with("name", "bob"),
        Attributes::new().with("owner", "alice").with("published", true),
    );

    let expr = ExpressionBuilder::new(&registry, ctx.principal())
        .with_pushdown(FilterPushdown::InMemory)
        .build(&rule)
        .unwrap();

    let first = expr.evaluate(&ctx, EvaluationMode::PerObject).unwrap();
    for _ in 0..5 {
        assert_eq!(
            expr.evaluate(&ctx, EvaluationMode::PerObject).unwrap(),
            first
        );
    }
    assert_eq!(first, Verdict::Pass);
}

#[test]
fn fresh_tree_per_decision_shares_check_instances() {
    let mut registry = CheckRegistry::new();
    registry
        .register(Check::filter("published", "published = true", |_, _| Ok(true)))
        .unwrap();

    let principal = Attributes::new();
    let builder =
        ExpressionBuilder::new(&registry, &principal).with_pushdown(FilterPushdown::InMemory);

    let rule: RuleNode = check("published");
    let first = builder.build(&rule).unwrap();
    let second = builder.build(&rule).unwrap();

    match (&first, &second) {
        (Expression::Check(a), Expression::Check(b)) => {
            assert!(std::sync::Arc::ptr_eq(a, b));
        }
        other => panic!("expected two check leaves, got {other:?}"),
    }
}
