use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gavel::{
    check, AccessContext, Attributes, Check, CheckRegistry, EvaluationMode, Expression,
    ExpressionBuilder, FilterPushdown, InMemoryMarkingVisitor, RuleNode,
};

/// Build a registry with `n` operation checks plus a user check and a
/// filter check, and a rule that ANDs every operation check together.
fn wide_rule(n: usize) -> (CheckRegistry, RuleNode) {
    let mut registry = CheckRegistry::new();
    registry
        .register(Check::user("is_admin", |p| p.flag("admin")))
        .unwrap();
    registry
        .register(Check::filter("published", "published = true", |_, _| Ok(true)))
        .unwrap();
    for i in 0..n {
        registry
            .register(Check::operation(format!("c{i}"), |_, _| Ok(true)))
            .unwrap();
    }

    let mut rule = check("c0");
    for i in 1..n {
        rule = rule.and(check(&format!("c{i}")));
    }
    (registry, rule)
}

fn entity_ctx() -> AccessContext {
    AccessContext::for_entity(Attributes::new(), Attributes::new())
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    for n in [8, 64] {
        let (registry, rule) = wide_rule(n);
        let principal = Attributes::new();
        group.bench_function(format!("and_chain_{n}"), |b| {
            b.iter(|| {
                let builder = ExpressionBuilder::new(&registry, &principal);
                black_box(builder.build(black_box(&rule)).unwrap())
            });
        });
    }
    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    for n in [8, 64] {
        let (registry, rule) = wide_rule(n);
        let principal = Attributes::new();
        let expr = ExpressionBuilder::new(&registry, &principal)
            .build(&rule)
            .unwrap();
        let ctx = entity_ctx();
        group.bench_function(format!("and_chain_{n}"), |b| {
            b.iter(|| {
                black_box(
                    black_box(&expr)
                        .evaluate(&ctx, EvaluationMode::PerObject)
                        .unwrap(),
                )
            });
        });
    }
    group.finish();
}

fn bench_folded_constant(c: &mut Criterion) {
    // An admin principal folds the whole rule away at build time; this
    // measures the best case the eager user-check evaluation buys.
    let (registry, rule) = wide_rule(16);
    let rule = check("is_admin").or(rule);
    let admin = Attributes::new().with("admin", true);
    let ctx = AccessContext::for_collection(admin.clone());

    c.bench_function("build_and_evaluate_folded_constant", |b| {
        b.iter(|| {
            let expr = ExpressionBuilder::new(&registry, &admin)
                .build(black_box(&rule))
                .unwrap();
            debug_assert!(matches!(expr, Expression::AlwaysPass));
            black_box(expr.evaluate(&ctx, EvaluationMode::Prefetch).unwrap())
        });
    });
}

fn bench_marking(c: &mut Criterion) {
    let mut registry = CheckRegistry::new();
    for i in 0..32 {
        registry
            .register(Check::filter(
                format!("f{i}"),
                "flag = true",
                |_, _| Ok(true),
            ))
            .unwrap();
    }
    let mut rule = check("f0");
    for i in 1..32 {
        rule = rule.and(check(&format!("f{i}")));
    }
    let principal = Attributes::new();
    let expr = ExpressionBuilder::new(&registry, &principal)
        .with_pushdown(FilterPushdown::InMemory)
        .build(&rule)
        .unwrap();

    c.bench_function("mark_in_memory_32_leaves", |b| {
        b.iter(|| {
            InMemoryMarkingVisitor::new().rewrite(black_box(&expr));
        });
    });
}

criterion_group!(
    benches,
    bench_build,
    bench_evaluate,
    bench_folded_constant,
    bench_marking
);
criterion_main!(benches);
