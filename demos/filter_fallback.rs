//! Show the in-memory fallback path for filter checks.
//!
//! A store that could not honor a pushed-down filter returns a superset of
//! rows. The marking pass flags each filter check so the orchestration
//! layer knows to re-apply its predicate per row.
//!
//! Run with: `cargo run --example filter_fallback`

use gavel::{
    check, AccessContext, Attributes, Check, CheckRegistry, EvaluationMode, ExpressionBuilder,
    FilterPushdown, InMemoryMarkingVisitor,
};

fn main() -> Result<(), gavel::GavelError> {
    let mut registry = CheckRegistry::new();
    registry.register(Check::filter("published", "published = true", |ctx, _| {
        Ok(ctx.entity().is_some_and(|e| e.flag("published")))
    }))?;
    registry.register(Check::operation("is_owner", |ctx, _| {
        Ok(ctx
            .entity()
            .is_some_and(|e| e.get("owner") == ctx.principal().get("name")))
    }))?;

    let principal = Attributes::new().with("name", "alice");
    let rule = check("published").and(check("is_owner"));

    // The store reported it could not apply the `published` filter, so the
    // tree is built with in-memory filter leaves and every filter check
    // gets flagged for per-row re-evaluation.
    let expr = ExpressionBuilder::new(&registry, &principal)
        .with_pushdown(FilterPushdown::InMemory)
        .build(&rule)?;
    InMemoryMarkingVisitor::new().rewrite(&expr);

    let published = registry.resolve("published").expect("registered above");
    println!(
        "check '{}' (store filter: {:?}) re-checked in memory: {}",
        published.name(),
        published.filter_fragment().unwrap_or("-"),
        published.executed_in_memory()
    );

    // Rows come back from the store; the tree now decides each one.
    let rows = [
        ("draft note", false, "alice"),
        ("public post", true, "alice"),
        ("peer post", true, "bob"),
    ];
    for (title, published, owner) in rows {
        let ctx = AccessContext::for_entity(
            principal.clone(),
            Attributes::new()
                .with("published", published)
                .with("owner", owner),
        );
        let verdict = expr.evaluate(&ctx, EvaluationMode::PerObject)?;
        println!("{title:>12}: {verdict}");
    }

    Ok(())
}
