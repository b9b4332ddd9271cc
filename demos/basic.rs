//! Parse a policy, register checks, and decide a few requests.
//!
//! Run with: `cargo run --example basic`

use gavel::{AccessContext, Attributes, Check, CheckRegistry, EvaluationMode, Policy};

fn main() -> Result<(), gavel::GavelError> {
    let policy = Policy::from_dsl(
        "\
# Article access policy.
permit read:  public OR is_admin OR is_owner
permit write: is_owner AND NOT suspended
",
    )?;

    let mut registry = CheckRegistry::new();
    registry.register(Check::user("is_admin", |p| p.flag("admin")))?;
    registry.register(Check::user("suspended", |p| p.flag("suspended")))?;
    registry.register(Check::operation("is_owner", |ctx, _| {
        Ok(ctx
            .entity()
            .is_some_and(|e| e.get("owner") == ctx.principal().get("name")))
    }))?;
    registry.register(Check::filter("public", "visibility = 'public'", |ctx, _| {
        Ok(ctx.entity().is_some_and(|e| e.flag("public")))
    }))?;

    let alice = Attributes::new().with("name", "alice");
    let article = Attributes::new().with("owner", "alice").with("public", false);
    let ctx = AccessContext::for_entity(alice, article);

    for permission in ["read", "write"] {
        let report =
            policy.decide_detailed(permission, &registry, &ctx, EvaluationMode::PerObject)?;
        println!(
            "{permission:>5}: {} (rule folded to {}, took {:?})",
            report.verdict(),
            report.expression(),
            report.duration()
        );
    }

    Ok(())
}
