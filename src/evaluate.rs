use crate::types::{AccessContext, EvalError, EvaluationMode, Expression, Verdict};

impl Expression {
    /// Evaluate this expression for the given context and mode.
    ///
    /// Composites evaluate both children unconditionally — runtime
    /// short-circuiting is deliberately absent, since check predicates may
    /// carry observable effects (auditing, marking) that must fire on every
    /// decision. All simplification happens at build time instead.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::CheckFailed`] as soon as any check predicate
    /// fails; the whole decision aborts rather than guessing a verdict.
    pub fn evaluate(
        &self,
        ctx: &AccessContext,
        mode: EvaluationMode,
    ) -> Result<Verdict, EvalError> {
        eval(self, ctx, mode)
    }
}

fn eval(
    expr: &Expression,
    ctx: &AccessContext,
    mode: EvaluationMode,
) -> Result<Verdict, EvalError> {
    match expr {
        Expression::Check(check) => {
            let ok = check
                .run(ctx, mode)
                .map_err(|source| EvalError::CheckFailed {
                    check: check.name().to_owned(),
                    source,
                })?;
            Ok(Verdict::from(ok))
        }
        Expression::And(left, right) => {
            let l = eval(left, ctx, mode)?;
            let r = eval(right, ctx, mode)?;
            Ok(l & r)
        }
        Expression::Or(left, right) => {
            let l = eval(left, ctx, mode)?;
            let r = eval(right, ctx, mode)?;
            Ok(l | r)
        }
        Expression::Not(inner) => Ok(!eval(inner, ctx, mode)?),
        Expression::AlwaysPass => Ok(Verdict::Pass),
        Expression::AlwaysFail => Ok(Verdict::Fail),
        // A surviving no-op marks a subtree the store already satisfied.
        Expression::NoOp => Ok(Verdict::Pass),
    }
}
