use crate::builder::fold_not;
use crate::types::{Check, Expression};

/// Dispatch abstraction over expression nodes.
///
/// Tree-wide inspection and rewrite passes implement this trait instead of
/// matching on [`Expression`] directly, so node types stay ignorant of the
/// passes that walk them. [`Expression::accept`] performs the dispatch;
/// each method receives the node itself plus its destructured parts.
pub trait ExpressionVisitor<'a> {
    type Output;

    fn visit_check(&mut self, expr: &'a Expression, check: &'a Check) -> Self::Output;
    fn visit_and(
        &mut self,
        expr: &'a Expression,
        left: &'a Expression,
        right: &'a Expression,
    ) -> Self::Output;
    fn visit_or(
        &mut self,
        expr: &'a Expression,
        left: &'a Expression,
        right: &'a Expression,
    ) -> Self::Output;
    fn visit_not(&mut self, expr: &'a Expression, inner: &'a Expression) -> Self::Output;
    fn visit_sentinel(&mut self, expr: &'a Expression) -> Self::Output;
}

impl Expression {
    /// Dispatch to the visitor method matching this node's kind.
    pub fn accept<'a, V: ExpressionVisitor<'a>>(&'a self, visitor: &mut V) -> V::Output {
        match self {
            Expression::Check(check) => visitor.visit_check(self, check.as_ref()),
            Expression::And(left, right) => visitor.visit_and(self, left, right),
            Expression::Or(left, right) => visitor.visit_or(self, left, right),
            Expression::Not(inner) => visitor.visit_not(self, inner),
            Expression::AlwaysPass | Expression::AlwaysFail | Expression::NoOp => {
                visitor.visit_sentinel(self)
            }
        }
    }
}

/// Flags every filter check reachable from a tree for in-memory
/// re-evaluation.
///
/// Run when the data store reports it could not fully honor the pushed-down
/// filters: the rows it returned are a superset, and each filter check's
/// fallback predicate must run per object after all.
///
/// The pass exists for its side effect on the checks. Its return value is
/// the visited node for leaves and composites, but for `Not` it is the
/// *inner* node's result — the wrapper is not reconstructed. Callers keep
/// evaluating the original tree, which is unchanged.
#[derive(Debug, Default)]
pub struct InMemoryMarkingVisitor;

impl InMemoryMarkingVisitor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Walk `expr`, marking every filter-check leaf.
    pub fn rewrite<'a>(&mut self, expr: &'a Expression) -> &'a Expression {
        expr.accept(self)
    }
}

impl<'a> ExpressionVisitor<'a> for InMemoryMarkingVisitor {
    type Output = &'a Expression;

    fn visit_check(&mut self, expr: &'a Expression, check: &'a Check) -> &'a Expression {
        check.mark_executed_in_memory();
        expr
    }

    fn visit_and(
        &mut self,
        expr: &'a Expression,
        left: &'a Expression,
        right: &'a Expression,
    ) -> &'a Expression {
        left.accept(self);
        right.accept(self);
        expr
    }

    fn visit_or(
        &mut self,
        expr: &'a Expression,
        left: &'a Expression,
        right: &'a Expression,
    ) -> &'a Expression {
        left.accept(self);
        right.accept(self);
        expr
    }

    fn visit_not(&mut self, _expr: &'a Expression, inner: &'a Expression) -> &'a Expression {
        // Wrapper dropped on purpose; only the leaf side effect matters.
        inner.accept(self)
    }

    fn visit_sentinel(&mut self, expr: &'a Expression) -> &'a Expression {
        expr
    }
}

/// Rewrites a tree into negation normal form.
///
/// `Not` nodes are pushed inward with De Morgan's laws until they sit
/// directly on leaves, and double negations cancel. Produces a new,
/// evaluation-equivalent tree; the input is untouched.
#[derive(Debug, Default)]
pub struct NormalizationVisitor;

impl NormalizationVisitor {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Produce the negation-normal-form equivalent of `expr`.
    #[must_use]
    pub fn normalize(&mut self, expr: &Expression) -> Expression {
        expr.accept(self)
    }

    fn negate(&mut self, expr: &Expression) -> Expression {
        match expr {
            Expression::And(left, right) => Expression::Or(
                Box::new(self.negate(left)),
                Box::new(self.negate(right)),
            ),
            Expression::Or(left, right) => Expression::And(
                Box::new(self.negate(left)),
                Box::new(self.negate(right)),
            ),
            Expression::Not(inner) => inner.accept(self),
            other => fold_not(other.clone()),
        }
    }
}

impl<'a> ExpressionVisitor<'a> for NormalizationVisitor {
    type Output = Expression;

    fn visit_check(&mut self, expr: &'a Expression, _check: &'a Check) -> Expression {
        expr.clone()
    }

    fn visit_and(
        &mut self,
        _expr: &'a Expression,
        left: &'a Expression,
        right: &'a Expression,
    ) -> Expression {
        Expression::And(Box::new(left.accept(self)), Box::new(right.accept(self)))
    }

    fn visit_or(
        &mut self,
        _expr: &'a Expression,
        left: &'a Expression,
        right: &'a Expression,
    ) -> Expression {
        Expression::Or(Box::new(left.accept(self)), Box::new(right.accept(self)))
    }

    fn visit_not(&mut self, _expr: &'a Expression, inner: &'a Expression) -> Expression {
        self.negate(inner)
    }

    fn visit_sentinel(&mut self, expr: &'a Expression) -> Expression {
        expr.clone()
    }
}
