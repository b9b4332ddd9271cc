use std::sync::Arc;

use crate::types::{Attributes, BuildError, CheckKind, CheckRegistry, Expression, RuleNode};

/// How the builder treats filter-expression checks it encounters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterPushdown {
    /// The data store already applied every filter check's predicate while
    /// producing the rows under decision, so filter leaves fold away.
    StoreApplied,
    /// No store filtering happened; filter checks stay in the tree and run
    /// their in-memory predicate per object.
    InMemory,
}

/// Builds a simplified [`Expression`] from a parsed rule.
///
/// Folding happens bottom-up as each child is built: sentinel operands
/// collapse their parent using boolean identity and absorption laws, and
/// user checks are evaluated once against the principal so whole branches
/// can disappear before any entity is touched.
///
/// # Example
///
/// ```
/// use gavel::{check, Attributes, Check, CheckRegistry, Expression, ExpressionBuilder};
///
/// let mut registry = CheckRegistry::new();
/// registry.register(Check::user("is_admin", |p| p.flag("admin"))).unwrap();
/// registry.register(Check::operation("is_owner", |_, _| Ok(false))).unwrap();
///
/// let admin = Attributes::new().with("admin", true);
/// let expr = ExpressionBuilder::new(&registry, &admin)
///     .build(&check("is_admin").or(check("is_owner")))
///     .unwrap();
/// assert!(matches!(expr, Expression::AlwaysPass));
/// ```
#[derive(Debug)]
pub struct ExpressionBuilder<'a> {
    registry: &'a CheckRegistry,
    principal: &'a Attributes,
    pushdown: FilterPushdown,
}

impl<'a> ExpressionBuilder<'a> {
    /// Create a builder. Filter checks default to
    /// [`FilterPushdown::StoreApplied`].
    #[must_use]
    pub fn new(registry: &'a CheckRegistry, principal: &'a Attributes) -> Self {
        Self {
            registry,
            principal,
            pushdown: FilterPushdown::StoreApplied,
        }
    }

    /// Override how filter checks are handled.
    #[must_use]
    pub fn with_pushdown(mut self, pushdown: FilterPushdown) -> Self {
        self.pushdown = pushdown;
        self
    }

    /// Build and fold the expression tree for `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnknownCheck`] if the rule references a name
    /// absent from the registry. The caller must treat this as a denial.
    pub fn build(&self, rule: &RuleNode) -> Result<Expression, BuildError> {
        match rule {
            RuleNode::Check(name) => self.leaf(name),
            RuleNode::And(left, right) => Ok(fold_and(self.build(left)?, self.build(right)?)),
            RuleNode::Or(left, right) => Ok(fold_or(self.build(left)?, self.build(right)?)),
            RuleNode::Not(inner) => Ok(fold_not(self.build(inner)?)),
        }
    }

    fn leaf(&self, name: &str) -> Result<Expression, BuildError> {
        let check = self
            .registry
            .resolve(name)
            .ok_or_else(|| BuildError::UnknownCheck {
                name: name.to_owned(),
            })?;

        // Identity checks fold immediately; their verdict cannot change per
        // object, and folding them lets AND/OR collapse whole branches.
        if let Some(ok) = check.run_user(self.principal) {
            return Ok(if ok {
                Expression::AlwaysPass
            } else {
                Expression::AlwaysFail
            });
        }

        Ok(match check.kind() {
            CheckKind::Filter => match self.pushdown {
                FilterPushdown::StoreApplied => Expression::NoOp,
                FilterPushdown::InMemory => Expression::Check(Arc::clone(check)),
            },
            _ => Expression::Check(Arc::clone(check)),
        })
    }
}

pub(crate) fn fold_not(inner: Expression) -> Expression {
    match inner {
        Expression::AlwaysPass => Expression::AlwaysFail,
        Expression::AlwaysFail => Expression::AlwaysPass,
        Expression::NoOp => Expression::NoOp,
        other => Expression::Not(Box::new(other)),
    }
}

pub(crate) fn fold_or(left: Expression, right: Expression) -> Expression {
    if matches!(left, Expression::NoOp | Expression::AlwaysPass) {
        return left;
    }
    if matches!(right, Expression::NoOp | Expression::AlwaysPass) {
        return right;
    }
    if matches!(left, Expression::AlwaysFail) {
        return right;
    }
    // An always-fail right operand is kept in place; the composite still
    // evaluates to the left operand's verdict.
    Expression::Or(Box::new(left), Box::new(right))
}

pub(crate) fn fold_and(left: Expression, right: Expression) -> Expression {
    if matches!(left, Expression::AlwaysFail) || matches!(right, Expression::AlwaysFail) {
        return Expression::AlwaysFail;
    }
    if matches!(left, Expression::NoOp | Expression::AlwaysPass) {
        return right;
    }
    if matches!(right, Expression::NoOp | Expression::AlwaysPass) {
        return left;
    }
    Expression::And(Box::new(left), Box::new(right))
}
