use std::fmt;
use std::ops::Not;
use std::sync::Arc;

use super::check::Check;

/// Parsed rule syntax tree: a boolean formula over named checks.
///
/// Produced by the policy parser or assembled programmatically with
/// [`check()`] and the [`and`](RuleNode::and)/[`or`](RuleNode::or)/`!`
/// combinators. Turned into an evaluable [`Expression`] by the
/// [`ExpressionBuilder`](crate::ExpressionBuilder).
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    /// A reference to a registered check, by name.
    Check(String),
    And(Box<RuleNode>, Box<RuleNode>),
    Or(Box<RuleNode>, Box<RuleNode>),
    Not(Box<RuleNode>),
}

impl RuleNode {
    #[must_use]
    pub fn and(self, other: RuleNode) -> RuleNode {
        RuleNode::And(Box::new(self), Box::new(other))
    }

    #[must_use]
    pub fn or(self, other: RuleNode) -> RuleNode {
        RuleNode::Or(Box::new(self), Box::new(other))
    }
}

impl Not for RuleNode {
    type Output = RuleNode;

    fn not(self) -> RuleNode {
        RuleNode::Not(Box::new(self))
    }
}

/// Reference a check by name.
#[must_use]
pub fn check(name: &str) -> RuleNode {
    RuleNode::Check(name.to_owned())
}

impl fmt::Display for RuleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleNode::Check(name) => write!(f, "{name}"),
            RuleNode::And(a, b) => write!(f, "({a} AND {b})"),
            RuleNode::Or(a, b) => write!(f, "({a} OR {b})"),
            RuleNode::Not(inner) => write!(f, "(NOT {inner})"),
        }
    }
}

/// A node in the built permission expression tree.
///
/// Structurally immutable: folding and rewriting produce new nodes rather
/// than mutating existing ones. Built once per decision and discarded after
/// the verdict; only the referenced [`Check`] instances outlive the tree.
///
/// The three sentinel variants exist for build-time folding. `AlwaysPass`
/// and `AlwaysFail` record an already-decided subtree; `NoOp` records a
/// subtree already satisfied elsewhere (by the store's filter pushdown) and
/// is folded away before the tree reaches evaluation.
#[derive(Debug, Clone)]
pub enum Expression {
    /// Leaf wrapping a deferred check.
    Check(Arc<Check>),
    And(Box<Expression>, Box<Expression>),
    Or(Box<Expression>, Box<Expression>),
    Not(Box<Expression>),
    AlwaysPass,
    AlwaysFail,
    NoOp,
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Check(c) => write!(f, "{}", c.name()),
            Expression::And(l, r) => write!(f, "({l} AND {r})"),
            Expression::Or(l, r) => write!(f, "({l} OR {r})"),
            Expression::Not(inner) => write!(f, "(NOT {inner})"),
            Expression::AlwaysPass => write!(f, "PASS"),
            Expression::AlwaysFail => write!(f, "FAIL"),
            Expression::NoOp => write!(f, "NOOP"),
        }
    }
}
