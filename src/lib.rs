mod builder;
mod error;
mod evaluate;
mod parse;
#[cfg(feature = "policy-cache")]
pub mod serial;
mod types;
mod visitor;

pub use builder::{ExpressionBuilder, FilterPushdown};
pub use error::GavelError;
pub use parse::{ParseError, ParsedPolicy};
pub use types::{
    AccessContext, Attributes, BuildError, Check, CheckFailure, CheckKind, CheckOutcome,
    CheckRegistry, DecisionReport, EvalError, EvaluationMode, Expression, Permission, Policy,
    RuleNode, Value, Verdict, check,
};
pub use visitor::{ExpressionVisitor, InMemoryMarkingVisitor, NormalizationVisitor};
