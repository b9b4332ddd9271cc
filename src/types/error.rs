use thiserror::Error;

use super::check::CheckFailure;

/// Errors raised while turning a parsed rule into an expression tree.
///
/// Every build error aborts the authorization decision; an unresolved name
/// never degrades into a permissive verdict.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("rule references unknown check '{name}'")]
    UnknownCheck { name: String },

    #[error("duplicate check name '{name}'")]
    DuplicateCheck { name: String },

    #[error("no permission named '{name}' in this policy")]
    UnknownPermission { name: String },

    #[error("duplicate permission name '{name}'")]
    DuplicatePermission { name: String },
}

/// Errors raised while evaluating an expression tree.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("check '{check}' failed during evaluation: {source}")]
    CheckFailed { check: String, source: CheckFailure },
}
