use thiserror::Error;

use crate::parse::ParseError;
use crate::types::{BuildError, EvalError};

/// Unified error type covering parsing, building, evaluation, and I/O.
///
/// Returned by convenience methods like [`Policy::from_dsl()`](crate::Policy::from_dsl)
/// and [`Policy::decide()`](crate::Policy::decide).
#[derive(Debug, Error)]
pub enum GavelError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "policy-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "policy-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
