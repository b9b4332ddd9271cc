use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

/// The outcome of evaluating a permission expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Verdict {
    /// The caller may proceed.
    Pass,
    /// The caller is denied.
    Fail,
}

impl Verdict {
    #[must_use]
    pub fn is_pass(self) -> bool {
        self == Verdict::Pass
    }

    #[must_use]
    pub fn is_fail(self) -> bool {
        self == Verdict::Fail
    }
}

impl From<bool> for Verdict {
    fn from(ok: bool) -> Self {
        if ok {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

impl BitAnd for Verdict {
    type Output = Verdict;

    fn bitand(self, rhs: Verdict) -> Verdict {
        Verdict::from(self.is_pass() && rhs.is_pass())
    }
}

impl BitOr for Verdict {
    type Output = Verdict;

    fn bitor(self, rhs: Verdict) -> Verdict {
        Verdict::from(self.is_pass() || rhs.is_pass())
    }
}

impl Not for Verdict {
    type Output = Verdict;

    fn not(self) -> Verdict {
        match self {
            Verdict::Pass => Verdict::Fail,
            Verdict::Fail => Verdict::Pass,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "pass"),
            Verdict::Fail => write!(f, "fail"),
        }
    }
}

/// Distinguishes the fine-grained per-object decision from the coarse
/// collection-level decision taken before any row has been fetched.
///
/// Checks receive the mode and may answer differently in each: a predicate
/// that needs the target entity typically passes the prefetch stage and
/// defers the real test to the per-object stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationMode {
    /// Deciding for a single, fully materialized entity.
    PerObject,
    /// Deciding whether a whole collection query needs further filtering.
    Prefetch,
}
