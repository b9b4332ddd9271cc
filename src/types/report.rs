use std::fmt;
use std::time::Duration;

use super::verdict::Verdict;

/// Detailed decision report returned by
/// [`Policy::decide_detailed()`](super::policy::Policy::decide_detailed).
///
/// Carries the verdict, a rendering of the folded expression that was
/// actually evaluated, and the wall-clock duration of build plus
/// evaluation.
#[derive(Debug, Clone)]
#[must_use]
pub struct DecisionReport {
    verdict: Verdict,
    expression: String,
    duration: Duration,
}

impl DecisionReport {
    pub(crate) fn new(verdict: Verdict, expression: String, duration: Duration) -> Self {
        Self {
            verdict,
            expression,
            duration,
        }
    }

    /// The decision verdict, same as [`Policy::decide()`](super::policy::Policy::decide).
    #[must_use]
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// The folded expression the verdict was computed from. Subtrees folded
    /// away at build time (eagerly evaluated user checks, store-satisfied
    /// filter checks) do not appear.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Wall-clock duration of building and evaluating the expression.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for DecisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "verdict: {}, expression: {}, duration: {:?}",
            self.verdict, self.expression, self.duration
        )
    }
}
