use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use super::context::{AccessContext, Attributes};
use super::verdict::EvaluationMode;

/// Error surfaced by a failing check predicate. Evaluation aborts and the
/// error reaches the caller; a failing predicate never silently denies.
pub type CheckFailure = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of running a check predicate.
pub type CheckOutcome = Result<bool, CheckFailure>;

type UserPredicate = dyn Fn(&Attributes) -> bool + Send + Sync;
type ObjectPredicate = dyn Fn(&AccessContext, EvaluationMode) -> CheckOutcome + Send + Sync;

/// The three check categories, which differ in evaluation timing.
///
/// `User` checks run once at build time against the principal alone.
/// `Operation` checks run at evaluation time with the full context.
/// `Filter` checks are normally pushed down to the data store and only run
/// in memory as a fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    User,
    Operation,
    Filter,
}

/// A named, reusable authorization predicate.
///
/// Checks are registered once in a [`CheckRegistry`](super::CheckRegistry)
/// and referenced by name from policy rules. A check instance is commonly
/// shared across concurrent decisions behind `Arc`.
pub struct Check {
    name: String,
    body: Body,
}

enum Body {
    User(Box<UserPredicate>),
    Operation(Box<ObjectPredicate>),
    Filter {
        fragment: String,
        predicate: Box<ObjectPredicate>,
        executed_in_memory: AtomicBool,
    },
}

impl Check {
    /// An identity-only check, decidable from the principal's attributes
    /// without a target entity. Evaluated eagerly while the expression tree
    /// is built, so the predicate must be cheap and stateless.
    pub fn user(
        name: impl Into<String>,
        predicate: impl Fn(&Attributes) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            body: Body::User(Box::new(predicate)),
        }
    }

    /// A per-object check, deferred to evaluation time.
    pub fn operation(
        name: impl Into<String>,
        predicate: impl Fn(&AccessContext, EvaluationMode) -> CheckOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            body: Body::Operation(Box::new(predicate)),
        }
    }

    /// A store-pushable check. `fragment` is the store-native filter text
    /// handed to the query layer; `predicate` is the in-memory fallback used
    /// when the store could not honor the pushdown.
    pub fn filter(
        name: impl Into<String>,
        fragment: impl Into<String>,
        predicate: impl Fn(&AccessContext, EvaluationMode) -> CheckOutcome + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            body: Body::Filter {
                fragment: fragment.into(),
                predicate: Box::new(predicate),
                executed_in_memory: AtomicBool::new(false),
            },
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> CheckKind {
        match self.body {
            Body::User(_) => CheckKind::User,
            Body::Operation(_) => CheckKind::Operation,
            Body::Filter { .. } => CheckKind::Filter,
        }
    }

    /// The store-native filter text, for filter checks only.
    #[must_use]
    pub fn filter_fragment(&self) -> Option<&str> {
        match &self.body {
            Body::Filter { fragment, .. } => Some(fragment.as_str()),
            _ => None,
        }
    }

    /// Whether this filter check has been flagged for in-memory
    /// re-evaluation. Always `false` for non-filter checks.
    ///
    /// The flag is monotonic: once set it stays set for the lifetime of the
    /// check instance. A check shared across concurrent decisions may
    /// therefore carry a mark from another request; register a fresh
    /// [`CheckRegistry`](super::CheckRegistry) per request when that
    /// isolation matters.
    #[must_use]
    pub fn executed_in_memory(&self) -> bool {
        match &self.body {
            Body::Filter {
                executed_in_memory, ..
            } => executed_in_memory.load(Ordering::Relaxed),
            _ => false,
        }
    }

    /// Flag a filter check for in-memory re-evaluation. No-op for other
    /// kinds. Idempotent; safe to race from concurrent markers.
    pub(crate) fn mark_executed_in_memory(&self) {
        if let Body::Filter {
            executed_in_memory, ..
        } = &self.body
        {
            executed_in_memory.store(true, Ordering::Relaxed);
        }
    }

    /// Run the identity predicate against the principal. `None` unless this
    /// is a user check.
    pub(crate) fn run_user(&self, principal: &Attributes) -> Option<bool> {
        match &self.body {
            Body::User(predicate) => Some(predicate(principal)),
            _ => None,
        }
    }

    /// Run the check with the full context, regardless of kind. User checks
    /// fall back to their identity predicate.
    pub(crate) fn run(&self, ctx: &AccessContext, mode: EvaluationMode) -> CheckOutcome {
        match &self.body {
            Body::User(predicate) => Ok(predicate(ctx.principal())),
            Body::Operation(predicate) => predicate(ctx, mode),
            Body::Filter { predicate, .. } => predicate(ctx, mode),
        }
    }
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}
