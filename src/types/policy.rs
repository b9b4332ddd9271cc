use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use crate::builder::{ExpressionBuilder, FilterPushdown};

use super::context::AccessContext;
use super::error::BuildError;
use super::expr::RuleNode;
use super::registry::CheckRegistry;
use super::report::DecisionReport;
use super::verdict::{EvaluationMode, Verdict};

/// A named permission rule.
#[derive(Debug, Clone)]
pub struct Permission {
    pub name: String,
    pub rule: RuleNode,
}

/// An immutable set of named permission rules.
///
/// Parsed from policy text or assembled programmatically. Thread-safe and
/// designed to live behind `Arc`; each decision builds a fresh expression
/// tree from the referenced rule.
///
/// # Example
///
/// ```
/// use gavel::{AccessContext, Attributes, Check, CheckRegistry, EvaluationMode, Policy, Verdict};
///
/// let policy = Policy::from_dsl("permit read: is_admin OR is_owner").unwrap();
///
/// let mut registry = CheckRegistry::new();
/// registry.register(Check::user("is_admin", |p| p.flag("admin"))).unwrap();
/// registry.register(Check::operation("is_owner", |ctx, _| {
///     Ok(ctx.entity().is_some_and(|e| e.get("owner") == ctx.principal().get("id")))
/// })).unwrap();
///
/// let ctx = AccessContext::for_entity(
///     Attributes::new().with("id", 7_i64).with("admin", true),
///     Attributes::new().with("owner", 9_i64),
/// );
/// let verdict = policy
///     .decide("read", &registry, &ctx, EvaluationMode::PerObject)
///     .unwrap();
/// assert_eq!(verdict, Verdict::Pass);
/// ```
#[derive(Debug, Clone)]
pub struct Policy {
    permissions: Vec<Permission>,
}

impl Policy {
    /// Build a policy from a list of permissions.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DuplicatePermission`] if two permissions share
    /// a name.
    pub fn from_permissions(permissions: Vec<Permission>) -> Result<Self, BuildError> {
        let mut seen = HashSet::new();
        for permission in &permissions {
            if !seen.insert(permission.name.as_str()) {
                return Err(BuildError::DuplicatePermission {
                    name: permission.name.clone(),
                });
            }
        }
        Ok(Self { permissions })
    }

    /// Parse policy text into a `Policy`.
    ///
    /// # Errors
    ///
    /// Returns [`GavelError`](crate::GavelError) on parse or validation
    /// failure.
    pub fn from_dsl(input: &str) -> Result<Self, crate::GavelError> {
        let parsed = crate::parse::parse(input)?;
        let policy = Self::from_permissions(parsed.permissions)?;
        Ok(policy)
    }

    /// Read a policy file and parse it.
    ///
    /// # Errors
    ///
    /// Returns [`GavelError`](crate::GavelError) on I/O, parse, or
    /// validation failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::GavelError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_dsl(&input)
    }

    /// Look up a permission's rule by name.
    #[must_use]
    pub fn permission(&self, name: &str) -> Option<&RuleNode> {
        self.permissions
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.rule)
    }

    /// The permission names, in declaration order.
    #[must_use]
    pub fn permission_names(&self) -> Vec<&str> {
        self.permissions.iter().map(|p| p.name.as_str()).collect()
    }

    /// The permissions, in declaration order.
    #[must_use]
    pub fn permissions(&self) -> &[Permission] {
        &self.permissions
    }

    /// The number of permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Whether the policy has no permissions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }

    /// Decide a named permission for the given context.
    ///
    /// This is the self-contained path with no data store involved: filter
    /// checks are kept as in-memory leaves, user checks fold at build time,
    /// and the folded tree is evaluated in the given mode. A rule that
    /// folds away entirely passes.
    ///
    /// # Errors
    ///
    /// Fails closed: an unknown permission or check name, or a failing
    /// check predicate, surfaces as an error and never as a permissive
    /// verdict.
    pub fn decide(
        &self,
        name: &str,
        registry: &CheckRegistry,
        ctx: &AccessContext,
        mode: EvaluationMode,
    ) -> Result<Verdict, crate::GavelError> {
        let rule = self
            .permission(name)
            .ok_or_else(|| BuildError::UnknownPermission {
                name: name.to_owned(),
            })?;
        let expr = ExpressionBuilder::new(registry, ctx.principal())
            .with_pushdown(FilterPushdown::InMemory)
            .build(rule)?;
        let verdict = expr.evaluate(ctx, mode)?;
        Ok(verdict)
    }

    /// Decide a named permission and report the folded expression and
    /// timing alongside the verdict.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`decide()`](Self::decide).
    pub fn decide_detailed(
        &self,
        name: &str,
        registry: &CheckRegistry,
        ctx: &AccessContext,
        mode: EvaluationMode,
    ) -> Result<DecisionReport, crate::GavelError> {
        let start = Instant::now();
        let rule = self
            .permission(name)
            .ok_or_else(|| BuildError::UnknownPermission {
                name: name.to_owned(),
            })?;
        let expr = ExpressionBuilder::new(registry, ctx.principal())
            .with_pushdown(FilterPushdown::InMemory)
            .build(rule)?;
        let verdict = expr.evaluate(ctx, mode)?;
        Ok(DecisionReport::new(
            verdict,
            expr.to_string(),
            start.elapsed(),
        ))
    }
}

#[cfg(feature = "policy-cache")]
impl Policy {
    /// Serialize this policy to a byte vector.
    ///
    /// The optional `source_text` is hashed (BLAKE3) and embedded in the
    /// payload metadata. Callers can use this to detect when the original
    /// policy text has changed and the cache should be rebuilt.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    pub fn to_bytes(
        &self,
        source_text: Option<&str>,
    ) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self, source_text)
    }

    /// Deserialize a policy from a byte slice previously produced by
    /// [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, or validation failure.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes)
    }

    /// Serialize this policy and write it to a file.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) on
    /// encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
        source_text: Option<&str>,
    ) -> Result<(), crate::serial::SerializeError> {
        let bytes = self.to_bytes(source_text)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a file and deserialize the policy it contains.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// I/O, format, integrity, or validation failure.
    pub fn from_binary_file(
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, crate::serial::DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Policy({} permissions)", self.permissions.len())
    }
}
