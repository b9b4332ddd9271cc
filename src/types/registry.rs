use std::collections::HashMap;
use std::sync::Arc;

use super::check::Check;
use super::error::BuildError;

/// Maps check names to shared check instances.
///
/// Rules reference checks by name; the builder resolves those references
/// here. Registered checks live behind `Arc` so expression trees from many
/// concurrent decisions can hold the same instance.
#[derive(Debug, Default)]
pub struct CheckRegistry {
    checks: HashMap<String, Arc<Check>>,
}

impl CheckRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a check under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::DuplicateCheck`] if a check with the same name
    /// is already registered.
    pub fn register(&mut self, check: Check) -> Result<(), BuildError> {
        let name = check.name().to_owned();
        if self.checks.contains_key(&name) {
            return Err(BuildError::DuplicateCheck { name });
        }
        self.checks.insert(name, Arc::new(check));
        Ok(())
    }

    /// Look up a check by name.
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<&Arc<Check>> {
        self.checks.get(name)
    }

    /// The number of registered checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Iterate over all registered checks.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Check>> {
        self.checks.values()
    }
}
