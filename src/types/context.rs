use std::collections::HashMap;

use super::Value;

/// A dot-path keyed attribute tree, used for both the caller principal and
/// the target entity.
///
/// Supports nested paths like `"profile.clearance"`.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    root: HashMap<String, Node>,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(Value),
    Branch(HashMap<String, Node>),
}

impl Attributes {
    /// Create an empty attribute set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value at a dot-separated path, consuming and returning `self`.
    /// Intermediate branches are created as needed.
    #[must_use]
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.insert(path, value.into());
        self
    }

    /// Insert a value at a dot-separated path.
    ///
    /// A leaf sitting in the middle of the path is replaced by a branch.
    pub fn insert(&mut self, path: &str, value: Value) {
        let mut segments = path.split('.').peekable();
        let mut map = &mut self.root;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                map.insert(segment.to_owned(), Node::Leaf(value));
                return;
            }
            let entry = map
                .entry(segment.to_owned())
                .or_insert_with(|| Node::Branch(HashMap::new()));
            if let Node::Leaf(_) = entry {
                *entry = Node::Branch(HashMap::new());
            }
            match entry {
                Node::Branch(branch) => map = branch,
                Node::Leaf(_) => unreachable!("leaf replaced by branch above"),
            }
        }
    }

    /// Look up a value by dot-separated path.
    /// Returns `None` if the path is absent or points at a branch.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.').peekable();
        let mut map = &self.root;
        while let Some(segment) = segments.next() {
            match map.get(segment)? {
                Node::Leaf(v) => {
                    return if segments.peek().is_none() {
                        Some(v)
                    } else {
                        None
                    };
                }
                Node::Branch(branch) => {
                    if segments.peek().is_none() {
                        return None;
                    }
                    map = branch;
                }
            }
        }
        None
    }

    /// Shorthand for `get(path).and_then(Value::as_bool).unwrap_or(false)`,
    /// the common shape of a boolean attribute test inside a predicate.
    #[must_use]
    pub fn flag(&self, path: &str) -> bool {
        self.get(path).and_then(Value::as_bool).unwrap_or(false)
    }
}

/// Evaluation context for one authorization decision: the caller principal
/// plus, for per-object decisions, the target entity's attributes.
#[derive(Debug, Clone)]
pub struct AccessContext {
    principal: Attributes,
    entity: Option<Attributes>,
}

impl AccessContext {
    /// Context for a per-object decision.
    #[must_use]
    pub fn for_entity(principal: Attributes, entity: Attributes) -> Self {
        Self {
            principal,
            entity: Some(entity),
        }
    }

    /// Context for a collection-level decision, where no single target
    /// entity exists yet.
    #[must_use]
    pub fn for_collection(principal: Attributes) -> Self {
        Self {
            principal,
            entity: None,
        }
    }

    /// The caller's identity attributes.
    #[must_use]
    pub fn principal(&self) -> &Attributes {
        &self.principal
    }

    /// The target entity's attributes, if this is a per-object decision.
    #[must_use]
    pub fn entity(&self) -> Option<&Attributes> {
        self.entity.as_ref()
    }
}
