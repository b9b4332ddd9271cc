use crate::Permission;

/// The result of parsing policy text.
#[derive(Debug)]
pub struct ParsedPolicy {
    pub permissions: Vec<Permission>,
}
