//! Binary serialization and deserialization of parsed policies.
//!
//! This module provides a stable binary format for persisting parsed
//! [`Policy`](crate::Policy) values, so policy text is parsed once and
//! reloaded cheaply. The format consists of a 32-byte fixed header followed
//! by a bincode-encoded payload.
//!
//! ## Wire Format
//!
//! ```text
//! Offset  Size  Field
//! 0       4     Magic bytes: b"GAVL"
//! 4       2     Format version (u16, little-endian)
//! 6       2     Engine version (u16, little-endian)
//! 8       4     Flags (u32, reserved)
//! 12      4     Payload length in bytes (u32, little-endian)
//! 16      16    BLAKE3 hash of the payload (truncated to 16 bytes)
//! 32..    var   Bincode-encoded payload
//! ```
//!
//! ## Versioning
//!
//! The format version in the header must match exactly. If it does not,
//! deserialization fails immediately with [`DeserializeError::IncompatibleVersion`].
//! The engine version is informational only.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Permission, Policy, RuleNode};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const MAGIC: &[u8; 4] = b"GAVL";
const FORMAT_VERSION: u16 = 1;
const ENGINE_VERSION: u16 = 1;
const HEADER_SIZE: usize = 32;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when serializing a [`Policy`](crate::Policy) to bytes.
#[derive(Debug, Error)]
pub enum SerializeError {
    #[error("failed to encode policy: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("I/O error during serialization: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur when deserializing a [`Policy`](crate::Policy) from bytes.
#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("not a gavel policy cache: invalid magic bytes")]
    BadMagic,

    #[error("incompatible format version: blob is v{blob}, engine supports v{supported}")]
    IncompatibleVersion { blob: u16, supported: u16 },

    #[error("integrity check failed: BLAKE3 checksum mismatch")]
    ChecksumMismatch,

    #[error("payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: u32, actual: usize },

    #[error("failed to decode payload: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("I/O error during deserialization: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Serialized type hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct SerializedPolicy {
    metadata: PolicyMetadata,
    permissions: Vec<SerializedPermission>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolicyMetadata {
    permission_count: usize,
    source_digest: Option<[u8; 32]>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializedPermission {
    name: String,
    rule: SerializedRule,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum SerializedRule {
    Check(String),
    And(Vec<SerializedRule>),
    Or(Vec<SerializedRule>),
    Not(Box<SerializedRule>),
}

// ---------------------------------------------------------------------------
// Rule flattening (binary -> n-ary)
// ---------------------------------------------------------------------------

fn flatten_rule(rule: &RuleNode) -> SerializedRule {
    match rule {
        RuleNode::And(_, _) => {
            let mut children = Vec::new();
            collect_and_children(rule, &mut children);
            SerializedRule::And(children)
        }
        RuleNode::Or(_, _) => {
            let mut children = Vec::new();
            collect_or_children(rule, &mut children);
            SerializedRule::Or(children)
        }
        RuleNode::Not(inner) => SerializedRule::Not(Box::new(flatten_rule(inner))),
        RuleNode::Check(name) => SerializedRule::Check(name.clone()),
    }
}

fn collect_and_children(rule: &RuleNode, out: &mut Vec<SerializedRule>) {
    match rule {
        RuleNode::And(left, right) => {
            collect_and_children(left, out);
            collect_and_children(right, out);
        }
        other => out.push(flatten_rule(other)),
    }
}

fn collect_or_children(rule: &RuleNode, out: &mut Vec<SerializedRule>) {
    match rule {
        RuleNode::Or(left, right) => {
            collect_or_children(left, out);
            collect_or_children(right, out);
        }
        other => out.push(flatten_rule(other)),
    }
}

// ---------------------------------------------------------------------------
// Rule unflattening (n-ary -> binary)
// ---------------------------------------------------------------------------

fn unflatten_rule(rule: SerializedRule) -> Result<RuleNode, DeserializeError> {
    match rule {
        SerializedRule::And(children) => {
            if children.len() == 1 {
                return unflatten_rule(children.into_iter().next().expect("length checked above"));
            }
            let mut iter = children.into_iter();
            let first = unflatten_rule(iter.next().expect("validated non-empty"))?;
            iter.try_fold(first, |acc, child| {
                Ok(RuleNode::And(
                    Box::new(acc),
                    Box::new(unflatten_rule(child)?),
                ))
            })
        }
        SerializedRule::Or(children) => {
            if children.len() == 1 {
                return unflatten_rule(children.into_iter().next().expect("length checked above"));
            }
            let mut iter = children.into_iter();
            let first = unflatten_rule(iter.next().expect("validated non-empty"))?;
            iter.try_fold(first, |acc, child| {
                Ok(RuleNode::Or(
                    Box::new(acc),
                    Box::new(unflatten_rule(child)?),
                ))
            })
        }
        SerializedRule::Not(inner) => Ok(RuleNode::Not(Box::new(unflatten_rule(*inner)?))),
        SerializedRule::Check(name) => Ok(RuleNode::Check(name)),
    }
}

// ---------------------------------------------------------------------------
// Policy <-> SerializedPolicy
// ---------------------------------------------------------------------------

fn policy_to_serialized(policy: &Policy, source_text: Option<&str>) -> SerializedPolicy {
    let source_digest = source_text.map(|s| *blake3::hash(s.as_bytes()).as_bytes());

    let permissions: Vec<SerializedPermission> = policy
        .permissions()
        .iter()
        .map(|p| SerializedPermission {
            name: p.name.clone(),
            rule: flatten_rule(&p.rule),
        })
        .collect();

    SerializedPolicy {
        metadata: PolicyMetadata {
            permission_count: permissions.len(),
            source_digest,
        },
        permissions,
    }
}

fn serialized_to_policy(ser: SerializedPolicy) -> Result<Policy, DeserializeError> {
    validate(&ser)?;

    let permissions: Vec<Permission> = ser
        .permissions
        .into_iter()
        .map(|sp| {
            let rule = unflatten_rule(sp.rule)?;
            Ok(Permission {
                name: sp.name,
                rule,
            })
        })
        .collect::<Result<Vec<_>, DeserializeError>>()?;

    Policy::from_permissions(permissions).map_err(|e| DeserializeError::Validation(e.to_string()))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(ser: &SerializedPolicy) -> Result<(), DeserializeError> {
    if ser.metadata.permission_count != ser.permissions.len() {
        return Err(DeserializeError::Validation(format!(
            "metadata says {} permissions but payload has {}",
            ser.metadata.permission_count,
            ser.permissions.len()
        )));
    }

    for permission in &ser.permissions {
        if permission.name.is_empty() {
            return Err(DeserializeError::Validation(
                "empty permission name".to_owned(),
            ));
        }
        validate_rule(&permission.rule, &permission.name)?;
    }

    Ok(())
}

fn validate_rule(rule: &SerializedRule, permission: &str) -> Result<(), DeserializeError> {
    match rule {
        SerializedRule::Check(name) => {
            if name.is_empty() {
                return Err(DeserializeError::Validation(format!(
                    "empty check name in permission '{permission}'"
                )));
            }
            Ok(())
        }
        SerializedRule::And(children) | SerializedRule::Or(children) => {
            if children.is_empty() {
                return Err(DeserializeError::Validation(format!(
                    "empty And/Or rule in permission '{permission}'"
                )));
            }
            for child in children {
                validate_rule(child, permission)?;
            }
            Ok(())
        }
        SerializedRule::Not(inner) => validate_rule(inner, permission),
    }
}

// ---------------------------------------------------------------------------
// Header I/O
// ---------------------------------------------------------------------------

fn write_header(buf: &mut Vec<u8>, payload: &[u8]) {
    let hash = blake3::hash(payload);
    let hash_bytes = hash.as_bytes();

    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    buf.extend_from_slice(&ENGINE_VERSION.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes()); // flags (reserved)
    #[allow(clippy::cast_possible_truncation)] // payload will never exceed 4 GiB
    let payload_len = payload.len() as u32;
    buf.extend_from_slice(&payload_len.to_le_bytes());
    buf.extend_from_slice(&hash_bytes[..16]);
}

#[allow(clippy::cast_possible_truncation)] // HEADER_SIZE is 32, always fits in u32
fn read_header(bytes: &[u8]) -> Result<(u16, u32, [u8; 16]), DeserializeError> {
    if bytes.len() < HEADER_SIZE {
        return Err(DeserializeError::LengthMismatch {
            expected: HEADER_SIZE as u32,
            actual: bytes.len(),
        });
    }

    if &bytes[0..4] != MAGIC {
        return Err(DeserializeError::BadMagic);
    }

    let format_version = u16::from_le_bytes([bytes[4], bytes[5]]);
    // bytes[6..8] is engine_version (informational, not used for checks)
    // bytes[8..12] is flags (reserved)
    let payload_len = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&bytes[16..32]);

    Ok((format_version, payload_len, hash))
}

// ---------------------------------------------------------------------------
// Public encode/decode
// ---------------------------------------------------------------------------

pub(crate) fn encode(policy: &Policy, source_text: Option<&str>) -> Result<Vec<u8>, SerializeError> {
    let serialized = policy_to_serialized(policy, source_text);
    let payload = bincode::serde::encode_to_vec(&serialized, bincode::config::standard())?;

    let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
    write_header(&mut buf, &payload);
    buf.extend_from_slice(&payload);
    Ok(buf)
}

pub(crate) fn decode(bytes: &[u8]) -> Result<Policy, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_start = HEADER_SIZE;
    let payload_end = payload_start + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[payload_start..payload_end];

    // Integrity check
    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedPolicy, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    serialized_to_policy(serialized)
}

/// Extract the source digest embedded in a serialized policy, if any.
///
/// Callers can compare this against the BLAKE3 hash of their current policy
/// text to decide whether the cache is stale and should be rebuilt.
///
/// # Errors
///
/// Returns [`DeserializeError`] on header, integrity, or decode failure.
pub fn source_digest(bytes: &[u8]) -> Result<Option<[u8; 32]>, DeserializeError> {
    let (format_version, payload_len, stored_hash) = read_header(bytes)?;

    if format_version != FORMAT_VERSION {
        return Err(DeserializeError::IncompatibleVersion {
            blob: format_version,
            supported: FORMAT_VERSION,
        });
    }

    let payload_start = HEADER_SIZE;
    let payload_end = payload_start + payload_len as usize;
    if bytes.len() < payload_end {
        return Err(DeserializeError::LengthMismatch {
            expected: payload_len,
            actual: bytes.len() - HEADER_SIZE,
        });
    }
    let payload = &bytes[payload_start..payload_end];

    let computed_hash = blake3::hash(payload);
    if computed_hash.as_bytes()[..16] != stored_hash {
        return Err(DeserializeError::ChecksumMismatch);
    }

    let (serialized, _): (SerializedPolicy, usize) =
        bincode::serde::decode_from_slice(payload, bincode::config::standard())?;

    Ok(serialized.metadata.source_digest)
}
