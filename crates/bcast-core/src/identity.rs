//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all domain identifiers in the broadcast stack.
//! These prevent accidental identifier confusion — you cannot pass a
//! `ContactId` where a `JobId` is expected.
//!
//! The one non-UUID identity is [`PhoneE164`]: the canonical phone key
//! shared by the dedup engine, the consent log, and the suppression lists.
//! A `PhoneE164` can only be constructed through [`PhoneE164::parse`] (or
//! the contact normalizer, which calls it), so holding one is proof the
//! number already passed canonicalization.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Unique identifier for a broadcast job (one campaign run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

/// Unique identifier for a processed contact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactId(pub Uuid);

/// Unique identifier for a message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub Uuid);

/// Unique identifier for a sending account (one gateway phone number).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub Uuid);

impl JobId {
    /// Generate a new random job identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl ContactId {
    /// Generate a new random contact identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl TemplateId {
    /// Generate a new random template identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AccountId {
    /// Generate a new random account identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ContactId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for TemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job:{}", self.0)
    }
}

impl std::fmt::Display for ContactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "contact:{}", self.0)
    }
}

impl std::fmt::Display for TemplateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "template:{}", self.0)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "account:{}", self.0)
    }
}

// ─── Canonical Phone Identity ────────────────────────────────────────

/// A phone number in canonical E.164 form: `+` followed by 8–15 digits.
///
/// This is the identity key for deduplication, consent lookups, and
/// suppression lookups. All three subsystems share one key type so a
/// number that opted out via keyword is the same value a later job's
/// compliance check queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneE164(String);

impl PhoneE164 {
    /// Minimum number of digits after the `+` sign.
    pub const MIN_DIGITS: usize = 8;
    /// Maximum number of digits after the `+` sign (ITU E.164 limit).
    pub const MAX_DIGITS: usize = 15;

    /// Parse a string already expected to be in canonical form.
    ///
    /// This is a strict shape check, not a normalizer: the input must be
    /// `+` followed by 8–15 digits, nothing else. Raw user input goes
    /// through the contact normalizer instead.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidPhone`] if the shape is wrong.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let digits = s
            .strip_prefix('+')
            .ok_or_else(|| CoreError::InvalidPhone(format!("missing + prefix: {s:?}")))?;
        if digits.len() < Self::MIN_DIGITS || digits.len() > Self::MAX_DIGITS {
            return Err(CoreError::InvalidPhone(format!(
                "expected {}-{} digits, got {}: {s:?}",
                Self::MIN_DIGITS,
                Self::MAX_DIGITS,
                digits.len()
            )));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidPhone(format!(
                "non-digit character in {s:?}"
            )));
        }
        Ok(Self(s.to_string()))
    }

    /// The full canonical string, including the `+` prefix.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digits after the `+` prefix.
    pub fn digits(&self) -> &str {
        &self.0[1..]
    }
}

impl std::fmt::Display for PhoneE164 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneE164 {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
