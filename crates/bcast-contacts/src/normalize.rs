//! # Contact Normalizer
//!
//! Parses raw contact records and normalizes phone numbers to canonical
//! E.164. Accepted input shapes, in resolution order:
//!
//! 1. `+<country><subscriber>` — already international.
//! 2. `00<country><subscriber>` — international with the 00 exit code.
//! 3. National format — resolved against the contact's country hint, or
//!    the batch's configured default country (India in the original
//!    deployment), stripping the trunk zero where the country uses one.
//!
//! Formatting characters (spaces, dashes, dots, parentheses) are stripped
//! before resolution. Anything that still fails the E.164 shape check is
//! rejected as a [`ValidationError`] and reported in the batch summary —
//! a malformed row never fails the job.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

use bcast_core::{ContactId, CountryCode, PhoneE164};

use crate::dedup::DuplicateMark;

// ─── Input / Output Records ──────────────────────────────────────────

/// A raw contact row as uploaded, before any validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawContact {
    /// Phone number in whatever format the upload used.
    pub phone: String,
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Optional country hint for national-format numbers.
    pub country_hint: Option<CountryCode>,
    /// Arbitrary extra columns from the upload.
    pub custom_fields: BTreeMap<String, String>,
    /// Row number in the source file, for traceability.
    pub source_row: Option<u32>,
}

/// A contact that passed normalization.
///
/// Immutable once scored, except for the duplicate mark set by the
/// cross-campaign dedup stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedContact {
    /// Unique contact identifier within this job.
    pub id: ContactId,
    /// Canonical phone identity — the dedup/consent/suppression key.
    pub phone: PhoneE164,
    /// The phone exactly as uploaded (trimmed), kept for the exact-match
    /// dedup stage and traceability.
    pub source_phone: String,
    /// Display name.
    pub name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Resolved country.
    pub country: CountryCode,
    /// Quality score in [0, 100]; 0 until the scorer runs.
    pub quality_score: u8,
    /// Arbitrary extra columns from the upload.
    pub custom_fields: BTreeMap<String, String>,
    /// Row number in the source file.
    pub source_row: Option<u32>,
    /// Set if a dedup stage marked this contact a duplicate.
    pub duplicate: Option<DuplicateMark>,
}

impl ProcessedContact {
    /// Whether a dedup stage marked this contact a duplicate.
    pub fn is_duplicate(&self) -> bool {
        self.duplicate.is_some()
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// A per-row validation failure. Collected, reported, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("row {source_row:?}: {reason}: {raw:?}")]
pub struct ValidationError {
    /// Row number in the source file, if known.
    pub source_row: Option<u32>,
    /// The offending raw phone value.
    pub raw: String,
    /// Why the row was rejected.
    pub reason: String,
}

// ─── Batch Output ────────────────────────────────────────────────────

/// Counts summarizing one normalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Rows in the input batch.
    pub total: u32,
    /// Rows that normalized successfully.
    pub valid: u32,
    /// Rows rejected as malformed.
    pub invalid: u32,
}

/// The output of a normalization run: validated contacts in input order,
/// plus the rejects.
#[derive(Debug, Clone)]
pub struct NormalizedBatch {
    /// Contacts that passed, in input order.
    pub contacts: Vec<ProcessedContact>,
    /// Per-row rejects.
    pub errors: Vec<ValidationError>,
    /// Aggregate counts.
    pub summary: BatchSummary,
}

// ─── Normalizer ──────────────────────────────────────────────────────

/// The contact normalizer.
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Country applied to national-format numbers without a hint.
    default_country: CountryCode,
}

impl Normalizer {
    /// Create a normalizer with the given default country for
    /// national-format numbers.
    ///
    /// The default country must have a dialing prefix;
    /// [`CountryCode::Zz`] is rejected by falling back to India, the
    /// original deployment's default.
    pub fn new(default_country: CountryCode) -> Self {
        let default_country = if default_country.dialing_prefix().is_none() {
            CountryCode::In
        } else {
            default_country
        };
        Self { default_country }
    }

    /// Normalize a whole batch, preserving input order.
    pub fn normalize_batch(&self, rows: Vec<RawContact>) -> NormalizedBatch {
        let total = rows.len() as u32;
        let mut contacts = Vec::new();
        let mut errors = Vec::new();

        for row in rows {
            match self.normalize_row(&row) {
                Ok((phone, country)) => contacts.push(ProcessedContact {
                    id: ContactId::new(),
                    phone,
                    source_phone: row.phone.trim().to_string(),
                    name: row.name,
                    email: row.email,
                    country,
                    quality_score: 0,
                    custom_fields: row.custom_fields,
                    source_row: row.source_row,
                    duplicate: None,
                }),
                Err(e) => errors.push(e),
            }
        }

        let summary = BatchSummary {
            total,
            valid: contacts.len() as u32,
            invalid: errors.len() as u32,
        };
        debug!(
            total = summary.total,
            valid = summary.valid,
            invalid = summary.invalid,
            "contact batch normalized"
        );
        NormalizedBatch {
            contacts,
            errors,
            summary,
        }
    }

    /// Normalize a single row to its canonical identity and country.
    fn normalize_row(&self, row: &RawContact) -> Result<(PhoneE164, CountryCode), ValidationError> {
        let trimmed = row.phone.trim();
        if trimmed.is_empty() {
            return Err(self.reject(row, "empty phone"));
        }

        let stripped = strip_formatting(trimmed);
        if stripped.is_empty() {
            return Err(self.reject(row, "no digits"));
        }
        if let Some(bad) = stripped
            .chars()
            .find(|c| !c.is_ascii_digit() && *c != '+')
        {
            return Err(self.reject(row, &format!("unexpected character {bad:?}")));
        }

        let digits = if let Some(rest) = stripped.strip_prefix('+') {
            rest.to_string()
        } else if let Some(rest) = stripped.strip_prefix("00") {
            rest.to_string()
        } else {
            // National format: resolve against the hint or default country.
            let country = row.country_hint.unwrap_or(self.default_country);
            let prefix = match country.dialing_prefix() {
                Some(p) => p,
                None => return Err(self.reject(row, "no dialing prefix for country hint")),
            };
            let national = if country.strips_trunk_zero() {
                stripped.strip_prefix('0').unwrap_or(&stripped)
            } else {
                &stripped
            };
            format!("{prefix}{national}")
        };

        let candidate = format!("+{digits}");
        let phone = PhoneE164::parse(&candidate)
            .map_err(|e| self.reject(row, &e.to_string()))?;
        let country = CountryCode::from_e164_digits(phone.digits());
        Ok((phone, country))
    }

    fn reject(&self, row: &RawContact, reason: &str) -> ValidationError {
        ValidationError {
            source_row: row.source_row,
            raw: row.phone.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(CountryCode::In)
    }
}

/// Strip formatting characters commonly found in uploaded numbers.
fn strip_formatting(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')' | '\t'))
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────
