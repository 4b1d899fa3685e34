//! # Country & Locale Primitives
//!
//! The closed set of destination countries the engine has explicit rules
//! for, plus the catch-all [`CountryCode::Rest`]. Every `match` on
//! `CountryCode` must be exhaustive — adding a country forces every
//! consumer (normalizer, time-window check, timezone clustering) to handle
//! it at compile time.
//!
//! Each country carries three facts the pipeline needs:
//!
//! - the international dialing prefix, for resolving raw numbers to a
//!   country and for default-country normalization;
//! - whether the national format uses a trunk zero that must be stripped
//!   during canonicalization (`044…` → `+9144…`);
//! - a fixed UTC offset and the regulatory send window, for the compliance
//!   time-window check and timezone clustering.
//!
//! Offsets are fixed, not DST-aware: the send windows are wide enough
//! (9:00–21:00/22:00) that a one-hour DST shift stays inside regulatory
//! bounds, and fixed offsets keep window math deterministic.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// Destination countries with explicit normalization and send-window rules.
///
/// | Code | Country | Prefix | UTC offset | Send window |
/// |------|---------|--------|------------|-------------|
/// | IN | India | 91 | +05:30 | 09:00–21:00 |
/// | US | United States | 1 | −05:00 | 09:00–21:00 |
/// | GB | United Kingdom | 44 | +00:00 | 09:00–21:00 |
/// | AE | United Arab Emirates | 971 | +04:00 | 09:00–22:00 |
/// | DE | Germany | 49 | +01:00 | 09:00–21:00 |
/// | FR | France | 33 | +01:00 | 09:00–21:00 |
/// | BR | Brazil | 55 | −03:00 | 09:00–21:00 |
/// | ID | Indonesia | 62 | +07:00 | 09:00–21:00 |
/// | ZZ | Rest of world | — | +00:00 | 09:00–21:00 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CountryCode {
    /// India (TRAI-mandated 9 AM – 9 PM marketing window).
    In,
    /// United States.
    Us,
    /// United Kingdom.
    Gb,
    /// United Arab Emirates (9 AM – 10 PM window).
    Ae,
    /// Germany.
    De,
    /// France.
    Fr,
    /// Brazil.
    Br,
    /// Indonesia.
    Id,
    /// Any country without explicit rules. Conservative defaults apply.
    Zz,
}

impl CountryCode {
    /// All countries with explicit rules, in dialing-prefix match order
    /// (longest prefix first, so `971` wins over `9…` ambiguity).
    pub fn all() -> &'static [CountryCode] {
        &[
            Self::Ae,
            Self::In,
            Self::Gb,
            Self::De,
            Self::Fr,
            Self::Br,
            Self::Id,
            Self::Us,
            Self::Zz,
        ]
    }

    /// Resolve a country from canonical E.164 digits (no `+` prefix).
    ///
    /// Longest-prefix match over the known dialing prefixes; anything
    /// unmatched resolves to [`CountryCode::Zz`].
    pub fn from_e164_digits(digits: &str) -> CountryCode {
        // 3-digit prefixes before their 2-digit/1-digit ancestors.
        if digits.starts_with("971") {
            Self::Ae
        } else if digits.starts_with("91") {
            Self::In
        } else if digits.starts_with("44") {
            Self::Gb
        } else if digits.starts_with("49") {
            Self::De
        } else if digits.starts_with("33") {
            Self::Fr
        } else if digits.starts_with("55") {
            Self::Br
        } else if digits.starts_with("62") {
            Self::Id
        } else if digits.starts_with('1') {
            Self::Us
        } else {
            Self::Zz
        }
    }

    /// The international dialing prefix, without `+`.
    ///
    /// `None` for [`CountryCode::Zz`] — the catch-all cannot be used as a
    /// default country for prefix-less numbers.
    pub fn dialing_prefix(&self) -> Option<&'static str> {
        match self {
            Self::In => Some("91"),
            Self::Us => Some("1"),
            Self::Gb => Some("44"),
            Self::Ae => Some("971"),
            Self::De => Some("49"),
            Self::Fr => Some("33"),
            Self::Br => Some("55"),
            Self::Id => Some("62"),
            Self::Zz => None,
        }
    }

    /// Whether national-format numbers carry a trunk zero that must be
    /// stripped before prepending the dialing prefix.
    pub fn strips_trunk_zero(&self) -> bool {
        match self {
            Self::In | Self::Gb | Self::Ae | Self::De | Self::Fr | Self::Br | Self::Id => true,
            Self::Us | Self::Zz => false,
        }
    }

    /// Fixed UTC offset in minutes.
    pub fn utc_offset_minutes(&self) -> i32 {
        match self {
            Self::In => 330,
            Self::Us => -300,
            Self::Gb => 0,
            Self::Ae => 240,
            Self::De | Self::Fr => 60,
            Self::Br => -180,
            Self::Id => 420,
            Self::Zz => 0,
        }
    }

    /// The permitted marketing send window in recipient-local hours,
    /// as `(start_hour, end_hour)` with the end exclusive.
    pub fn send_window_hours(&self) -> (u32, u32) {
        match self {
            Self::Ae => (9, 22),
            _ => (9, 21),
        }
    }

    /// ISO 3166-1 alpha-2 code (uppercase), `ZZ` for the catch-all.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Us => "US",
            Self::Gb => "GB",
            Self::Ae => "AE",
            Self::De => "DE",
            Self::Fr => "FR",
            Self::Br => "BR",
            Self::Id => "ID",
            Self::Zz => "ZZ",
        }
    }
}

impl std::fmt::Display for CountryCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CountryCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(Self::In),
            "US" => Ok(Self::Us),
            "GB" => Ok(Self::Gb),
            "AE" => Ok(Self::Ae),
            "DE" => Ok(Self::De),
            "FR" => Ok(Self::Fr),
            "BR" => Ok(Self::Br),
            "ID" => Ok(Self::Id),
            "ZZ" => Ok(Self::Zz),
            other => Err(CoreError::UnknownValue(format!(
                "unknown country code: {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_resolution() {
        assert_eq!(CountryCode::from_e164_digits("919876543210"), CountryCode::In);
        assert_eq!(CountryCode::from_e164_digits("14155550123"), CountryCode::Us);
        assert_eq!(CountryCode::from_e164_digits("971501234567"), CountryCode::Ae);
        assert_eq!(CountryCode::from_e164_digits("447911123456"), CountryCode::Gb);
        assert_eq!(CountryCode::from_e164_digits("4915112345678"), CountryCode::De);
        assert_eq!(CountryCode::from_e164_digits("33612345678"), CountryCode::Fr);
        assert_eq!(CountryCode::from_e164_digits("5511912345678"), CountryCode::Br);
        assert_eq!(CountryCode::from_e164_digits("628123456789"), CountryCode::Id);
    }

    #[test]
    fn test_uae_prefix_beats_india() {
        // 971… must resolve to AE, never to IN via the leading 9.
        assert_eq!(CountryCode::from_e164_digits("971509876543"), CountryCode::Ae);
    }

    #[test]
    fn test_unknown_prefix_is_rest() {
        assert_eq!(CountryCode::from_e164_digits("81312345678"), CountryCode::Zz);
    }

    #[test]
    fn test_rest_has_no_dialing_prefix() {
        assert!(CountryCode::Zz.dialing_prefix().is_none());
        for c in CountryCode::all() {
            if *c != CountryCode::Zz {
                assert!(c.dialing_prefix().is_some());
            }
        }
    }

    #[test]
    fn test_send_windows() {
        assert_eq!(CountryCode::In.send_window_hours(), (9, 21));
        assert_eq!(CountryCode::Ae.send_window_hours(), (9, 22));
        assert_eq!(CountryCode::Zz.send_window_hours(), (9, 21));
    }

    #[test]
    fn test_as_str_roundtrip() {
        for c in CountryCode::all() {
            let parsed: CountryCode = c.as_str().parse().unwrap();
            assert_eq!(*c, parsed);
        }
    }

    #[test]
    fn test_from_str_invalid() {
        assert!("XX".parse::<CountryCode>().is_err());
        assert!("in".parse::<CountryCode>().is_err()); // case-sensitive
        assert!("".parse::<CountryCode>().is_err());
    }

    #[test]
    fn test_serde_format_matches_as_str() {
        for c in CountryCode::all() {
            let json = serde_json::to_string(c).unwrap();
            assert_eq!(json, format!("\"{}\"", c.as_str()));
        }
    }
}
