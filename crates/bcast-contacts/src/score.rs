//! # Quality Scorer
//!
//! Assigns each validated contact a quality score in [0, 100], a
//! weighted sum of four components:
//!
//! | Component            | Weight |
//! |----------------------|--------|
//! | Phone validity       | 0.40   |
//! | Profile completeness | 0.25   |
//! | Interaction recency  | 0.20   |
//! | Engagement history   | 0.15   |
//!
//! The weighted sum is rounded half-up to the nearest integer. Scoring
//! runs after dedup; duplicates are skipped, their score stays 0.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::normalize::ProcessedContact;

// ─── Inputs ──────────────────────────────────────────────────────────

/// Historical engagement classification of a contact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementLevel {
    /// Replies or clicks on recent sends.
    Active,
    /// Receives and reads, never responds.
    Passive,
    /// No history yet.
    New,
    /// Known history of ignoring messages.
    Unresponsive,
    /// No engagement data at all.
    #[default]
    None,
}

impl EngagementLevel {
    /// Component value in [0, 100].
    fn component(&self) -> f64 {
        match self {
            Self::Active => 100.0,
            Self::Passive => 67.0,
            Self::New => 53.0,
            Self::Unresponsive | Self::None => 0.0,
        }
    }
}

/// Per-contact scoring inputs beyond what normalization produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    /// Whether the phone passed full validation. Always true for
    /// contacts emitted by the normalizer; carried explicitly so scores
    /// can be recomputed from stored inputs.
    pub phone_valid: bool,
    /// Fraction of profile fields populated, in [0, 1].
    pub completeness: f64,
    /// Days since the contact last interacted, if ever.
    pub days_since_last_interaction: Option<u32>,
    /// Engagement classification.
    pub engagement: EngagementLevel,
}

// ─── Scorer ──────────────────────────────────────────────────────────

const W_PHONE: f64 = 0.40;
const W_COMPLETENESS: f64 = 0.25;
const W_RECENCY: f64 = 0.20;
const W_ENGAGEMENT: f64 = 0.15;

/// The weighted quality scorer.
#[derive(Debug, Default)]
pub struct QualityScorer;

impl QualityScorer {
    /// Create a scorer.
    pub fn new() -> Self {
        Self
    }

    /// Compute the score for one set of inputs.
    pub fn score(&self, inputs: &ScoreInputs) -> u8 {
        let phone = if inputs.phone_valid { 100.0 } else { 0.0 };
        let completeness = inputs.completeness.clamp(0.0, 1.0) * 100.0;
        let recency = recency_component(inputs.days_since_last_interaction);
        let engagement = inputs.engagement.component();

        let weighted = W_PHONE * phone
            + W_COMPLETENESS * completeness
            + W_RECENCY * recency
            + W_ENGAGEMENT * engagement;
        weighted.round().clamp(0.0, 100.0) as u8
    }

    /// Score a batch in place, skipping duplicates.
    ///
    /// `inputs` is keyed by position and must align with `contacts`.
    pub fn score_batch(&self, contacts: &mut [ProcessedContact], inputs: &[ScoreInputs]) {
        debug_assert_eq!(contacts.len(), inputs.len());
        let mut scored = 0u32;
        for (contact, inp) in contacts.iter_mut().zip(inputs) {
            if contact.is_duplicate() {
                continue;
            }
            contact.quality_score = self.score(inp);
            scored += 1;
        }
        debug!(scored, "quality scoring complete");
    }

    /// Derive the scoring inputs the normalizer can see on its own:
    /// valid phone, completeness from name/email presence, no history.
    pub fn baseline_inputs(contact: &ProcessedContact) -> ScoreInputs {
        let populated = [contact.name.is_some(), contact.email.is_some()]
            .iter()
            .filter(|p| **p)
            .count() as f64;
        ScoreInputs {
            phone_valid: true,
            completeness: populated / 2.0,
            days_since_last_interaction: None,
            engagement: EngagementLevel::None,
        }
    }
}

/// Recency component from days since last interaction.
///
/// Never interacted scores the bottom band, same as stale history.
fn recency_component(days: Option<u32>) -> f64 {
    match days {
        Some(d) if d <= 30 => 100.0,
        Some(d) if d <= 90 => 75.0,
        Some(d) if d <= 180 => 50.0,
        _ => 25.0,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_perfect_contact_scores_100() {
        let inputs = ScoreInputs {
            phone_valid: true,
            completeness: 1.0,
            days_since_last_interaction: Some(3),
            engagement: EngagementLevel::Active,
        };
        assert_eq!(QualityScorer::new().score(&inputs), 100);
    }

    #[test]
    fn test_minimal_contact_scores_phone_and_stale_recency_only() {
        // Valid phone, nothing else: 0.40*100 + 0.20*25 = 45.
        let inputs = ScoreInputs {
            phone_valid: true,
            completeness: 0.0,
            days_since_last_interaction: None,
            engagement: EngagementLevel::None,
        };
        assert_eq!(QualityScorer::new().score(&inputs), 45);
    }

    #[test]
    fn test_recency_bands() {
        assert_eq!(recency_component(Some(0)), 100.0);
        assert_eq!(recency_component(Some(30)), 100.0);
        assert_eq!(recency_component(Some(31)), 75.0);
        assert_eq!(recency_component(Some(90)), 75.0);
        assert_eq!(recency_component(Some(91)), 50.0);
        assert_eq!(recency_component(Some(180)), 50.0);
        assert_eq!(recency_component(Some(181)), 25.0);
        assert_eq!(recency_component(None), 25.0);
    }

    #[test]
    fn test_engagement_components() {
        assert_eq!(EngagementLevel::Active.component(), 100.0);
        assert_eq!(EngagementLevel::Passive.component(), 67.0);
        assert_eq!(EngagementLevel::New.component(), 53.0);
        assert_eq!(EngagementLevel::Unresponsive.component(), 0.0);
        assert_eq!(EngagementLevel::None.component(), 0.0);
    }

    #[test]
    fn test_rounding_half_up() {
        // 0.40*100 + 0.25*50 + 0.20*75 + 0.15*53 = 40 + 12.5 + 15 + 7.95
        // = 75.45, rounds to 75.
        let inputs = ScoreInputs {
            phone_valid: true,
            completeness: 0.5,
            days_since_last_interaction: Some(60),
            engagement: EngagementLevel::New,
        };
        assert_eq!(QualityScorer::new().score(&inputs), 75);
    }

    #[test]
    fn test_completeness_clamped() {
        let inputs = ScoreInputs {
            phone_valid: false,
            completeness: 7.3,
            days_since_last_interaction: Some(400),
            engagement: EngagementLevel::None,
        };
        // 0.25*100 + 0.20*25 = 30.
        assert_eq!(QualityScorer::new().score(&inputs), 30);
    }

    #[test]
    fn test_batch_skips_duplicates() {
        use crate::dedup::DedupEngine;
        use crate::normalize::{Normalizer, RawContact};
        use std::collections::HashSet;

        let rows = vec![
            RawContact {
                phone: "+919876543210".to_string(),
                name: Some("Asha".to_string()),
                ..Default::default()
            },
            RawContact {
                phone: "+919876543210".to_string(),
                ..Default::default()
            },
        ];
        let mut contacts = Normalizer::default().normalize_batch(rows).contacts;
        DedupEngine::new().run(&mut contacts, &HashSet::new());

        let scorer = QualityScorer::new();
        let inputs: Vec<ScoreInputs> = contacts
            .iter()
            .map(QualityScorer::baseline_inputs)
            .collect();
        scorer.score_batch(&mut contacts, &inputs);

        assert!(contacts[0].quality_score > 0);
        assert_eq!(contacts[1].quality_score, 0);
    }

    #[test]
    fn test_baseline_inputs_count_profile_fields() {
        use crate::normalize::{Normalizer, RawContact};
        let rows = vec![RawContact {
            phone: "+919876543210".to_string(),
            name: Some("Asha".to_string()),
            email: None,
            ..Default::default()
        }];
        let contacts = Normalizer::default().normalize_batch(rows).contacts;
        let inputs = QualityScorer::baseline_inputs(&contacts[0]);
        assert!(inputs.phone_valid);
        assert_eq!(inputs.completeness, 0.5);
    }

    proptest! {
        /// Scores always land in [0, 100] and match the closed-form
        /// weighted sum.
        #[test]
        fn prop_score_in_range_and_matches_formula(
            phone_valid in any::<bool>(),
            completeness in 0.0f64..=1.0,
            days in proptest::option::of(0u32..1000),
            engagement_idx in 0usize..5,
        ) {
            let engagement = [
                EngagementLevel::Active,
                EngagementLevel::Passive,
                EngagementLevel::New,
                EngagementLevel::Unresponsive,
                EngagementLevel::None,
            ][engagement_idx];
            let inputs = ScoreInputs {
                phone_valid,
                completeness,
                days_since_last_interaction: days,
                engagement,
            };
            let score = QualityScorer::new().score(&inputs);
            prop_assert!(score <= 100);

            let expected = (0.40 * if phone_valid { 100.0 } else { 0.0 }
                + 0.25 * completeness * 100.0
                + 0.20 * super::recency_component(days)
                + 0.15 * engagement.component())
                .round() as u8;
            prop_assert_eq!(score, expected);
        }
    }
}
