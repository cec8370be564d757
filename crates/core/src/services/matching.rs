//! Buddy compatibility scoring.
//!
//! Pure functions over [`UserProfile`] snapshots; nothing here touches the
//! database.

use std::collections::BTreeSet;

use serde::Serialize;

/// Weight of the shared-interest sub-score.
pub const INTEREST_WEIGHT: f64 = 0.25;
/// Weight of the travel-style sub-score.
pub const TRAVEL_STYLE_WEIGHT: f64 = 0.20;
/// Weight of the language sub-score.
pub const LANGUAGE_WEIGHT: f64 = 0.15;
/// Weight of the nationality match.
pub const NATIONALITY_WEIGHT: f64 = 0.10;

/// Sum of all weights; `raw` is rescaled by this to reach 0..=100.
const WEIGHT_TOTAL: f64 =
    INTEREST_WEIGHT + TRAVEL_STYLE_WEIGHT + LANGUAGE_WEIGHT + NATIONALITY_WEIGHT;

const INTEREST_THRESHOLD: f64 = 0.3;
const TRAVEL_STYLE_THRESHOLD: f64 = 0.3;
const LANGUAGE_THRESHOLD: f64 = 0.5;

/// Immutable profile snapshot used for scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    pub nationality: Option<String>,
    pub interests: BTreeSet<String>,
    pub travel_styles: BTreeSet<String>,
    pub languages: BTreeSet<String>,
}

/// Why two users were considered a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    SharedInterests,
    SimilarTravelStyle,
    CommonLanguage,
    SameNationality,
}

/// Result of scoring two profiles.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchScore {
    /// Weighted sum of sub-scores, in `0.0..=0.70`.
    pub raw: f64,
    /// `raw` rescaled to `0..=100`.
    pub normalized: u8,
    pub reasons: Vec<MatchReason>,
}

/// Compatibility scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchScorer;

impl MatchScorer {
    /// Score `a` against `b`. The result is symmetric.
    #[must_use]
    pub fn score(a: &UserProfile, b: &UserProfile) -> MatchScore {
        let interests = overlap(&a.interests, &b.interests);
        let travel_styles = overlap(&a.travel_styles, &b.travel_styles);
        let languages = overlap(&a.languages, &b.languages);
        let nationality = match (&a.nationality, &b.nationality) {
            (Some(x), Some(y)) if x.eq_ignore_ascii_case(y) => 1.0,
            _ => 0.0,
        };

        let raw = interests * INTEREST_WEIGHT
            + travel_styles * TRAVEL_STYLE_WEIGHT
            + languages * LANGUAGE_WEIGHT
            + nationality * NATIONALITY_WEIGHT;

        let mut reasons = Vec::new();
        if interests > INTEREST_THRESHOLD {
            reasons.push(MatchReason::SharedInterests);
        }
        if travel_styles > TRAVEL_STYLE_THRESHOLD {
            reasons.push(MatchReason::SimilarTravelStyle);
        }
        if languages > LANGUAGE_THRESHOLD {
            reasons.push(MatchReason::CommonLanguage);
        }
        if nationality >= 1.0 {
            reasons.push(MatchReason::SameNationality);
        }

        MatchScore {
            raw,
            normalized: normalize(raw),
            reasons,
        }
    }
}

/// `|A ∩ B| / max(|A|, |B|)`; zero when either set is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / a.len().max(b.len()) as f64
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn normalize(raw: f64) -> u8 {
    let scaled = (raw * 100.0 / WEIGHT_TOTAL).round();
    scaled.clamp(0.0, 100.0) as u8
}
