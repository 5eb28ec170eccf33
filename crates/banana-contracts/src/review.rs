use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const CRITERION_MAX: f64 = 2.0;
pub const SCORE_MAX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    TechnicalAccuracy,
    ClarityReadability,
    LabelQuality,
    LayoutComposition,
    ProfessionalAppearance,
}

pub const CRITERIA: [Criterion; 5] = [
    Criterion::TechnicalAccuracy,
    Criterion::ClarityReadability,
    Criterion::LabelQuality,
    Criterion::LayoutComposition,
    Criterion::ProfessionalAppearance,
];

impl Criterion {
    pub fn key(self) -> &'static str {
        match self {
            Criterion::TechnicalAccuracy => "technical_accuracy",
            Criterion::ClarityReadability => "clarity_readability",
            Criterion::LabelQuality => "label_quality",
            Criterion::LayoutComposition => "layout_composition",
            Criterion::ProfessionalAppearance => "professional_appearance",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Criterion::TechnicalAccuracy => "Technical Accuracy",
            Criterion::ClarityReadability => "Clarity and Readability",
            Criterion::LabelQuality => "Label Quality",
            Criterion::LayoutComposition => "Layout and Composition",
            Criterion::ProfessionalAppearance => "Professional Appearance",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Criterion::TechnicalAccuracy => "Correct representation of concepts",
            Criterion::ClarityReadability => "Easy to understand at a glance",
            Criterion::LabelQuality => "All elements labeled, readable fonts",
            Criterion::LayoutComposition => "Logical flow, balanced space",
            Criterion::ProfessionalAppearance => "Publication-ready quality",
        }
    }

    /// Line tag the reviewer is asked to emit, e.g. `TECHNICAL_ACCURACY`.
    pub fn tag(self) -> String {
        self.key().to_ascii_uppercase()
    }

    fn label_pattern(self) -> &'static str {
        match self {
            Criterion::TechnicalAccuracy => r"technical[ _\-]*accuracy",
            Criterion::ClarityReadability => r"clarity[ _\-]*(?:and|&)?[ _\-]*readability",
            Criterion::LabelQuality => r"label[ _\-]*quality",
            Criterion::LayoutComposition => r"layout[ _\-]*(?:and|&)?[ _\-]*composition",
            Criterion::ProfessionalAppearance => r"professional[ _\-]*appearance",
        }
    }
}

/// Per-criterion sub-scores, each in `[0.0, 2.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CriterionScores {
    pub technical_accuracy: f64,
    pub clarity_readability: f64,
    pub label_quality: f64,
    pub layout_composition: f64,
    pub professional_appearance: f64,
}

impl CriterionScores {
    pub fn from_array(values: [f64; 5]) -> Self {
        let [a, b, c, d, e] = values.map(|value| clamp_round(value, CRITERION_MAX));
        Self {
            technical_accuracy: a,
            clarity_readability: b,
            label_quality: c,
            layout_composition: d,
            professional_appearance: e,
        }
    }

    pub fn to_array(&self) -> [f64; 5] {
        [
            self.technical_accuracy,
            self.clarity_readability,
            self.label_quality,
            self.layout_composition,
            self.professional_appearance,
        ]
    }

    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::TechnicalAccuracy => self.technical_accuracy,
            Criterion::ClarityReadability => self.clarity_readability,
            Criterion::LabelQuality => self.label_quality,
            Criterion::LayoutComposition => self.layout_composition,
            Criterion::ProfessionalAppearance => self.professional_appearance,
        }
    }

    pub fn total(&self) -> f64 {
        round_tenth(self.to_array().iter().sum())
    }

    /// Spreads a total evenly over the five criteria.
    fn spread(total: f64) -> Self {
        let share = clamp_round(total, SCORE_MAX) / CRITERIA.len() as f64;
        Self {
            technical_accuracy: share,
            clarity_readability: share,
            label_quality: share,
            layout_composition: share,
            professional_appearance: share,
        }
    }
}

/// Outcome of one review call, derived from an iteration's critique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewResult {
    pub score: f64,
    pub criterion_scores: CriterionScores,
    pub critique: String,
    #[serde(default)]
    pub review_failed: bool,
}

impl ReviewResult {
    /// Zero-score result kept when the review call itself fails, so the
    /// generated image is still recorded.
    pub fn failed(reason: &str) -> Self {
        Self {
            score: 0.0,
            criterion_scores: CriterionScores::default(),
            critique: format!(
                "Review failed: {}. The image was kept with a score of 0.",
                reason.trim()
            ),
            review_failed: true,
        }
    }

    pub fn meets(&self, threshold: f64) -> bool {
        self.score >= threshold
    }
}

/// Parses reviewer text into a score and sub-scores.
///
/// All five criterion lines win over the `SCORE:` line and the total is
/// recomputed from them. With only a total, it is spread evenly across the
/// criteria. Returns `None` when neither is present.
pub fn parse_review(text: &str) -> Option<ReviewResult> {
    let critique = text.trim();
    if critique.is_empty() {
        return None;
    }

    let parsed: Vec<Option<f64>> = CRITERIA
        .iter()
        .map(|criterion| capture_number(criterion_regex(*criterion), critique))
        .collect();

    let criterion_scores = if parsed.iter().all(Option::is_some) {
        let mut values = [0.0; 5];
        for (slot, value) in values.iter_mut().zip(parsed.iter()) {
            *slot = value.unwrap_or_default();
        }
        CriterionScores::from_array(values)
    } else {
        let total = capture_number(score_regex(), critique)
            .or_else(|| capture_number(loose_score_regex(), critique))?;
        CriterionScores::spread(total)
    };

    Some(ReviewResult {
        score: criterion_scores.total(),
        criterion_scores,
        critique: critique.to_string(),
        review_failed: false,
    })
}

fn capture_number(re: Option<&Regex>, text: &str) -> Option<f64> {
    re?.captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

fn score_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?im)^[\s\*#]*(?:total\s+)?score\**\s*[:=]\s*\**\s*(\d+(?:\.\d+)?)").ok()
    })
    .as_ref()
}

fn loose_score_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(?:score|rating|quality)[:\s]+(\d+(?:\.\d+)?)").ok())
        .as_ref()
}

fn criterion_regex(criterion: Criterion) -> Option<&'static Regex> {
    static RES: OnceLock<Vec<Option<Regex>>> = OnceLock::new();
    let all = RES.get_or_init(|| {
        CRITERIA
            .iter()
            .map(|item| {
                let pattern = format!(
                    r"(?im)^[\s\-\*#\d\.]*\**(?:{})\**\s*(?:\([^)]*\))?\s*[:=]\s*\**\s*(\d+(?:\.\d+)?)",
                    item.label_pattern()
                );
                Regex::new(&pattern).ok()
            })
            .collect()
    });
    let idx = CRITERIA.iter().position(|item| *item == criterion)?;
    all.get(idx)?.as_ref()
}

fn clamp_round(value: f64, max: f64) -> f64 {
    round_tenth(value.clamp(0.0, max))
}

pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
