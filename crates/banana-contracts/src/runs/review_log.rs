use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::iteration::{file_stem, IterationRecord};
use crate::review::CriterionScores;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewLogEntry {
    pub score: f64,
    pub criterion_scores: CriterionScores,
    pub critique: String,
    pub elapsed_seconds: f64,
    pub generation_seconds: f64,
    pub review_seconds: f64,
    pub image_path: String,
    #[serde(default)]
    pub review_failed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image: Option<String>,
}

impl From<&IterationRecord> for ReviewLogEntry {
    fn from(record: &IterationRecord) -> Self {
        Self {
            score: record.review.score,
            criterion_scores: record.review.criterion_scores,
            critique: record.review.critique.clone(),
            elapsed_seconds: round_millis(record.elapsed().as_secs_f64()),
            generation_seconds: round_millis(record.generation_elapsed.as_secs_f64()),
            review_seconds: round_millis(record.review_elapsed.as_secs_f64()),
            image_path: record.image_path.to_string_lossy().to_string(),
            review_failed: record.review.review_failed,
            source_image: record
                .source_image
                .as_ref()
                .map(|path| path.to_string_lossy().to_string()),
        }
    }
}

/// `<dir>/<stem>_review_log.json`
pub fn review_log_path(output: &Path) -> PathBuf {
    output.with_file_name(format!("{}_review_log.json", file_stem(output)))
}

/// Log keyed by iteration index, in iteration order.
pub fn build_review_log(records: &[IterationRecord]) -> IndexMap<String, ReviewLogEntry> {
    records
        .iter()
        .map(|record| (record.iteration.to_string(), ReviewLogEntry::from(record)))
        .collect()
}

/// Written once after the loop terminates.
pub fn write_review_log(path: &Path, records: &[IterationRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(&build_review_log(records))?)?;
    Ok(())
}

fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
