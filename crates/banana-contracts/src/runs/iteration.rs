use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::review::ReviewResult;

pub const DEFAULT_EXTENSION: &str = "png";

/// One generate+review round. Records are appended in iteration order and
/// never touched again.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    pub iteration: u32,
    pub prompt: String,
    pub image_path: PathBuf,
    pub image_bytes: Vec<u8>,
    /// Set only on the first iteration of an edit request.
    pub source_image: Option<PathBuf>,
    pub review: ReviewResult,
    pub generation_elapsed: Duration,
    pub review_elapsed: Duration,
}

impl IterationRecord {
    pub fn score(&self) -> f64 {
        self.review.score
    }

    pub fn elapsed(&self) -> Duration {
        self.generation_elapsed + self.review_elapsed
    }
}

/// Highest score wins; ties go to the earliest iteration.
pub fn select_best(records: &[IterationRecord]) -> Option<&IterationRecord> {
    records.iter().fold(None, |best: Option<&IterationRecord>, record| match best {
        Some(current) if current.score() >= record.score() => Some(current),
        _ => Some(record),
    })
}

/// Files produced for one request, all derived from the caller's output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub final_path: PathBuf,
    pub iteration_paths: Vec<PathBuf>,
    pub review_log_path: PathBuf,
}

impl OutputArtifact {
    pub fn for_output(output: &Path) -> Self {
        let final_path = if output.extension().is_some() {
            output.to_path_buf()
        } else {
            output.with_extension(DEFAULT_EXTENSION)
        };
        Self {
            final_path,
            iteration_paths: Vec::new(),
            review_log_path: super::review_log_path(output),
        }
    }

    pub fn extension(&self) -> String {
        self.final_path
            .extension()
            .and_then(|value| value.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_EXTENSION.to_string())
    }

    pub fn is_png(&self) -> bool {
        self.extension().eq_ignore_ascii_case("png")
    }

    /// `<dir>/<stem>_v<index>.<ext>`
    pub fn iteration_path(&self, index: u32) -> PathBuf {
        let stem = file_stem(&self.final_path);
        self.final_path
            .with_file_name(format!("{stem}_v{index}.{}", self.extension()))
    }
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|value| value.to_str())
        .filter(|value| !value.is_empty())
        .unwrap_or("output")
        .to_string()
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use crate::review::ReviewResult;

    use super::{select_best, IterationRecord, OutputArtifact};

    fn record(iteration: u32, score: f64) -> IterationRecord {
        let mut review = ReviewResult::failed("n/a");
        review.score = score;
        review.review_failed = false;
        IterationRecord {
            iteration,
            prompt: format!("prompt {iteration}"),
            image_path: PathBuf::from(format!("out_v{iteration}.png")),
            image_bytes: vec![iteration as u8],
            source_image: None,
            review,
            generation_elapsed: Duration::from_millis(1500),
            review_elapsed: Duration::from_millis(500),
        }
    }

    #[test]
    fn best_prefers_highest_score() {
        let records = vec![record(1, 6.0), record(2, 7.2)];
        assert_eq!(select_best(&records).map(|r| r.iteration), Some(2));
    }

    #[test]
    fn best_breaks_ties_by_earliest_iteration() {
        let records = vec![record(1, 7.0), record(2, 7.0)];
        assert_eq!(select_best(&records).map(|r| r.iteration), Some(1));
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn elapsed_adds_both_phases() {
        assert_eq!(record(1, 0.0).elapsed(), Duration::from_secs(2));
    }

    #[test]
    fn artifact_paths_derive_from_output() {
        let artifact = OutputArtifact::for_output(Path::new("figs/flow.png"));
        assert_eq!(artifact.final_path, PathBuf::from("figs/flow.png"));
        assert_eq!(artifact.iteration_path(2), PathBuf::from("figs/flow_v2.png"));
        assert_eq!(
            artifact.review_log_path,
            PathBuf::from("figs/flow_review_log.json")
        );
        assert!(artifact.is_png());
    }

    #[test]
    fn missing_extension_defaults_to_png() {
        let artifact = OutputArtifact::for_output(Path::new("diagram"));
        assert_eq!(artifact.final_path, PathBuf::from("diagram.png"));
        assert_eq!(artifact.iteration_path(1), PathBuf::from("diagram_v1.png"));

        let jpeg = OutputArtifact::for_output(Path::new("shot.JPG"));
        assert!(!jpeg.is_png());
        assert_eq!(jpeg.iteration_path(1), PathBuf::from("shot_v1.JPG"));
    }
}
