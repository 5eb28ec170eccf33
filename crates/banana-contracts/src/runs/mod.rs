pub mod iteration;
pub mod review_log;

pub use iteration::{select_best, IterationRecord, OutputArtifact};
pub use review_log::{build_review_log, review_log_path, write_review_log, ReviewLogEntry};
