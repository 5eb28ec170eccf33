use std::fmt::Write as _;

use banana_engine::{GenerationReport, Outcome, ProviderConfig};

const RULE: &str = "============================================================";

pub fn render_header(
    config: &ProviderConfig,
    prompt: &str,
    doc_type: &str,
    threshold: f64,
    max_iterations: u32,
    source: Option<&str>,
    output: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    match source {
        Some(source) => {
            let _ = writeln!(out, "Nano Banana - Editing Diagram");
            let _ = writeln!(out, "{RULE}");
            let _ = writeln!(out, "Source: {source}");
            let _ = writeln!(out, "Edit: {prompt}");
        }
        None => {
            let _ = writeln!(out, "Nano Banana - Generating Diagram");
            let _ = writeln!(out, "{RULE}");
            let _ = writeln!(out, "Description: {prompt}");
        }
    }
    let _ = writeln!(out, "Provider: {} ({})", config.kind, config.image_model);
    let _ = writeln!(out, "Document Type: {doc_type}");
    let _ = writeln!(out, "Quality Threshold: {threshold:.1}/10");
    let _ = writeln!(out, "Max Iterations: {max_iterations}");
    let _ = writeln!(out, "Timeout: {}s", config.request_timeout.as_secs());
    let _ = writeln!(out, "Output: {output}");
    let _ = writeln!(out, "{RULE}");
    out
}

pub fn render_report(report: &GenerationReport) -> String {
    let mut out = String::new();
    for record in &report.records {
        let _ = writeln!(
            out,
            "[Iteration {}] {} (generate {:.1}s, review {:.1}s)",
            record.iteration,
            record.image_path.display(),
            record.generation_elapsed.as_secs_f64(),
            record.review_elapsed.as_secs_f64(),
        );
        if record.review.review_failed {
            let _ = writeln!(out, "  Review failed, scored 0/10");
        } else {
            let _ = writeln!(
                out,
                "  Score: {:.1}/10 (threshold: {:.1}/10)",
                record.score(),
                report.threshold
            );
        }
    }
    let _ = writeln!(out);
    match report.outcome {
        Outcome::Accepted => {
            let _ = writeln!(
                out,
                "Quality meets threshold ({:.1} >= {:.1})",
                report.final_score, report.threshold
            );
        }
        Outcome::Exhausted => {
            let _ = writeln!(
                out,
                "Maximum iterations reached; kept iteration {} ({:.1}/10)",
                report.best_iteration, report.final_score
            );
        }
    }
    let _ = writeln!(out, "Final image: {}", report.artifact.final_path.display());
    let _ = writeln!(out, "Review log: {}", report.artifact.review_log_path.display());
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "Final Score: {:.1}/10", report.final_score);
    let _ = writeln!(
        out,
        "Iterations Used: {}/{}",
        report.records.len(),
        report.max_iterations
    );
    let _ = writeln!(out, "Total Time: {:.1}s", report.total_elapsed.as_secs_f64());
    let _ = writeln!(out, "{RULE}");
    out
}
