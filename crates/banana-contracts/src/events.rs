use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Lifecycle events of one generation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        provider: String,
        image_model: String,
        review_model: String,
        doc_type: String,
        threshold: f64,
        max_iterations: u32,
        edit_mode: bool,
    },
    IterationGenerated {
        iteration: u32,
        image_path: String,
        bytes: usize,
        elapsed_seconds: f64,
    },
    IterationReviewed {
        iteration: u32,
        score: f64,
        threshold: f64,
        elapsed_seconds: f64,
    },
    ReviewFailed {
        iteration: u32,
        error: String,
    },
    RunFinished {
        outcome: String,
        iterations: u32,
        final_path: String,
        final_score: f64,
        best_iteration: u32,
    },
    RunFailed {
        iteration: u32,
        error: String,
    },
}

/// Append-only `events.jsonl` writer.
///
/// Every line is one compact JSON object carrying `type`, `run_id` and `ts`
/// ahead of the event's own fields.
#[derive(Debug, Clone)]
pub struct EventWriter {
    path: PathBuf,
    run_id: String,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_run_id(path, uuid::Uuid::new_v4().to_string())
    }

    pub fn with_run_id(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            run_id: run_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emit(&self, event: &RunEvent) -> anyhow::Result<Value> {
        let mut line = Map::new();
        line.insert("run_id".to_string(), Value::String(self.run_id.clone()));
        line.insert("ts".to_string(), Value::String(now_utc_iso()));
        if let Value::Object(fields) = serde_json::to_value(event)? {
            for (key, value) in fields {
                line.insert(key, value);
            }
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let encoded = serde_json::to_string(&line)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(encoded.as_bytes())?;
        file.write_all(b"\n")?;

        Ok(Value::Object(line))
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}
