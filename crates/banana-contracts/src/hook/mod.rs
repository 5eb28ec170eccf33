//! Post-run output validation for the generation commands.
//!
//! A pure function of the hook payload plus the filesystem at call time:
//! no network, no writes, no state between invocations.

mod command;
mod patterns;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub use command::{
    is_generation_command, parse_output_path, GENERATION_ENTRY_POINTS, SHELL_TOOL_NAME,
};

pub const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolInput {
    #[serde(default)]
    pub command: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: ToolInput,
    #[serde(default, deserialize_with = "result_text")]
    pub tool_result: String,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl HookInput {
    /// `None` for empty or malformed payloads, which are passed through.
    pub fn from_json(raw: &str) -> Option<Self> {
        if raw.trim().is_empty() {
            return None;
        }
        serde_json::from_str(raw).ok()
    }
}

// Non-string results are inspected as their JSON text.
fn result_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    NotApplicable,
    NoOutputPath,
    OutputValid,
    MissingCredentials,
    InvalidApiKey,
    PermissionDenied,
    RateLimited,
    TimedOut,
    SourceImageMissing,
    NoImageReturned,
    EmptyResponse,
    GenerationFailed,
    OutputMissing,
    OutputEmpty,
    OutputNotPng,
    OutputUnreadable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub passed: bool,
    pub reason_code: ReasonCode,
    pub message: String,
}

impl Verdict {
    pub fn pass(reason_code: ReasonCode) -> Self {
        Self {
            passed: true,
            reason_code,
            message: String::new(),
        }
    }

    pub fn block(reason_code: ReasonCode, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            reason_code,
            message: message.into(),
        }
    }

    /// `{"systemMessage": ...}` payload written to stderr on block.
    pub fn system_message(&self) -> Value {
        serde_json::json!({ "systemMessage": self.message })
    }
}

pub fn evaluate(input: &HookInput, fallback_cwd: &Path) -> Verdict {
    if input.tool_name != SHELL_TOOL_NAME || !is_generation_command(&input.tool_input.command) {
        return Verdict::pass(ReasonCode::NotApplicable);
    }

    // A failed command leaves no file worth inspecting.
    if let Some(pattern) = patterns::match_known_failure(&input.tool_result) {
        return Verdict::block(pattern.reason, pattern.guidance);
    }
    if patterns::has_generic_failure(&input.tool_result) {
        return Verdict::block(
            ReasonCode::GenerationFailed,
            patterns::GENERIC_FAILURE_GUIDANCE,
        );
    }

    let Some(output) = parse_output_path(&input.tool_input.command) else {
        return Verdict::pass(ReasonCode::NoOutputPath);
    };
    let cwd = input.cwd.as_deref().unwrap_or(fallback_cwd);
    check_output_file(&cwd.join(output))
}

/// Existence, then non-empty, then PNG header for `.png` paths.
pub fn check_output_file(path: &Path) -> Verdict {
    let display = path.display();
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(_) => {
            return Verdict::block(
                ReasonCode::OutputMissing,
                format!(
                    "Output file was not created: {display}. Generation may have failed silently."
                ),
            )
        }
    };
    if metadata.len() == 0 {
        return Verdict::block(
            ReasonCode::OutputEmpty,
            format!("Output file is empty (0 bytes): {display}. Generation produced no data."),
        );
    }

    let is_png = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("png"))
        .unwrap_or(false);
    if !is_png {
        return Verdict::pass(ReasonCode::OutputValid);
    }

    match read_header(path) {
        Ok(header) if header == PNG_MAGIC => Verdict::pass(ReasonCode::OutputValid),
        Ok(_) => Verdict::block(
            ReasonCode::OutputNotPng,
            format!("Output file is not a valid PNG: {display}. File may be corrupted."),
        ),
        Err(_) => Verdict::block(
            ReasonCode::OutputUnreadable,
            format!("Cannot read output file: {display}. Check file permissions."),
        ),
    }
}

fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(PNG_MAGIC.len());
    File::open(path)?
        .take(PNG_MAGIC.len() as u64)
        .read_to_end(&mut header)?;
    Ok(header)
}
