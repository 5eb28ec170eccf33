use std::path::Path;

use banana_contracts::hook::{evaluate, HookInput};

pub const BLOCK_EXIT_CODE: i32 = 2;

/// Exit code plus the stderr payload, if any, for one hook invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookOutcome {
    pub exit_code: i32,
    pub stderr: Option<String>,
}

impl HookOutcome {
    fn pass() -> Self {
        Self {
            exit_code: 0,
            stderr: None,
        }
    }
}

/// Evaluates one raw stdin payload. Unparseable input passes silently.
pub fn run_hook(raw: &str, fallback_cwd: &Path) -> HookOutcome {
    let Some(input) = HookInput::from_json(raw) else {
        tracing::debug!("hook input was empty or not JSON");
        return HookOutcome::pass();
    };
    let verdict = evaluate(&input, fallback_cwd);
    tracing::debug!(reason = ?verdict.reason_code, passed = verdict.passed, "hook verdict");
    if verdict.passed {
        return HookOutcome::pass();
    }
    HookOutcome {
        exit_code: BLOCK_EXIT_CODE,
        stderr: Some(verdict.system_message().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use banana_contracts::hook::PNG_MAGIC;
    use serde_json::{json, Value};

    use super::{run_hook, BLOCK_EXIT_CODE};

    fn message(stderr: Option<&String>) -> String {
        stderr
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
            .and_then(|value| value["systemMessage"].as_str().map(str::to_string))
            .unwrap_or_default()
    }

    #[test]
    fn unrelated_command_exits_zero_silently() {
        let raw = r#"{"tool_name":"Bash","tool_input":{"command":"ls -la"},"tool_result":"total 42"}"#;
        let outcome = run_hook(raw, Path::new("/"));
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stderr.is_none());
    }

    #[test]
    fn missing_key_blocks_with_setup_guidance() {
        let raw = json!({
            "tool_name": "Bash",
            "tool_input": { "command": "generate_image \"a cat\" -o cat.png" },
            "tool_result": "Error: OPENROUTER_API_KEY not found. Get one at: https://openrouter.ai/keys",
        })
        .to_string();
        let outcome = run_hook(&raw, Path::new("/"));
        assert_eq!(outcome.exit_code, BLOCK_EXIT_CODE);
        assert!(message(outcome.stderr.as_ref()).contains("setup"));
    }

    #[test]
    fn missing_and_corrupt_outputs_block() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let out = temp.path().join("out.png");
        let raw = json!({
            "tool_name": "Bash",
            "tool_input": { "command": format!("generate_diagram \"flow\" -o {}", out.display()) },
            "tool_result": "Generation Complete!",
        })
        .to_string();

        let outcome = run_hook(&raw, temp.path());
        assert_eq!(outcome.exit_code, BLOCK_EXIT_CODE);
        assert!(message(outcome.stderr.as_ref()).contains("not created"));

        std::fs::write(&out, b"GIF89a not a png")?;
        let outcome = run_hook(&raw, temp.path());
        assert!(message(outcome.stderr.as_ref()).contains("not a valid PNG"));

        let mut png = PNG_MAGIC.to_vec();
        png.extend_from_slice(b"IHDR");
        std::fs::write(&out, png)?;
        assert_eq!(run_hook(&raw, temp.path()).exit_code, 0);
        Ok(())
    }

    #[test]
    fn relative_outputs_resolve_against_payload_cwd() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        std::fs::write(temp.path().join("rel.png"), b"")?;
        let raw = json!({
            "tool_name": "Bash",
            "tool_input": { "command": "generate_image \"x\" --output=rel.png" },
            "tool_result": "Image saved",
            "cwd": temp.path(),
        })
        .to_string();
        let outcome = run_hook(&raw, Path::new("/nonexistent"));
        assert!(message(outcome.stderr.as_ref()).contains("empty"));
        Ok(())
    }

    #[test]
    fn garbage_input_passes() {
        assert_eq!(run_hook("", Path::new("/")).exit_code, 0);
        assert_eq!(run_hook("not json at all", Path::new("/")).exit_code, 0);
    }
}
