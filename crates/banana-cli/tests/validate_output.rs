use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::{json, Value};

fn validate(payload: &str, cwd: &std::path::Path) -> anyhow::Result<Output> {
    let mut child = Command::new(env!("CARGO_BIN_EXE_validate_output"))
        .current_dir(cwd)
        .env("RUST_LOG", "trace")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(payload.as_bytes())?;
    }
    Ok(child.wait_with_output()?)
}

#[test]
fn blocked_run_writes_only_the_json_payload() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let payload = json!({
        "tool_name": "Bash",
        "tool_input": { "command": "generate_diagram \"flow\" -o missing.png" },
        "tool_result": "Generation Complete!",
    })
    .to_string();
    let output = validate(&payload, temp.path())?;

    assert_eq!(output.status.code(), Some(2));
    let stderr: Value = serde_json::from_slice(&output.stderr)?;
    let message = stderr["systemMessage"].as_str().unwrap_or_default();
    assert!(message.contains("not created"), "{message}");
    assert_eq!(stderr.as_object().map(|obj| obj.len()), Some(1));
    assert!(output.stdout.is_empty());
    Ok(())
}

#[test]
fn passing_run_is_silent() -> anyhow::Result<()> {
    let temp = tempfile::tempdir()?;
    let output = validate(r#"{"tool_name":"Bash","tool_input":{"command":"ls"}}"#, temp.path())?;
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stderr.is_empty());
    Ok(())
}
