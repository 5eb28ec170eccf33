use std::io::Read;
use std::path::PathBuf;

use banana_cli::hook::run_hook;

// No log subscriber: stderr carries only the block payload.
// Unreadable stdin passes.
fn main() {
    let mut raw = String::new();
    if std::io::stdin().read_to_string(&mut raw).is_err() {
        std::process::exit(0);
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let outcome = run_hook(&raw, &cwd);
    if let Some(payload) = &outcome.stderr {
        eprintln!("{payload}");
    }
    std::process::exit(outcome.exit_code);
}
