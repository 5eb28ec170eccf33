/// Substrings identifying the two generation entry points.
pub const GENERATION_ENTRY_POINTS: &[&str] = &["generate_image", "generate_diagram"];

/// Name of the shell-execution tool whose events are inspected.
pub const SHELL_TOOL_NAME: &str = "Bash";

pub fn is_generation_command(command: &str) -> bool {
    GENERATION_ENTRY_POINTS
        .iter()
        .any(|entry| command.contains(entry))
}

fn split_command(command: &str) -> Vec<String> {
    match shell_words::split(command) {
        Ok(parts) => parts,
        Err(_) => command.split_whitespace().map(str::to_string).collect(),
    }
}

/// Output path from the first `-o`/`--output` flag, in either the
/// separate-argument or `=` form.
pub fn parse_output_path(command: &str) -> Option<String> {
    let tokens = split_command(command);
    let mut iter = tokens.iter();
    while let Some(token) = iter.next() {
        if token == "-o" || token == "--output" {
            return iter.next().filter(|value| !value.is_empty()).cloned();
        }
        if let Some(value) = token
            .strip_prefix("--output=")
            .or_else(|| token.strip_prefix("-o="))
        {
            return Some(value.to_string()).filter(|value| !value.is_empty());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::{is_generation_command, parse_output_path};

    #[test]
    fn recognizes_both_entry_points() {
        assert!(is_generation_command("generate_image \"cat\" -o cat.png"));
        assert!(is_generation_command(
            "./target/release/generate_diagram \"flow\" -o flow.png"
        ));
        assert!(!is_generation_command("ls -la"));
    }

    #[test]
    fn first_output_flag_wins() {
        assert_eq!(
            parse_output_path("generate_diagram \"x\" -o first.png --output second.png").as_deref(),
            Some("first.png")
        );
        assert_eq!(
            parse_output_path("generate_image \"x\" --output=figs/a.png").as_deref(),
            Some("figs/a.png")
        );
    }

    #[test]
    fn quoted_paths_keep_spaces() {
        assert_eq!(
            parse_output_path("generate_image 'a b' -o 'my figs/out.png'").as_deref(),
            Some("my figs/out.png")
        );
    }

    #[test]
    fn unbalanced_quotes_fall_back_to_whitespace_split() {
        assert_eq!(
            parse_output_path("generate_image \"unterminated -o out.png").as_deref(),
            Some("out.png")
        );
    }

    #[test]
    fn missing_or_dangling_flag_yields_none() {
        assert!(parse_output_path("generate_image \"x\"").is_none());
        assert!(parse_output_path("generate_image \"x\" -o").is_none());
    }
}
