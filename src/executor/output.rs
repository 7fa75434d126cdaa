//! Command output helpers.

/// Longest line kept before truncation.
const MAX_LINE_LENGTH: usize = 200;
/// Longest total output kept before truncation.
const MAX_TOTAL_LENGTH: usize = 1000;

/// Shorten command output for log fields and human-readable messages.
///
/// Keeps at most `max_lines` non-empty lines, truncates long lines, and caps
/// the total length.
pub fn sanitize_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();

    let mut result = String::new();

    for line in lines.iter().take(max_lines) {
        let truncated = if line.chars().count() > MAX_LINE_LENGTH {
            let head: String = line.chars().take(MAX_LINE_LENGTH).collect();
            format!("{}...", head)
        } else {
            line.to_string()
        };

        if result.len() + truncated.len() > MAX_TOTAL_LENGTH {
            result.push_str("...[truncated]");
            return result;
        }

        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(&truncated);
    }

    if lines.len() > max_lines {
        result.push_str("\n...[additional output truncated]");
    }

    result
}
