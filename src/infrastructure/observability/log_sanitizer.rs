const MAX_VISIBLE_LENGTH: usize = 100;

/// Makes caller-supplied text safe to put in a log line.
pub fn sanitize_for_log(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let single_line: String = trimmed
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    let char_count = single_line.chars().count();
    let sanitized = if char_count > MAX_VISIBLE_LENGTH {
        let visible: String = single_line.chars().take(MAX_VISIBLE_LENGTH).collect();
        format!("{}... ({} chars total)", visible, char_count)
    } else {
        single_line
    };

    redact_sensitive_patterns(&sanitized)
}

fn redact_sensitive_patterns(text: &str) -> String {
    let patterns = [
        ("Bearer ", "Bearer [REDACTED]"),
        ("api_key=", "api_key=[REDACTED]"),
        ("password=", "password=[REDACTED]"),
        ("secret=", "secret=[REDACTED]"),
        ("token=", "token=[REDACTED]"),
    ];

    let mut result = text.to_string();
    for (pattern, replacement) in patterns {
        let mut from = 0;
        while let Some(offset) = result[from..].find(pattern) {
            let idx = from + offset;
            let value_start = idx + pattern.len();
            let end = result[value_start..]
                .find(|c: char| c.is_whitespace() || c == '&' || c == '"' || c == '\'')
                .map(|i| value_start + i)
                .unwrap_or(result.len());
            result.replace_range(idx..end, replacement);
            from = idx + replacement.len();
        }
    }

    result
}
