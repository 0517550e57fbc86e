//! Terminal commands. Each command opens the engine (or, for `doctor`, the
//! raw stores) from configuration and prints a human-readable report.

pub mod add;
pub mod doctor;
pub mod pillar;
pub mod recent;
pub mod search;
pub mod stats;

/// Truncate content to max_chars, appending "..." if truncated.
pub(crate) fn truncate_preview(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        content.to_string()
    } else {
        // Find a clean char boundary
        let end = content
            .char_indices()
            .take_while(|(i, _)| *i < max_chars)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(max_chars);
        format!("{}...", &content[..end])
    }
}
