/// Render prose as a bulleted list with one `- ` line per `.`-delimited segment.
///
/// Empty segments are dropped. Output always starts with a bullet marker, so text with no
/// segments renders as a bare `- `.
pub fn format_detailed_notes(text: &str) -> String {
    let segments: Vec<&str> = text
        .split('.')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    format!("- {}", segments.join("\n- "))
}
