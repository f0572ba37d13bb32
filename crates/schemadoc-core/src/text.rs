//! Line wrapping for long concatenated source lines.

/// Default wrap width in characters.
pub const DEFAULT_WRAP_WIDTH: usize = 80;

/// Default break sequence; the tab marks a continuation line.
pub const DEFAULT_WRAP_BREAK: &str = "\r\n\t";

/// Break `text` into segments of at most `width` characters joined by `line_break`.
///
/// A segment ends after the last space or tab inside its window, so words are
/// never split when the window holds a breaking space; otherwise the segment
/// is cut at exactly `width`. Text no longer than `width`, or a zero width,
/// is returned unchanged.
pub fn wrap_text(text: &str, width: usize, line_break: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    if width == 0 || chars.len() <= width {
        return text.to_string();
    }

    let mut segments: Vec<String> = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let mut stop = (start + width).min(chars.len());
        if stop < chars.len() {
            if let Some(space) = chars[start..stop]
                .iter()
                .rposition(|c| *c == ' ' || *c == '\t')
            {
                stop = start + space + 1;
            }
        }
        segments.push(chars[start..stop].iter().collect());
        start = stop;
    }

    segments.join(line_break)
}
