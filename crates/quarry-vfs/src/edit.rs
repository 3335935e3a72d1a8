use quarry_core::{Position, Range};

use crate::error::OverlayError;

/// An LSP-style content change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentChange {
    /// The range of text to replace. If `None`, the entire document is replaced.
    pub range: Option<Range>,
    /// Replacement text.
    pub text: String,
}

impl ContentChange {
    pub fn full(text: impl Into<String>) -> Self {
        Self {
            range: None,
            text: text.into(),
        }
    }

    pub fn replace(range: Range, text: impl Into<String>) -> Self {
        Self {
            range: Some(range),
            text: text.into(),
        }
    }
}

/// Applies `changes` in order to a copy of `text` and returns the new text.
///
/// Positions are UTF-16 based and clamped the way editors expect: columns past the end of a
/// line map to the line end, and a column splitting a surrogate pair maps to the start of
/// that character.
pub(crate) fn apply_changes(text: &str, changes: &[ContentChange]) -> Result<String, OverlayError> {
    let mut out = text.to_owned();
    for change in changes {
        match change.range {
            None => out.clone_from(&change.text),
            Some(range) => {
                let offsets = line_offsets(&out);
                let start = position_to_offset(&out, &offsets, range.start);
                let end = position_to_offset(&out, &offsets, range.end);
                if start > end {
                    return Err(OverlayError::InvalidRange);
                }
                out.replace_range(start..end, &change.text);
            }
        }
    }
    Ok(out)
}

fn line_offsets(text: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    let bytes = text.as_bytes();
    let mut i = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                offsets.push(i + 1);
                i += 1;
            }
            b'\r' => {
                if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                    offsets.push(i + 2);
                    i += 2;
                } else {
                    offsets.push(i + 1);
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    offsets
}

fn position_to_offset(text: &str, offsets: &[usize], position: Position) -> usize {
    let line = position.line as usize;
    if line >= offsets.len() {
        return text.len();
    }

    let line_start = offsets[line];
    let mut line_end = offsets.get(line + 1).copied().unwrap_or(text.len());

    // Columns are measured over the line text, excluding `\n`, `\r\n` or `\r`.
    let bytes = text.as_bytes();
    if line_end > line_start && bytes[line_end - 1] == b'\n' {
        line_end -= 1;
    }
    if line_end > line_start && bytes[line_end - 1] == b'\r' {
        line_end -= 1;
    }

    let line_text = &text[line_start..line_end];
    line_start + utf16_column_to_byte_offset(line_text, position.character)
}

fn utf16_column_to_byte_offset(line: &str, column: u32) -> usize {
    let mut col: u32 = 0;
    for (idx, ch) in line.char_indices() {
        let width = ch.len_utf16() as u32;
        if col + width > column {
            return idx;
        }
        col += width;
    }
    line.len()
}
