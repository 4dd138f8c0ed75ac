//! Text position utilities for byte offset and line:column conversions.
//!
//! Coordinate conventions:
//! - Lines and columns are **1-indexed** (matching editor conventions)
//! - Byte offsets are **0-indexed**
//! - Line/column values of 0 are treated as 1 (defensive clamping)
//!
//! Columns count Unicode scalar values, not bytes, so positions from editors
//! map correctly onto multi-byte UTF-8 content.

// ============================================================================
// Position Conversions
// ============================================================================

/// Convert a byte offset to 1-indexed line and column (Unicode-aware).
///
/// If `offset` exceeds the content length, returns the position at the end of
/// the content.
pub fn byte_offset_to_position(content: &str, offset: usize) -> (u32, u32) {
    let mut line = 1u32;
    let mut col = 1u32;
    let mut current = 0usize;

    for ch in content.chars() {
        if current >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
        current += ch.len_utf8();
    }

    (line, col)
}

/// Convert 1-indexed line and column to a byte offset (Unicode-aware).
///
/// Positions beyond a line's end clamp to the line end; lines beyond the
/// content clamp to the content length.
pub fn position_to_byte_offset(content: &str, line: u32, col: u32) -> usize {
    let line = line.max(1);
    let col = col.max(1);

    let mut current_line = 1u32;
    let mut current_col = 1u32;

    for (offset, ch) in content.char_indices() {
        if current_line == line {
            if current_col == col || ch == '\n' {
                return offset;
            }
            current_col += 1;
        } else if ch == '\n' {
            current_line += 1;
        }
    }

    content.len()
}

// ============================================================================
// Line Helpers
// ============================================================================

/// Byte offset of the start of the line containing `offset`.
pub fn line_start(content: &str, offset: usize) -> usize {
    let offset = offset.min(content.len());
    content[..offset].rfind('\n').map(|p| p + 1).unwrap_or(0)
}

/// The text of the line containing `offset`, up to (not including) `offset`.
pub fn line_prefix(content: &str, offset: usize) -> &str {
    let offset = offset.min(content.len());
    &content[line_start(content, offset)..offset]
}

/// Leading whitespace of the line containing `offset`.
///
/// Computed by a backward scan to the previous newline followed by a forward
/// scan over the whitespace run, so it works on lines the cursor is still
/// typing on.
pub fn line_indentation(content: &str, offset: usize) -> &str {
    let start = line_start(content, offset);
    let line = &content[start..];
    let end = line
        .char_indices()
        .find(|(_, c)| *c != ' ' && *c != '\t')
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    &line[..end]
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_to_position_roundtrip() {
        let content = "line one\nline two\nline three";
        assert_eq!(byte_offset_to_position(content, 0), (1, 1));
        assert_eq!(byte_offset_to_position(content, 9), (2, 1));
        assert_eq!(byte_offset_to_position(content, 14), (2, 6));
        assert_eq!(position_to_byte_offset(content, 2, 6), 14);
        assert_eq!(position_to_byte_offset(content, 1, 1), 0);
    }

    #[test]
    fn test_position_clamps() {
        let content = "ab\ncd";
        // Past the end of a line clamps to line end
        assert_eq!(position_to_byte_offset(content, 1, 99), 2);
        // Past the last line clamps to content length
        assert_eq!(position_to_byte_offset(content, 99, 1), content.len());
        assert_eq!(byte_offset_to_position(content, 999), (2, 3));
    }

    #[test]
    fn test_multibyte_columns() {
        let content = "é = 1\nx";
        // 'é' is two bytes but one column
        assert_eq!(byte_offset_to_position(content, content.find('=').unwrap()), (1, 3));
        assert_eq!(position_to_byte_offset(content, 2, 1), content.len() - 1);
    }

    #[test]
    fn test_line_helpers() {
        let content = "a = 1\n    b = 2\n\t\tc";
        let b_off = content.find('b').unwrap();
        assert_eq!(line_start(content, b_off), 6);
        assert_eq!(line_prefix(content, b_off), "    ");
        assert_eq!(line_indentation(content, b_off), "    ");
        let c_off = content.find('c').unwrap();
        assert_eq!(line_indentation(content, c_off), "\t\t");
        // Blank-line indentation is the whole line prefix
        assert_eq!(line_indentation("x\n   ", 5), "   ");
    }
}
