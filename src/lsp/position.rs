//! Conversion between LSP positions and tree points
//!
//! LSP counts columns in UTF-16 code units, the tree in bytes. Positions
//! past the end of a line or of the document are clamped.

use ropey::{Rope, RopeSlice};
use tower_lsp::lsp_types::{Position as LspPosition, Range as LspRange};

use crate::syntax::{Point, Range};

/// Char index of `position` in `text`.
pub fn position_to_char(text: &Rope, position: LspPosition) -> usize {
    let line = position.line as usize;
    if line >= text.len_lines() {
        return text.len_chars();
    }
    let slice = text.line(line);
    let column = (position.character as usize).min(line_width(slice));
    text.line_to_char(line) + slice.utf16_cu_to_char(column)
}

/// UTF-16 length of a line without its terminator.
fn line_width(line: RopeSlice<'_>) -> usize {
    let mut width = line.len_utf16_cu();
    let mut chars = line.chars_at(line.len_chars());
    if chars.prev() == Some('\n') {
        width -= 1;
        if chars.prev() == Some('\r') {
            width -= 1;
        }
    }
    width
}

pub fn position_to_point(text: &Rope, position: LspPosition) -> Point {
    let char_index = position_to_char(text, position);
    let row = text.char_to_line(char_index);
    let column = text.char_to_byte(char_index) - text.line_to_byte(row);
    Point::new(row, column)
}

pub fn point_to_position(text: &Rope, point: Point) -> LspPosition {
    if point.row >= text.len_lines() {
        let end = text.len_chars();
        let row = text.char_to_line(end);
        let line_start = text.char_to_utf16_cu(text.line_to_char(row));
        return LspPosition::new(row as u32, (text.char_to_utf16_cu(end) - line_start) as u32);
    }
    let line_start_byte = text.line_to_byte(point.row);
    let byte = (line_start_byte + point.column).min(text.len_bytes());
    let char_index = text.byte_to_char(byte);
    let line_start = text.char_to_utf16_cu(text.line_to_char(point.row));
    LspPosition::new(
        point.row as u32,
        (text.char_to_utf16_cu(char_index) - line_start) as u32,
    )
}

pub fn range_to_lsp(text: &Rope, range: &Range) -> LspRange {
    LspRange::new(
        point_to_position(text, range.start_point),
        point_to_position(text, range.end_point),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_columns() {
        let text = Rope::from_str("xlog(\"é😀\");\n$var(a) = 1;\n");
        // `)` follows two chars, one of them a surrogate pair.
        let point = position_to_point(&text, LspPosition::new(0, 10));
        assert_eq!(point, Point::new(0, 13));
        assert_eq!(point_to_position(&text, point), LspPosition::new(0, 10));
        assert_eq!(position_to_point(&text, LspPosition::new(1, 3)), Point::new(1, 3));
    }

    #[test]
    fn test_clamping() {
        let text = Rope::from_str("drop;\nexit;");
        assert_eq!(position_to_point(&text, LspPosition::new(0, 99)), Point::new(0, 5));
        assert_eq!(position_to_point(&text, LspPosition::new(9, 0)), Point::new(1, 5));
        assert_eq!(point_to_position(&text, Point::new(7, 0)), LspPosition::new(1, 5));
    }
}
