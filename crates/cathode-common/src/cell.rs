use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::types::DoubleHeight;

/// Maximum codepoints stored in a single cell (base character plus
/// combining marks).
pub const MAX_CHARS_PER_CELL: usize = 6;

/// Sentinel stored in the cell to the right of a double-width glyph. Not a
/// valid codepoint, so it can never collide with real content.
pub const WIDECHAR_CONT: u32 = u32::MAX;

/// Underline style (SGR 4, with sub-parameter selection)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Underline {
    #[default]
    Off = 0,
    Single = 1,
    Double = 2,
    Curly = 3,
}

/// Baseline shift (SGR 73/74/75 superscript/subscript)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Baseline {
    #[default]
    Normal = 0,
    Raise = 1,
    Lower = 2,
}

/// The logical style applied to subsequently written cells. Changes only
/// via SGR, pen save/restore, or a reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pen {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub underline: Underline,
    pub italic: bool,
    pub blink: bool,
    pub reverse: bool,
    pub conceal: bool,
    pub strike: bool,
    pub font: u8,
    pub small: bool,
    pub baseline: Baseline,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            fg: Color::DefaultFg,
            bg: Color::DefaultBg,
            bold: false,
            underline: Underline::Off,
            italic: false,
            blink: false,
            reverse: false,
            conceal: false,
            strike: false,
            font: 0,
            small: false,
            baseline: Baseline::Normal,
        }
    }
}

/// Attribute fields of an external screen cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CellAttrs {
    pub bold: bool,
    pub underline: Underline,
    pub italic: bool,
    pub blink: bool,
    pub reverse: bool,
    pub conceal: bool,
    pub strike: bool,
    pub font: u8,
    pub small: bool,
    pub baseline: Baseline,
    pub dwl: bool,
    pub dhl: DoubleHeight,
}

/// A screen cell in its external representation, as handed to scrollback
/// callbacks and returned by cell queries.
///
/// `chars[0] == 0` means the cell is erased. A double-wide glyph has
/// `width == 2` and occupies this cell plus a continuation cell to its
/// right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenCell {
    pub chars: [u32; MAX_CHARS_PER_CELL],
    pub width: u8,
    pub attrs: CellAttrs,
    pub fg: Color,
    pub bg: Color,
}

impl Default for ScreenCell {
    fn default() -> Self {
        Self {
            chars: [0; MAX_CHARS_PER_CELL],
            width: 1,
            attrs: CellAttrs::default(),
            fg: Color::DefaultFg,
            bg: Color::DefaultBg,
        }
    }
}

impl ScreenCell {
    pub fn is_erased(&self) -> bool {
        self.chars[0] == 0
    }

    /// The stored codepoints, up to the first empty slot.
    pub fn codepoints(&self) -> &[u32] {
        let len = self.chars.iter().position(|&c| c == 0).unwrap_or(MAX_CHARS_PER_CELL);
        &self.chars[..len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pen() {
        let pen = Pen::default();
        assert_eq!(pen.fg, Color::DefaultFg);
        assert_eq!(pen.bg, Color::DefaultBg);
        assert!(!pen.bold);
        assert_eq!(pen.underline, Underline::Off);
    }

    #[test]
    fn test_cell_codepoints() {
        let mut cell = ScreenCell::default();
        assert!(cell.is_erased());
        assert!(cell.codepoints().is_empty());

        cell.chars[0] = 'e' as u32;
        cell.chars[1] = 0x0301;
        assert_eq!(cell.codepoints(), &['e' as u32, 0x0301]);
    }
}
