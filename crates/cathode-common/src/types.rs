use serde::{Deserialize, Serialize};

/// Cell position (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pos {
    pub row: i32,
    pub col: i32,
}

impl Pos {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

/// Rectangular area of cells, as half-open row and column intervals
/// `[start_row, end_row) x [start_col, end_col)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub start_row: i32,
    pub end_row: i32,
    pub start_col: i32,
    pub end_col: i32,
}

impl Rect {
    pub fn new(start_row: i32, end_row: i32, start_col: i32, end_col: i32) -> Self {
        Self {
            start_row,
            end_row,
            start_col,
            end_col,
        }
    }

    pub fn height(&self) -> i32 {
        self.end_row - self.start_row
    }

    pub fn width(&self) -> i32 {
        self.end_col - self.start_col
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.row >= self.start_row
            && pos.row < self.end_row
            && pos.col >= self.start_col
            && pos.col < self.end_col
    }

    /// True if `other` lies entirely within this rect.
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.start_row >= self.start_row
            && other.end_row <= self.end_row
            && other.start_col >= self.start_col
            && other.end_col <= self.end_col
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.start_row < other.end_row
            && self.end_row > other.start_row
            && self.start_col < other.end_col
            && self.end_col > other.start_col
    }

    /// Shift the whole rect by the given row and column deltas.
    pub fn translate(&mut self, row_delta: i32, col_delta: i32) {
        self.start_row += row_delta;
        self.end_row += row_delta;
        self.start_col += col_delta;
        self.end_col += col_delta;
    }

    /// Clamp this rect to lie within `bounds`.
    pub fn clip(&mut self, bounds: &Rect) {
        self.start_row = self.start_row.max(bounds.start_row);
        self.end_row = self.end_row.min(bounds.end_row);
        self.start_col = self.start_col.max(bounds.start_col);
        self.end_col = self.end_col.min(bounds.end_col);
    }

    /// Grow this rect to the union of itself and `other`.
    pub fn expand(&mut self, other: &Rect) {
        self.start_row = self.start_row.min(other.start_row);
        self.end_row = self.end_row.max(other.end_row);
        self.start_col = self.start_col.min(other.start_col);
        self.end_col = self.end_col.max(other.end_col);
    }
}

/// Double-height line state (DECDHL)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DoubleHeight {
    #[default]
    Off,
    Top,
    Bottom,
}

/// Per-row metadata, kept for both the primary and alternate buffers.
///
/// `continuation` is set when the row is the logical continuation of the row
/// above it, i.e. a soft wrap happened while printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineInfo {
    pub doublewidth: bool,
    pub doubleheight: DoubleHeight,
    pub continuation: bool,
}

/// Cursor shape as set by DECSCUSR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CursorShape {
    #[default]
    Block = 1,
    Underline = 2,
    BarLeft = 3,
}

impl CursorShape {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            1 => Some(CursorShape::Block),
            2 => Some(CursorShape::Underline),
            3 => Some(CursorShape::BarLeft),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_contains() {
        let r = Rect::new(2, 5, 0, 10);
        assert!(r.contains(Pos::new(2, 0)));
        assert!(r.contains(Pos::new(4, 9)));
        assert!(!r.contains(Pos::new(5, 0)));
        assert!(!r.contains(Pos::new(2, 10)));
    }

    #[test]
    fn test_rect_intersects() {
        let a = Rect::new(0, 4, 0, 4);
        let b = Rect::new(3, 6, 3, 6);
        let c = Rect::new(4, 6, 0, 4);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_rect_expand_and_clip() {
        let mut r = Rect::new(1, 2, 1, 2);
        r.expand(&Rect::new(0, 5, 0, 1));
        assert_eq!(r, Rect::new(0, 5, 0, 2));

        r.clip(&Rect::new(1, 3, 0, 2));
        assert_eq!(r, Rect::new(1, 3, 0, 2));
    }

    #[test]
    fn test_rect_translate() {
        let mut r = Rect::new(2, 4, 2, 4);
        r.translate(-1, 2);
        assert_eq!(r, Rect::new(1, 3, 4, 6));
    }
}
