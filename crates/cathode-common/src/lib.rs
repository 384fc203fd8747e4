pub mod cell;
pub mod color;
pub mod error;
pub mod types;
pub mod value;

pub use cell::{Baseline, CellAttrs, Pen, ScreenCell, Underline, MAX_CHARS_PER_CELL, WIDECHAR_CONT};
pub use color::Color;
pub use error::{CathodeError, Result};
pub use types::{CursorShape, DoubleHeight, LineInfo, Pos, Rect};
pub use value::{Attr, MouseMode, Prop, SelectionMask, StringFragment, Value, C1};
