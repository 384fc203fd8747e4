//! cathode-core: an embeddable terminal emulator engine.
//!
//! The engine consumes the byte stream a program writes to its controlling
//! terminal, interprets it as an ECMA-48 / VT control sequence stream, and
//! maintains an in-memory model of the display. It performs no I/O, owns no
//! threads, and dispatches all effects synchronously through host-installed
//! callback traits. See [`Terminal`] for the entry point.

pub mod callbacks;
pub mod encoding;
pub mod keyboard;
pub mod output;
pub mod screen;
pub mod state;
pub mod unicode;

mod rect_ops;
mod terminal;

pub use callbacks::{Fallbacks, GlyphInfo, ResizeFields, ScreenListener, SelectionListener, StateListener};
pub use keyboard::{Key, Modifier};
pub use output::Output;
pub use screen::{DamageMerge, Screen};
pub use state::{MouseProtocol, State};
pub use terminal::Terminal;

pub use cathode_common::{
    Attr, Baseline, CathodeError, CellAttrs, Color, CursorShape, DoubleHeight, LineInfo,
    MouseMode, Pen, Pos, Prop, Rect, Result, ScreenCell, SelectionMask, StringFragment,
    Underline, Value, MAX_CHARS_PER_CELL, WIDECHAR_CONT,
};
pub use cathode_parser::CsiParam;

/// Version advertised through XTVERSION queries.
pub const VERSION_MAJOR: u32 = 0;
pub const VERSION_MINOR: u32 = 1;

/// Secondary Device Attributes firmware version field.
pub const DA2_FIRMWARE_VERSION: u32 = 100;
