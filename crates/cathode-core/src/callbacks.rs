//! Callback traits through which the engine reports effects to the host.
//!
//! Boolean returns mean "handled". The state layer drives a
//! [`StateListener`] (the built-in screen layer implements it); the screen
//! layer drives a [`ScreenListener`] installed by the host.

use cathode_common::{
    Attr, DoubleHeight, LineInfo, Pos, Prop, Rect, ScreenCell, SelectionMask, StringFragment,
    Value,
};
use cathode_parser::CsiParam;

/// A glyph about to be stored: base codepoint plus combining marks.
#[derive(Debug, Clone, Copy)]
pub struct GlyphInfo<'a> {
    pub chars: &'a [u32],
    pub width: i32,
    pub protected_cell: bool,
    pub dwl: bool,
    pub dhl: DoubleHeight,
}

/// Mutable state exposed to the `resize` callback: the handler may adjust
/// the cursor and rebuild the per-row line info of either buffer.
pub struct ResizeFields<'a> {
    pub pos: Pos,
    pub lineinfos: [&'a mut Vec<LineInfo>; 2],
}

/// Abstract screen operations emitted by the state layer.
#[allow(unused_variables)]
pub trait StateListener {
    fn putglyph(&mut self, glyph: &GlyphInfo<'_>, pos: Pos) -> bool {
        false
    }

    fn movecursor(&mut self, pos: Pos, oldpos: Pos, visible: bool) -> bool {
        false
    }

    fn scrollrect(&mut self, rect: Rect, downward: i32, rightward: i32) -> bool {
        false
    }

    fn moverect(&mut self, dest: Rect, src: Rect) -> bool {
        false
    }

    fn erase(&mut self, rect: Rect, selective: bool) -> bool {
        false
    }

    fn initpen(&mut self) -> bool {
        false
    }

    fn setpenattr(&mut self, attr: Attr, val: &Value<'_>) -> bool {
        false
    }

    /// Returning false refuses the property; the state will not store it.
    fn settermprop(&mut self, prop: Prop, val: &Value<'_>) -> bool {
        true
    }

    fn setlineinfo(&mut self, row: i32, newinfo: LineInfo, oldinfo: LineInfo) -> bool {
        true
    }

    fn bell(&mut self) -> bool {
        false
    }

    fn resize(&mut self, rows: i32, cols: i32, fields: &mut ResizeFields<'_>) -> bool {
        false
    }

    fn sb_pushline(&mut self, cells: &[ScreenCell], continuation: bool) -> bool {
        false
    }

    /// Fill `cells` with the most recently pushed scrollback line. Returns
    /// `Some(continuation)` on success, `None` when the scrollback is empty.
    fn sb_popline(&mut self, cells: &mut [ScreenCell]) -> Option<bool> {
        None
    }

    fn sb_clear(&mut self) -> bool {
        false
    }

    /// Fired immediately before a scroll destroys the content of `rect`.
    /// `lineinfo` is the active buffer's per-row metadata, so scrollback
    /// handlers can propagate continuation bits.
    fn premove(&mut self, rect: Rect, lineinfo: &[LineInfo]) -> bool {
        false
    }
}

/// Events emitted by the screen layer for a rendering host.
#[allow(unused_variables)]
pub trait ScreenListener {
    fn damage(&mut self, rect: Rect) -> bool {
        false
    }

    fn moverect(&mut self, dest: Rect, src: Rect) -> bool {
        false
    }

    fn movecursor(&mut self, pos: Pos, oldpos: Pos, visible: bool) -> bool {
        false
    }

    fn settermprop(&mut self, prop: Prop, val: &Value<'_>) -> bool {
        true
    }

    fn bell(&mut self) -> bool {
        false
    }

    fn resize(&mut self, rows: i32, cols: i32) -> bool {
        false
    }

    fn sb_pushline(&mut self, cells: &[ScreenCell], continuation: bool) -> bool {
        false
    }

    fn sb_popline(&mut self, cells: &mut [ScreenCell]) -> Option<bool> {
        None
    }

    fn sb_clear(&mut self) -> bool {
        false
    }
}

/// OSC 52 selection traffic.
pub trait SelectionListener {
    /// The application asked for the current selection contents.
    fn query(&mut self, mask: SelectionMask);

    /// A decoded fragment of selection data set by the application.
    fn set(&mut self, mask: SelectionMask, frag: StringFragment<'_>);
}

/// Host hooks for sequences the engine itself does not handle. Returning
/// true claims the sequence; otherwise it is dropped.
#[allow(unused_variables)]
pub trait Fallbacks {
    fn control(&mut self, byte: u8) -> bool {
        false
    }

    fn escape(&mut self, bytes: &[u8]) -> bool {
        false
    }

    fn csi(&mut self, leader: &[u8], args: &[CsiParam], intermed: &[u8], command: u8) -> bool {
        false
    }

    fn osc(&mut self, command: i32, frag: StringFragment<'_>) -> bool {
        false
    }

    fn dcs(&mut self, command: &[u8], frag: StringFragment<'_>) -> bool {
        false
    }

    fn apc(&mut self, frag: StringFragment<'_>) -> bool {
        false
    }

    fn pm(&mut self, frag: StringFragment<'_>) -> bool {
        false
    }

    fn sos(&mut self, frag: StringFragment<'_>) -> bool {
        false
    }
}

/// Listener that drops everything; used when the host has installed
/// neither a screen nor state hooks.
pub(crate) struct NullListener;

impl StateListener for NullListener {}
