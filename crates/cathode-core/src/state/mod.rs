//! The logical terminal state machine.
//!
//! Owns the cursor, modes, scroll regions, tab stops, character-set
//! designations and pen, and translates parsed events into abstract screen
//! operations on a [`StateListener`]. Responses to queries are emitted
//! through the [`Output`] sink.

mod csi;
mod mouse;
mod pen;
mod selection;

use cathode_common::{
    CathodeError, Color, CursorShape, DoubleHeight, LineInfo, MouseMode, Pen, Pos, Prop, Rect,
    Result, StringFragment, Value,
};
use tracing::{debug, trace};

use crate::callbacks::{GlyphInfo, ResizeFields, SelectionListener, StateListener};
use crate::encoding::{self, Encoding, EncodingType, Utf8Decoder};
use crate::output::Output;
use crate::rect_ops::plan_scroll;
use crate::unicode::{char_width, is_combining};

pub use mouse::MouseProtocol;
pub(crate) use selection::SelectionState;

use cathode_common::MAX_CHARS_PER_CELL;

const DEFAULT_TABSTOP_INTERVAL: i32 = 8;

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub(crate) struct MouseFlags: u8 {
        const CLICK = 0x01;
        const DRAG  = 0x02;
        const MOVE  = 0x04;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Modes {
    pub keypad: bool,
    pub cursor: bool,
    pub autowrap: bool,
    pub insert: bool,
    pub newline: bool,
    pub cursor_visible: bool,
    pub cursor_blink: bool,
    pub cursor_shape: CursorShape,
    pub alt_screen: bool,
    pub origin: bool,
    pub screen: bool,
    pub leftrightmargin: bool,
    pub bracketpaste: bool,
    pub report_focus: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct SavedCursor {
    pos: Pos,
    pen: Pen,
    cursor_visible: bool,
    cursor_blink: bool,
    cursor_shape: CursorShape,
}

pub(crate) struct SelectionCtx {
    pub listener: Option<Box<dyn SelectionListener>>,
    pub buffer: Vec<u8>,
    pub mask: cathode_common::SelectionMask,
    pub state: SelectionState,
    pub recvpartial: u32,
    pub sendpartial: u32,
}

pub struct State {
    rows: i32,
    cols: i32,

    pub(crate) pos: Pos,
    at_phantom: bool,

    scrollregion_top: i32,
    scrollregion_bottom: Option<i32>,
    scrollregion_left: i32,
    scrollregion_right: Option<i32>,

    tabstops: Vec<u8>,

    lineinfos: [Vec<LineInfo>; 2],
    lineinfo_bufidx: usize,

    // Mouse state
    pub(crate) mouse_col: i32,
    pub(crate) mouse_row: i32,
    pub(crate) mouse_buttons: i32,
    pub(crate) mouse_flags: MouseFlags,
    pub(crate) mouse_protocol: MouseProtocol,

    // Combining state: the last emitted glyph, so a combining mark arriving
    // in a later write can re-join it
    combine_chars: Vec<u32>,
    combine_width: i32,
    combine_pos: Pos,

    pub(crate) mode: Modes,

    encodings: [Encoding; 4],
    encoding_utf8: Encoding,
    gl_set: usize,
    gr_set: usize,
    gsingle_set: usize,

    pub(crate) pen: Pen,
    pub(crate) default_fg: Color,
    pub(crate) default_bg: Color,
    pub(crate) colors: [Color; 16],
    pub(crate) bold_is_highbright: bool,

    protected_cell: bool,

    saved: SavedCursor,

    decrqss: [u8; 4],
    decrqss_len: usize,

    pub(crate) selection: SelectionCtx,

    utf8: bool,
}

fn default_encoding(utf8: bool) -> Encoding {
    if utf8 {
        Encoding::Utf8(Utf8Decoder::default())
    } else {
        Encoding::UsAscii
    }
}

impl State {
    pub fn new(rows: i32, cols: i32, utf8: bool) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let mut state = Self {
            rows,
            cols,
            pos: Pos::default(),
            at_phantom: false,
            scrollregion_top: 0,
            scrollregion_bottom: None,
            scrollregion_left: 0,
            scrollregion_right: None,
            tabstops: vec![0; ((cols + 7) / 8) as usize],
            lineinfos: [
                vec![LineInfo::default(); rows as usize],
                vec![LineInfo::default(); rows as usize],
            ],
            lineinfo_bufidx: 0,
            mouse_col: 0,
            mouse_row: 0,
            mouse_buttons: 0,
            mouse_flags: MouseFlags::empty(),
            mouse_protocol: MouseProtocol::X10,
            combine_chars: Vec::with_capacity(16),
            combine_width: 0,
            combine_pos: Pos::default(),
            mode: Modes::default(),
            encodings: [
                default_encoding(utf8),
                default_encoding(utf8),
                default_encoding(utf8),
                default_encoding(utf8),
            ],
            encoding_utf8: default_encoding(true),
            gl_set: 0,
            gr_set: 1,
            gsingle_set: 0,
            pen: Pen::default(),
            default_fg: Color::Rgb(240, 240, 240),
            default_bg: Color::Rgb(0, 0, 0),
            colors: pen::default_ansi_palette(),
            bold_is_highbright: false,
            protected_cell: false,
            saved: SavedCursor::default(),
            decrqss: [0; 4],
            decrqss_len: 0,
            selection: SelectionCtx {
                listener: None,
                buffer: Vec::new(),
                mask: cathode_common::SelectionMask::empty(),
                state: SelectionState::Initial,
                recvpartial: 0,
                sendpartial: 0,
            },
            utf8,
        };
        // Start out in the same shape a soft reset produces
        let mut scratch = Output::new(0);
        state.reset(false, &mut crate::callbacks::NullListener, &mut scratch);
        state
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn cursor_pos(&self) -> Pos {
        self.pos
    }

    pub fn utf8(&self) -> bool {
        self.utf8
    }

    /// Switching UTF-8 mode rebinds all designation slots to the new
    /// default decoder.
    pub(crate) fn set_utf8(&mut self, enabled: bool) {
        if self.utf8 == enabled {
            return;
        }
        self.utf8 = enabled;
        for slot in &mut self.encodings {
            *slot = default_encoding(enabled);
        }
    }

    pub fn lineinfo(&self, row: i32) -> LineInfo {
        self.lineinfo_at(row)
    }

    pub fn set_bold_highbright(&mut self, enabled: bool) {
        self.bold_is_highbright = enabled;
    }

    pub fn set_selection_listener(
        &mut self,
        listener: Box<dyn SelectionListener>,
        buflen: usize,
    ) -> Result<()> {
        if buflen < 4 {
            return Err(CathodeError::SelectionBuffer { len: buflen });
        }
        self.selection.listener = Some(listener);
        self.selection.buffer = vec![0; buflen];
        Ok(())
    }

    pub fn clear_selection_listener(&mut self) {
        self.selection.listener = None;
        self.selection.buffer = Vec::new();
    }

    // ---- internal helpers ----

    fn lineinfo_at(&self, row: i32) -> LineInfo {
        self.lineinfos[self.lineinfo_bufidx]
            .get(row as usize)
            .copied()
            .unwrap_or_default()
    }

    fn store_lineinfo(&mut self, row: i32, info: LineInfo) {
        if let Some(slot) = self.lineinfos[self.lineinfo_bufidx].get_mut(row as usize) {
            *slot = info;
        }
    }

    pub(crate) fn scrollregion_bottom_val(&self) -> i32 {
        self.scrollregion_bottom.unwrap_or(self.rows)
    }

    pub(crate) fn scrollregion_left_val(&self) -> i32 {
        if self.mode.leftrightmargin {
            self.scrollregion_left
        } else {
            0
        }
    }

    pub(crate) fn scrollregion_right_val(&self) -> i32 {
        if self.mode.leftrightmargin {
            self.scrollregion_right.unwrap_or(self.cols)
        } else {
            self.cols
        }
    }

    fn row_width(&self, row: i32) -> i32 {
        if self.lineinfo_at(row).doublewidth {
            self.cols / 2
        } else {
            self.cols
        }
    }

    pub(crate) fn this_row_width(&self) -> i32 {
        self.row_width(self.pos.row)
    }

    fn emit_glyph(&self, ops: &mut dyn StateListener, chars: &[u32], width: i32, pos: Pos) {
        let li = self.lineinfo_at(pos.row);
        let info = GlyphInfo {
            chars,
            width,
            protected_cell: self.protected_cell,
            dwl: li.doublewidth,
            dhl: li.doubleheight,
        };
        if !ops.putglyph(&info, pos) {
            debug!(
                "unhandled putglyph U+{:04x} at ({},{})",
                chars.first().copied().unwrap_or(0),
                pos.row,
                pos.col
            );
        }
    }

    pub(crate) fn updatecursor(&mut self, oldpos: Pos, cancel_phantom: bool, ops: &mut dyn StateListener) {
        if self.pos == oldpos {
            return;
        }
        if cancel_phantom {
            self.at_phantom = false;
        }
        let _ = ops.movecursor(self.pos, oldpos, self.mode.cursor_visible);
    }

    pub(crate) fn erase(&mut self, rect: Rect, selective: bool, ops: &mut dyn StateListener) {
        if rect.end_col == self.cols {
            // Erasing the final cells of a row cancels the continuation
            // marker on the row below it
            for row in (rect.start_row + 1)..(rect.end_row + 1).min(self.rows) {
                if let Some(li) = self.lineinfos[self.lineinfo_bufidx].get_mut(row as usize) {
                    li.continuation = false;
                }
            }
        }

        let _ = ops.erase(rect, selective);
    }

    pub(crate) fn scroll(
        &mut self,
        rect: Rect,
        downward: i32,
        rightward: i32,
        ops: &mut dyn StateListener,
    ) {
        if downward == 0 && rightward == 0 {
            return;
        }

        let downward = downward.clamp(-rect.height(), rect.height());
        let rightward = rightward.clamp(-rect.width(), rect.width());

        // Announce the subsection of the rect about to be destroyed
        if downward > 0 {
            let r = Rect::new(rect.start_row, rect.start_row + downward, rect.start_col, rect.end_col);
            let _ = ops.premove(r, &self.lineinfos[self.lineinfo_bufidx]);
        } else if downward < 0 {
            let r = Rect::new(rect.end_row + downward, rect.end_row, rect.start_col, rect.end_col);
            let _ = ops.premove(r, &self.lineinfos[self.lineinfo_bufidx]);
        }
        if rightward > 0 {
            let r = Rect::new(rect.start_row, rect.end_row, rect.start_col, rect.start_col + rightward);
            let _ = ops.premove(r, &self.lineinfos[self.lineinfo_bufidx]);
        } else if rightward < 0 {
            let r = Rect::new(rect.start_row, rect.end_row, rect.end_col + rightward, rect.end_col);
            let _ = ops.premove(r, &self.lineinfos[self.lineinfo_bufidx]);
        }

        // Line info scrolls with full-width vertical scrolls
        if rect.start_col == 0 && rect.end_col == self.cols && rightward == 0 {
            let height = rect.height() - downward.abs();
            let li = &mut self.lineinfos[self.lineinfo_bufidx];
            if downward > 0 {
                let src = (rect.start_row + downward) as usize;
                li.copy_within(src..src + height as usize, rect.start_row as usize);
                for row in (rect.end_row - downward)..rect.end_row {
                    li[row as usize] = LineInfo::default();
                }
            } else {
                let src = rect.start_row as usize;
                li.copy_within(src..src + height as usize, (rect.start_row - downward) as usize);
                for row in rect.start_row..(rect.start_row - downward) {
                    li[row as usize] = LineInfo::default();
                }
            }
        }

        if ops.scrollrect(rect, downward, rightward) {
            return;
        }

        // No scrollrect handler; decompose into moverect + erase
        let plan = plan_scroll(rect, downward, rightward);
        if let Some((dest, src)) = plan.moverect {
            let _ = ops.moverect(dest, src);
        }
        let _ = ops.erase(plan.erase, false);
    }

    pub(crate) fn linefeed(&mut self, ops: &mut dyn StateListener) {
        if self.pos.row == self.scrollregion_bottom_val() - 1 {
            let rect = Rect::new(
                self.scrollregion_top,
                self.scrollregion_bottom_val(),
                self.scrollregion_left_val(),
                self.scrollregion_right_val(),
            );
            self.scroll(rect, 1, 0, ops);
        } else if self.pos.row < self.rows - 1 {
            self.pos.row += 1;
        }
    }

    fn set_col_tabstop(&mut self, col: i32) {
        let mask = 1u8 << (col & 7);
        self.tabstops[(col >> 3) as usize] |= mask;
    }

    fn clear_col_tabstop(&mut self, col: i32) {
        let mask = 1u8 << (col & 7);
        self.tabstops[(col >> 3) as usize] &= !mask;
    }

    fn is_col_tabstop(&self, col: i32) -> bool {
        let mask = 1u8 << (col & 7);
        self.tabstops
            .get((col >> 3) as usize)
            .is_some_and(|b| b & mask != 0)
    }

    pub(crate) fn is_cursor_in_scrollregion(&self) -> bool {
        if self.pos.row < self.scrollregion_top || self.pos.row >= self.scrollregion_bottom_val() {
            return false;
        }
        if self.pos.col < self.scrollregion_left_val()
            || self.pos.col >= self.scrollregion_right_val()
        {
            return false;
        }
        true
    }

    pub(crate) fn tab(&mut self, mut count: i64, direction: i32) {
        while count > 0 {
            if direction > 0 {
                if self.pos.col >= self.this_row_width() - 1 {
                    return;
                }
                self.pos.col += 1;
            } else {
                if self.pos.col < 1 {
                    return;
                }
                self.pos.col -= 1;
            }

            if self.is_col_tabstop(self.pos.col) {
                count -= 1;
            }
        }
    }

    pub(crate) fn set_lineinfo(
        &mut self,
        row: i32,
        force: bool,
        dwl: bool,
        dhl: DoubleHeight,
        ops: &mut dyn StateListener,
    ) {
        let old = self.lineinfo_at(row);
        let mut info = old;
        info.doublewidth = dwl;
        info.doubleheight = dhl;

        if ops.setlineinfo(row, info, old) || force {
            self.store_lineinfo(row, info);
        }
    }

    // ---- termprops ----

    pub(crate) fn settermprop_bool(&mut self, prop: Prop, v: bool, ops: &mut dyn StateListener) -> bool {
        self.settermprop(prop, &Value::Bool(v), ops)
    }

    pub(crate) fn settermprop_int(&mut self, prop: Prop, v: i64, ops: &mut dyn StateListener) -> bool {
        self.settermprop(prop, &Value::Int(v), ops)
    }

    fn settermprop_string(
        &mut self,
        prop: Prop,
        frag: StringFragment<'_>,
        ops: &mut dyn StateListener,
    ) -> bool {
        self.settermprop(prop, &Value::Str(frag), ops)
    }

    /// Apply a property change. The listener sees it first and may refuse
    /// it, in which case no state is stored; this matters for altscreen
    /// switching when no alternate buffer exists.
    pub fn settermprop(&mut self, prop: Prop, val: &Value<'_>, ops: &mut dyn StateListener) -> bool {
        if !ops.settermprop(prop, val) {
            return false;
        }

        match prop {
            Prop::Title | Prop::IconName => true,
            Prop::CursorVisible => {
                self.mode.cursor_visible = val.as_bool().unwrap_or(false);
                true
            }
            Prop::CursorBlink => {
                self.mode.cursor_blink = val.as_bool().unwrap_or(false);
                true
            }
            Prop::CursorShape => {
                if let Some(shape) = val.as_int().and_then(CursorShape::from_i64) {
                    self.mode.cursor_shape = shape;
                }
                true
            }
            Prop::Reverse => {
                self.mode.screen = val.as_bool().unwrap_or(false);
                true
            }
            Prop::AltScreen => {
                self.mode.alt_screen = val.as_bool().unwrap_or(false);
                self.lineinfo_bufidx = usize::from(self.mode.alt_screen);
                if self.mode.alt_screen {
                    let rect = Rect::new(0, self.rows, 0, self.cols);
                    self.erase(rect, false, ops);
                }
                true
            }
            Prop::Mouse => {
                let level = val.as_int().unwrap_or(0);
                self.mouse_flags = MouseFlags::empty();
                if level != 0 {
                    self.mouse_flags |= MouseFlags::CLICK;
                }
                if level == MouseMode::Drag as i64 {
                    self.mouse_flags |= MouseFlags::DRAG;
                }
                if level == MouseMode::Move as i64 {
                    self.mouse_flags |= MouseFlags::MOVE;
                }
                true
            }
            Prop::FocusReport => {
                self.mode.report_focus = val.as_bool().unwrap_or(false);
                true
            }
        }
    }

    // ---- cursor save/restore ----

    pub(crate) fn savecursor(&mut self, save: bool, ops: &mut dyn StateListener) {
        if save {
            self.saved.pos = self.pos;
            self.saved.cursor_visible = self.mode.cursor_visible;
            self.saved.cursor_blink = self.mode.cursor_blink;
            self.saved.cursor_shape = self.mode.cursor_shape;
            self.savepen(true, ops);
        } else {
            let oldpos = self.pos;

            self.pos = self.saved.pos;
            if self.pos.row >= self.rows {
                self.pos.row = self.rows - 1;
            }
            if self.pos.col >= self.cols {
                self.pos.col = self.cols - 1;
            }

            let visible = self.saved.cursor_visible;
            let blink = self.saved.cursor_blink;
            let shape = self.saved.cursor_shape;
            self.settermprop_bool(Prop::CursorVisible, visible, ops);
            self.settermprop_bool(Prop::CursorBlink, blink, ops);
            self.settermprop_int(Prop::CursorShape, shape as i64, ops);

            self.savepen(false, ops);

            self.updatecursor(oldpos, true, ops);
        }
    }

    // ---- text ingestion ----

    pub(crate) fn on_text(&mut self, bytes: &[u8], ops: &mut dyn StateListener) -> usize {
        if bytes.is_empty() {
            return 0;
        }

        let oldpos = self.pos;

        const MAX_DECODE: usize = 1024;
        let mut codepoints = [0u32; MAX_DECODE];

        let limit = if self.gsingle_set != 0 { 1 } else { MAX_DECODE };
        let enc = if self.gsingle_set != 0 {
            &mut self.encodings[self.gsingle_set]
        } else if bytes[0] & 0x80 == 0 {
            &mut self.encodings[self.gl_set]
        } else if self.utf8 {
            &mut self.encoding_utf8
        } else {
            &mut self.encodings[self.gr_set]
        };

        let (npoints, eaten) = enc.decode(&mut codepoints[..limit], bytes);

        // The encoding may not have found enough bytes yet for even a
        // single codepoint
        if npoints == 0 {
            return eaten;
        }

        if self.gsingle_set != 0 {
            self.gsingle_set = 0;
        }

        let mut i = 0usize;

        // A combining char that needs to merge with the previous glyph
        if is_combining(codepoints[0]) {
            if self.pos.row == self.combine_pos.row
                && self.pos.col == self.combine_pos.col + self.combine_width
            {
                while i < npoints && is_combining(codepoints[i]) {
                    self.combine_chars.push(codepoints[i]);
                    i += 1;
                }
                self.emit_glyph(ops, &self.combine_chars, self.combine_width, self.combine_pos);
            } else {
                trace!("combining char with no glyph to join");
            }
        }

        while i < npoints {
            let glyph_start = i;
            let mut glyph_end = i + 1;
            while glyph_end < npoints && glyph_end < glyph_start + MAX_CHARS_PER_CELL {
                if !is_combining(codepoints[glyph_end]) {
                    break;
                }
                glyph_end += 1;
            }

            let mut width = 0i32;
            let mut chars = [0u32; MAX_CHARS_PER_CELL];
            for k in glyph_start..glyph_end {
                chars[k - glyph_start] = codepoints[k];
                let w = char_width(codepoints[k]);
                debug_assert!(w >= 0, "control codepoint U+{:04x} in text", codepoints[k]);
                width += w.max(0);
            }

            i = glyph_end;
            // Combining chars beyond the per-cell limit are dropped
            while i < npoints && is_combining(codepoints[i]) {
                i += 1;
            }
            let glyph_count = glyph_end - glyph_start;

            if self.at_phantom || self.pos.col + width > self.this_row_width() {
                self.linefeed(ops);
                self.pos.col = 0;
                self.at_phantom = false;
                let row = self.pos.row;
                if let Some(li) = self.lineinfos[self.lineinfo_bufidx].get_mut(row as usize) {
                    li.continuation = true;
                }
            }

            if self.mode.insert {
                let rect = Rect::new(
                    self.pos.row,
                    self.pos.row + 1,
                    self.pos.col,
                    self.this_row_width(),
                );
                self.scroll(rect, 0, -1, ops);
            }

            self.emit_glyph(ops, &chars[..glyph_count], width, self.pos);

            if i == npoints {
                // End of the buffer; remember the glyph in case the next
                // write starts with combining chars
                self.combine_chars.clear();
                self.combine_chars.extend_from_slice(&chars[..glyph_count]);
                self.combine_width = width;
                self.combine_pos = self.pos;
            }

            if self.pos.col + width >= self.this_row_width() {
                if self.mode.autowrap {
                    self.at_phantom = true;
                }
            } else {
                self.pos.col += width;
            }
        }

        self.updatecursor(oldpos, false, ops);

        debug_assert!(
            self.pos.row >= 0 && self.pos.row < self.rows && self.pos.col >= 0 && self.pos.col < self.cols,
            "cursor out of bounds after text: ({},{})",
            self.pos.row,
            self.pos.col
        );

        eaten
    }

    // ---- control handler ----

    pub(crate) fn on_control(&mut self, control: u8, ops: &mut dyn StateListener) -> bool {
        let oldpos = self.pos;

        match control {
            0x07 => {
                // BEL
                let _ = ops.bell();
            }
            0x08 => {
                // BS
                if self.pos.col > 0 {
                    self.pos.col -= 1;
                }
            }
            0x09 => {
                // HT
                self.tab(1, 1);
            }
            0x0a | 0x0b | 0x0c => {
                // LF, VT, FF
                self.linefeed(ops);
                if self.mode.newline {
                    self.pos.col = 0;
                }
            }
            0x0d => {
                // CR
                self.pos.col = 0;
            }
            0x0e => {
                // LS1
                self.gl_set = 1;
            }
            0x0f => {
                // LS0
                self.gl_set = 0;
            }
            0x84 => {
                // IND
                self.linefeed(ops);
            }
            0x85 => {
                // NEL
                self.linefeed(ops);
                self.pos.col = 0;
            }
            0x88 => {
                // HTS
                self.set_col_tabstop(self.pos.col);
            }
            0x8d => {
                // RI
                if self.pos.row == self.scrollregion_top {
                    let rect = Rect::new(
                        self.scrollregion_top,
                        self.scrollregion_bottom_val(),
                        self.scrollregion_left_val(),
                        self.scrollregion_right_val(),
                    );
                    self.scroll(rect, -1, 0, ops);
                } else if self.pos.row > 0 {
                    self.pos.row -= 1;
                }
            }
            0x8e => {
                // SS2
                self.gsingle_set = 2;
            }
            0x8f => {
                // SS3
                self.gsingle_set = 3;
            }
            _ => return false,
        }

        self.updatecursor(oldpos, true, ops);

        debug_assert!(
            self.pos.row >= 0 && self.pos.row < self.rows && self.pos.col >= 0 && self.pos.col < self.cols,
            "cursor out of bounds after control 0x{:02x}",
            control
        );

        true
    }

    // ---- escape handler ----

    pub(crate) fn on_escape(
        &mut self,
        bytes: &[u8],
        ops: &mut dyn StateListener,
        out: &mut Output,
    ) -> bool {
        match bytes[0] {
            b' ' => {
                if bytes.len() != 2 {
                    return false;
                }
                match bytes[1] {
                    b'F' => out.set_ctrl8bit(false), // S7C1T
                    b'G' => out.set_ctrl8bit(true),  // S8C1T
                    _ => return false,
                }
                true
            }

            b'#' => {
                if bytes.len() != 2 {
                    return false;
                }
                match bytes[1] {
                    b'3' => {
                        // DECDHL top
                        if !self.mode.leftrightmargin {
                            self.set_lineinfo(self.pos.row, false, true, DoubleHeight::Top, ops);
                        }
                    }
                    b'4' => {
                        // DECDHL bottom
                        if !self.mode.leftrightmargin {
                            self.set_lineinfo(self.pos.row, false, true, DoubleHeight::Bottom, ops);
                        }
                    }
                    b'5' => {
                        // DECSWL
                        if !self.mode.leftrightmargin {
                            self.set_lineinfo(self.pos.row, false, false, DoubleHeight::Off, ops);
                        }
                    }
                    b'6' => {
                        // DECDWL
                        if !self.mode.leftrightmargin {
                            self.set_lineinfo(self.pos.row, false, true, DoubleHeight::Off, ops);
                        }
                    }
                    b'8' => {
                        // DECALN
                        for row in 0..self.rows {
                            for col in 0..self.row_width(row) {
                                self.emit_glyph(ops, &[b'E' as u32], 1, Pos::new(row, col));
                            }
                        }
                    }
                    _ => return false,
                }
                true
            }

            b'(' | b')' | b'*' | b'+' => {
                // SCS
                if bytes.len() != 2 {
                    return false;
                }
                let setnum = (bytes[0] - b'(') as usize;
                if let Some(mut enc) = encoding::create(EncodingType::Single94, bytes[1]) {
                    enc.reset();
                    self.encodings[setnum] = enc;
                }
                true
            }

            b'7' => {
                // DECSC
                self.savecursor(true, ops);
                true
            }

            b'8' => {
                // DECRC
                self.savecursor(false, ops);
                true
            }

            // Ignored by VT100; used in VT52 mode to switch up to VT100
            b'<' => true,

            b'=' => {
                // DECKPAM
                self.mode.keypad = true;
                true
            }

            b'>' => {
                // DECKPNM
                self.mode.keypad = false;
                true
            }

            b'c' => {
                // RIS
                let oldpos = self.pos;
                self.reset(true, ops, out);
                let _ = ops.movecursor(self.pos, oldpos, self.mode.cursor_visible);
                true
            }

            b'n' => {
                // LS2
                self.gl_set = 2;
                true
            }

            b'o' => {
                // LS3
                self.gl_set = 3;
                true
            }

            b'~' => {
                // LS1R
                self.gr_set = 1;
                true
            }

            b'}' => {
                // LS2R
                self.gr_set = 2;
                true
            }

            b'|' => {
                // LS3R
                self.gr_set = 3;
                true
            }

            _ => false,
        }
    }

    // ---- mode helpers ----

    pub(crate) fn set_mode(&mut self, num: i64, val: bool) {
        match num {
            4 => self.mode.insert = val,   // IRM
            20 => self.mode.newline = val, // LNM
            _ => debug!("unknown mode {}", num),
        }
    }

    pub(crate) fn set_dec_mode(&mut self, num: i64, val: bool, ops: &mut dyn StateListener) {
        match num {
            1 => self.mode.cursor = val,
            5 => {
                // DECSCNM
                self.settermprop_bool(Prop::Reverse, val, ops);
            }
            6 => {
                // DECOM
                let oldpos = self.pos;
                self.mode.origin = val;
                self.pos.row = if val { self.scrollregion_top } else { 0 };
                self.pos.col = if val { self.scrollregion_left_val() } else { 0 };
                self.updatecursor(oldpos, true, ops);
            }
            7 => self.mode.autowrap = val,
            12 => {
                self.settermprop_bool(Prop::CursorBlink, val, ops);
            }
            25 => {
                self.settermprop_bool(Prop::CursorVisible, val, ops);
            }
            69 => {
                // DECLRMM; setting it clears every line's dwl/dhl state
                self.mode.leftrightmargin = val;
                if val {
                    for row in 0..self.rows {
                        self.set_lineinfo(row, true, false, DoubleHeight::Off, ops);
                    }
                }
            }
            1000 | 1002 | 1003 => {
                let level = if !val {
                    MouseMode::None
                } else if num == 1000 {
                    MouseMode::Click
                } else if num == 1002 {
                    MouseMode::Drag
                } else {
                    MouseMode::Move
                };
                self.settermprop_int(Prop::Mouse, level as i64, ops);
            }
            1004 => {
                self.settermprop_bool(Prop::FocusReport, val, ops);
                self.mode.report_focus = val;
            }
            1005 => {
                self.mouse_protocol = if val { MouseProtocol::Utf8 } else { MouseProtocol::X10 };
            }
            1006 => {
                self.mouse_protocol = if val { MouseProtocol::Sgr } else { MouseProtocol::X10 };
            }
            1015 => {
                self.mouse_protocol = if val { MouseProtocol::Rxvt } else { MouseProtocol::X10 };
            }
            1047 => {
                self.settermprop_bool(Prop::AltScreen, val, ops);
            }
            1048 => {
                self.savecursor(val, ops);
            }
            1049 => {
                self.settermprop_bool(Prop::AltScreen, val, ops);
                self.savecursor(val, ops);
            }
            2004 => self.mode.bracketpaste = val,
            _ => debug!("unknown DEC mode {}", num),
        }
    }

    pub(crate) fn request_dec_mode(&mut self, num: i64, out: &mut Output) {
        let reply = match num {
            1 => self.mode.cursor,
            5 => self.mode.screen,
            6 => self.mode.origin,
            7 => self.mode.autowrap,
            12 => self.mode.cursor_blink,
            25 => self.mode.cursor_visible,
            69 => self.mode.leftrightmargin,
            1000 => self.mouse_flags == MouseFlags::CLICK,
            1002 => self.mouse_flags == (MouseFlags::CLICK | MouseFlags::DRAG),
            1003 => self.mouse_flags == (MouseFlags::CLICK | MouseFlags::MOVE),
            1004 => self.mode.report_focus,
            1005 => self.mouse_protocol == MouseProtocol::Utf8,
            1006 => self.mouse_protocol == MouseProtocol::Sgr,
            1015 => self.mouse_protocol == MouseProtocol::Rxvt,
            1047 => self.mode.alt_screen,
            2004 => self.mode.bracketpaste,
            _ => {
                out.push_ctrl(cathode_common::C1::Csi, format_args!("?{};{}$y", num, 0));
                return;
            }
        };
        out.push_ctrl(
            cathode_common::C1::Csi,
            format_args!("?{};{}$y", num, if reply { 1 } else { 2 }),
        );
    }

    pub(crate) fn request_version_string(&mut self, out: &mut Output) {
        out.push_str_seq(
            Some(cathode_common::C1::Dcs),
            true,
            format_args!(">|cathode({}.{})", crate::VERSION_MAJOR, crate::VERSION_MINOR),
        );
    }

    // ---- OSC handler ----

    pub(crate) fn on_osc(
        &mut self,
        command: i32,
        frag: StringFragment<'_>,
        ops: &mut dyn StateListener,
    ) -> bool {
        match command {
            0 => {
                self.settermprop_string(Prop::IconName, frag, ops);
                self.settermprop_string(Prop::Title, frag, ops);
                true
            }
            1 => {
                self.settermprop_string(Prop::IconName, frag, ops);
                true
            }
            2 => {
                self.settermprop_string(Prop::Title, frag, ops);
                true
            }
            52 => {
                if self.selection.listener.is_some() {
                    self.osc_selection(frag);
                }
                true
            }
            _ => false,
        }
    }

    // ---- DCS handler ----

    pub(crate) fn on_dcs(&mut self, command: &[u8], frag: StringFragment<'_>, out: &mut Output) -> bool {
        if command == b"$q" {
            self.request_status_string(frag, out);
            return true;
        }
        debug!("unhandled DCS {:?}", command);
        false
    }

    // ---- resize ----

    pub(crate) fn on_resize(&mut self, rows: i32, cols: i32, ops: &mut dyn StateListener) {
        let oldpos = self.pos;

        if cols != self.cols {
            let mut newtabstops = vec![0u8; ((cols + 7) / 8) as usize];
            let common = newtabstops.len().min(self.tabstops.len());
            newtabstops[..common].copy_from_slice(&self.tabstops[..common]);

            for col in self.cols..cols {
                let mask = 1u8 << (col & 7);
                if col % DEFAULT_TABSTOP_INTERVAL == 0 {
                    newtabstops[(col >> 3) as usize] |= mask;
                } else {
                    newtabstops[(col >> 3) as usize] &= !mask;
                }
            }

            self.tabstops = newtabstops;
        }

        let old_rows = self.rows;
        self.rows = rows;
        self.cols = cols;

        if let Some(b) = self.scrollregion_bottom {
            if b > rows {
                self.scrollregion_bottom = Some(rows);
            }
        }
        if let Some(r) = self.scrollregion_right {
            if r > cols {
                self.scrollregion_right = Some(cols);
            }
        }

        // Reset a region that clamping left degenerate
        if self.scrollregion_top >= rows
            || matches!(self.scrollregion_bottom, Some(b) if b <= self.scrollregion_top)
        {
            self.scrollregion_top = 0;
            self.scrollregion_bottom = None;
        }
        if self.scrollregion_left >= cols
            || matches!(self.scrollregion_right, Some(r) if r <= self.scrollregion_left)
        {
            self.scrollregion_left = 0;
            self.scrollregion_right = None;
        }

        let mut newpos = self.pos;
        let handled = {
            let [li0, li1] = &mut self.lineinfos;
            let mut fields = ResizeFields {
                pos: newpos,
                lineinfos: [li0, li1],
            };
            let handled = ops.resize(rows, cols, &mut fields);
            if handled {
                newpos = fields.pos;
            }
            handled
        };
        self.pos = newpos;

        if !handled && rows != old_rows {
            for li in &mut self.lineinfos {
                if li.is_empty() {
                    continue;
                }
                li.resize(rows as usize, LineInfo::default());
            }
        }

        self.lineinfo_bufidx = usize::from(self.mode.alt_screen);

        if self.at_phantom && self.pos.col < cols - 1 {
            self.at_phantom = false;
            self.pos.col += 1;
        }

        self.pos.row = self.pos.row.clamp(0, rows - 1);
        self.pos.col = self.pos.col.clamp(0, cols - 1);

        self.updatecursor(oldpos, true, ops);
    }

    // ---- reset ----

    /// Soft reset clears modes, regions, tab stops and the pen; hard reset
    /// additionally homes the cursor and erases the screen.
    pub fn reset(&mut self, hard: bool, ops: &mut dyn StateListener, out: &mut Output) {
        self.scrollregion_top = 0;
        self.scrollregion_bottom = None;
        self.scrollregion_left = 0;
        self.scrollregion_right = None;

        self.mode.keypad = false;
        self.mode.cursor = false;
        self.mode.autowrap = true;
        self.mode.insert = false;
        self.mode.newline = false;
        self.mode.alt_screen = false;
        self.mode.origin = false;
        self.mode.leftrightmargin = false;
        self.mode.bracketpaste = false;
        self.mode.report_focus = false;

        self.mouse_flags = MouseFlags::empty();

        out.set_ctrl8bit(false);

        for col in 0..self.cols {
            if col % DEFAULT_TABSTOP_INTERVAL == 0 {
                self.set_col_tabstop(col);
            } else {
                self.clear_col_tabstop(col);
            }
        }

        for row in 0..self.rows {
            self.set_lineinfo(row, true, false, DoubleHeight::Off, ops);
        }

        let _ = ops.initpen();
        self.resetpen(ops);

        for slot in &mut self.encodings {
            *slot = default_encoding(self.utf8);
        }

        self.gl_set = 0;
        self.gr_set = 1;
        self.gsingle_set = 0;

        self.protected_cell = false;

        self.settermprop_bool(Prop::CursorVisible, true, ops);
        self.settermprop_bool(Prop::CursorBlink, true, ops);
        self.settermprop_int(Prop::CursorShape, CursorShape::Block as i64, ops);

        if hard {
            self.pos = Pos::new(0, 0);
            self.at_phantom = false;

            let rect = Rect::new(0, self.rows, 0, self.cols);
            self.erase(rect, false, ops);
        }
    }

}

#[cfg(test)]
mod tests;
