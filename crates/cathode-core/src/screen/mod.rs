//! The screen layer: a cell grid for the primary and alternate buffers,
//! damage accounting, scrollback handoff, and read-back queries.
//!
//! The screen implements [`StateListener`], materialising the state
//! layer's abstract operations into stored cells, and reports changes to a
//! host-installed [`ScreenListener`].

mod resize;

use cathode_common::{
    Baseline, CellAttrs, Color, DoubleHeight, LineInfo, Pos, Prop, Rect, ScreenCell, Underline,
    Value, MAX_CHARS_PER_CELL, WIDECHAR_CONT,
};

use crate::callbacks::{GlyphInfo, ResizeFields, ScreenListener, StateListener};
use crate::rect_ops::plan_scroll;

/// How aggressively damage rects are merged before being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DamageMerge {
    /// Every damaged rect is reported immediately.
    #[default]
    Cell,
    /// Damage within a single row coalesces until the row changes.
    Row,
    /// Damage accumulates until explicitly flushed.
    Screen,
    /// Like `Screen`, and scrolls are held pending and coalesced too.
    Scroll,
}

/// Pen state as stored per cell, including the non-pen bits the cell
/// carries (protection flag, double-width/height line membership).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScreenPen {
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
    pub protected_cell: bool,
    pub dwl: bool,
    pub dhl: DoubleHeight,
}

impl Default for ScreenPen {
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
            protected_cell: false,
            dwl: false,
            dhl: DoubleHeight::Off,
        }
    }
}

/// Internal storage of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IntCell {
    pub chars: [u32; MAX_CHARS_PER_CELL],
    pub pen: ScreenPen,
}

impl IntCell {
    fn blank(pen: ScreenPen) -> Self {
        Self {
            chars: [0; MAX_CHARS_PER_CELL],
            pen,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingScroll {
    rect: Rect,
    downward: i32,
    rightward: i32,
}

pub struct Screen {
    listener: Option<Box<dyn ScreenListener>>,

    damage_merge: DamageMerge,
    damaged: Option<Rect>,
    pending_scroll: Option<PendingScroll>,

    rows: i32,
    cols: i32,

    global_reverse: bool,
    reflow: bool,

    // buffers[1] (the altscreen) is lazily allocated by enable_altscreen
    buffers: [Vec<IntCell>; 2],
    buffer_idx: usize,

    // dwl/dhl of each row, maintained from setlineinfo and scroll events
    lineinfo: [Vec<LineInfo>; 2],

    // staging row for scrollback push/pop
    sb_buffer: Vec<ScreenCell>,

    pen: ScreenPen,
}

/// Copy pen attributes out to the external cell form, folding the global
/// reverse flag into `.reverse`.
fn pen_to_cell_attrs(pen: &ScreenPen, global_reverse: bool) -> CellAttrs {
    CellAttrs {
        bold: pen.bold,
        underline: pen.underline,
        italic: pen.italic,
        blink: pen.blink,
        reverse: pen.reverse ^ global_reverse,
        conceal: pen.conceal,
        strike: pen.strike,
        font: pen.font,
        small: pen.small,
        baseline: pen.baseline,
        dwl: pen.dwl,
        dhl: pen.dhl,
    }
}

pub(crate) fn cell_attrs_to_pen(cell: &ScreenCell, global_reverse: bool) -> ScreenPen {
    ScreenPen {
        fg: cell.fg,
        bg: cell.bg,
        bold: cell.attrs.bold,
        underline: cell.attrs.underline,
        italic: cell.attrs.italic,
        blink: cell.attrs.blink,
        reverse: cell.attrs.reverse ^ global_reverse,
        conceal: cell.attrs.conceal,
        strike: cell.attrs.strike,
        font: cell.attrs.font,
        small: cell.attrs.small,
        baseline: cell.attrs.baseline,
        protected_cell: false,
        dwl: cell.attrs.dwl,
        dhl: cell.attrs.dhl,
    }
}

/// Export one cell of `buf` to the external form. Width is 2 iff the cell
/// to the right is a wide-char continuation.
pub(crate) fn export_cell(
    buf: &[IntCell],
    total_cols: i32,
    row: i32,
    col: i32,
    global_reverse: bool,
) -> ScreenCell {
    let cell = buf[(row * total_cols + col) as usize];
    let next = if col < total_cols - 1 {
        Some(&buf[(row * total_cols + col + 1) as usize])
    } else {
        None
    };

    ScreenCell {
        chars: cell.chars,
        width: if next.is_some_and(|c| c.chars[0] == WIDECHAR_CONT) {
            2
        } else {
            1
        },
        attrs: pen_to_cell_attrs(&cell.pen, global_reverse),
        fg: cell.pen.fg,
        bg: cell.pen.bg,
    }
}

impl Screen {
    pub fn new(rows: i32, cols: i32) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let pen = ScreenPen::default();
        Self {
            listener: None,
            damage_merge: DamageMerge::Cell,
            damaged: None,
            pending_scroll: None,
            rows,
            cols,
            global_reverse: false,
            reflow: false,
            buffers: [vec![IntCell::blank(pen); (rows * cols) as usize], Vec::new()],
            buffer_idx: 0,
            lineinfo: [
                vec![LineInfo::default(); rows as usize],
                vec![LineInfo::default(); rows as usize],
            ],
            sb_buffer: vec![ScreenCell::default(); cols as usize],
            pen,
        }
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn set_listener(&mut self, listener: Box<dyn ScreenListener>) {
        self.listener = Some(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    /// Enable reflow-aware resizing: logical lines re-wrap at the new
    /// width instead of being truncated.
    pub fn set_reflow(&mut self, reflow: bool) {
        self.reflow = reflow;
    }

    /// Allocate the alternate buffer so `Prop::AltScreen` switches can
    /// take effect.
    pub fn enable_altscreen(&mut self, enabled: bool) {
        if enabled && self.buffers[1].is_empty() {
            let pen = self.pen;
            self.buffers[1] = vec![IntCell::blank(pen); (self.rows * self.cols) as usize];
        }
    }

    pub fn set_damage_merge(&mut self, merge: DamageMerge) {
        self.flush_damage();
        self.damage_merge = merge;
    }

    /// True while the alternate buffer is displayed.
    pub fn altscreen_active(&self) -> bool {
        self.buffer_idx == 1
    }

    // ---- cell access ----

    fn getcell(&self, row: i32, col: i32) -> Option<&IntCell> {
        if row < 0 || row >= self.rows || col < 0 || col >= self.cols {
            return None;
        }
        Some(&self.buffers[self.buffer_idx][(self.cols * row + col) as usize])
    }

    fn getcell_mut(&mut self, row: i32, col: i32) -> Option<&mut IntCell> {
        if row < 0 || row >= self.rows || col < 0 || col >= self.cols {
            return None;
        }
        Some(&mut self.buffers[self.buffer_idx][(self.cols * row + col) as usize])
    }

    /// Read one cell in external form.
    pub fn get_cell(&self, pos: Pos) -> Option<ScreenCell> {
        self.getcell(pos.row, pos.col)?;
        Some(export_cell(
            &self.buffers[self.buffer_idx],
            self.cols,
            pos.row,
            pos.col,
            self.global_reverse,
        ))
    }

    /// The codepoints within `rect`, with erased cells rendered as spaces
    /// only when later content follows on the same row, continuation cells
    /// skipped, and rows separated by a linefeed.
    pub fn get_chars(&self, rect: Rect) -> Vec<u32> {
        let mut out = Vec::new();
        let mut padding = 0usize;

        for row in rect.start_row..rect.end_row {
            for col in rect.start_col..rect.end_col {
                let Some(cell) = self.getcell(row, col) else {
                    continue;
                };

                if cell.chars[0] == 0 {
                    padding += 1;
                } else if cell.chars[0] == WIDECHAR_CONT {
                    // gap behind a double-width char
                } else {
                    while padding > 0 {
                        out.push(0x20);
                        padding -= 1;
                    }
                    for &c in &cell.chars {
                        if c == 0 {
                            break;
                        }
                        out.push(c);
                    }
                }
            }

            if row < rect.end_row - 1 {
                out.push(0x0a);
                padding = 0;
            }
        }

        out
    }

    /// [`Self::get_chars`] as a UTF-8 string.
    pub fn get_text(&self, rect: Rect) -> String {
        self.get_chars(rect)
            .into_iter()
            .filter_map(char::from_u32)
            .collect()
    }

    // ---- damage ----

    fn damage(&mut self, rect: Rect) {
        let emit = match self.damage_merge {
            DamageMerge::Cell => rect,

            DamageMerge::Row => {
                if rect.height() > 1 {
                    // Bigger than one row: flush what is stored, emit this
                    self.flush_damage();
                    rect
                } else {
                    match self.damaged {
                        None => {
                            self.damaged = Some(rect);
                            return;
                        }
                        Some(ref mut d) if d.start_row == rect.start_row => {
                            d.start_col = d.start_col.min(rect.start_col);
                            d.end_col = d.end_col.max(rect.end_col);
                            return;
                        }
                        Some(d) => {
                            self.damaged = Some(rect);
                            d
                        }
                    }
                }
            }

            DamageMerge::Screen | DamageMerge::Scroll => {
                match &mut self.damaged {
                    None => self.damaged = Some(rect),
                    Some(d) => d.expand(&rect),
                }
                return;
            }
        };

        if let Some(cb) = self.listener.as_deref_mut() {
            let _ = cb.damage(emit);
        }
    }

    fn damagescreen(&mut self) {
        self.damage(Rect::new(0, self.rows, 0, self.cols));
    }

    /// Deliver pending scrolls and accumulated damage to the listener.
    pub fn flush_damage(&mut self) {
        if let Some(pending) = self.pending_scroll.take() {
            let plan = plan_scroll(pending.rect, pending.downward, pending.rightward);
            if let Some((dest, src)) = plan.moverect {
                self.moverect_user(dest, src);
            }
            self.erase_user(plan.erase);
        }

        if let Some(rect) = self.damaged.take() {
            if let Some(cb) = self.listener.as_deref_mut() {
                let _ = cb.damage(rect);
            }
        }
    }

    // ---- scroll plumbing ----

    fn moverect_internal(&mut self, dest: Rect, src: Rect) {
        let cols = self.cols;
        let ncols = src.width() as usize;
        let downward = src.start_row - dest.start_row;

        let (init_row, test_row, inc_row) = if downward < 0 {
            (dest.end_row - 1, dest.start_row - 1, -1)
        } else {
            (dest.start_row, dest.end_row, 1)
        };

        let buf = &mut self.buffers[self.buffer_idx];
        let mut row = init_row;
        while row != test_row {
            let dsti = (row * cols + dest.start_col) as usize;
            let srci = ((row + downward) * cols + src.start_col) as usize;
            buf.copy_within(srci..srci + ncols, dsti);
            row += inc_row;
        }
    }

    fn moverect_user(&mut self, dest: Rect, src: Rect) {
        if self.listener.is_some() {
            if self.damage_merge != DamageMerge::Scroll {
                // Avoid re-entering through stale stored damage
                self.flush_damage();
            }

            if let Some(cb) = self.listener.as_deref_mut() {
                if cb.moverect(dest, src) {
                    return;
                }
            }
        }

        self.damage(dest);
    }

    fn erase_internal(&mut self, rect: Rect, selective: bool) {
        let (fg, bg) = (self.pen.fg, self.pen.bg);

        for row in rect.start_row..rect.end_row.min(self.rows) {
            let info = self.lineinfo[self.buffer_idx]
                .get(row as usize)
                .copied()
                .unwrap_or_default();

            for col in rect.start_col..rect.end_col {
                let Some(cell) = self.getcell_mut(row, col) else {
                    continue;
                };

                if selective && cell.pen.protected_cell {
                    continue;
                }

                cell.chars[0] = 0;
                // Only the colours carry over; everything else resets
                cell.pen = ScreenPen {
                    fg,
                    bg,
                    dwl: info.doublewidth,
                    dhl: info.doubleheight,
                    ..ScreenPen::default()
                };
            }
        }
    }

    fn erase_user(&mut self, rect: Rect) {
        self.damage(rect);
    }

    // ---- scrollback ----

    fn sb_pushline_from_row(&mut self, row: i32, continuation: bool) {
        let cols = self.cols;
        for col in 0..cols {
            self.sb_buffer[col as usize] = export_cell(
                &self.buffers[self.buffer_idx],
                cols,
                row,
                col,
                self.global_reverse,
            );
        }

        let Self {
            listener, sb_buffer, ..
        } = self;
        if let Some(cb) = listener {
            let _ = cb.sb_pushline(&sb_buffer[..cols as usize], continuation);
        }
    }

    fn shuffle_lineinfo(&mut self, rect: Rect, downward: i32) {
        let height = rect.height() - downward.abs();
        let li = &mut self.lineinfo[self.buffer_idx];
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
}

impl StateListener for Screen {
    fn putglyph(&mut self, glyph: &GlyphInfo<'_>, pos: Pos) -> bool {
        let pen = self.pen;
        let Some(cell) = self.getcell_mut(pos.row, pos.col) else {
            return false;
        };

        let mut i = 0;
        while i < glyph.chars.len() && i < MAX_CHARS_PER_CELL {
            cell.chars[i] = glyph.chars[i];
            i += 1;
        }
        if i < MAX_CHARS_PER_CELL {
            cell.chars[i] = 0;
        }
        cell.pen = pen;
        cell.pen.protected_cell = glyph.protected_cell;
        cell.pen.dwl = glyph.dwl;
        cell.pen.dhl = glyph.dhl;

        for col in 1..glyph.width {
            if let Some(cont) = self.getcell_mut(pos.row, pos.col + col) {
                cont.chars[0] = WIDECHAR_CONT;
            }
        }

        self.damage(Rect::new(
            pos.row,
            pos.row + 1,
            pos.col,
            pos.col + glyph.width,
        ));

        true
    }

    fn premove(&mut self, rect: Rect, lineinfo: &[LineInfo]) -> bool {
        // Only full rows leaving the top of the primary buffer go to
        // scrollback
        if self.listener.is_some()
            && rect.start_row == 0
            && rect.start_col == 0
            && rect.end_col == self.cols
            && self.buffer_idx == 0
        {
            for row in 0..rect.end_row {
                let continuation = lineinfo.get(row as usize).is_some_and(|li| li.continuation);
                self.sb_pushline_from_row(row, continuation);
            }
        }
        true
    }

    fn movecursor(&mut self, pos: Pos, oldpos: Pos, visible: bool) -> bool {
        if let Some(cb) = self.listener.as_deref_mut() {
            return cb.movecursor(pos, oldpos, visible);
        }
        false
    }

    fn scrollrect(&mut self, rect: Rect, downward: i32, rightward: i32) -> bool {
        // Keep the dwl/dhl mirror in step with the state's line info
        if rect.start_col == 0 && rect.end_col == self.cols && rightward == 0 {
            self.shuffle_lineinfo(rect, downward);
        }

        if self.damage_merge != DamageMerge::Scroll {
            let plan = plan_scroll(rect, downward, rightward);
            if let Some((dest, src)) = plan.moverect {
                self.moverect_internal(dest, src);
            }
            self.erase_internal(plan.erase, false);

            self.flush_damage();

            if let Some((dest, src)) = plan.moverect {
                self.moverect_user(dest, src);
            }
            self.erase_user(plan.erase);

            return true;
        }

        if let Some(damaged) = self.damaged {
            if !rect.intersects(&damaged) {
                self.flush_damage();
            }
        }

        match self.pending_scroll {
            None => {
                self.pending_scroll = Some(PendingScroll {
                    rect,
                    downward,
                    rightward,
                });
            }
            Some(ref mut pending)
                if pending.rect == rect
                    && ((pending.downward == 0 && downward == 0)
                        || (pending.rightward == 0 && rightward == 0)) =>
            {
                pending.downward += downward;
                pending.rightward += rightward;
            }
            Some(_) => {
                self.flush_damage();
                self.pending_scroll = Some(PendingScroll {
                    rect,
                    downward,
                    rightward,
                });
            }
        }

        let plan = plan_scroll(rect, downward, rightward);
        if let Some((dest, src)) = plan.moverect {
            self.moverect_internal(dest, src);
        }
        self.erase_internal(plan.erase, false);

        let Some(mut damaged) = self.damaged else {
            return true;
        };

        if rect.contains_rect(&damaged) {
            // Scroll region entirely contains the damage; just move it
            damaged.translate(-downward, -rightward);
            damaged.clip(&rect);
            self.damaged = Some(damaged);
        } else if rect.start_col <= damaged.start_col
            && rect.end_col >= damaged.end_col
            && rightward == 0
        {
            // Vertical scroll that neatly cuts the damage region
            if damaged.start_row >= rect.start_row && damaged.start_row < rect.end_row {
                damaged.start_row =
                    (damaged.start_row - downward).clamp(rect.start_row, rect.end_row);
            }
            if damaged.end_row > rect.start_row && damaged.end_row < rect.end_row {
                damaged.end_row = (damaged.end_row - downward).clamp(rect.start_row, rect.end_row);
            }
            self.damaged = Some(damaged);
        } else {
            tracing::debug!("pending damage overlaps scroll; leaving as-is");
        }

        true
    }

    fn erase(&mut self, rect: Rect, selective: bool) -> bool {
        self.erase_internal(rect, selective);
        self.erase_user(rect);
        true
    }

    fn initpen(&mut self) -> bool {
        false
    }

    fn setpenattr(&mut self, attr: cathode_common::Attr, val: &Value<'_>) -> bool {
        use cathode_common::Attr;

        match attr {
            Attr::Bold => self.pen.bold = val.as_bool().unwrap_or(false),
            Attr::Underline => {
                self.pen.underline = match val.as_int().unwrap_or(0) {
                    1 => Underline::Single,
                    2 => Underline::Double,
                    3 => Underline::Curly,
                    _ => Underline::Off,
                }
            }
            Attr::Italic => self.pen.italic = val.as_bool().unwrap_or(false),
            Attr::Blink => self.pen.blink = val.as_bool().unwrap_or(false),
            Attr::Reverse => self.pen.reverse = val.as_bool().unwrap_or(false),
            Attr::Conceal => self.pen.conceal = val.as_bool().unwrap_or(false),
            Attr::Strike => self.pen.strike = val.as_bool().unwrap_or(false),
            Attr::Font => self.pen.font = val.as_int().unwrap_or(0) as u8,
            Attr::Foreground => self.pen.fg = val.as_color().unwrap_or(Color::DefaultFg),
            Attr::Background => self.pen.bg = val.as_color().unwrap_or(Color::DefaultBg),
            Attr::Small => self.pen.small = val.as_bool().unwrap_or(false),
            Attr::Baseline => {
                self.pen.baseline = match val.as_int().unwrap_or(0) {
                    1 => Baseline::Raise,
                    2 => Baseline::Lower,
                    _ => Baseline::Normal,
                }
            }
        }
        true
    }

    fn settermprop(&mut self, prop: Prop, val: &Value<'_>) -> bool {
        match prop {
            Prop::AltScreen => {
                let on = val.as_bool().unwrap_or(false);
                if on && self.buffers[1].is_empty() {
                    return false;
                }
                self.buffer_idx = usize::from(on);
                // Enabling is followed by an erase which damages anyway;
                // only disabling needs an explicit full damage
                if !on {
                    self.damagescreen();
                }
            }
            Prop::Reverse => {
                self.global_reverse = val.as_bool().unwrap_or(false);
                self.damagescreen();
            }
            _ => {}
        }

        if let Some(cb) = self.listener.as_deref_mut() {
            return cb.settermprop(prop, val);
        }

        true
    }

    fn bell(&mut self) -> bool {
        if let Some(cb) = self.listener.as_deref_mut() {
            return cb.bell();
        }
        false
    }

    fn resize(&mut self, new_rows: i32, new_cols: i32, fields: &mut ResizeFields<'_>) -> bool {
        self.resize_fromstate(new_rows, new_cols, fields)
    }

    fn setlineinfo(&mut self, row: i32, newinfo: LineInfo, oldinfo: LineInfo) -> bool {
        if let Some(slot) = self.lineinfo[self.buffer_idx].get_mut(row as usize) {
            *slot = newinfo;
        }

        if newinfo.doublewidth != oldinfo.doublewidth
            || newinfo.doubleheight != oldinfo.doubleheight
        {
            for col in 0..self.cols {
                if let Some(cell) = self.getcell_mut(row, col) {
                    cell.pen.dwl = newinfo.doublewidth;
                    cell.pen.dhl = newinfo.doubleheight;
                }
            }

            let width = if newinfo.doublewidth {
                self.cols / 2
            } else {
                self.cols
            };
            self.damage(Rect::new(row, row + 1, 0, width));

            if newinfo.doublewidth {
                self.erase_internal(Rect::new(row, row + 1, self.cols / 2, self.cols), false);
            }
        }
        true
    }

    fn sb_clear(&mut self) -> bool {
        if let Some(cb) = self.listener.as_deref_mut() {
            if cb.sb_clear() {
                return true;
            }
        }
        false
    }
}
