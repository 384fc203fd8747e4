//! CSI sequence dispatch and DECRQSS status replies.

use cathode_common::{CursorShape, DoubleHeight, Pos, Prop, Rect, StringFragment, C1};
use cathode_parser::CsiParam;

use super::State;
use crate::callbacks::StateListener;
use crate::output::Output;

fn arg(args: &[CsiParam], i: usize) -> CsiParam {
    args.get(i).copied().unwrap_or(CsiParam::MISSING)
}

impl State {
    /// Dispatch one CSI sequence. Returns false for sequences the engine
    /// does not recognise so the caller can offer them to fallbacks.
    pub(crate) fn on_csi(
        &mut self,
        leader: &[u8],
        args: &[CsiParam],
        intermed: &[u8],
        command: u8,
        ops: &mut dyn StateListener,
        out: &mut Output,
    ) -> bool {
        let leader_byte = match leader {
            [] => 0u8,
            [b @ (b'?' | b'>')] => *b,
            _ => return false,
        };

        let intermed_byte = match intermed {
            [] => 0u8,
            [b @ (b' ' | b'!' | b'"' | b'$' | b'\'')] => *b,
            _ => return false,
        };

        let oldpos = self.pos;
        let mut cancel_phantom = true;

        match (leader_byte, intermed_byte, command) {
            (0, 0, b'@') => {
                // ICH
                let count = arg(args, 0).count() as i32;
                if self.is_cursor_in_scrollregion() {
                    let end_col = if self.mode.leftrightmargin {
                        self.scrollregion_right_val()
                    } else {
                        self.this_row_width()
                    };
                    let rect = Rect::new(self.pos.row, self.pos.row + 1, self.pos.col, end_col);
                    self.scroll(rect, 0, -count, ops);
                }
            }

            (0, 0, b'A') => {
                // CUU
                self.pos.row -= arg(args, 0).count() as i32;
                self.at_phantom = false;
            }

            (0, 0, b'B') => {
                // CUD
                self.pos.row += arg(args, 0).count() as i32;
                self.at_phantom = false;
            }

            (0, 0, b'C') => {
                // CUF
                self.pos.col += arg(args, 0).count() as i32;
                self.at_phantom = false;
            }

            (0, 0, b'D') => {
                // CUB
                self.pos.col -= arg(args, 0).count() as i32;
                self.at_phantom = false;
            }

            (0, 0, b'E') => {
                // CNL
                self.pos.col = 0;
                self.pos.row += arg(args, 0).count() as i32;
                self.at_phantom = false;
            }

            (0, 0, b'F') => {
                // CPL
                self.pos.col = 0;
                self.pos.row -= arg(args, 0).count() as i32;
                self.at_phantom = false;
            }

            (0, 0, b'G') => {
                // CHA
                self.pos.col = arg(args, 0).or(1) as i32 - 1;
                self.at_phantom = false;
            }

            (0, 0, b'H') | (0, 0, b'f') => {
                // CUP / HVP
                let row = arg(args, 0).or(1) as i32;
                let col = arg(args, 1).or(1) as i32;
                self.pos.row = row - 1;
                self.pos.col = col - 1;
                if self.mode.origin {
                    self.pos.row += self.scrollregion_top;
                    self.pos.col += self.scrollregion_left_val();
                }
                self.at_phantom = false;
            }

            (0, 0, b'I') => {
                // CHT
                self.tab(arg(args, 0).count(), 1);
            }

            (0, 0, b'J') | (b'?', 0, b'J') => {
                // ED / DECSED
                let selective = leader_byte == b'?';
                match arg(args, 0).or(0) {
                    0 => {
                        let rect = Rect::new(self.pos.row, self.pos.row + 1, self.pos.col, self.cols);
                        if rect.end_col > rect.start_col {
                            self.erase(rect, selective, ops);
                        }

                        let rect = Rect::new(self.pos.row + 1, self.rows, 0, self.cols);
                        for row in rect.start_row..rect.end_row {
                            self.set_lineinfo(row, true, false, DoubleHeight::Off, ops);
                        }
                        if rect.end_row > rect.start_row {
                            self.erase(rect, selective, ops);
                        }
                    }
                    1 => {
                        let rect = Rect::new(0, self.pos.row, 0, self.cols);
                        for row in rect.start_row..rect.end_row {
                            self.set_lineinfo(row, true, false, DoubleHeight::Off, ops);
                        }
                        if rect.end_col > rect.start_col {
                            self.erase(rect, selective, ops);
                        }

                        let rect = Rect::new(self.pos.row, self.pos.row + 1, 0, self.pos.col + 1);
                        if rect.end_row > rect.start_row {
                            self.erase(rect, selective, ops);
                        }
                    }
                    2 => {
                        let rect = Rect::new(0, self.rows, 0, self.cols);
                        for row in rect.start_row..rect.end_row {
                            self.set_lineinfo(row, true, false, DoubleHeight::Off, ops);
                        }
                        self.erase(rect, selective, ops);
                    }
                    3 => {
                        if ops.sb_clear() {
                            return true;
                        }
                    }
                    _ => {}
                }
            }

            (0, 0, b'K') | (b'?', 0, b'K') => {
                // EL / DECSEL
                let selective = leader_byte == b'?';
                let (start_col, end_col) = match arg(args, 0).or(0) {
                    0 => (self.pos.col, self.this_row_width()),
                    1 => (0, self.pos.col + 1),
                    2 => (0, self.this_row_width()),
                    _ => return false,
                };
                let rect = Rect::new(self.pos.row, self.pos.row + 1, start_col, end_col);
                if rect.end_col > rect.start_col {
                    self.erase(rect, selective, ops);
                }
            }

            (0, 0, b'L') => {
                // IL
                let count = arg(args, 0).count() as i32;
                if self.is_cursor_in_scrollregion() {
                    let rect = Rect::new(
                        self.pos.row,
                        self.scrollregion_bottom_val(),
                        self.scrollregion_left_val(),
                        self.scrollregion_right_val(),
                    );
                    self.scroll(rect, -count, 0, ops);
                }
            }

            (0, 0, b'M') => {
                // DL
                let count = arg(args, 0).count() as i32;
                if self.is_cursor_in_scrollregion() {
                    let rect = Rect::new(
                        self.pos.row,
                        self.scrollregion_bottom_val(),
                        self.scrollregion_left_val(),
                        self.scrollregion_right_val(),
                    );
                    self.scroll(rect, count, 0, ops);
                }
            }

            (0, 0, b'P') => {
                // DCH
                let count = arg(args, 0).count() as i32;
                if self.is_cursor_in_scrollregion() {
                    let end_col = if self.mode.leftrightmargin {
                        self.scrollregion_right_val()
                    } else {
                        self.this_row_width()
                    };
                    let rect = Rect::new(self.pos.row, self.pos.row + 1, self.pos.col, end_col);
                    self.scroll(rect, 0, count, ops);
                }
            }

            (0, 0, b'S') => {
                // SU
                let count = arg(args, 0).count() as i32;
                let rect = Rect::new(
                    self.scrollregion_top,
                    self.scrollregion_bottom_val(),
                    self.scrollregion_left_val(),
                    self.scrollregion_right_val(),
                );
                self.scroll(rect, count, 0, ops);
            }

            (0, 0, b'T') => {
                // SD
                let count = arg(args, 0).count() as i32;
                let rect = Rect::new(
                    self.scrollregion_top,
                    self.scrollregion_bottom_val(),
                    self.scrollregion_left_val(),
                    self.scrollregion_right_val(),
                );
                self.scroll(rect, -count, 0, ops);
            }

            (0, 0, b'X') => {
                // ECH
                let count = arg(args, 0).count() as i32;
                let rect = Rect::new(
                    self.pos.row,
                    self.pos.row + 1,
                    self.pos.col,
                    (self.pos.col + count).min(self.this_row_width()),
                );
                self.erase(rect, false, ops);
            }

            (0, 0, b'Z') => {
                // CBT
                self.tab(arg(args, 0).count(), -1);
            }

            (0, 0, b'`') => {
                // HPA
                self.pos.col = arg(args, 0).or(1) as i32 - 1;
                self.at_phantom = false;
            }

            (0, 0, b'a') => {
                // HPR
                self.pos.col += arg(args, 0).count() as i32;
                self.at_phantom = false;
            }

            (0, 0, b'b') => {
                // REP: repeat the preceding graphic character
                if self.combine_width < 1 {
                    return true;
                }
                let row_width = self.this_row_width();
                let count = arg(args, 0).count() as i32;
                let col = (self.pos.col + count * self.combine_width).min(row_width);
                while self.pos.col + self.combine_width <= col {
                    self.emit_glyph(ops, &self.combine_chars, self.combine_width, self.pos);
                    self.pos.col += self.combine_width;
                }
                if self.pos.col + self.combine_width >= row_width && self.mode.autowrap {
                    self.at_phantom = true;
                    cancel_phantom = false;
                }
            }

            (0, 0, b'c') => {
                // DA
                if arg(args, 0).or(0) == 0 {
                    out.push_ctrl(C1::Csi, format_args!("?1;2c"));
                }
            }

            (b'>', 0, b'c') => {
                // Secondary DA
                out.push_ctrl(
                    C1::Csi,
                    format_args!(">{};{};{}c", 0, crate::DA2_FIRMWARE_VERSION, 0),
                );
            }

            (0, 0, b'd') => {
                // VPA
                self.pos.row = arg(args, 0).or(1) as i32 - 1;
                if self.mode.origin {
                    self.pos.row += self.scrollregion_top;
                }
                self.at_phantom = false;
            }

            (0, 0, b'e') => {
                // VPR
                self.pos.row += arg(args, 0).count() as i32;
                self.at_phantom = false;
            }

            (0, 0, b'g') => {
                // TBC
                match arg(args, 0).or(0) {
                    0 => {
                        let col = self.pos.col;
                        self.clear_col_tabstop(col);
                    }
                    3 | 5 => {
                        for col in 0..self.cols {
                            self.clear_col_tabstop(col);
                        }
                    }
                    1 | 2 | 4 => {}
                    _ => return false,
                }
            }

            (0, 0, b'h') => {
                // SM
                if let Some(num) = arg(args, 0).value() {
                    self.set_mode(num, true);
                }
            }

            (b'?', 0, b'h') => {
                // DEC private mode set
                for a in args {
                    if let Some(num) = a.value() {
                        self.set_dec_mode(num, true, ops);
                    }
                }
            }

            (0, 0, b'j') => {
                // HPB
                self.pos.col -= arg(args, 0).count() as i32;
                self.at_phantom = false;
            }

            (0, 0, b'k') => {
                // VPB
                self.pos.row -= arg(args, 0).count() as i32;
                self.at_phantom = false;
            }

            (0, 0, b'l') => {
                // RM
                if let Some(num) = arg(args, 0).value() {
                    self.set_mode(num, false);
                }
            }

            (b'?', 0, b'l') => {
                // DEC private mode reset
                for a in args {
                    if let Some(num) = a.value() {
                        self.set_dec_mode(num, false, ops);
                    }
                }
            }

            (0, 0, b'm') => {
                // SGR
                self.setpen(args, ops);
            }

            (b'?', 0, b'm') => {
                // DECSGR: alternative superscript/subscript selection
                for a in args {
                    match a.value() {
                        Some(4) => self.setpen(&[CsiParam::new(73)], ops),
                        Some(5) => self.setpen(&[CsiParam::new(74)], ops),
                        Some(24) => self.setpen(&[CsiParam::new(75)], ops),
                        _ => {}
                    }
                }
            }

            (0, 0, b'n') | (b'?', 0, b'n') => {
                // DSR / DECDSR
                let qmark = if leader_byte == b'?' { "?" } else { "" };
                match arg(args, 0).or(0) {
                    0..=4 => {} // replies; ignore
                    5 => out.push_ctrl(C1::Csi, format_args!("{}0n", qmark)),
                    6 => out.push_ctrl(
                        C1::Csi,
                        format_args!("{}{};{}R", qmark, self.pos.row + 1, self.pos.col + 1),
                    ),
                    _ => {}
                }
            }

            (0, b'!', b'p') => {
                // DECSTR
                self.reset(false, ops, out);
            }

            (b'?', b'$', b'p') => {
                // DECRQM
                if let Some(num) = arg(args, 0).value() {
                    self.request_dec_mode(num, out);
                }
            }

            (b'>', 0, b'q') => {
                // XTVERSION
                self.request_version_string(out);
            }

            (0, b' ', b'q') => {
                // DECSCUSR
                let styles = [
                    (true, CursorShape::Block),
                    (true, CursorShape::Block),
                    (false, CursorShape::Block),
                    (true, CursorShape::Underline),
                    (false, CursorShape::Underline),
                    (true, CursorShape::BarLeft),
                    (false, CursorShape::BarLeft),
                ];
                let val = arg(args, 0).or(1);
                if (0..styles.len() as i64).contains(&val) {
                    let (blink, shape) = styles[val as usize];
                    self.settermprop_bool(Prop::CursorBlink, blink, ops);
                    self.settermprop_int(Prop::CursorShape, shape as i64, ops);
                }
            }

            (0, b'"', b'q') => {
                // DECSCA
                match arg(args, 0).or(0) {
                    0 | 2 => self.protected_cell = false,
                    1 => self.protected_cell = true,
                    _ => {}
                }
            }

            (0, 0, b'r') => {
                // DECSTBM
                let top = (arg(args, 0).or(1) as i32 - 1).clamp(0, self.rows);
                let bottom = arg(args, 1).value().map(|b| b as i32);

                self.scrollregion_top = top;
                self.scrollregion_bottom = match bottom {
                    Some(b) if !(top == 0 && b == self.rows) => Some(b.min(self.rows)),
                    _ => None,
                };

                if self.scrollregion_bottom_val() <= self.scrollregion_top {
                    // Invalid
                    self.scrollregion_top = 0;
                    self.scrollregion_bottom = None;
                }

                // Setting the scrolling region restores the cursor to home
                self.pos = Pos::new(0, 0);
                if self.mode.origin {
                    self.pos.row += self.scrollregion_top;
                    self.pos.col += self.scrollregion_left_val();
                }
            }

            (0, 0, b's') => {
                // DECSLRM; stored even without DECLRMM, taking effect when
                // that mode is set
                let left = (arg(args, 0).or(1) as i32 - 1).clamp(0, self.cols);
                let right = arg(args, 1).value().map(|r| r as i32);

                self.scrollregion_left = left;
                self.scrollregion_right = match right {
                    Some(r) if !(left == 0 && r == self.cols) => Some(r.min(self.cols)),
                    _ => None,
                };

                if matches!(self.scrollregion_right, Some(r) if r <= self.scrollregion_left)
                    || self.scrollregion_left >= self.cols
                {
                    // Invalid
                    self.scrollregion_left = 0;
                    self.scrollregion_right = None;
                }

                self.pos = Pos::new(0, 0);
                if self.mode.origin {
                    self.pos.row += self.scrollregion_top;
                    self.pos.col += self.scrollregion_left_val();
                }
            }

            (0, b'\'', b'}') => {
                // DECIC
                let count = arg(args, 0).count() as i32;
                if self.is_cursor_in_scrollregion() {
                    let rect = Rect::new(
                        self.scrollregion_top,
                        self.scrollregion_bottom_val(),
                        self.pos.col,
                        self.scrollregion_right_val(),
                    );
                    self.scroll(rect, 0, -count, ops);
                }
            }

            (0, b'\'', b'~') => {
                // DECDC
                let count = arg(args, 0).count() as i32;
                if self.is_cursor_in_scrollregion() {
                    let rect = Rect::new(
                        self.scrollregion_top,
                        self.scrollregion_bottom_val(),
                        self.pos.col,
                        self.scrollregion_right_val(),
                    );
                    self.scroll(rect, 0, count, ops);
                }
            }

            _ => return false,
        }

        if self.mode.origin {
            self.pos.row = self
                .pos
                .row
                .clamp(self.scrollregion_top, self.scrollregion_bottom_val() - 1);
            self.pos.col = self
                .pos
                .col
                .clamp(self.scrollregion_left_val(), self.scrollregion_right_val() - 1);
        } else {
            self.pos.row = self.pos.row.clamp(0, self.rows - 1);
            self.pos.col = self.pos.col.clamp(0, self.this_row_width() - 1);
        }

        self.updatecursor(oldpos, cancel_phantom, ops);

        debug_assert!(
            self.pos.row >= 0 && self.pos.row < self.rows && self.pos.col >= 0 && self.pos.col < self.cols,
            "cursor out of bounds after CSI {:?}",
            command as char
        );

        true
    }

    // ---- DECRQSS ----

    /// Accumulate a DECRQSS request body and, once complete, emit the
    /// self-describing `DCS 1 $ r ... ST` reply.
    pub(crate) fn request_status_string(&mut self, frag: StringFragment<'_>, out: &mut Output) {
        if frag.initial {
            self.decrqss = [0; 4];
            self.decrqss_len = 0;
        }

        for &b in frag.bytes {
            if self.decrqss_len < self.decrqss.len() - 1 {
                self.decrqss[self.decrqss_len] = b;
                self.decrqss_len += 1;
            }
        }

        if !frag.is_final {
            return;
        }

        match &self.decrqss[..self.decrqss_len] {
            b"m" => {
                // Query SGR
                let args = self.getpen();
                let mut body = String::new();
                for (i, a) in args.iter().enumerate() {
                    body.push_str(&a.or(0).to_string());
                    if i < args.len() - 1 {
                        body.push(if a.has_more() { ':' } else { ';' });
                    }
                }
                out.push_str_seq(Some(C1::Dcs), true, format_args!("1$r{}m", body));
            }
            b" q" => {
                // Query DECSCUSR
                let mut reply = match self.mode.cursor_shape {
                    CursorShape::Block => 2,
                    CursorShape::Underline => 4,
                    CursorShape::BarLeft => 6,
                };
                if self.mode.cursor_blink {
                    reply -= 1;
                }
                out.push_str_seq(Some(C1::Dcs), true, format_args!("1$r{} q", reply));
            }
            b"\"q" => {
                // Query DECSCA
                let protected = if self.protected_cell { 1 } else { 2 };
                out.push_str_seq(Some(C1::Dcs), true, format_args!("1$r{}\"q", protected));
            }
            b"r" => {
                // Query DECSTBM
                out.push_str_seq(
                    Some(C1::Dcs),
                    true,
                    format_args!(
                        "1$r{};{}r",
                        self.scrollregion_top + 1,
                        self.scrollregion_bottom_val()
                    ),
                );
            }
            b"s" => {
                // Query DECSLRM
                out.push_str_seq(
                    Some(C1::Dcs),
                    true,
                    format_args!(
                        "1$r{};{}s",
                        self.scrollregion_left_val() + 1,
                        self.scrollregion_right_val()
                    ),
                );
            }
            _ => out.push_str_seq(Some(C1::Dcs), true, format_args!("0$r")),
        }
    }
}
