//! Reflow-aware buffer resize.
//!
//! Old rows are walked bottom-to-top, grouped into logical lines (a run of
//! rows whose non-first members carry the continuation flag), and re-laid
//! out at the new width. Rows that overflow off the top of the primary
//! buffer go to scrollback; rows left unfilled at the top are backfilled
//! by popping logical lines back out of scrollback and re-splitting them.

use cathode_common::{LineInfo, Pos, Rect, ScreenCell, WIDECHAR_CONT};

use super::{cell_attrs_to_pen, export_cell, IntCell, Screen};
use crate::callbacks::ResizeFields;

/// Content width of a row: the column after the last non-blank cell.
fn line_popcount(buf: &[IntCell], row: i32, cols: i32) -> i32 {
    let mut col = cols - 1;
    while col >= 0 && buf[(row * cols + col) as usize].chars[0] == 0 {
        col -= 1;
    }
    col + 1
}

impl Screen {
    pub(super) fn resize_fromstate(
        &mut self,
        new_rows: i32,
        new_cols: i32,
        fields: &mut ResizeFields<'_>,
    ) -> bool {
        let altscreen_active = !self.buffers[1].is_empty() && self.buffer_idx == 1;

        let old_rows = self.rows;
        let old_cols = self.cols;

        if new_cols > old_cols {
            // Ensure the staging row is large enough for a new or old row
            self.sb_buffer.resize(new_cols as usize, ScreenCell::default());
        }

        self.resize_buffer(0, new_rows, new_cols, !altscreen_active, fields);
        if !self.buffers[1].is_empty() {
            self.resize_buffer(1, new_rows, new_cols, altscreen_active, fields);
        } else if new_rows != old_rows {
            // The altscreen isn't enabled; just keep its lineinfo sized
            fields.lineinfos[1].resize(new_rows as usize, LineInfo::default());
        }

        self.buffer_idx = usize::from(altscreen_active);

        self.rows = new_rows;
        self.cols = new_cols;

        if new_cols <= old_cols {
            self.sb_buffer.resize(new_cols as usize, ScreenCell::default());
        }

        self.lineinfo[0] = fields.lineinfos[0].clone();
        self.lineinfo[1] = fields.lineinfos[1].clone();

        self.damage(Rect::new(0, new_rows, 0, new_cols));

        if let Some(cb) = self.listener.as_deref_mut() {
            let _ = cb.resize(new_rows, new_cols);
        }

        true
    }

    fn resize_buffer(
        &mut self,
        bufidx: usize,
        new_rows: i32,
        new_cols: i32,
        active: bool,
        fields: &mut ResizeFields<'_>,
    ) {
        let old_rows = self.rows;
        let old_cols = self.cols;
        let reflow = self.reflow;
        let global_reverse = self.global_reverse;

        let old_buffer = std::mem::take(&mut self.buffers[bufidx]);
        let old_lineinfo: Vec<LineInfo> = fields.lineinfos[bufidx].clone();

        let blank = IntCell::blank(self.pen);
        let mut new_buffer = vec![blank; (new_rows * new_cols) as usize];
        let mut new_lineinfo = vec![LineInfo::default(); new_rows as usize];

        let mut old_row = old_rows - 1;
        let mut new_row = new_rows - 1;

        let old_cursor = fields.pos;
        let mut new_cursor = Pos::new(-1, -1);

        // The lowest row known to be blank; rows below it are spare space
        // we can scroll content down into
        let mut final_blank_row = new_rows;

        while old_row >= 0 {
            let old_row_end = old_row;
            while reflow && old_row >= 0 && old_lineinfo[old_row as usize].continuation {
                old_row -= 1;
            }
            let old_row_start = old_row.max(0);

            let mut width = 0i32;
            for row in old_row_start..=old_row_end {
                if reflow && row < old_rows - 1 && old_lineinfo[(row + 1) as usize].continuation {
                    width += old_cols;
                } else {
                    width += line_popcount(&old_buffer, row, old_cols);
                }
            }

            if final_blank_row == new_row + 1 && width == 0 {
                final_blank_row = new_row;
            }

            let new_height = if reflow {
                if width > 0 {
                    (width + new_cols - 1) / new_cols
                } else {
                    1
                }
            } else {
                1
            };

            let mut new_row_end = new_row;
            let mut new_row_start = new_row - new_height + 1;

            old_row = old_row_start;
            let mut old_col = 0i32;

            let spare_rows = new_rows - final_blank_row;

            if new_row_start < 0
                && spare_rows >= 0
                && (!active || new_cursor.row == -1 || new_cursor.row - new_row_start < new_rows)
            {
                // Scroll the partially-filled buffer down into the blank
                // rows at the bottom to make the line fit
                let downwards = (-new_row_start).min(spare_rows);
                let rowcount = new_rows - downwards;

                new_buffer.copy_within(
                    0..(rowcount * new_cols) as usize,
                    (downwards * new_cols) as usize,
                );
                new_lineinfo.copy_within(0..rowcount as usize, downwards as usize);

                new_row += downwards;
                new_row_start += downwards;
                new_row_end += downwards;

                if new_cursor.row >= 0 {
                    new_cursor.row += downwards;
                }

                final_blank_row += downwards;
            }

            if new_row_start < 0 {
                if old_row_start <= old_cursor.row && old_cursor.row <= old_row_end {
                    new_cursor.row = 0;
                    new_cursor.col = old_cursor.col.min(new_cols - 1);
                }
                break;
            }

            let mut width = width;
            new_row = new_row_start;
            while new_row <= new_row_end {
                let mut count = width.min(new_cols);
                width -= count;

                let mut new_col = 0i32;

                while count > 0 {
                    new_buffer[(new_row * new_cols + new_col) as usize] =
                        old_buffer[(old_row * old_cols + old_col) as usize];

                    if old_cursor.row == old_row && old_cursor.col == old_col {
                        new_cursor = Pos::new(new_row, new_col);
                    }

                    old_col += 1;
                    if old_col == old_cols {
                        old_row += 1;

                        if !reflow {
                            new_col += 1;
                            break;
                        }
                        old_col = 0;
                    }

                    new_col += 1;
                    count -= 1;
                }

                if old_row <= old_row_end && old_cursor.row == old_row && old_cursor.col >= old_col
                {
                    new_cursor.row = new_row;
                    new_cursor.col = (old_cursor.col - old_col + new_col).min(new_cols - 1);
                }

                while new_col < new_cols {
                    new_buffer[(new_row * new_cols + new_col) as usize] = blank;
                    new_col += 1;
                }

                new_lineinfo[new_row as usize].continuation = new_row > new_row_start;

                new_row += 1;
            }

            old_row = old_row_start - 1;
            new_row = new_row_start - 1;
        }

        if old_cursor.row <= old_row {
            // The cursor would have moved off the top; bring it in range
            new_cursor.row = 0;
            new_cursor.col = old_cursor.col.min(new_cols - 1);
        }

        debug_assert!(
            !active || (new_cursor.row != -1 && new_cursor.col != -1),
            "resize failed to update cursor position"
        );
        if active && (new_cursor.row == -1 || new_cursor.col == -1) {
            new_cursor = Pos::new(0, 0);
        }

        if old_row >= 0 && bufidx == 0 && self.listener.is_some() {
            // Push the rows that fell off the top to scrollback
            for row in 0..=old_row {
                let continuation = old_lineinfo
                    .get(row as usize)
                    .is_some_and(|li| li.continuation);
                for col in 0..old_cols {
                    self.sb_buffer[col as usize] =
                        export_cell(&old_buffer, old_cols, row, col, global_reverse);
                }
                let Self {
                    listener, sb_buffer, ..
                } = &mut *self;
                if let Some(cb) = listener {
                    let _ = cb.sb_pushline(&sb_buffer[..old_cols as usize], continuation);
                }
            }
        }

        if new_row >= 0 && bufidx == 0 && self.listener.is_some() {
            if reflow {
                self.backfill_reflow(
                    &mut new_buffer,
                    &mut new_lineinfo,
                    &mut new_row,
                    new_cols,
                    old_cols,
                    blank,
                );
            } else {
                while new_row >= 0 {
                    let popped = {
                        let Self {
                            listener, sb_buffer, ..
                        } = &mut *self;
                        listener
                            .as_mut()
                            .and_then(|cb| cb.sb_popline(&mut sb_buffer[..old_cols as usize]))
                    };
                    let Some(continuation) = popped else { break };

                    new_lineinfo[new_row as usize].continuation = continuation;

                    let mut col = 0i32;
                    while col < old_cols && col < new_cols {
                        let src = self.sb_buffer[col as usize];
                        let idx = (new_row * new_cols + col) as usize;
                        new_buffer[idx].chars = src.chars;
                        new_buffer[idx].pen = cell_attrs_to_pen(&src, global_reverse);
                        if src.width == 2 && col < new_cols - 1 {
                            new_buffer[idx + 1].chars[0] = WIDECHAR_CONT;
                        }
                        col += i32::from(src.width.max(1));
                    }
                    while col < new_cols {
                        new_buffer[(new_row * new_cols + col) as usize] = blank;
                        col += 1;
                    }

                    new_row -= 1;
                }
            }
        }

        if new_row >= 0 {
            // Shift the accumulated rows up to the top and blank the tail
            let moverows = new_rows - new_row - 1;
            new_buffer.copy_within(
                ((new_row + 1) * new_cols) as usize..((new_row + 1 + moverows) * new_cols) as usize,
                0,
            );
            new_lineinfo.copy_within((new_row + 1) as usize..(new_row + 1 + moverows) as usize, 0);

            new_cursor.row -= new_row + 1;

            for row in moverows..new_rows {
                for col in 0..new_cols {
                    new_buffer[(row * new_cols + col) as usize] = blank;
                }
                new_lineinfo[row as usize] = LineInfo::default();
            }
        }

        self.buffers[bufidx] = new_buffer;
        *fields.lineinfos[bufidx] = new_lineinfo;

        if active {
            fields.pos = new_cursor;
        }
    }

    /// Pop whole logical lines from scrollback and re-split them at the
    /// new width, filling upwards from `new_row`. A line that no longer
    /// fits is pushed back and the backfill stops.
    fn backfill_reflow(
        &mut self,
        new_buffer: &mut [IntCell],
        new_lineinfo: &mut [LineInfo],
        new_row: &mut i32,
        new_cols: i32,
        old_cols: i32,
        blank: IntCell,
    ) {
        let global_reverse = self.global_reverse;
        let mut logical: Vec<ScreenCell> = vec![ScreenCell::default(); (old_cols * 4) as usize];

        'pop: while *new_row >= 0 {
            // Scrollback is LIFO: the first pop is the last segment of its
            // logical line. Keep popping while continuation says more
            // segments precede it.
            let popped = {
                let Self {
                    listener, sb_buffer, ..
                } = &mut *self;
                listener
                    .as_mut()
                    .and_then(|cb| cb.sb_popline(&mut sb_buffer[..old_cols as usize]))
            };
            let Some(mut continuation) = popped else {
                break;
            };

            logical[..old_cols as usize].copy_from_slice(&self.sb_buffer[..old_cols as usize]);
            let mut total_segs = 1usize;

            while continuation {
                let popped = {
                    let Self {
                        listener, sb_buffer, ..
                    } = &mut *self;
                    listener
                        .as_mut()
                        .and_then(|cb| cb.sb_popline(&mut sb_buffer[..old_cols as usize]))
                };
                let Some(c) = popped else { break };
                continuation = c;

                let needed = old_cols as usize * (total_segs + 1);
                if logical.len() < needed {
                    logical.resize(needed * 2, ScreenCell::default());
                }
                logical[old_cols as usize * total_segs..][..old_cols as usize]
                    .copy_from_slice(&self.sb_buffer[..old_cols as usize]);
                total_segs += 1;
            }

            // Segments arrived in reverse order; put them right
            for i in 0..total_segs / 2 {
                let j = total_segs - 1 - i;
                for k in 0..old_cols as usize {
                    logical.swap(i * old_cols as usize + k, j * old_cols as usize + k);
                }
            }

            // Full width for every segment but the last, which is trimmed
            // of trailing blanks
            let mut total_width = 0i32;
            for seg in 0..total_segs {
                if seg < total_segs - 1 {
                    total_width += old_cols;
                } else {
                    let base = seg * old_cols as usize;
                    let mut col = old_cols - 1;
                    while col >= 0 && logical[base + col as usize].chars[0] == 0 {
                        col -= 1;
                    }
                    total_width += col + 1;
                }
            }

            let new_height = if total_width > 0 {
                (total_width + new_cols - 1) / new_cols
            } else {
                1
            };

            if *new_row - new_height + 1 < 0 {
                // Not enough space; return the logical line to scrollback
                for seg in 0..total_segs {
                    let base = seg * old_cols as usize;
                    let Self { listener, .. } = &mut *self;
                    if let Some(cb) = listener {
                        let _ = cb.sb_pushline(&logical[base..base + old_cols as usize], seg > 0);
                    }
                }
                break 'pop;
            }

            let mut src_seg = 0usize;
            let mut src_col = 0i32;
            let mut remaining = total_width;
            let row_start = *new_row - new_height + 1;

            for row in row_start..=*new_row {
                new_lineinfo[row as usize].continuation = row > row_start;

                let mut count = remaining.min(new_cols);
                remaining -= count;

                let mut col = 0i32;
                while count > 0 {
                    let src = logical[src_seg * old_cols as usize + src_col as usize];
                    let idx = (row * new_cols + col) as usize;
                    new_buffer[idx].chars = src.chars;
                    new_buffer[idx].pen = cell_attrs_to_pen(&src, global_reverse);

                    if src.width == 2 && col < new_cols - 1 {
                        new_buffer[idx + 1].chars[0] = WIDECHAR_CONT;
                    }

                    src_col += 1;
                    if src_col >= old_cols {
                        src_seg += 1;
                        src_col = 0;
                    }

                    col += 1;
                    count -= 1;
                }

                while col < new_cols {
                    new_buffer[(row * new_cols + col) as usize] = blank;
                    col += 1;
                }
            }

            *new_row -= new_height;
        }
    }
}
