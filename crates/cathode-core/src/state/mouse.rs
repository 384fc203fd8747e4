//! Mouse report encoding for the four wire protocols.

use cathode_common::C1;

use super::{MouseFlags, State};
use crate::encoding::{fill_utf8, UTF8_MAX_SEQLEN};
use crate::keyboard::Modifier;
use crate::output::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseProtocol {
    #[default]
    X10,
    Utf8,
    Sgr,
    Rxvt,
}

const X10_COORD_OFFSET: i32 = 0x21;
const X10_COORD_MAX: i32 = 0xff;
const X10_BUTTON_OFFSET: i32 = 0x20;
const X10_HIGH_BUTTON_OFFSET: i32 = 0x40;
const X10_MODIFIER_SHIFT: i32 = 2;
const X10_RELEASE_CODE: i32 = 3;

impl State {
    pub(crate) fn output_mouse(
        &mut self,
        code: i32,
        pressed: bool,
        modifiers: i32,
        col: i32,
        row: i32,
        out: &mut Output,
    ) {
        let modifiers = modifiers << X10_MODIFIER_SHIFT;

        match self.mouse_protocol {
            MouseProtocol::X10 => {
                let col = col.min(X10_COORD_MAX - X10_COORD_OFFSET);
                let row = row.min(X10_COORD_MAX - X10_COORD_OFFSET);
                let code = if pressed { code } else { X10_RELEASE_CODE };

                out.push_ctrl(C1::Csi, format_args!("M"));
                out.push_bytes(&[
                    ((code | modifiers) + X10_BUTTON_OFFSET) as u8,
                    (col + X10_COORD_OFFSET) as u8,
                    (row + X10_COORD_OFFSET) as u8,
                ]);
            }

            MouseProtocol::Utf8 => {
                let code = if pressed { code } else { X10_RELEASE_CODE };

                let mut utf8 = [0u8; 3 * UTF8_MAX_SEQLEN];
                let mut len = 0;
                len += fill_utf8(((code | modifiers) + X10_BUTTON_OFFSET) as u32, &mut utf8[len..]);
                len += fill_utf8((col + X10_COORD_OFFSET) as u32, &mut utf8[len..]);
                len += fill_utf8((row + X10_COORD_OFFSET) as u32, &mut utf8[len..]);

                out.push_ctrl(C1::Csi, format_args!("M"));
                out.push_bytes(&utf8[..len]);
            }

            MouseProtocol::Sgr => {
                out.push_ctrl(
                    C1::Csi,
                    format_args!(
                        "<{};{};{}{}",
                        code | modifiers,
                        col + 1,
                        row + 1,
                        if pressed { 'M' } else { 'm' }
                    ),
                );
            }

            MouseProtocol::Rxvt => {
                let code = if pressed { code } else { X10_RELEASE_CODE };
                out.push_ctrl(
                    C1::Csi,
                    format_args!("{};{};{}M", code | modifiers, col + 1, row + 1),
                );
            }
        }
    }

    /// Pointer motion. Only reports when the cell changes, and only when
    /// the application asked for drag (with a button held) or any-motion
    /// reports.
    pub(crate) fn mouse_move(&mut self, row: i32, col: i32, modifier: Modifier, out: &mut Output) {
        if col == self.mouse_col && row == self.mouse_row {
            return;
        }

        self.mouse_col = col;
        self.mouse_row = row;

        if (self.mouse_flags.contains(MouseFlags::DRAG) && self.mouse_buttons != 0)
            || self.mouse_flags.contains(MouseFlags::MOVE)
        {
            let button = if self.mouse_buttons & 0x01 != 0 {
                1
            } else if self.mouse_buttons & 0x02 != 0 {
                2
            } else if self.mouse_buttons & 0x04 != 0 {
                3
            } else {
                4
            };
            self.output_mouse(
                button - 1 + X10_BUTTON_OFFSET,
                true,
                i32::from(modifier.bits()),
                col,
                row,
                out,
            );
        }
    }

    /// Button press or release. Buttons 1..3 track held state; 4..7 are
    /// wheel/extended buttons encoded with the high-button offset.
    pub(crate) fn mouse_button(
        &mut self,
        button: i32,
        pressed: bool,
        modifier: Modifier,
        out: &mut Output,
    ) {
        let old_buttons = self.mouse_buttons;

        if button > 0 && button < 4 {
            if pressed {
                self.mouse_buttons |= 1 << (button - 1);
            } else {
                self.mouse_buttons &= !(1 << (button - 1));
            }
        }

        if self.mouse_buttons == old_buttons && button < 4 {
            return;
        }

        if self.mouse_flags.is_empty() {
            return;
        }

        let (col, row) = (self.mouse_col, self.mouse_row);
        if button < 4 {
            self.output_mouse(button - 1, pressed, i32::from(modifier.bits()), col, row, out);
        } else if button < 8 {
            self.output_mouse(
                button - 4 + X10_HIGH_BUTTON_OFFSET,
                pressed,
                i32::from(modifier.bits()),
                col,
                row,
                out,
            );
        }
    }
}
