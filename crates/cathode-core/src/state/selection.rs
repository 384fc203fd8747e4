//! OSC 52 selection handling: streaming base64 decode of set requests,
//! query dispatch, and the base64 send path.

use cathode_common::{SelectionMask, StringFragment, C1};
use tracing::debug;

use super::{SelectionCtx, State};
use crate::output::Output;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SelectionState {
    Initial,
    Selected,
    Query,
    SetInitial,
    Set,
    Invalid,
}

const BASE64_INVALID: u8 = 0xff;
const PARTIAL_COUNT_SHIFT: u32 = 24;
const PARTIAL_MASK_18BIT: u32 = 0x3_ffff;
const PARTIAL_MASK_24BIT: u32 = 0xff_ffff;

fn base64_one(b: u8) -> u8 {
    match b {
        0..=25 => b'A' + b,
        26..=51 => b'a' + b - 26,
        52..=61 => b'0' + b - 52,
        62 => b'+',
        63 => b'/',
        _ => 0,
    }
}

fn unbase64one(c: u8) -> u8 {
    match c {
        b'A'..=b'Z' => c - b'A',
        b'a'..=b'z' => c - b'a' + 26,
        b'0'..=b'9' => c - b'0' + 52,
        b'+' => 62,
        b'/' => 63,
        _ => BASE64_INVALID,
    }
}

impl State {
    /// Consume one fragment of an OSC 52 body.
    pub(crate) fn osc_selection(&mut self, frag: StringFragment<'_>) {
        let SelectionCtx {
            listener,
            buffer,
            mask,
            state,
            recvpartial,
            ..
        } = &mut self.selection;

        let mut s = frag.bytes;

        if frag.initial {
            *mask = SelectionMask::empty();
            *state = SelectionState::Initial;
        }

        while *state == SelectionState::Initial && !s.is_empty() {
            match s[0] {
                b'c' => *mask |= SelectionMask::CLIPBOARD,
                b'p' => *mask |= SelectionMask::PRIMARY,
                b'q' => *mask |= SelectionMask::SECONDARY,
                b's' => *mask |= SelectionMask::SELECT,
                d @ b'0'..=b'7' => {
                    *mask |= SelectionMask::from_bits_truncate(
                        SelectionMask::CUT0.bits() << (d - b'0'),
                    );
                }
                b';' => {
                    *state = SelectionState::Selected;
                    if mask.is_empty() {
                        *mask = SelectionMask::SELECT | SelectionMask::CUT0;
                    }
                }
                _ => {}
            }
            s = &s[1..];
        }

        if s.is_empty() {
            // Already finished without carrying any payload; report an
            // empty set so the host can clear the selection
            if frag.is_final {
                if let Some(cb) = listener {
                    let sf = StringFragment::new(&[], *state != SelectionState::Set, true);
                    cb.set(*mask, sf);
                }
            }
            return;
        }

        if *state == SelectionState::Selected {
            if s[0] == b'?' {
                *state = SelectionState::Query;
            } else {
                *state = SelectionState::SetInitial;
                *recvpartial = 0;
            }
        }

        if *state == SelectionState::Query {
            if let Some(cb) = listener {
                cb.query(*mask);
            }
            return;
        }

        if *state == SelectionState::Invalid {
            return;
        }

        let Some(cb) = listener else { return };

        let mut bufcur = 0usize;
        let mut x: u32 = 0;
        let mut n: u32 = 0;

        if *recvpartial != 0 {
            n = *recvpartial >> PARTIAL_COUNT_SHIFT;
            x = *recvpartial & PARTIAL_MASK_18BIT;
            *recvpartial = 0;
        }

        while buffer.len() - bufcur >= 3 && !s.is_empty() {
            if s[0] == b'=' {
                if n == 2 {
                    buffer[bufcur] = (x >> 4) as u8;
                    bufcur += 1;
                }
                if n == 3 {
                    buffer[bufcur] = (x >> 10) as u8;
                    buffer[bufcur + 1] = (x >> 2) as u8;
                    bufcur += 2;
                }

                while !s.is_empty() && s[0] == b'=' {
                    s = &s[1..];
                }
                n = 0;
            } else {
                let b = unbase64one(s[0]);
                if b == BASE64_INVALID {
                    debug!("bad base64 input 0x{:02x} in OSC 52", s[0]);
                    *state = SelectionState::Invalid;
                    cb.set(*mask, StringFragment::new(&[], true, true));
                    break;
                }

                x = (x << 6) | u32::from(b);
                n += 1;
                s = &s[1..];

                if n == 4 {
                    buffer[bufcur] = (x >> 16) as u8;
                    buffer[bufcur + 1] = (x >> 8) as u8;
                    buffer[bufcur + 2] = x as u8;
                    bufcur += 3;
                    x = 0;
                    n = 0;
                }
            }

            if s.is_empty() || buffer.len() - bufcur < 3 {
                if bufcur > 0 {
                    let sf = StringFragment::new(
                        &buffer[..bufcur],
                        *state == SelectionState::SetInitial,
                        frag.is_final && s.is_empty(),
                    );
                    cb.set(*mask, sf);
                    *state = SelectionState::Set;
                }
                bufcur = 0;
            }
        }

        if n != 0 {
            *recvpartial = (n << PARTIAL_COUNT_SHIFT) | x;
        }
    }

    /// Stream host selection data to the output as an OSC 52 reply,
    /// base64-encoding incrementally.
    pub fn send_selection(&mut self, mask: SelectionMask, frag: StringFragment<'_>, out: &mut Output) {
        if self.selection.buffer.len() < 4 {
            self.selection.buffer.resize(4096, 0);
        }

        if frag.initial {
            const SELECTION_CHARS: &[u8] = b"cpqs01234567";
            let mut idx = mask.bits().trailing_zeros() as usize;
            if idx >= SELECTION_CHARS.len() {
                idx = 3; // default to SELECT
            }

            out.push_str_seq(
                Some(C1::Osc),
                false,
                format_args!("52;{};", SELECTION_CHARS[idx] as char),
            );

            self.selection.sendpartial = 0;
        }

        if !frag.bytes.is_empty() {
            let mut s = frag.bytes;
            let mut bufcur = 0usize;
            let mut x: u32 = 0;
            let mut n: u32 = 0;

            if self.selection.sendpartial != 0 {
                n = self.selection.sendpartial >> PARTIAL_COUNT_SHIFT;
                x = self.selection.sendpartial & PARTIAL_MASK_24BIT;
                self.selection.sendpartial = 0;
            }

            let buffer = &mut self.selection.buffer;

            while buffer.len() - bufcur >= 4 && !s.is_empty() {
                x = (x << 8) | u32::from(s[0]);
                n += 1;
                s = &s[1..];

                if n == 3 {
                    buffer[bufcur] = base64_one(((x >> 18) & 0x3f) as u8);
                    buffer[bufcur + 1] = base64_one(((x >> 12) & 0x3f) as u8);
                    buffer[bufcur + 2] = base64_one(((x >> 6) & 0x3f) as u8);
                    buffer[bufcur + 3] = base64_one((x & 0x3f) as u8);
                    bufcur += 4;
                    x = 0;
                    n = 0;
                }

                if s.is_empty() || buffer.len() - bufcur < 4 {
                    if bufcur > 0 {
                        out.push_bytes(&buffer[..bufcur]);
                    }
                    bufcur = 0;
                }
            }

            if n != 0 {
                self.selection.sendpartial = (n << PARTIAL_COUNT_SHIFT) | x;
            }
        }

        if frag.is_final {
            if self.selection.sendpartial != 0 {
                let n = self.selection.sendpartial >> PARTIAL_COUNT_SHIFT;
                let mut x = self.selection.sendpartial & PARTIAL_MASK_24BIT;

                // n is either 1 or 2 now
                x <<= if n == 1 { 16 } else { 8 };

                let tail = [
                    base64_one(((x >> 18) & 0x3f) as u8),
                    base64_one(((x >> 12) & 0x3f) as u8),
                    if n == 1 {
                        b'='
                    } else {
                        base64_one(((x >> 6) & 0x3f) as u8)
                    },
                    b'=',
                ];
                out.push_bytes(&tail);
                self.selection.sendpartial = 0;
            }
            out.push_str_seq(None, true, format_args!(""));
        }
    }
}
