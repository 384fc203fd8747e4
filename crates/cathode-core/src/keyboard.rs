//! Translation of user key input into the byte sequences a terminal
//! application expects, honoring keypad/cursor application modes, LNM, and
//! bracketed paste.

use cathode_common::C1;

use crate::encoding::{fill_utf8, UTF8_MAX_SEQLEN};
use crate::output::Output;
use crate::state::State;

bitflags::bitflags! {
    /// Keyboard modifiers, encoded into CSI sequences as `bits + 1`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifier: u8 {
        const SHIFT = 0x01;
        const ALT   = 0x02;
        const CTRL  = 0x04;
    }
}

/// Named (non-Unicode) keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Tab,
    Backspace,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    /// F1..F12; other numbers produce nothing.
    Function(u8),
    Keypad0,
    Keypad1,
    Keypad2,
    Keypad3,
    Keypad4,
    Keypad5,
    Keypad6,
    Keypad7,
    Keypad8,
    Keypad9,
    KeypadMult,
    KeypadPlus,
    KeypadComma,
    KeypadMinus,
    KeypadPeriod,
    KeypadDivide,
    KeypadEnter,
    KeypadEqual,
}

#[derive(Debug, Clone, Copy)]
enum KeycodeType {
    Literal,
    Tab,
    Enter,
    Ss3,
    CsiCursor,
    CsiNum,
    Keypad,
}

#[derive(Debug, Clone, Copy)]
struct KeyCode {
    ty: KeycodeType,
    literal: u8,
    csinum: i32,
}

const fn kc(ty: KeycodeType, literal: u8, csinum: i32) -> KeyCode {
    KeyCode { ty, literal, csinum }
}

fn keycode(key: Key) -> Option<KeyCode> {
    use KeycodeType::*;

    Some(match key {
        Key::Enter => kc(Enter, b'\r', 0),
        Key::Tab => kc(Tab, b'\t', 0),
        Key::Backspace => kc(Literal, 0x7f, 0),
        Key::Escape => kc(Literal, 0x1b, 0),

        Key::Up => kc(CsiCursor, b'A', 0),
        Key::Down => kc(CsiCursor, b'B', 0),
        Key::Left => kc(CsiCursor, b'D', 0),
        Key::Right => kc(CsiCursor, b'C', 0),

        Key::Insert => kc(CsiNum, b'~', 2),
        Key::Delete => kc(CsiNum, b'~', 3),
        Key::Home => kc(CsiCursor, b'H', 0),
        Key::End => kc(CsiCursor, b'F', 0),
        Key::PageUp => kc(CsiNum, b'~', 5),
        Key::PageDown => kc(CsiNum, b'~', 6),

        Key::Function(n) => match n {
            1 => kc(Ss3, b'P', 0),
            2 => kc(Ss3, b'Q', 0),
            3 => kc(Ss3, b'R', 0),
            4 => kc(Ss3, b'S', 0),
            5 => kc(CsiNum, b'~', 15),
            6 => kc(CsiNum, b'~', 17),
            7 => kc(CsiNum, b'~', 18),
            8 => kc(CsiNum, b'~', 19),
            9 => kc(CsiNum, b'~', 20),
            10 => kc(CsiNum, b'~', 21),
            11 => kc(CsiNum, b'~', 23),
            12 => kc(CsiNum, b'~', 24),
            _ => return None,
        },

        Key::Keypad0 => kc(Keypad, b'0', 'p' as i32),
        Key::Keypad1 => kc(Keypad, b'1', 'q' as i32),
        Key::Keypad2 => kc(Keypad, b'2', 'r' as i32),
        Key::Keypad3 => kc(Keypad, b'3', 's' as i32),
        Key::Keypad4 => kc(Keypad, b'4', 't' as i32),
        Key::Keypad5 => kc(Keypad, b'5', 'u' as i32),
        Key::Keypad6 => kc(Keypad, b'6', 'v' as i32),
        Key::Keypad7 => kc(Keypad, b'7', 'w' as i32),
        Key::Keypad8 => kc(Keypad, b'8', 'x' as i32),
        Key::Keypad9 => kc(Keypad, b'9', 'y' as i32),
        Key::KeypadMult => kc(Keypad, b'*', 'j' as i32),
        Key::KeypadPlus => kc(Keypad, b'+', 'k' as i32),
        Key::KeypadComma => kc(Keypad, b',', 'l' as i32),
        Key::KeypadMinus => kc(Keypad, b'-', 'm' as i32),
        Key::KeypadPeriod => kc(Keypad, b'.', 'n' as i32),
        Key::KeypadDivide => kc(Keypad, b'/', 'o' as i32),
        Key::KeypadEnter => kc(Keypad, b'\n', 'M' as i32),
        Key::KeypadEqual => kc(Keypad, b'=', 'X' as i32),
    })
}

fn push_unichar(out: &mut Output, c: u32) {
    let mut buf = [0u8; UTF8_MAX_SEQLEN];
    let len = fill_utf8(c, &mut buf);
    out.push_bytes(&buf[..len]);
}

/// Encode a Unicode key press. Modified presses that fall under the CSI-u
/// convention get `CSI <cp> ; <mod+1> u`; Ctrl masks letters into C0;
/// Alt prefixes ESC.
pub(crate) fn unichar(c: u32, modifier: Modifier, out: &mut Output) {
    let mut modifier = modifier;
    if c != u32::from(b' ') {
        modifier &= !Modifier::SHIFT;
    }

    if modifier.is_empty() {
        push_unichar(out, c);
        return;
    }

    let needs_csi_u = match c {
        c if c == u32::from(b'i')
            || c == u32::from(b'j')
            || c == u32::from(b'm')
            || c == u32::from(b'[') =>
        {
            true
        }
        c if c == u32::from(b'\\')
            || c == u32::from(b']')
            || c == u32::from(b'^')
            || c == u32::from(b'_') =>
        {
            false
        }
        c if c == u32::from(b' ') => modifier.contains(Modifier::SHIFT),
        _ => !(u32::from(b'a')..=u32::from(b'z')).contains(&c),
    };

    if needs_csi_u && !(modifier & !Modifier::ALT).is_empty() {
        out.push_ctrl(C1::Csi, format_args!("{};{}u", c, modifier.bits() + 1));
        return;
    }

    let mut c = c;
    if modifier.contains(Modifier::CTRL) {
        // maps 'a'-'z' to 0x01-0x1a
        c &= 0x1f;
    }

    if modifier.contains(Modifier::ALT) {
        out.push_bytes(&[0x1b]);
    }

    push_unichar(out, c);
}

fn emit_literal(literal: u8, imod: u8, out: &mut Output) {
    if imod != 0 && imod & (Modifier::SHIFT | Modifier::CTRL).bits() != 0 {
        out.push_ctrl(C1::Csi, format_args!("{};{}u", literal, imod + 1));
    } else if imod != 0 && imod & Modifier::ALT.bits() != 0 {
        out.push_bytes(&[0x1b, literal]);
    } else {
        out.push_bytes(&[literal]);
    }
}

fn emit_csi(literal: u8, imod: u8, out: &mut Output) {
    if imod == 0 {
        out.push_ctrl(C1::Csi, format_args!("{}", literal as char));
    } else {
        out.push_ctrl(C1::Csi, format_args!("1;{}{}", imod + 1, literal as char));
    }
}

fn emit_ss3(literal: u8, imod: u8, out: &mut Output) {
    if imod == 0 {
        out.push_ctrl(C1::Ss3, format_args!("{}", literal as char));
    } else {
        emit_csi(literal, imod, out);
    }
}

/// Encode a named key press.
pub(crate) fn key(key: Key, modifier: Modifier, state: &State, out: &mut Output) {
    let Some(k) = keycode(key) else { return };

    let imod = modifier.bits();

    match k.ty {
        KeycodeType::Tab => {
            if modifier == Modifier::SHIFT {
                out.push_ctrl(C1::Csi, format_args!("Z"));
            } else if modifier.contains(Modifier::SHIFT) {
                out.push_ctrl(C1::Csi, format_args!("1;{}Z", imod + 1));
            } else {
                emit_literal(k.literal, imod, out);
            }
        }

        KeycodeType::Enter => {
            if state.mode.newline {
                out.push_bytes(b"\r\n");
            } else {
                emit_literal(k.literal, imod, out);
            }
        }

        KeycodeType::Literal => emit_literal(k.literal, imod, out),

        KeycodeType::Ss3 => emit_ss3(k.literal, imod, out),

        KeycodeType::CsiNum => {
            if imod == 0 {
                out.push_ctrl(C1::Csi, format_args!("{}{}", k.csinum, k.literal as char));
            } else {
                out.push_ctrl(
                    C1::Csi,
                    format_args!("{};{}{}", k.csinum, imod + 1, k.literal as char),
                );
            }
        }

        KeycodeType::CsiCursor => {
            if state.mode.cursor {
                emit_ss3(k.literal, imod, out);
            } else {
                emit_csi(k.literal, imod, out);
            }
        }

        KeycodeType::Keypad => {
            if state.mode.keypad {
                emit_ss3(k.csinum as u8, imod, out);
            } else {
                emit_literal(k.literal, imod, out);
            }
        }
    }
}

pub(crate) fn start_paste(state: &State, out: &mut Output) {
    if state.mode.bracketpaste {
        out.push_ctrl(C1::Csi, format_args!("200~"));
    }
}

pub(crate) fn end_paste(state: &State, out: &mut Output) {
    if state.mode.bracketpaste {
        out.push_ctrl(C1::Csi, format_args!("201~"));
    }
}
