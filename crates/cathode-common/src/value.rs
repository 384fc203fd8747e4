use bitflags::bitflags;

use crate::color::Color;

/// A slice of an incrementally delivered string (OSC/DCS/APC/PM/SOS bodies,
/// OSC 52 payload fragments). `initial` marks the first fragment of the
/// sequence, `is_final` the last; a body split across several `write` calls
/// arrives as multiple fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringFragment<'a> {
    pub bytes: &'a [u8],
    pub initial: bool,
    pub is_final: bool,
}

impl<'a> StringFragment<'a> {
    pub fn new(bytes: &'a [u8], initial: bool, is_final: bool) -> Self {
        Self {
            bytes,
            initial,
            is_final,
        }
    }

    pub fn text(&self) -> Option<&'a str> {
        std::str::from_utf8(self.bytes).ok()
    }
}

/// Discriminated value passed through property and attribute callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    Bool(bool),
    Int(i64),
    Color(Color),
    Str(StringFragment<'a>),
}

impl Value<'_> {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }
}

/// Terminal properties observable by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    Title,
    IconName,
    CursorVisible,
    CursorBlink,
    CursorShape,
    Reverse,
    AltScreen,
    Mouse,
    FocusReport,
}

/// Pen attributes delivered through `setpenattr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attr {
    Bold,
    Underline,
    Italic,
    Blink,
    Reverse,
    Conceal,
    Strike,
    Font,
    Foreground,
    Background,
    Small,
    Baseline,
}

/// Mouse reporting level carried by `Prop::Mouse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseMode {
    #[default]
    None = 0,
    Click = 1,
    Drag = 2,
    Move = 3,
}

bitflags! {
    /// Which selection buffers an OSC 52 transaction addresses.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SelectionMask: u16 {
        const CLIPBOARD = 1 << 0;
        const PRIMARY   = 1 << 1;
        const SECONDARY = 1 << 2;
        const SELECT    = 1 << 3;
        const CUT0      = 1 << 4;
        const CUT1      = 1 << 5;
        const CUT2      = 1 << 6;
        const CUT3      = 1 << 7;
        const CUT4      = 1 << 8;
        const CUT5      = 1 << 9;
        const CUT6      = 1 << 10;
        const CUT7      = 1 << 11;
    }
}

/// 8-bit C1 control codes emitted on the output path. In 7-bit mode each is
/// written as ESC plus the byte minus 0x40.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum C1 {
    Ss3 = 0x8f,
    Dcs = 0x90,
    Sos = 0x98,
    Csi = 0x9b,
    St = 0x9c,
    Osc = 0x9d,
    Pm = 0x9e,
    Apc = 0x9f,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Int(5).as_int(), Some(5));
        assert_eq!(Value::Bool(true).as_int(), None);
        assert_eq!(
            Value::Color(Color::Indexed(3)).as_color(),
            Some(Color::Indexed(3))
        );
    }

    #[test]
    fn test_fragment_text() {
        let frag = StringFragment::new(b"title", true, true);
        assert_eq!(frag.text(), Some("title"));
        let bad = StringFragment::new(&[0xff, 0xfe], true, true);
        assert_eq!(bad.text(), None);
    }
}
