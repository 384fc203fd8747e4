//! Pen state, SGR decoding, and the 256-colour palette.

use cathode_common::{Attr, Baseline, Color, Pen, Underline, Value};
use cathode_parser::CsiParam;
use tracing::debug;

use super::State;
use crate::callbacks::StateListener;

const RAMP6: [u8; 6] = [0x00, 0x33, 0x66, 0x99, 0xcc, 0xff];

const RAMP24: [u8; 24] = [
    0x00, 0x0b, 0x16, 0x21, 0x2c, 0x37, 0x42, 0x4d, 0x58, 0x63, 0x6e, 0x79, 0x85, 0x90, 0x9b,
    0xa6, 0xb1, 0xbc, 0xc7, 0xd2, 0xdd, 0xe8, 0xf3, 0xff,
];

pub(super) fn default_ansi_palette() -> [Color; 16] {
    [
        Color::Rgb(0, 0, 0),       // black
        Color::Rgb(224, 0, 0),     // red
        Color::Rgb(0, 224, 0),     // green
        Color::Rgb(224, 224, 0),   // yellow
        Color::Rgb(0, 0, 224),     // blue
        Color::Rgb(224, 0, 224),   // magenta
        Color::Rgb(0, 224, 224),   // cyan
        Color::Rgb(224, 224, 224), // white == light grey
        // high intensity
        Color::Rgb(128, 128, 128), // black
        Color::Rgb(255, 64, 64),   // red
        Color::Rgb(64, 255, 64),   // green
        Color::Rgb(255, 255, 64),  // yellow
        Color::Rgb(64, 64, 255),   // blue
        Color::Rgb(255, 64, 255),  // magenta
        Color::Rgb(64, 255, 255),  // cyan
        Color::Rgb(255, 255, 255), // white for real
    ]
}

fn push_pen_color(args: &mut Vec<CsiParam>, col: Color, is_fg: bool) {
    let family = if is_fg { 30 } else { 40 };
    let bright_family = if is_fg { 90 } else { 100 };
    let extended = if is_fg { 38 } else { 48 };

    match col {
        Color::DefaultFg if is_fg => {}
        Color::DefaultBg if !is_fg => {}
        Color::Indexed(idx) if idx < 8 => args.push(CsiParam::new(i64::from(idx) + family)),
        Color::Indexed(idx) if idx < 16 => {
            args.push(CsiParam::new(i64::from(idx) - 8 + bright_family))
        }
        Color::Indexed(idx) => {
            args.push(CsiParam::new_more(extended));
            args.push(CsiParam::new_more(5));
            args.push(CsiParam::new(i64::from(idx)));
        }
        Color::Rgb(r, g, b) => {
            args.push(CsiParam::new_more(extended));
            args.push(CsiParam::new_more(2));
            args.push(CsiParam::new_more(i64::from(r)));
            args.push(CsiParam::new_more(i64::from(g)));
            args.push(CsiParam::new(i64::from(b)));
        }
        _ => {}
    }
}

impl State {
    /// The stored ANSI palette for indices 0..15, the 6x6x6 cube for
    /// 16..231, the gray ramp for 232..255.
    pub fn palette_color(&self, index: i64) -> Option<Color> {
        match index {
            0..=15 => Some(self.colors[index as usize]),
            16..=231 => {
                let idx = index - 16;
                Some(Color::Rgb(
                    RAMP6[(idx / 36 % 6) as usize],
                    RAMP6[(idx / 6 % 6) as usize],
                    RAMP6[(idx % 6) as usize],
                ))
            }
            232..=255 => {
                let g = RAMP24[(index - 232) as usize];
                Some(Color::Rgb(g, g, g))
            }
            _ => None,
        }
    }

    pub fn set_palette_color(&mut self, index: i64, col: Color) {
        if (0..16).contains(&index) {
            self.colors[index as usize] = col;
        }
    }

    pub fn set_default_colors(&mut self, fg: Color, bg: Color) {
        self.default_fg = fg;
        self.default_bg = bg;
    }

    pub fn default_colors(&self) -> (Color, Color) {
        (self.default_fg, self.default_bg)
    }

    /// Resolve a colour to a concrete RGB triple.
    pub fn convert_color_to_rgb(&self, col: Color) -> Color {
        match col {
            Color::DefaultFg => self.default_fg,
            Color::DefaultBg => self.default_bg,
            Color::Indexed(idx) => self.palette_color(i64::from(idx)).unwrap_or(col),
            Color::Rgb(..) => col,
        }
    }

    pub fn penattr(&self, attr: Attr) -> Value<'static> {
        match attr {
            Attr::Bold => Value::Bool(self.pen.bold),
            Attr::Underline => Value::Int(self.pen.underline as i64),
            Attr::Italic => Value::Bool(self.pen.italic),
            Attr::Blink => Value::Bool(self.pen.blink),
            Attr::Reverse => Value::Bool(self.pen.reverse),
            Attr::Conceal => Value::Bool(self.pen.conceal),
            Attr::Strike => Value::Bool(self.pen.strike),
            Attr::Font => Value::Int(i64::from(self.pen.font)),
            Attr::Foreground => Value::Color(self.pen.fg),
            Attr::Background => Value::Color(self.pen.bg),
            Attr::Small => Value::Bool(self.pen.small),
            Attr::Baseline => Value::Int(self.pen.baseline as i64),
        }
    }

    // ---- internal ----

    fn setpenattr_bool(&mut self, ops: &mut dyn StateListener, attr: Attr, v: bool) {
        let _ = ops.setpenattr(attr, &Value::Bool(v));
    }

    fn setpenattr_int(&mut self, ops: &mut dyn StateListener, attr: Attr, v: i64) {
        let _ = ops.setpenattr(attr, &Value::Int(v));
    }

    fn setpenattr_col(&mut self, ops: &mut dyn StateListener, attr: Attr, col: Color) {
        let _ = ops.setpenattr(attr, &Value::Color(col));
    }

    fn set_pen_col_ansi(&mut self, ops: &mut dyn StateListener, attr: Attr, idx: i64) {
        let col = Color::Indexed(idx as u8);
        if attr == Attr::Background {
            self.pen.bg = col;
        } else {
            self.pen.fg = col;
        }
        self.setpenattr_col(ops, attr, col);
    }

    fn lookup_colour(&self, palette: i64, args: &[CsiParam], col: &mut Color) -> usize {
        match palette {
            2 => {
                // Direct RGB
                if args.len() < 3 {
                    return args.len();
                }
                *col = Color::Rgb(args[0].or(0) as u8, args[1].or(0) as u8, args[2].or(0) as u8);
                3
            }
            5 => {
                // XTerm 256-colour index
                if args.is_empty() {
                    return 0;
                }
                if !args[0].is_missing() {
                    *col = Color::Indexed(args[0].or(0) as u8);
                }
                1
            }
            _ => {
                debug!("unrecognised colour palette {}", palette);
                0
            }
        }
    }

    pub(crate) fn resetpen(&mut self, ops: &mut dyn StateListener) {
        self.pen.bold = false;
        self.setpenattr_bool(ops, Attr::Bold, false);
        self.pen.underline = Underline::Off;
        self.setpenattr_int(ops, Attr::Underline, Underline::Off as i64);
        self.pen.italic = false;
        self.setpenattr_bool(ops, Attr::Italic, false);
        self.pen.blink = false;
        self.setpenattr_bool(ops, Attr::Blink, false);
        self.pen.reverse = false;
        self.setpenattr_bool(ops, Attr::Reverse, false);
        self.pen.conceal = false;
        self.setpenattr_bool(ops, Attr::Conceal, false);
        self.pen.strike = false;
        self.setpenattr_bool(ops, Attr::Strike, false);
        self.pen.font = 0;
        self.setpenattr_int(ops, Attr::Font, 0);
        self.pen.small = false;
        self.setpenattr_bool(ops, Attr::Small, false);
        self.pen.baseline = Baseline::Normal;
        self.setpenattr_int(ops, Attr::Baseline, Baseline::Normal as i64);

        self.pen.fg = Color::DefaultFg;
        self.setpenattr_col(ops, Attr::Foreground, Color::DefaultFg);
        self.pen.bg = Color::DefaultBg;
        self.setpenattr_col(ops, Attr::Background, Color::DefaultBg);
    }

    pub(crate) fn savepen(&mut self, save: bool, ops: &mut dyn StateListener) {
        if save {
            self.saved_pen_store();
        } else {
            self.saved_pen_restore();

            let pen = self.pen;
            self.setpenattr_bool(ops, Attr::Bold, pen.bold);
            self.setpenattr_int(ops, Attr::Underline, pen.underline as i64);
            self.setpenattr_bool(ops, Attr::Italic, pen.italic);
            self.setpenattr_bool(ops, Attr::Blink, pen.blink);
            self.setpenattr_bool(ops, Attr::Reverse, pen.reverse);
            self.setpenattr_bool(ops, Attr::Conceal, pen.conceal);
            self.setpenattr_bool(ops, Attr::Strike, pen.strike);
            self.setpenattr_int(ops, Attr::Font, i64::from(pen.font));
            self.setpenattr_bool(ops, Attr::Small, pen.small);
            self.setpenattr_int(ops, Attr::Baseline, pen.baseline as i64);

            self.setpenattr_col(ops, Attr::Foreground, pen.fg);
            self.setpenattr_col(ops, Attr::Background, pen.bg);
        }
    }

    /// Apply an SGR parameter list to the pen.
    pub(crate) fn setpen(&mut self, args: &[CsiParam], ops: &mut dyn StateListener) {
        let mut argi = 0usize;

        while argi < args.len() {
            match args[argi].value() {
                None | Some(0) => self.resetpen(ops),

                Some(1) => {
                    // Bold on
                    let fg = self.pen.fg;
                    self.pen.bold = true;
                    self.setpenattr_bool(ops, Attr::Bold, true);
                    if let Color::Indexed(idx) = fg {
                        if idx < 8 && self.bold_is_highbright {
                            self.set_pen_col_ansi(ops, Attr::Foreground, i64::from(idx) + 8);
                        }
                    }
                }

                Some(3) => {
                    self.pen.italic = true;
                    self.setpenattr_bool(ops, Attr::Italic, true);
                }

                Some(4) => {
                    // Underline, with optional style sub-parameter
                    self.pen.underline = Underline::Single;
                    if args[argi].has_more() && argi + 1 < args.len() {
                        argi += 1;
                        match args[argi].value() {
                            Some(0) => self.pen.underline = Underline::Off,
                            Some(1) => self.pen.underline = Underline::Single,
                            Some(2) => self.pen.underline = Underline::Double,
                            Some(3) => self.pen.underline = Underline::Curly,
                            _ => {}
                        }
                    }
                    let underline = self.pen.underline;
                    self.setpenattr_int(ops, Attr::Underline, underline as i64);
                }

                Some(5) => {
                    self.pen.blink = true;
                    self.setpenattr_bool(ops, Attr::Blink, true);
                }

                Some(7) => {
                    self.pen.reverse = true;
                    self.setpenattr_bool(ops, Attr::Reverse, true);
                }

                Some(8) => {
                    self.pen.conceal = true;
                    self.setpenattr_bool(ops, Attr::Conceal, true);
                }

                Some(9) => {
                    self.pen.strike = true;
                    self.setpenattr_bool(ops, Attr::Strike, true);
                }

                Some(v @ 10..=19) => {
                    self.pen.font = (v - 10) as u8;
                    self.setpenattr_int(ops, Attr::Font, v - 10);
                }

                Some(21) => {
                    self.pen.underline = Underline::Double;
                    self.setpenattr_int(ops, Attr::Underline, Underline::Double as i64);
                }

                Some(22) => {
                    self.pen.bold = false;
                    self.setpenattr_bool(ops, Attr::Bold, false);
                }

                Some(23) => {
                    self.pen.italic = false;
                    self.setpenattr_bool(ops, Attr::Italic, false);
                }

                Some(24) => {
                    self.pen.underline = Underline::Off;
                    self.setpenattr_int(ops, Attr::Underline, Underline::Off as i64);
                }

                Some(25) => {
                    self.pen.blink = false;
                    self.setpenattr_bool(ops, Attr::Blink, false);
                }

                Some(27) => {
                    self.pen.reverse = false;
                    self.setpenattr_bool(ops, Attr::Reverse, false);
                }

                Some(28) => {
                    self.pen.conceal = false;
                    self.setpenattr_bool(ops, Attr::Conceal, false);
                }

                Some(29) => {
                    self.pen.strike = false;
                    self.setpenattr_bool(ops, Attr::Strike, false);
                }

                Some(v) if (30..=37).contains(&v) || (40..=47).contains(&v) => {
                    let is_bg = v >= 40;
                    let mut idx = v - if is_bg { 40 } else { 30 };
                    if !is_bg && self.pen.bold && self.bold_is_highbright {
                        idx += 8;
                    }
                    let attr = if is_bg { Attr::Background } else { Attr::Foreground };
                    self.set_pen_col_ansi(ops, attr, idx);
                }

                Some(v @ (38 | 48)) => {
                    if args.len() - argi < 2 {
                        return;
                    }
                    let is_bg = v == 48;
                    let palette = args[argi + 1].or(0);
                    let mut col = if is_bg { self.pen.bg } else { self.pen.fg };
                    let consumed = self.lookup_colour(palette, &args[argi + 2..], &mut col);
                    argi += 1 + consumed;
                    let attr = if is_bg { Attr::Background } else { Attr::Foreground };
                    if is_bg {
                        self.pen.bg = col;
                    } else {
                        self.pen.fg = col;
                    }
                    self.setpenattr_col(ops, attr, col);
                }

                Some(v @ (39 | 49)) => {
                    let is_bg = v == 49;
                    let (attr, col) = if is_bg {
                        (Attr::Background, Color::DefaultBg)
                    } else {
                        (Attr::Foreground, Color::DefaultFg)
                    };
                    if is_bg {
                        self.pen.bg = col;
                    } else {
                        self.pen.fg = col;
                    }
                    self.setpenattr_col(ops, attr, col);
                }

                Some(v @ 73..=75) => {
                    self.pen.small = v != 75;
                    self.pen.baseline = match v {
                        73 => Baseline::Raise,
                        74 => Baseline::Lower,
                        _ => Baseline::Normal,
                    };
                    let (small, baseline) = (self.pen.small, self.pen.baseline);
                    self.setpenattr_bool(ops, Attr::Small, small);
                    self.setpenattr_int(ops, Attr::Baseline, baseline as i64);
                }

                Some(v) if (90..=97).contains(&v) || (100..=107).contains(&v) => {
                    let is_bg = v >= 100;
                    let idx = v - if is_bg { 100 } else { 90 } + 8;
                    let attr = if is_bg { Attr::Background } else { Attr::Foreground };
                    self.set_pen_col_ansi(ops, attr, idx);
                }

                Some(other) => {
                    debug!("unhandled SGR {}", other);
                }
            }

            while argi < args.len() && args[argi].has_more() {
                argi += 1;
            }
            if argi < args.len() {
                argi += 1;
            }
        }
    }

    /// The minimal SGR argument vector that reproduces the current pen
    /// from a reset one.
    pub fn getpen(&self) -> Vec<CsiParam> {
        let mut args = Vec::new();
        let pen: &Pen = &self.pen;

        if pen.bold {
            args.push(CsiParam::new(1));
        }
        if pen.italic {
            args.push(CsiParam::new(3));
        }
        if pen.underline == Underline::Single {
            args.push(CsiParam::new(4));
        }
        if pen.underline == Underline::Curly {
            args.push(CsiParam::new_more(4));
            args.push(CsiParam::new(3));
        }
        if pen.blink {
            args.push(CsiParam::new(5));
        }
        if pen.reverse {
            args.push(CsiParam::new(7));
        }
        if pen.conceal {
            args.push(CsiParam::new(8));
        }
        if pen.strike {
            args.push(CsiParam::new(9));
        }
        if pen.font != 0 {
            args.push(CsiParam::new(10 + i64::from(pen.font)));
        }
        if pen.underline == Underline::Double {
            args.push(CsiParam::new(21));
        }

        push_pen_color(&mut args, pen.fg, true);
        push_pen_color(&mut args, pen.bg, false);

        if pen.small {
            if pen.baseline == Baseline::Raise {
                args.push(CsiParam::new(73));
            } else if pen.baseline == Baseline::Lower {
                args.push(CsiParam::new(74));
            }
        }

        args
    }

    fn saved_pen_store(&mut self) {
        self.saved.pen = self.pen;
    }

    fn saved_pen_restore(&mut self) {
        self.pen = self.saved.pen;
    }
}
