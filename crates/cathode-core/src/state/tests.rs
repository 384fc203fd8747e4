use std::cell::RefCell;
use std::rc::Rc;

use cathode_common::{Attr, Color, LineInfo, Pos, Prop, Rect, SelectionMask, Underline};

use crate::callbacks::{GlyphInfo, SelectionListener, StateListener};
use crate::keyboard::{Key, Modifier};
use crate::Terminal;

#[derive(Debug, Clone, PartialEq)]
enum OwnedValue {
    Bool(bool),
    Int(i64),
    Color(Color),
    Str(Vec<u8>, bool, bool),
}

impl From<&cathode_common::Value<'_>> for OwnedValue {
    fn from(v: &cathode_common::Value<'_>) -> Self {
        match v {
            cathode_common::Value::Bool(b) => OwnedValue::Bool(*b),
            cathode_common::Value::Int(n) => OwnedValue::Int(*n),
            cathode_common::Value::Color(c) => OwnedValue::Color(*c),
            cathode_common::Value::Str(f) => OwnedValue::Str(f.bytes.to_vec(), f.initial, f.is_final),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Glyph { chars: Vec<u32>, width: i32, pos: Pos },
    MoveCursor(Pos, Pos),
    ScrollRect(Rect, i32, i32),
    Erase(Rect, bool),
    PenAttr(Attr, OwnedValue),
    TermProp(Prop, OwnedValue),
    SetLineInfo(i32, LineInfo),
    Bell,
    SbClear,
    Premove(Rect),
}

struct Recorder {
    ops: Rc<RefCell<Vec<Op>>>,
}

impl StateListener for Recorder {
    fn putglyph(&mut self, glyph: &GlyphInfo<'_>, pos: Pos) -> bool {
        self.ops.borrow_mut().push(Op::Glyph {
            chars: glyph.chars.to_vec(),
            width: glyph.width,
            pos,
        });
        true
    }

    fn movecursor(&mut self, pos: Pos, oldpos: Pos, _visible: bool) -> bool {
        self.ops.borrow_mut().push(Op::MoveCursor(pos, oldpos));
        true
    }

    fn scrollrect(&mut self, rect: Rect, downward: i32, rightward: i32) -> bool {
        self.ops
            .borrow_mut()
            .push(Op::ScrollRect(rect, downward, rightward));
        true
    }

    fn erase(&mut self, rect: Rect, selective: bool) -> bool {
        self.ops.borrow_mut().push(Op::Erase(rect, selective));
        true
    }

    fn setpenattr(&mut self, attr: Attr, val: &cathode_common::Value<'_>) -> bool {
        self.ops.borrow_mut().push(Op::PenAttr(attr, val.into()));
        true
    }

    fn settermprop(&mut self, prop: Prop, val: &cathode_common::Value<'_>) -> bool {
        self.ops.borrow_mut().push(Op::TermProp(prop, val.into()));
        true
    }

    fn setlineinfo(&mut self, row: i32, newinfo: LineInfo, _oldinfo: LineInfo) -> bool {
        self.ops.borrow_mut().push(Op::SetLineInfo(row, newinfo));
        true
    }

    fn bell(&mut self) -> bool {
        self.ops.borrow_mut().push(Op::Bell);
        true
    }

    fn sb_clear(&mut self) -> bool {
        self.ops.borrow_mut().push(Op::SbClear);
        true
    }

    fn premove(&mut self, rect: Rect, _lineinfo: &[LineInfo]) -> bool {
        self.ops.borrow_mut().push(Op::Premove(rect));
        true
    }
}

fn term() -> (Terminal, Rc<RefCell<Vec<Op>>>) {
    let mut t = Terminal::new(24, 80);
    let ops: Rc<RefCell<Vec<Op>>> = Rc::default();
    t.set_state_listener(Box::new(Recorder { ops: ops.clone() }));
    (t, ops)
}

fn glyphs(ops: &[Op]) -> Vec<(Vec<u32>, i32, Pos)> {
    ops.iter()
        .filter_map(|op| match op {
            Op::Glyph { chars, width, pos } => Some((chars.clone(), *width, *pos)),
            _ => None,
        })
        .collect()
}

#[test]
fn test_plain_text_glyphs() {
    let (mut t, ops) = term();
    t.write(b"ABC");

    let gs = glyphs(&ops.borrow());
    assert_eq!(
        gs,
        vec![
            (vec![b'A' as u32], 1, Pos::new(0, 0)),
            (vec![b'B' as u32], 1, Pos::new(0, 1)),
            (vec![b'C' as u32], 1, Pos::new(0, 2)),
        ]
    );
    assert_eq!(t.cursor_pos(), Pos::new(0, 3));
}

#[test]
fn test_cr_lf() {
    let (mut t, _) = term();
    t.write(b"Hello\r\n");
    assert_eq!(t.cursor_pos(), Pos::new(1, 0));
}

#[test]
fn test_bell() {
    let (mut t, ops) = term();
    t.write(b"\x07");
    assert_eq!(*ops.borrow(), vec![Op::Bell]);
}

#[test]
fn test_backspace_stops_at_left_margin() {
    let (mut t, _) = term();
    t.write(b"ab\x08\x08\x08");
    assert_eq!(t.cursor_pos(), Pos::new(0, 0));
}

#[test]
fn test_tab_stops() {
    let (mut t, _) = term();
    t.write(b"\t");
    assert_eq!(t.cursor_pos(), Pos::new(0, 8));
    t.write(b"X\t");
    assert_eq!(t.cursor_pos(), Pos::new(0, 16));
    // HTS sets a custom stop
    t.write(b"\x1b[3;5H\x1bH\r\t");
    assert_eq!(t.cursor_pos(), Pos::new(2, 4));
}

#[test]
fn test_autowrap_phantom() {
    let (mut t, ops) = term();
    t.write("x".repeat(80).as_bytes());
    // The cursor holds at the last column until the next glyph
    assert_eq!(t.cursor_pos(), Pos::new(0, 79));

    t.write(b"y");
    let gs = glyphs(&ops.borrow());
    assert_eq!(gs.last().unwrap().2, Pos::new(1, 0));
    assert!(t.state().lineinfo(1).continuation);
}

#[test]
fn test_wrap_cancelled_by_motion() {
    let (mut t, _) = term();
    t.write("x".repeat(80).as_bytes());
    t.write(b"\x1b[D");
    t.write(b"y");
    // Motion cleared the phantom latch, so no wrap happened
    assert_eq!(t.cursor_pos(), Pos::new(0, 79));
}

#[test]
fn test_cup_and_relative_movement() {
    let (mut t, _) = term();
    t.write(b"\x1b[5;10H");
    assert_eq!(t.cursor_pos(), Pos::new(4, 9));
    t.write(b"\x1b[2A");
    assert_eq!(t.cursor_pos(), Pos::new(2, 9));
    t.write(b"\x1b[3C");
    assert_eq!(t.cursor_pos(), Pos::new(2, 12));
    t.write(b"\x1b[H");
    assert_eq!(t.cursor_pos(), Pos::new(0, 0));
    // Clamped at the edges
    t.write(b"\x1b[999;999H");
    assert_eq!(t.cursor_pos(), Pos::new(23, 79));
}

#[test]
fn test_save_restore_cursor() {
    let (mut t, _) = term();
    t.write(b"\x1b[5;10H\x1b7\x1b[H\x1b8");
    assert_eq!(t.cursor_pos(), Pos::new(4, 9));
}

#[test]
fn test_scrollregion_linefeed_scrolls() {
    let (mut t, ops) = term();
    t.write(b"\x1b[1;5r");
    assert_eq!(t.cursor_pos(), Pos::new(0, 0));
    t.write(b"\x1b[5;1H\n");

    let recorded = ops.borrow();
    assert!(recorded.contains(&Op::Premove(Rect::new(0, 1, 0, 80))));
    assert!(recorded.contains(&Op::ScrollRect(Rect::new(0, 5, 0, 80), 1, 0)));
}

#[test]
fn test_ri_scrolls_at_top() {
    let (mut t, ops) = term();
    t.write(b"\x1bM");
    assert!(ops
        .borrow()
        .contains(&Op::ScrollRect(Rect::new(0, 24, 0, 80), -1, 0)));
}

#[test]
fn test_degenerate_scrollregion_rejected() {
    let (mut t, ops) = term();
    t.write(b"\x1b[7;3r");
    ops.borrow_mut().clear();
    // A linefeed on the last row must scroll the whole screen
    t.write(b"\x1b[24;1H\n");
    assert!(ops
        .borrow()
        .contains(&Op::ScrollRect(Rect::new(0, 24, 0, 80), 1, 0)));
}

#[test]
fn test_origin_mode_addressing() {
    let (mut t, _) = term();
    t.write(b"\x1b[5;20r\x1b[?6h");
    assert_eq!(t.cursor_pos(), Pos::new(4, 0));
    t.write(b"\x1b[1;1H");
    assert_eq!(t.cursor_pos(), Pos::new(4, 0));
    t.write(b"\x1b[999;1H");
    assert_eq!(t.cursor_pos(), Pos::new(19, 0));
    t.write(b"\x1b[?6l");
    assert_eq!(t.cursor_pos(), Pos::new(0, 0));
}

#[test]
fn test_erase_display() {
    let (mut t, ops) = term();
    t.write(b"\x1b[5;10H");
    ops.borrow_mut().clear();
    t.write(b"\x1b[2J");
    assert!(ops.borrow().contains(&Op::Erase(Rect::new(0, 24, 0, 80), false)));
}

#[test]
fn test_erase_below_splits_rects() {
    let (mut t, ops) = term();
    t.write(b"\x1b[5;10H");
    ops.borrow_mut().clear();
    t.write(b"\x1b[J");
    let recorded = ops.borrow();
    assert!(recorded.contains(&Op::Erase(Rect::new(4, 5, 9, 80), false)));
    assert!(recorded.contains(&Op::Erase(Rect::new(5, 24, 0, 80), false)));
}

#[test]
fn test_erase_line_variants() {
    let (mut t, ops) = term();
    t.write(b"\x1b[3;10H");
    ops.borrow_mut().clear();
    t.write(b"\x1b[K\x1b[1K\x1b[2K");
    let recorded = ops.borrow();
    assert!(recorded.contains(&Op::Erase(Rect::new(2, 3, 9, 80), false)));
    assert!(recorded.contains(&Op::Erase(Rect::new(2, 3, 0, 10), false)));
    assert!(recorded.contains(&Op::Erase(Rect::new(2, 3, 0, 80), false)));
}

#[test]
fn test_ech() {
    let (mut t, ops) = term();
    ops.borrow_mut().clear();
    t.write(b"\x1b[3X");
    assert!(ops.borrow().contains(&Op::Erase(Rect::new(0, 1, 0, 3), false)));
}

#[test]
fn test_ich_dch() {
    let (mut t, ops) = term();
    t.write(b"\x1b[1;5H");
    ops.borrow_mut().clear();
    t.write(b"\x1b[2@");
    assert!(ops
        .borrow()
        .contains(&Op::ScrollRect(Rect::new(0, 1, 4, 80), 0, -2)));

    ops.borrow_mut().clear();
    t.write(b"\x1b[3P");
    assert!(ops
        .borrow()
        .contains(&Op::ScrollRect(Rect::new(0, 1, 4, 80), 0, 3)));
}

#[test]
fn test_il_dl() {
    let (mut t, ops) = term();
    t.write(b"\x1b[10;1H");
    ops.borrow_mut().clear();
    t.write(b"\x1b[2L");
    assert!(ops
        .borrow()
        .contains(&Op::ScrollRect(Rect::new(9, 24, 0, 80), -2, 0)));

    ops.borrow_mut().clear();
    t.write(b"\x1b[M");
    assert!(ops
        .borrow()
        .contains(&Op::ScrollRect(Rect::new(9, 24, 0, 80), 1, 0)));
}

#[test]
fn test_insert_mode_shifts_row() {
    let (mut t, ops) = term();
    t.write(b"\x1b[4h");
    ops.borrow_mut().clear();
    t.write(b"A");
    let recorded = ops.borrow();
    let scroll_at = recorded
        .iter()
        .position(|op| *op == Op::ScrollRect(Rect::new(0, 1, 0, 80), 0, -1))
        .expect("insert mode must pre-shift the row");
    let glyph_at = recorded
        .iter()
        .position(|op| matches!(op, Op::Glyph { .. }))
        .expect("glyph must still be written");
    assert!(scroll_at < glyph_at);
}

#[test]
fn test_rep_repeats_last_glyph() {
    let (mut t, ops) = term();
    t.write(b"a\x1b[3b");
    let gs = glyphs(&ops.borrow());
    assert_eq!(gs.len(), 4);
    for (i, g) in gs.iter().enumerate() {
        assert_eq!(g.0, vec![b'a' as u32]);
        assert_eq!(g.2, Pos::new(0, i as i32));
    }
    assert_eq!(t.cursor_pos(), Pos::new(0, 4));
}

#[test]
fn test_decaln_fills_screen() {
    let (mut t, ops) = term();
    t.write(b"\x1b#8");
    let gs = glyphs(&ops.borrow());
    assert_eq!(gs.len(), 24 * 80);
    assert_eq!(gs[0], (vec![b'E' as u32], 1, Pos::new(0, 0)));
    assert_eq!(gs.last().unwrap().2, Pos::new(23, 79));
}

#[test]
fn test_dwl_lineinfo() {
    let (mut t, ops) = term();
    t.write(b"\x1b#6");
    let recorded = ops.borrow();
    assert!(recorded.iter().any(|op| matches!(
        op,
        Op::SetLineInfo(0, info) if info.doublewidth
    )));
    drop(recorded);
    // Row width halves on a DWL line
    t.write("x".repeat(40).as_bytes());
    assert_eq!(t.cursor_pos(), Pos::new(0, 39));
    t.write(b"y");
    assert_eq!(glyphs(&ops.borrow()).last().unwrap().2, Pos::new(1, 0));
}

#[test]
fn test_dec_special_graphics() {
    let (mut t, ops) = term();
    t.write(b"\x1b(0q");
    assert_eq!(glyphs(&ops.borrow())[0].0, vec![0x2500]);

    ops.borrow_mut().clear();
    t.write(b"\x1b(Bq");
    assert_eq!(glyphs(&ops.borrow())[0].0, vec![b'q' as u32]);
}

#[test]
fn test_single_shift() {
    let (mut t, ops) = term();
    // Designate G2 as DEC graphics, select it for one glyph with SS2
    t.write(b"\x1b*0\x1bNq");
    assert_eq!(glyphs(&ops.borrow())[0].0, vec![0x2500]);

    ops.borrow_mut().clear();
    t.write(b"q");
    assert_eq!(glyphs(&ops.borrow())[0].0, vec![b'q' as u32]);
}

#[test]
fn test_combining_join_across_writes() {
    let (mut t, ops) = term();
    t.set_utf8(true);
    t.write(b"e");
    // U+0301 combining acute, arriving in a separate write
    t.write(b"\xcc\x81");

    let gs = glyphs(&ops.borrow());
    assert_eq!(gs.len(), 2);
    assert_eq!(gs[1], (vec![b'e' as u32, 0x0301], 1, Pos::new(0, 0)));
    assert_eq!(t.cursor_pos(), Pos::new(0, 1));
}

#[test]
fn test_utf8_split_multibyte() {
    let (mut t, ops) = term();
    t.set_utf8(true);
    t.write(b"\xc3");
    assert!(glyphs(&ops.borrow()).is_empty());
    t.write(b"\xa9");
    assert_eq!(glyphs(&ops.borrow())[0].0, vec![0xe9]);
}

#[test]
fn test_wide_char_advances_two() {
    let (mut t, ops) = term();
    t.set_utf8(true);
    t.write("中".as_bytes());
    let gs = glyphs(&ops.borrow());
    assert_eq!(gs[0], (vec![0x4e2d], 2, Pos::new(0, 0)));
    assert_eq!(t.cursor_pos(), Pos::new(0, 2));
}

#[test]
fn test_sgr_pen_attrs() {
    let (mut t, ops) = term();
    ops.borrow_mut().clear();
    t.write(b"\x1b[1;3;31m");
    let recorded = ops.borrow();
    assert!(recorded.contains(&Op::PenAttr(Attr::Bold, OwnedValue::Bool(true))));
    assert!(recorded.contains(&Op::PenAttr(Attr::Italic, OwnedValue::Bool(true))));
    assert!(recorded.contains(&Op::PenAttr(
        Attr::Foreground,
        OwnedValue::Color(Color::Indexed(1))
    )));
}

#[test]
fn test_sgr_underline_styles() {
    let (mut t, ops) = term();
    t.write(b"\x1b[4:3m");
    assert!(ops.borrow().contains(&Op::PenAttr(
        Attr::Underline,
        OwnedValue::Int(Underline::Curly as i64)
    )));

    ops.borrow_mut().clear();
    t.write(b"\x1b[21m");
    assert!(ops.borrow().contains(&Op::PenAttr(
        Attr::Underline,
        OwnedValue::Int(Underline::Double as i64)
    )));

    ops.borrow_mut().clear();
    t.write(b"\x1b[24m");
    assert!(ops.borrow().contains(&Op::PenAttr(
        Attr::Underline,
        OwnedValue::Int(Underline::Off as i64)
    )));
}

#[test]
fn test_sgr_extended_colors() {
    let (mut t, ops) = term();
    t.write(b"\x1b[38;5;123m");
    assert!(ops.borrow().contains(&Op::PenAttr(
        Attr::Foreground,
        OwnedValue::Color(Color::Indexed(123))
    )));

    ops.borrow_mut().clear();
    t.write(b"\x1b[48;2;10;20;30m");
    assert!(ops.borrow().contains(&Op::PenAttr(
        Attr::Background,
        OwnedValue::Color(Color::Rgb(10, 20, 30))
    )));

    // Colon-separated sub-parameter form
    ops.borrow_mut().clear();
    t.write(b"\x1b[38:2:1:2:3m");
    assert!(ops.borrow().contains(&Op::PenAttr(
        Attr::Foreground,
        OwnedValue::Color(Color::Rgb(1, 2, 3))
    )));
}

#[test]
fn test_sgr_bold_highbright() {
    let (mut t, ops) = term();
    t.state_mut().set_bold_highbright(true);
    t.write(b"\x1b[1;31m");
    assert!(ops.borrow().contains(&Op::PenAttr(
        Attr::Foreground,
        OwnedValue::Color(Color::Indexed(9))
    )));
}

#[test]
fn test_sgr_reset_restores_defaults() {
    let (mut t, ops) = term();
    t.write(b"\x1b[1;31m");
    ops.borrow_mut().clear();
    t.write(b"\x1b[m");
    let recorded = ops.borrow();
    assert!(recorded.contains(&Op::PenAttr(Attr::Bold, OwnedValue::Bool(false))));
    assert!(recorded.contains(&Op::PenAttr(
        Attr::Foreground,
        OwnedValue::Color(Color::DefaultFg)
    )));
}

#[test]
fn test_getpen_minimal_args() {
    let (mut t, _) = term();
    t.write(b"\x1b[1;3;38;5;123m");
    let args: Vec<i64> = t.state().getpen().iter().map(|a| a.or(-1)).collect();
    assert_eq!(args, vec![1, 3, 38, 5, 123]);

    let pen_args = t.state().getpen();
    assert!(pen_args[2].has_more());
    assert!(pen_args[3].has_more());
    assert!(!pen_args[4].has_more());
}

#[test]
fn test_palette_lookup() {
    let (t, _) = term();
    assert_eq!(t.state().palette_color(1), Some(Color::Rgb(224, 0, 0)));
    assert_eq!(t.state().palette_color(16), Some(Color::Rgb(0, 0, 0)));
    assert_eq!(t.state().palette_color(21), Some(Color::Rgb(0, 0, 0xff)));
    assert_eq!(t.state().palette_color(231), Some(Color::Rgb(0xff, 0xff, 0xff)));
    assert_eq!(t.state().palette_color(232), Some(Color::Rgb(0, 0, 0)));
    assert_eq!(t.state().palette_color(255), Some(Color::Rgb(0xff, 0xff, 0xff)));
    assert_eq!(t.state().palette_color(256), None);
}

#[test]
fn test_default_colors() {
    let (t, _) = term();
    let (fg, bg) = t.state().default_colors();
    assert_eq!(fg, Color::Rgb(240, 240, 240));
    assert_eq!(bg, Color::Rgb(0, 0, 0));
}

#[test]
fn test_osc_title() {
    let (mut t, ops) = term();
    t.write(b"\x1b]2;hi\x07");
    assert!(ops.borrow().contains(&Op::TermProp(
        Prop::Title,
        OwnedValue::Str(b"hi".to_vec(), true, true)
    )));
}

#[test]
fn test_altscreen_prop_and_erase() {
    let (mut t, ops) = term();
    t.write(b"\x1b[?1049h");
    let recorded = ops.borrow();
    assert!(recorded.contains(&Op::TermProp(Prop::AltScreen, OwnedValue::Bool(true))));
    assert!(recorded.contains(&Op::Erase(Rect::new(0, 24, 0, 80), false)));
}

#[test]
fn test_sb_clear_request() {
    let (mut t, ops) = term();
    t.write(b"\x1b[3J");
    assert!(ops.borrow().contains(&Op::SbClear));
}

#[test]
fn test_device_attributes() {
    let (mut t, _) = term();
    t.write(b"\x1b[c");
    assert_eq!(t.take_output(), b"\x1b[?1;2c");

    t.write(b"\x1b[>c");
    assert_eq!(t.take_output(), b"\x1b[>0;100;0c");
}

#[test]
fn test_cursor_position_report() {
    let (mut t, _) = term();
    t.write(b"\x1b[5;10H\x1b[6n");
    assert_eq!(t.take_output(), b"\x1b[5;10R");
}

#[test]
fn test_decrqm_reports() {
    let (mut t, _) = term();
    t.write(b"\x1b[?7$p");
    assert_eq!(t.take_output(), b"\x1b[?7;1$y");
    t.write(b"\x1b[?6$p");
    assert_eq!(t.take_output(), b"\x1b[?6;2$y");
    t.write(b"\x1b[?9999$p");
    assert_eq!(t.take_output(), b"\x1b[?9999;0$y");
}

#[test]
fn test_decrqss_sgr() {
    let (mut t, _) = term();
    t.write(b"\x1b[1;3m");
    t.write(b"\x1bP$qm\x1b\\");
    assert_eq!(t.take_output(), b"\x1bP1$r1;3m\x1b\\");
}

#[test]
fn test_decrqss_scrollregion() {
    let (mut t, _) = term();
    t.write(b"\x1b[3;10r\x1bP$qr\x1b\\");
    assert_eq!(t.take_output(), b"\x1bP1$r3;10r\x1b\\");
}

#[test]
fn test_decrqss_unknown() {
    let (mut t, _) = term();
    t.write(b"\x1bP$qz\x1b\\");
    assert_eq!(t.take_output(), b"\x1bP0$r\x1b\\");
}

#[test]
fn test_xtversion() {
    let (mut t, _) = term();
    t.write(b"\x1b[>q");
    assert_eq!(t.take_output(), b"\x1bP>|cathode(0.1)\x1b\\");
}

#[test]
fn test_s8c1t_switches_reply_encoding() {
    let (mut t, _) = term();
    t.write(b"\x1b G\x1b[c");
    assert_eq!(t.take_output(), b"\x9b?1;2c");
    t.write(b"\x1b F\x1b[c");
    assert_eq!(t.take_output(), b"\x1b[?1;2c");
}

#[test]
fn test_focus_reporting() {
    let (mut t, _) = term();
    t.focus_in();
    assert!(t.take_output().is_empty());

    t.write(b"\x1b[?1004h");
    t.focus_in();
    assert_eq!(t.take_output(), b"\x1b[I");
    t.focus_out();
    assert_eq!(t.take_output(), b"\x1b[O");
}

#[test]
fn test_mouse_x10_report() {
    let (mut t, _) = term();
    t.write(b"\x1b[?1000h");
    t.mouse_button(1, true, Modifier::empty());
    assert_eq!(t.take_output(), b"\x1b[M\x20\x21\x21");
    t.mouse_button(1, false, Modifier::empty());
    assert_eq!(t.take_output(), b"\x1b[M\x23\x21\x21");
}

#[test]
fn test_mouse_sgr_report() {
    let (mut t, _) = term();
    t.write(b"\x1b[?1000h\x1b[?1006h");
    t.mouse_move(4, 9, Modifier::empty());
    t.mouse_button(1, true, Modifier::empty());
    assert_eq!(t.take_output(), b"\x1b[<0;10;5M");
    t.mouse_button(1, false, Modifier::empty());
    assert_eq!(t.take_output(), b"\x1b[<0;10;5m");
}

#[test]
fn test_mouse_drag_only_on_cell_change() {
    let (mut t, _) = term();
    t.write(b"\x1b[?1002h\x1b[?1006h");
    t.mouse_button(1, true, Modifier::empty());
    t.take_output();

    t.mouse_move(0, 1, Modifier::empty());
    assert_eq!(t.take_output(), b"\x1b[<32;2;1M");
    // Same cell again: no report
    t.mouse_move(0, 1, Modifier::empty());
    assert!(t.take_output().is_empty());
}

#[test]
fn test_keyboard_unichar() {
    let (mut t, _) = term();
    t.keyboard_unichar('a' as u32, Modifier::empty());
    assert_eq!(t.take_output(), b"a");

    t.keyboard_unichar('a' as u32, Modifier::CTRL);
    assert_eq!(t.take_output(), b"\x01");

    t.keyboard_unichar('a' as u32, Modifier::ALT);
    assert_eq!(t.take_output(), b"\x1ba");

    t.keyboard_unichar('i' as u32, Modifier::CTRL);
    assert_eq!(t.take_output(), b"\x1b[105;5u");

    t.keyboard_unichar(0xe9, Modifier::empty());
    assert_eq!(t.take_output(), "é".as_bytes());
}

#[test]
fn test_keyboard_named_keys() {
    let (mut t, _) = term();
    t.keyboard_key(Key::Up, Modifier::empty());
    assert_eq!(t.take_output(), b"\x1b[A");

    t.keyboard_key(Key::Tab, Modifier::SHIFT);
    assert_eq!(t.take_output(), b"\x1b[Z");

    t.keyboard_key(Key::Function(5), Modifier::empty());
    assert_eq!(t.take_output(), b"\x1b[15~");

    t.keyboard_key(Key::Function(5), Modifier::SHIFT);
    assert_eq!(t.take_output(), b"\x1b[15;2~");

    t.keyboard_key(Key::Enter, Modifier::empty());
    assert_eq!(t.take_output(), b"\r");

    t.keyboard_key(Key::Delete, Modifier::empty());
    assert_eq!(t.take_output(), b"\x1b[3~");
}

#[test]
fn test_keyboard_application_modes() {
    let (mut t, _) = term();
    t.write(b"\x1b[?1h");
    t.keyboard_key(Key::Up, Modifier::empty());
    assert_eq!(t.take_output(), b"\x1bOA");

    t.write(b"\x1b=");
    t.keyboard_key(Key::Keypad5, Modifier::empty());
    assert_eq!(t.take_output(), b"\x1bOu");
    t.write(b"\x1b>");
    t.keyboard_key(Key::Keypad5, Modifier::empty());
    assert_eq!(t.take_output(), b"5");
}

#[test]
fn test_keyboard_lnm_enter() {
    let (mut t, _) = term();
    t.write(b"\x1b[20h");
    t.keyboard_key(Key::Enter, Modifier::empty());
    assert_eq!(t.take_output(), b"\r\n");
}

#[test]
fn test_bracketed_paste() {
    let (mut t, _) = term();
    t.keyboard_start_paste();
    assert!(t.take_output().is_empty());

    t.write(b"\x1b[?2004h");
    t.keyboard_start_paste();
    assert_eq!(t.take_output(), b"\x1b[200~");
    t.keyboard_end_paste();
    assert_eq!(t.take_output(), b"\x1b[201~");
}

// ---- selection ----

#[derive(Default)]
struct SelRecorder {
    queries: Rc<RefCell<Vec<SelectionMask>>>,
    sets: Rc<RefCell<Vec<(SelectionMask, Vec<u8>, bool, bool)>>>,
}

impl SelectionListener for SelRecorder {
    fn query(&mut self, mask: SelectionMask) {
        self.queries.borrow_mut().push(mask);
    }

    fn set(&mut self, mask: SelectionMask, frag: cathode_common::StringFragment<'_>) {
        self.sets
            .borrow_mut()
            .push((mask, frag.bytes.to_vec(), frag.initial, frag.is_final));
    }
}

fn selection_term() -> (
    Terminal,
    Rc<RefCell<Vec<SelectionMask>>>,
    Rc<RefCell<Vec<(SelectionMask, Vec<u8>, bool, bool)>>>,
) {
    let mut t = Terminal::new(24, 80);
    let rec = SelRecorder::default();
    let queries = rec.queries.clone();
    let sets = rec.sets.clone();
    t.set_selection_listener(Box::new(rec), 16).unwrap();
    (t, queries, sets)
}

#[test]
fn test_selection_set_decodes_base64() {
    let (mut t, _, sets) = selection_term();
    t.write(b"\x1b]52;c;aGVsbG8=\x07");

    let sets = sets.borrow();
    assert_eq!(sets.len(), 1);
    let (mask, bytes, initial, is_final) = &sets[0];
    assert_eq!(*mask, SelectionMask::CLIPBOARD);
    assert_eq!(bytes, b"hello");
    assert!(initial);
    assert!(is_final);
}

#[test]
fn test_selection_query() {
    let (mut t, queries, _) = selection_term();
    t.write(b"\x1b]52;cp;?\x07");
    assert_eq!(
        *queries.borrow(),
        vec![SelectionMask::CLIPBOARD | SelectionMask::PRIMARY]
    );
}

#[test]
fn test_selection_default_mask() {
    let (mut t, _, sets) = selection_term();
    t.write(b"\x1b]52;;aGk=\x07");
    let sets = sets.borrow();
    assert_eq!(sets[0].0, SelectionMask::SELECT | SelectionMask::CUT0);
    assert_eq!(sets[0].1, b"hi");
}

#[test]
fn test_selection_invalid_base64() {
    let (mut t, _, sets) = selection_term();
    t.write(b"\x1b]52;c;a!!!\x07");
    let sets = sets.borrow();
    // The transaction ends with an empty final fragment
    let last = sets.last().unwrap();
    assert!(last.1.is_empty());
    assert!(last.3);
}

#[test]
fn test_selection_split_across_writes() {
    let (mut t, _, sets) = selection_term();
    t.write(b"\x1b]52;c;aGVs");
    t.write(b"bG8=\x07");

    let sets = sets.borrow();
    let total: Vec<u8> = sets.iter().flat_map(|s| s.1.clone()).collect();
    assert_eq!(total, b"hello");
    assert!(sets.first().unwrap().2);
    assert!(sets.last().unwrap().3);
}

#[test]
fn test_send_selection_encodes() {
    let (mut t, _, _) = selection_term();
    t.send_selection(
        SelectionMask::CLIPBOARD,
        cathode_common::StringFragment::new(b"hello", true, true),
    );
    assert_eq!(t.take_output(), b"\x1b]52;c;aGVsbG8=\x1b\\");
}

#[test]
fn test_send_selection_streaming() {
    let (mut t, _, _) = selection_term();
    t.send_selection(
        SelectionMask::CLIPBOARD,
        cathode_common::StringFragment::new(b"hel", true, false),
    );
    t.send_selection(
        SelectionMask::CLIPBOARD,
        cathode_common::StringFragment::new(b"lo", false, true),
    );
    assert_eq!(t.take_output(), b"\x1b]52;c;aGVsbG8=\x1b\\");
}

// ---- reset ----

#[test]
fn test_soft_reset_keeps_screen() {
    let (mut t, ops) = term();
    t.write(b"\x1b[5;10H\x1b[1;31m\x1b[3;10r");
    ops.borrow_mut().clear();
    t.write(b"\x1b[!p");

    // Scroll region cleared: a linefeed on the last row scrolls the lot
    t.write(b"\x1b[24;1H\n");
    assert!(ops
        .borrow()
        .contains(&Op::ScrollRect(Rect::new(0, 24, 0, 80), 1, 0)));
    // But no erase happened
    assert!(!ops
        .borrow()
        .iter()
        .any(|op| matches!(op, Op::Erase(r, _) if *r == Rect::new(0, 24, 0, 80))));
}

#[test]
fn test_hard_reset_homes_and_erases() {
    let (mut t, ops) = term();
    t.write(b"\x1b[5;10H");
    ops.borrow_mut().clear();
    t.write(b"\x1bc");
    assert_eq!(t.cursor_pos(), Pos::new(0, 0));
    assert!(ops.borrow().contains(&Op::Erase(Rect::new(0, 24, 0, 80), false)));
}

#[test]
fn test_resize_clamps_cursor() {
    let (mut t, _) = term();
    t.write(b"\x1b[20;70H");
    t.resize(10, 40).unwrap();
    assert_eq!(t.cursor_pos(), Pos::new(9, 39));
    assert!(t.resize(0, 40).is_err());
}

#[test]
fn test_erase_clears_continuation() {
    let (mut t, _) = term();
    t.write("x".repeat(81).as_bytes());
    assert!(t.state().lineinfo(1).continuation);
    // Erasing the end of row 0 clears row 1's continuation bit
    t.write(b"\x1b[1;1H\x1b[K");
    assert!(!t.state().lineinfo(1).continuation);
}
