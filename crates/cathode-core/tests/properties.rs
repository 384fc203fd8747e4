//! Property tests: write totality, split-invariance, UTF-8 round-trips,
//! and reflow resize round-trips.

use cathode_core::encoding::{self, fill_utf8, EncodingType, UTF8_MAX_SEQLEN};
use cathode_core::{Pos, Rect, Terminal};
use proptest::prelude::*;

fn run_writes(bytes: &[u8], chunk: usize) -> (String, Pos, Vec<u8>) {
    let mut t = Terminal::new(24, 80);
    t.set_utf8(true);
    t.install_screen();

    if chunk == 0 {
        t.write(bytes);
    } else {
        for part in bytes.chunks(chunk) {
            t.write(part);
        }
    }

    let text = t.screen().map(|s| s.get_text(Rect::new(0, 24, 0, 80))).unwrap_or_default();
    (text, t.cursor_pos(), t.take_output())
}

proptest! {
    #[test]
    fn prop_write_is_total(bytes in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut t = Terminal::new(24, 80);
        t.set_utf8(true);
        t.install_screen();
        prop_assert_eq!(t.write(&bytes), bytes.len());
    }

    #[test]
    fn prop_split_writes_equivalent(
        bytes in proptest::collection::vec(any::<u8>(), 0..256),
        chunk in 1usize..8,
    ) {
        let whole = run_writes(&bytes, 0);
        let split = run_writes(&bytes, chunk);
        prop_assert_eq!(whole, split);
    }

    #[test]
    fn prop_utf8_roundtrip(
        cp in prop_oneof![
            0x20u32..0x7f,
            0xa0u32..0xd800,
            0xe000u32..0xfffe,
            0x1_0000u32..0x11_0000,
        ]
    ) {
        let mut buf = [0u8; UTF8_MAX_SEQLEN];
        let len = fill_utf8(cp, &mut buf);

        let mut decoder = encoding::create(EncodingType::Utf8, b'u').unwrap();
        let mut out = [0u32; 4];
        let (produced, eaten) = decoder.decode(&mut out, &buf[..len]);

        prop_assert_eq!(produced, 1);
        prop_assert_eq!(eaten, len);
        prop_assert_eq!(out[0], cp);
    }

    #[test]
    fn prop_reflow_resize_roundtrip(
        lines in proptest::collection::vec("[a-z]{0,30}", 1..10),
        new_cols in 20i32..120,
    ) {
        let mut t = Terminal::new(24, 80);
        t.set_utf8(true);
        t.install_screen().set_reflow(true);

        for (i, line) in lines.iter().enumerate() {
            if i > 0 {
                t.write(b"\r\n");
            }
            t.write(line.as_bytes());
        }

        let screen = t.screen().unwrap();
        let before = screen.get_text(Rect::new(0, 24, 0, 80));

        t.resize(24, new_cols).unwrap();
        t.resize(24, 80).unwrap();

        let screen = t.screen().unwrap();
        let after = screen.get_text(Rect::new(0, 24, 0, 80));
        prop_assert_eq!(before, after);
    }
}
