//! The host-bound output sink.
//!
//! Everything the engine emits (query replies, mouse reports, key
//! encodings) goes through a single `Output`. If the host has installed a
//! callback, bytes are handed over immediately and never buffered;
//! otherwise they accumulate in a fixed-capacity buffer and writes that
//! would overflow it are dropped.

use std::fmt;
use std::io::Write as _;

use cathode_common::C1;
use tracing::debug;

pub const DEFAULT_BUFFER_SIZE: usize = 4096;

const ESC: u8 = 0x1b;

pub struct Output {
    callback: Option<Box<dyn FnMut(&[u8])>>,
    buffer: Vec<u8>,
    capacity: usize,
    ctrl8bit: bool,
}

impl Output {
    pub fn new(capacity: usize) -> Self {
        Self {
            callback: None,
            buffer: Vec::with_capacity(capacity),
            capacity,
            ctrl8bit: false,
        }
    }

    pub fn set_callback(&mut self, callback: Box<dyn FnMut(&[u8])>) {
        self.callback = Some(callback);
    }

    pub fn clear_callback(&mut self) {
        self.callback = None;
    }

    /// Whether C1 introducers are emitted as single 8-bit bytes (S8C1T) or
    /// as ESC-prefixed pairs (S7C1T).
    pub fn ctrl8bit(&self) -> bool {
        self.ctrl8bit
    }

    pub fn set_ctrl8bit(&mut self, enabled: bool) {
        self.ctrl8bit = enabled;
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Drain the buffered output.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        if let Some(cb) = self.callback.as_mut() {
            cb(bytes);
            return;
        }

        if bytes.len() > self.capacity - self.buffer.len() {
            debug!("output buffer full, dropping {} bytes", bytes.len());
            return;
        }
        self.buffer.extend_from_slice(bytes);
    }

    fn append_c1(buf: &mut Vec<u8>, ctrl: C1, ctrl8bit: bool) {
        let byte = ctrl as u8;
        if !ctrl8bit {
            buf.push(ESC);
            buf.push(byte - 0x40);
        } else {
            buf.push(byte);
        }
    }

    /// Emit a C1 introducer followed by formatted text.
    pub fn push_ctrl(&mut self, ctrl: C1, args: fmt::Arguments<'_>) {
        let mut seq = Vec::new();
        Self::append_c1(&mut seq, ctrl, self.ctrl8bit);
        let _ = write!(seq, "{}", args);
        self.push_bytes(&seq);
    }

    /// Emit an optionally introduced, optionally ST-terminated string
    /// sequence (DCS/OSC replies).
    pub fn push_str_seq(&mut self, intro: Option<C1>, terminate: bool, args: fmt::Arguments<'_>) {
        let mut seq = Vec::new();
        if let Some(ctrl) = intro {
            Self::append_c1(&mut seq, ctrl, self.ctrl8bit);
        }
        let _ = write!(seq, "{}", args);
        if terminate {
            if self.ctrl8bit {
                seq.push(C1::St as u8);
            } else {
                seq.push(ESC);
                seq.push(b'\\');
            }
        }
        self.push_bytes(&seq);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffered_output() {
        let mut out = Output::new(16);
        out.push_bytes(b"abc");
        assert_eq!(out.take(), b"abc");
        assert!(out.is_empty());
    }

    #[test]
    fn test_overflow_drops() {
        let mut out = Output::new(4);
        out.push_bytes(b"abc");
        out.push_bytes(b"de");
        assert_eq!(out.take(), b"abc");
    }

    #[test]
    fn test_callback_bypasses_buffer() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let seen: Rc<RefCell<Vec<u8>>> = Rc::default();
        let sink = seen.clone();
        let mut out = Output::new(4);
        out.set_callback(Box::new(move |bytes| {
            sink.borrow_mut().extend_from_slice(bytes)
        }));
        out.push_bytes(b"longer than four");
        assert_eq!(&*seen.borrow(), b"longer than four");
        assert!(out.is_empty());
    }

    #[test]
    fn test_push_ctrl_7bit_vs_8bit() {
        let mut out = Output::new(64);
        out.push_ctrl(C1::Csi, format_args!("{}c", "?1;2"));
        assert_eq!(out.take(), b"\x1b[?1;2c");

        out.set_ctrl8bit(true);
        out.push_ctrl(C1::Csi, format_args!("?1;2c"));
        assert_eq!(out.take(), b"\x9b?1;2c");
    }

    #[test]
    fn test_push_str_seq_terminated() {
        let mut out = Output::new(64);
        out.push_str_seq(Some(C1::Dcs), true, format_args!("1$r{}m", 0));
        assert_eq!(out.take(), b"\x1bP1$r0m\x1b\\");
    }
}
