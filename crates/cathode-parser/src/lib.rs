//! Byte-level ECMA-48 / VT control sequence parser.
//!
//! The parser runs byte-at-a-time over the input, classifying it into text
//! runs, C0/C1 controls, escape sequences, CSI sequences, and the
//! string-carrying sequences (OSC, DCS, APC, PM, SOS), and delivers each to
//! a [`Perform`] implementation. String bodies are delivered incrementally
//! as fragments so a sequence split across `advance` calls never needs to
//! be buffered whole.

use cathode_common::StringFragment;
use tracing::{debug, trace};

mod params;

pub use params::{CsiParam, ARG_OVERFLOW_LIMIT};

pub const INTERMED_MAX: usize = 16;
pub const CSI_ARGS_MAX: usize = 16;
pub const CSI_LEADER_MAX: usize = 16;
pub const DCS_COMMAND_MAX: usize = 16;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;
const CAN: u8 = 0x18;
const SUB: u8 = 0x1a;
const DEL: u8 = 0x7f;
const ST8: u8 = 0x9c;

/// Offset between an 8-bit C1 control (0x80-0x9F) and its 7-bit
/// ESC-prefixed equivalent (ESC 0x40-0x5F).
const C1_ESC_OFFSET: u8 = 0x40;

/// Consumer of parsed events. Boolean returns mean "handled"; unhandled
/// events are logged and dropped by the parser.
pub trait Perform {
    /// Offered a run of plain text bytes; returns how many were consumed.
    /// A partial multi-byte character at the end of the run may be left
    /// unconsumed and will be offered again with the next input.
    fn text(&mut self, bytes: &[u8]) -> usize {
        bytes.len()
    }

    fn control(&mut self, byte: u8) -> bool {
        let _ = byte;
        false
    }

    /// An escape sequence: the intermediate bytes followed by the final byte.
    fn escape(&mut self, bytes: &[u8]) -> bool {
        let _ = bytes;
        false
    }

    fn csi_dispatch(&mut self, leader: &[u8], args: &[CsiParam], intermed: &[u8], command: u8) -> bool {
        let _ = (leader, args, intermed, command);
        false
    }

    /// OSC body fragment. `command` is the numeric prefix, or -1 when the
    /// sequence carried no digits before the body.
    fn osc_dispatch(&mut self, command: i32, frag: StringFragment<'_>) -> bool {
        let _ = (command, frag);
        false
    }

    fn dcs_dispatch(&mut self, command: &[u8], frag: StringFragment<'_>) -> bool {
        let _ = (command, frag);
        false
    }

    fn apc_dispatch(&mut self, frag: StringFragment<'_>) -> bool {
        let _ = frag;
        false
    }

    fn pm_dispatch(&mut self, frag: StringFragment<'_>) -> bool {
        let _ = frag;
        false
    }

    fn sos_dispatch(&mut self, frag: StringFragment<'_>) -> bool {
        let _ = frag;
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Normal,
    CsiLeader,
    CsiArgs,
    CsiIntermed,
    DcsCommand,
    // String states: these deliver body fragments to the callbacks
    OscCommand,
    Osc,
    Dcs,
    Apc,
    Pm,
    Sos,
}

impl ParserState {
    fn is_string(self) -> bool {
        matches!(
            self,
            ParserState::OscCommand
                | ParserState::Osc
                | ParserState::Dcs
                | ParserState::Apc
                | ParserState::Pm
                | ParserState::Sos
        )
    }
}

#[derive(Debug, Default)]
struct CsiScratch {
    leader: [u8; CSI_LEADER_MAX],
    leaderlen: usize,
    args: [CsiParam; CSI_ARGS_MAX],
    argi: usize,
}

/// Per-sequence scratch, keyed by the parser state.
#[derive(Debug)]
enum Scratch {
    None,
    Csi(CsiScratch),
    Osc { command: i32 },
    Dcs { command: [u8; DCS_COMMAND_MAX], len: usize },
}

/// The parser state machine.
pub struct Parser {
    state: ParserState,
    in_esc: bool,
    intermed: [u8; INTERMED_MAX],
    intermedlen: usize,
    scratch: Scratch,
    string_initial: bool,
    emit_nul: bool,
    utf8: bool,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Normal,
            in_esc: false,
            intermed: [0; INTERMED_MAX],
            intermedlen: 0,
            scratch: Scratch::None,
            string_initial: false,
            emit_nul: false,
            utf8: false,
        }
    }

    /// When UTF-8 mode is on, bytes >= 0x80 belong to the text decoder and
    /// 8-bit C1 introducers are not recognised.
    pub fn set_utf8(&mut self, enabled: bool) {
        self.utf8 = enabled;
    }

    pub fn utf8(&self) -> bool {
        self.utf8
    }

    /// Deliver NUL, DEL, CAN and SUB to the control callback instead of
    /// swallowing them.
    pub fn set_emit_nul(&mut self, enabled: bool) {
        self.emit_nul = enabled;
    }

    /// Run the state machine over `data`, dispatching events to `perform`.
    /// Always consumes the whole input.
    pub fn advance(&mut self, perform: &mut dyn Perform, data: &[u8]) -> usize {
        let mut pos = 0usize;
        // Offset of the in-progress string body within `data`, if any
        let mut string_start: Option<usize> = match self.state {
            ParserState::Osc
            | ParserState::Dcs
            | ParserState::Apc
            | ParserState::Pm
            | ParserState::Sos => Some(0),
            _ => None,
        };

        while pos < data.len() {
            let mut c = data[pos];
            let mut c1_allowed = !self.utf8;
            let mut advance = 1usize;

            if c == 0x00 || c == DEL {
                if self.state.is_string() {
                    if let Some(start) = string_start {
                        self.string_fragment(perform, &data[start..pos], false);
                        string_start = Some(pos + 1);
                    }
                }
                if self.emit_nul {
                    self.do_control(perform, c);
                }
                pos += 1;
                continue;
            }
            if c == CAN || c == SUB {
                self.in_esc = false;
                self.state = ParserState::Normal;
                string_start = None;
                if self.emit_nul {
                    self.do_control(perform, c);
                }
                pos += 1;
                continue;
            } else if c == ESC {
                self.intermedlen = 0;
                if !self.state.is_string() {
                    self.state = ParserState::Normal;
                }
                self.in_esc = true;
                pos += 1;
                continue;
            } else if c == BEL && self.state.is_string() {
                // BEL can stand for ST; handled by the terminator check below
            } else if c < 0x20 {
                // Other C0
                if self.state == ParserState::Sos {
                    // All other C0s permitted in SOS
                    pos += 1;
                    continue;
                }
                if self.state.is_string() {
                    if let Some(start) = string_start {
                        self.string_fragment(perform, &data[start..pos], false);
                    }
                }
                self.do_control(perform, c);
                if self.state.is_string() {
                    string_start = Some(pos + 1);
                }
                pos += 1;
                continue;
            }

            let mut string_len = string_start.map(|s| pos - s);

            if self.in_esc {
                // With no intermediates, a byte in [0x40,0x60) stands for
                // the corresponding 8-bit C1. In a string state only
                // ESC \ (ST) is given that treatment.
                if self.intermedlen == 0
                    && (0x40..0x60).contains(&c)
                    && (!self.state.is_string() || c == b'\\')
                {
                    c += C1_ESC_OFFSET;
                    c1_allowed = true;
                    if let Some(len) = string_len.as_mut() {
                        // Exclude the ESC from the in-progress fragment
                        if *len > 0 {
                            *len -= 1;
                        }
                    }
                    self.in_esc = false;
                } else {
                    string_start = None;
                    self.state = ParserState::Normal;
                }
            }

            match self.state {
                ParserState::CsiLeader => {
                    if (0x3c..=0x3f).contains(&c) {
                        if let Scratch::Csi(csi) = &mut self.scratch {
                            if csi.leaderlen < CSI_LEADER_MAX - 1 {
                                csi.leader[csi.leaderlen] = c;
                                csi.leaderlen += 1;
                            }
                        }
                    } else {
                        if let Scratch::Csi(csi) = &mut self.scratch {
                            csi.argi = 0;
                            csi.args[0] = CsiParam::MISSING;
                        }
                        self.state = ParserState::CsiArgs;
                        self.csi_args_byte(perform, c);
                    }
                }

                ParserState::CsiArgs => self.csi_args_byte(perform, c),

                ParserState::CsiIntermed => self.csi_intermed_byte(perform, c),

                ParserState::OscCommand => {
                    let mut handled = false;
                    if let Scratch::Osc { command } = &mut self.scratch {
                        if c.is_ascii_digit() {
                            if *command == -1 {
                                *command = i32::from(c - b'0');
                            } else if i64::from(*command) <= ARG_OVERFLOW_LIMIT {
                                *command = *command * 10 + i32::from(c - b'0');
                            }
                            handled = true;
                        }
                    }
                    if !handled {
                        if c == b';' {
                            self.state = ParserState::Osc;
                            string_start = Some(pos + 1);
                        } else {
                            // No command terminator; the byte belongs to the body
                            string_start = Some(pos);
                            self.state = ParserState::Osc;
                            if c == BEL || (c1_allowed && c == ST8) {
                                self.string_fragment(perform, &[], true);
                                self.state = ParserState::Normal;
                                string_start = None;
                            }
                        }
                    }
                }

                ParserState::DcsCommand => {
                    if let Scratch::Dcs { command, len } = &mut self.scratch {
                        if *len < DCS_COMMAND_MAX {
                            command[*len] = c;
                            *len += 1;
                        }
                    }
                    if (0x40..=0x7e).contains(&c) {
                        string_start = Some(pos + 1);
                        self.state = ParserState::Dcs;
                    }
                }

                ParserState::Osc
                | ParserState::Dcs
                | ParserState::Apc
                | ParserState::Pm
                | ParserState::Sos => {
                    if c == BEL || (c1_allowed && c == ST8) {
                        let start = string_start.unwrap_or(pos);
                        let len = string_len.unwrap_or(0);
                        let frag = &data[start..start + len];
                        self.string_fragment(perform, frag, true);
                        self.state = ParserState::Normal;
                        string_start = None;
                    }
                }

                ParserState::Normal => {
                    if self.in_esc {
                        if (0x20..=0x2f).contains(&c) {
                            if self.intermedlen < INTERMED_MAX - 1 {
                                self.intermed[self.intermedlen] = c;
                                self.intermedlen += 1;
                            }
                        } else if (0x30..=0x7e).contains(&c) {
                            self.do_escape(perform, c);
                            self.in_esc = false;
                        } else {
                            trace!("unhandled byte 0x{:02x} in escape", c);
                        }
                    } else if c1_allowed && (0x80..0xa0).contains(&c) {
                        match c {
                            0x90 => {
                                // DCS
                                self.string_initial = true;
                                self.scratch = Scratch::Dcs {
                                    command: [0; DCS_COMMAND_MAX],
                                    len: 0,
                                };
                                self.state = ParserState::DcsCommand;
                                string_start = None;
                            }
                            0x98 => {
                                // SOS
                                self.string_initial = true;
                                self.state = ParserState::Sos;
                                string_start = Some(pos + 1);
                            }
                            0x9b => {
                                // CSI
                                self.scratch = Scratch::Csi(CsiScratch::default());
                                self.state = ParserState::CsiLeader;
                                string_start = None;
                            }
                            0x9d => {
                                // OSC
                                self.scratch = Scratch::Osc { command: -1 };
                                self.string_initial = true;
                                self.state = ParserState::OscCommand;
                                string_start = None;
                            }
                            0x9e => {
                                // PM
                                self.string_initial = true;
                                self.state = ParserState::Pm;
                                string_start = Some(pos + 1);
                            }
                            0x9f => {
                                // APC
                                self.string_initial = true;
                                self.state = ParserState::Apc;
                                string_start = Some(pos + 1);
                            }
                            _ => self.do_control(perform, c),
                        }
                    } else {
                        let mut eaten = perform.text(&data[pos..]);
                        if eaten == 0 {
                            trace!("text callback did not consume any input");
                            eaten = 1;
                        }
                        advance = eaten;
                    }
                }
            }

            pos += advance;
        }

        if let Some(start) = string_start {
            let mut len = pos.saturating_sub(start);
            if self.in_esc && len > 0 {
                // A trailing ESC may be the first half of ESC \; keep it out
                // of the fragment
                len -= 1;
            }
            let frag = &data[start..start + len];
            self.string_fragment(perform, frag, false);
        }

        data.len()
    }

    fn csi_args_byte(&mut self, perform: &mut dyn Perform, mut c: u8) {
        if let Scratch::Csi(csi) = &mut self.scratch {
            if c.is_ascii_digit() {
                csi.args[csi.argi].push_digit(c - b'0');
                return;
            }
            if c == b':' {
                csi.args[csi.argi].set_more();
                c = b';';
            }
            if c == b';' {
                if csi.argi < CSI_ARGS_MAX - 1 {
                    csi.argi += 1;
                    csi.args[csi.argi] = CsiParam::MISSING;
                }
                return;
            }
            csi.argi += 1;
        }
        self.intermedlen = 0;
        self.state = ParserState::CsiIntermed;
        self.csi_intermed_byte(perform, c);
    }

    fn csi_intermed_byte(&mut self, perform: &mut dyn Perform, c: u8) {
        if (0x20..=0x2f).contains(&c) {
            if self.intermedlen < INTERMED_MAX - 1 {
                self.intermed[self.intermedlen] = c;
                self.intermedlen += 1;
            }
            return;
        }
        if (0x40..=0x7e).contains(&c) {
            self.do_csi(perform, c);
        }
        self.state = ParserState::Normal;
    }

    fn do_control(&mut self, perform: &mut dyn Perform, byte: u8) {
        if !perform.control(byte) {
            debug!("unhandled control 0x{:02x}", byte);
        }
    }

    fn do_escape(&mut self, perform: &mut dyn Perform, command: u8) {
        let mut seq = [0u8; INTERMED_MAX + 1];
        let len = self.intermedlen;
        seq[..len].copy_from_slice(&self.intermed[..len]);
        seq[len] = command;
        if !perform.escape(&seq[..len + 1]) {
            debug!("unhandled escape ESC 0x{:02x}", command);
        }
    }

    fn do_csi(&mut self, perform: &mut dyn Perform, command: u8) {
        let empty_leader: &[u8] = &[];
        let empty_args: &[CsiParam] = &[];
        let (leader, args) = match &self.scratch {
            Scratch::Csi(csi) => (&csi.leader[..csi.leaderlen], &csi.args[..csi.argi]),
            _ => (empty_leader, empty_args),
        };
        if !perform.csi_dispatch(leader, args, &self.intermed[..self.intermedlen], command) {
            debug!("unhandled CSI {:?}", command as char);
        }
    }

    fn string_fragment(&mut self, perform: &mut dyn Perform, bytes: &[u8], is_final: bool) {
        let frag = StringFragment::new(bytes, self.string_initial, is_final);
        match self.state {
            ParserState::Osc => {
                let command = match &self.scratch {
                    Scratch::Osc { command } => *command,
                    _ => -1,
                };
                let _ = perform.osc_dispatch(command, frag);
            }
            ParserState::Dcs => {
                let (command, len) = match &self.scratch {
                    Scratch::Dcs { command, len } => (*command, *len),
                    _ => ([0; DCS_COMMAND_MAX], 0),
                };
                let _ = perform.dcs_dispatch(&command[..len], frag);
            }
            ParserState::Apc => {
                let _ = perform.apc_dispatch(frag);
            }
            ParserState::Pm => {
                let _ = perform.pm_dispatch(frag);
            }
            ParserState::Sos => {
                let _ = perform.sos_dispatch(frag);
            }
            _ => {}
        }
        self.string_initial = false;
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
