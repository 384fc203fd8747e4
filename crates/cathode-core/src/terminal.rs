//! The engine façade: owns the parser, state, optional screen, and output
//! sink, and routes dispatch between them for each `write`.

use cathode_common::{CathodeError, Pos, Result, SelectionMask, StringFragment, C1};
use cathode_parser::{CsiParam, Parser, Perform};

use crate::callbacks::{Fallbacks, NullListener, SelectionListener, StateListener};
use crate::keyboard::{self, Key, Modifier};
use crate::output::{Output, DEFAULT_BUFFER_SIZE};
use crate::screen::Screen;
use crate::state::State;

pub struct Terminal {
    rows: i32,
    cols: i32,
    utf8: bool,

    parser: Parser,
    state: State,
    screen: Option<Screen>,
    output: Output,

    state_listener: Option<Box<dyn StateListener>>,
    fallbacks: Option<Box<dyn Fallbacks>>,
    null_ops: NullListener,
}

/// Per-write adapter binding the parser callbacks to the state layer, the
/// active listener route, the output sink, and host fallbacks.
struct Dispatch<'a> {
    state: &'a mut State,
    ops: &'a mut dyn StateListener,
    out: &'a mut Output,
    fallbacks: Option<&'a mut dyn Fallbacks>,
}

impl Perform for Dispatch<'_> {
    fn text(&mut self, bytes: &[u8]) -> usize {
        self.state.on_text(bytes, self.ops)
    }

    fn control(&mut self, byte: u8) -> bool {
        if self.state.on_control(byte, self.ops) {
            return true;
        }
        if let Some(fb) = &mut self.fallbacks {
            return fb.control(byte);
        }
        false
    }

    fn escape(&mut self, bytes: &[u8]) -> bool {
        if self.state.on_escape(bytes, self.ops, self.out) {
            return true;
        }
        if let Some(fb) = &mut self.fallbacks {
            return fb.escape(bytes);
        }
        false
    }

    fn csi_dispatch(&mut self, leader: &[u8], args: &[CsiParam], intermed: &[u8], command: u8) -> bool {
        if self
            .state
            .on_csi(leader, args, intermed, command, self.ops, self.out)
        {
            return true;
        }
        if let Some(fb) = &mut self.fallbacks {
            return fb.csi(leader, args, intermed, command);
        }
        false
    }

    fn osc_dispatch(&mut self, command: i32, frag: StringFragment<'_>) -> bool {
        if self.state.on_osc(command, frag, self.ops) {
            return true;
        }
        if let Some(fb) = &mut self.fallbacks {
            return fb.osc(command, frag);
        }
        false
    }

    fn dcs_dispatch(&mut self, command: &[u8], frag: StringFragment<'_>) -> bool {
        if self.state.on_dcs(command, frag, self.out) {
            return true;
        }
        if let Some(fb) = &mut self.fallbacks {
            return fb.dcs(command, frag);
        }
        false
    }

    fn apc_dispatch(&mut self, frag: StringFragment<'_>) -> bool {
        if let Some(fb) = &mut self.fallbacks {
            return fb.apc(frag);
        }
        false
    }

    fn pm_dispatch(&mut self, frag: StringFragment<'_>) -> bool {
        if let Some(fb) = &mut self.fallbacks {
            return fb.pm(frag);
        }
        false
    }

    fn sos_dispatch(&mut self, frag: StringFragment<'_>) -> bool {
        if let Some(fb) = &mut self.fallbacks {
            return fb.sos(frag);
        }
        false
    }
}

macro_rules! with_dispatch {
    ($self:ident, |$state:ident, $ops:ident, $out:ident| $body:expr) => {{
        let Terminal {
            state: $state,
            screen,
            output: $out,
            state_listener,
            null_ops,
            ..
        } = $self;
        let $ops: &mut dyn StateListener = match (screen.as_mut(), state_listener.as_mut()) {
            (Some(s), _) => s,
            (None, Some(l)) => l.as_mut(),
            (None, None) => null_ops,
        };
        $body
    }};
}

impl Terminal {
    /// Create an engine of the given size. The state starts out as a soft
    /// reset leaves it: default tab stops, ASCII designations, autowrap on.
    pub fn new(rows: i32, cols: i32) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            utf8: false,
            parser: Parser::new(),
            state: State::new(rows, cols, false),
            screen: None,
            output: Output::new(DEFAULT_BUFFER_SIZE),
            state_listener: None,
            fallbacks: None,
            null_ops: NullListener,
        }
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn utf8(&self) -> bool {
        self.utf8
    }

    /// Select how bytes >= 0x80 are decoded: as UTF-8, or through the GR
    /// designation with 8-bit C1 recognition.
    pub fn set_utf8(&mut self, enabled: bool) {
        self.utf8 = enabled;
        self.parser.set_utf8(enabled);
        self.state.set_utf8(enabled);
    }

    /// Deliver NUL, DEL, CAN and SUB to the control path instead of
    /// swallowing them.
    pub fn set_emit_nul(&mut self, enabled: bool) {
        self.parser.set_emit_nul(enabled);
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    /// Create the screen layer if it does not exist yet, and return it.
    /// While a screen is installed it consumes all state events; any
    /// host-installed state listener is bypassed.
    pub fn install_screen(&mut self) -> &mut Screen {
        let (rows, cols) = (self.rows, self.cols);
        self.screen.get_or_insert_with(|| Screen::new(rows, cols))
    }

    pub fn screen(&self) -> Option<&Screen> {
        self.screen.as_ref()
    }

    pub fn screen_mut(&mut self) -> Option<&mut Screen> {
        self.screen.as_mut()
    }

    pub fn set_state_listener(&mut self, listener: Box<dyn StateListener>) {
        self.state_listener = Some(listener);
    }

    pub fn clear_state_listener(&mut self) {
        self.state_listener = None;
    }

    pub fn set_fallbacks(&mut self, fallbacks: Box<dyn Fallbacks>) {
        self.fallbacks = Some(fallbacks);
    }

    pub fn clear_fallbacks(&mut self) {
        self.fallbacks = None;
    }

    pub fn set_selection_listener(
        &mut self,
        listener: Box<dyn SelectionListener>,
        buflen: usize,
    ) -> Result<()> {
        self.state.set_selection_listener(listener, buflen)
    }

    /// Install an output callback; emitted bytes are handed over
    /// immediately instead of accumulating in the internal buffer.
    pub fn set_output_callback(&mut self, callback: Box<dyn FnMut(&[u8])>) {
        self.output.set_callback(callback);
    }

    /// Drain the buffered host-bound output.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.output.take()
    }

    pub fn output_len(&self) -> usize {
        self.output.len()
    }

    /// Feed bytes from the application. Runs the parser to completion,
    /// dispatching all resulting callbacks inline; always consumes the
    /// whole input.
    pub fn write(&mut self, bytes: &[u8]) -> usize {
        let parser = &mut self.parser;
        let state = &mut self.state;
        let screen = &mut self.screen;
        let output = &mut self.output;
        let state_listener = &mut self.state_listener;
        let fallbacks = &mut self.fallbacks;
        let null_ops = &mut self.null_ops;
        let ops: &mut dyn StateListener = match (screen.as_mut(), state_listener.as_mut()) {
            (Some(s), _) => s,
            (None, Some(l)) => l.as_mut(),
            (None, None) => null_ops,
        };
        let fallbacks: Option<&mut dyn Fallbacks> = match fallbacks {
            Some(fb) => Some(fb.as_mut()),
            None => None,
        };
        let mut dispatch = Dispatch {
            state,
            ops,
            out: output,
            fallbacks,
        };
        parser.advance(&mut dispatch, bytes)
    }

    /// Resize the terminal. Content and cursor handling are delegated to
    /// the screen layer (reflow-aware when enabled).
    pub fn resize(&mut self, rows: i32, cols: i32) -> Result<()> {
        if rows < 1 || cols < 1 {
            return Err(CathodeError::InvalidSize { rows, cols });
        }

        self.rows = rows;
        self.cols = cols;

        with_dispatch!(self, |state, ops, _out| {
            state.on_resize(rows, cols, ops);
        });

        Ok(())
    }

    /// Soft or hard reset.
    pub fn reset(&mut self, hard: bool) {
        with_dispatch!(self, |state, ops, out| {
            state.reset(hard, ops, out);
        });
    }

    pub fn cursor_pos(&self) -> Pos {
        self.state.cursor_pos()
    }

    /// Deliver pending damage to the screen listener.
    pub fn flush_damage(&mut self) {
        if let Some(screen) = &mut self.screen {
            screen.flush_damage();
        }
    }

    // ---- host-side input ----

    pub fn keyboard_unichar(&mut self, c: u32, modifier: Modifier) {
        keyboard::unichar(c, modifier, &mut self.output);
    }

    pub fn keyboard_key(&mut self, key: Key, modifier: Modifier) {
        keyboard::key(key, modifier, &self.state, &mut self.output);
    }

    pub fn keyboard_start_paste(&mut self) {
        keyboard::start_paste(&self.state, &mut self.output);
    }

    pub fn keyboard_end_paste(&mut self) {
        keyboard::end_paste(&self.state, &mut self.output);
    }

    pub fn mouse_move(&mut self, row: i32, col: i32, modifier: Modifier) {
        let Terminal { state, output, .. } = self;
        state.mouse_move(row, col, modifier, output);
    }

    pub fn mouse_button(&mut self, button: i32, pressed: bool, modifier: Modifier) {
        let Terminal { state, output, .. } = self;
        state.mouse_button(button, pressed, modifier, output);
    }

    pub fn focus_in(&mut self) {
        if self.state.mode.report_focus {
            self.output.push_ctrl(C1::Csi, format_args!("I"));
        }
    }

    pub fn focus_out(&mut self) {
        if self.state.mode.report_focus {
            self.output.push_ctrl(C1::Csi, format_args!("O"));
        }
    }

    /// Reply to an OSC 52 query with selection data, streamed as base64.
    pub fn send_selection(&mut self, mask: SelectionMask, frag: StringFragment<'_>) {
        let Terminal { state, output, .. } = self;
        state.send_selection(mask, frag, output);
    }
}
