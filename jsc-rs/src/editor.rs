//! Terminal line editor for the interactive prompt.
//!
//! Bytes read from the raw-mode terminal go through a [`KeyDecoder`], which
//! matches control characters and escape sequences against a [`Keymap`] and
//! produces [`EditAction`]s.  [`LineState`] applies those to a
//! [`LineBuffer`] and the [`InputHistory`]; [`TerminalEditor`] owns the
//! raw-mode session and redraws the prompt line after every edit.
//!
//! ## Default bindings
//!
//! | Keys | Action |
//! |------|--------|
//! | Enter, `^J`, `^M` | submit the line |
//! | `^C` | abandon the line |
//! | `^D` | end of input on an empty line, else delete forward |
//! | `^A` / Home, `^E` / End | start / end of line |
//! | `^B` / Left, `^F` / Right | move one character |
//! | Alt-b, Alt-f, Ctrl-Left, Ctrl-Right | move one word |
//! | `^K`, `^U`, `^W` | kill to end, to start, previous word |
//! | `^Y` | yank |
//! | Up / `^P`, Down / `^N` | recall history |
//! | PgUp, PgDn | prefix search through history |

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;

use crossterm::{
    cursor, queue,
    style::Print,
    terminal::{self, ClearType},
};

use crate::history::{history_path, InputHistory, RecallMode, HISTORY_SIZE};
use crate::host::Host;
use crate::repl::LineSource;

// ── LineBuffer ────────────────────────────────────────────────────────────────

/// The line being edited, as a `Vec<char>` so that cursor movement works in
/// characters rather than bytes.  `pos` is always within `0..=len`.
#[derive(Debug, Clone, Default)]
pub struct LineBuffer {
    buffer: Vec<char>,
    pos: usize,
    /// Last killed text, available for yanking.
    kill_ring: Vec<char>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.buffer.iter().collect()
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Return the contents and reset to an empty line.  The kill ring
    /// survives.
    pub fn take_line(&mut self) -> String {
        let line = self.text();
        self.buffer.clear();
        self.pos = 0;
        line
    }

    /// Replace the contents, cursor at the end.
    pub fn set_text(&mut self, text: &str) {
        self.buffer = text.chars().collect();
        self.pos = self.buffer.len();
    }

    pub fn insert_char(&mut self, ch: char) {
        self.buffer.insert(self.pos, ch);
        self.pos += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for ch in s.chars() {
            self.insert_char(ch);
        }
    }

    /// Backspace.  Returns `true` if a character was deleted.
    pub fn delete_before(&mut self) -> bool {
        if self.pos == 0 {
            return false;
        }
        self.pos -= 1;
        self.buffer.remove(self.pos);
        true
    }

    /// Forward delete.  Returns `true` if a character was deleted.
    pub fn delete_at(&mut self) -> bool {
        if self.pos >= self.buffer.len() {
            return false;
        }
        self.buffer.remove(self.pos);
        true
    }

    pub fn move_left(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.pos = (self.pos + 1).min(self.buffer.len());
    }

    pub fn move_home(&mut self) {
        self.pos = 0;
    }

    pub fn move_end(&mut self) {
        self.pos = self.buffer.len();
    }

    /// Far edge of the word next to `start` in direction `dir`
    /// (`1` forward, `-1` backward).  Leading non-word characters are
    /// skipped first.
    pub fn word_boundary(&self, start: usize, dir: i32) -> usize {
        let len = self.buffer.len();
        let is_word = |i: usize| self.buffer[i].is_alphanumeric() || self.buffer[i] == '_';
        if dir < 0 {
            let mut place = start.min(len);
            while place > 0 && !is_word(place - 1) {
                place -= 1;
            }
            while place > 0 && is_word(place - 1) {
                place -= 1;
            }
            place
        } else {
            let mut place = start.min(len);
            while place < len && !is_word(place) {
                place += 1;
            }
            while place < len && is_word(place) {
                place += 1;
            }
            place
        }
    }

    pub fn move_word_backward(&mut self) {
        self.pos = self.word_boundary(self.pos, -1);
    }

    pub fn move_word_forward(&mut self) {
        self.pos = self.word_boundary(self.pos, 1);
    }

    pub fn kill_to_end(&mut self) {
        self.kill_ring = self.buffer.split_off(self.pos);
    }

    pub fn kill_to_start(&mut self) {
        self.kill_ring = self.buffer.drain(..self.pos).collect();
        self.pos = 0;
    }

    pub fn kill_word_backward(&mut self) {
        let start = self.word_boundary(self.pos, -1);
        self.kill_ring = self.buffer.drain(start..self.pos).collect();
        self.pos = start;
    }

    /// Insert the kill ring at the cursor.
    pub fn yank(&mut self) {
        let yanked = self.kill_ring.clone();
        for ch in yanked {
            self.insert_char(ch);
        }
    }
}

// ── EditAction ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Insert(char),
    Backspace,
    DeleteForward,
    /// `^D`: end of input on an empty line, forward delete otherwise.
    EndOfInput,
    MoveLeft,
    MoveRight,
    MoveHome,
    MoveEnd,
    WordBackward,
    WordForward,
    KillToEnd,
    KillToStart,
    KillWordBackward,
    Yank,
    RecallBackward,
    RecallForward,
    SearchBackward,
    SearchForward,
    Submit,
    Abandon,
}

// ── Keymap ────────────────────────────────────────────────────────────────────

/// Raw key sequences and the actions bound to them.
#[derive(Debug, Default)]
pub struct Keymap {
    bindings: HashMap<Vec<u8>, EditAction>,
}

impl Keymap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, sequence: &[u8], action: EditAction) {
        self.bindings.insert(sequence.to_vec(), action);
    }

    pub fn lookup(&self, sequence: &[u8]) -> Option<EditAction> {
        self.bindings.get(sequence).copied()
    }

    /// `true` if `sequence` is a proper prefix of some binding.
    pub fn has_prefix(&self, sequence: &[u8]) -> bool {
        self.bindings
            .keys()
            .any(|k| k.len() > sequence.len() && k.starts_with(sequence))
    }

    /// Emacs-style bindings plus the usual VT100 and xterm escape sequences.
    pub fn with_defaults(mut self) -> Self {
        use EditAction::*;

        let ctrl = |c: char| [c as u8 - b'@'];

        self.bind(&ctrl('A'), MoveHome);
        self.bind(&ctrl('B'), MoveLeft);
        self.bind(&ctrl('C'), Abandon);
        self.bind(&ctrl('D'), EndOfInput);
        self.bind(&ctrl('E'), MoveEnd);
        self.bind(&ctrl('F'), MoveRight);
        self.bind(&ctrl('J'), Submit);
        self.bind(&ctrl('K'), KillToEnd);
        self.bind(&ctrl('M'), Submit);
        self.bind(&ctrl('N'), RecallForward);
        self.bind(&ctrl('P'), RecallBackward);
        self.bind(&ctrl('U'), KillToStart);
        self.bind(&ctrl('W'), KillWordBackward);
        self.bind(&ctrl('Y'), Yank);

        self.bind(&[0x08], Backspace);
        self.bind(&[0x7F], Backspace);
        self.bind(b"\x1b[3~", DeleteForward);

        for prefix in [&b"\x1b["[..], &b"\x1bO"[..]] {
            let seq = |last: u8| [prefix, &[last][..]].concat();
            self.bind(&seq(b'A'), RecallBackward);
            self.bind(&seq(b'B'), RecallForward);
            self.bind(&seq(b'C'), MoveRight);
            self.bind(&seq(b'D'), MoveLeft);
            self.bind(&seq(b'H'), MoveHome);
            self.bind(&seq(b'F'), MoveEnd);
        }
        self.bind(b"\x1b[1~", MoveHome);
        self.bind(b"\x1b[4~", MoveEnd);

        self.bind(b"\x1bb", WordBackward);
        self.bind(b"\x1bf", WordForward);
        self.bind(b"\x1b[1;5D", WordBackward);
        self.bind(b"\x1b[1;5C", WordForward);

        self.bind(b"\x1b[5~", SearchBackward);
        self.bind(b"\x1b[6~", SearchForward);

        self
    }
}

// ── KeyDecoder ────────────────────────────────────────────────────────────────

/// Accumulates input bytes until they form a bound sequence or a complete
/// UTF-8 character.
#[derive(Debug)]
pub struct KeyDecoder {
    buf: Vec<u8>,
    keymap: Keymap,
}

impl Default for KeyDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyDecoder {
    pub fn new() -> Self {
        Self { buf: Vec::new(), keymap: Keymap::new().with_defaults() }
    }

    /// Feed one byte.  Returns an action once a sequence is complete;
    /// unrecognised sequences are dropped.
    pub fn push(&mut self, b: u8) -> Option<EditAction> {
        self.buf.push(b);

        if let Some(action) = self.keymap.lookup(&self.buf) {
            self.buf.clear();
            return Some(action);
        }

        let first = self.buf[0];
        if first >= 0x80 {
            return match std::str::from_utf8(&self.buf) {
                Ok(s) => {
                    let ch = s.chars().next();
                    self.buf.clear();
                    ch.map(EditAction::Insert)
                }
                // Incomplete multi-byte character: wait for the rest.
                Err(e) if e.error_len().is_none() => None,
                Err(_) => {
                    self.buf.clear();
                    None
                }
            };
        }

        if self.buf.len() == 1 && !first.is_ascii_control() {
            self.buf.clear();
            return Some(EditAction::Insert(first as char));
        }

        if !self.keymap.has_prefix(&self.buf) {
            self.buf.clear();
        }
        None
    }
}

// ── LineState ─────────────────────────────────────────────────────────────────

/// What the editor should do after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Submit(String),
    Abandon,
    EndOfInput,
}

/// The edit buffer plus history.
#[derive(Debug)]
pub struct LineState {
    pub buffer: LineBuffer,
    pub history: InputHistory,
}

impl LineState {
    pub fn new(history: InputHistory) -> Self {
        Self { buffer: LineBuffer::new(), history }
    }

    pub fn apply(&mut self, action: EditAction) -> Step {
        use EditAction::*;

        match action {
            Insert(ch) => self.buffer.insert_char(ch),
            Backspace => {
                self.buffer.delete_before();
            }
            DeleteForward => {
                self.buffer.delete_at();
            }
            EndOfInput => {
                if self.buffer.is_empty() {
                    return Step::EndOfInput;
                }
                self.buffer.delete_at();
            }
            MoveLeft => self.buffer.move_left(),
            MoveRight => self.buffer.move_right(),
            MoveHome => self.buffer.move_home(),
            MoveEnd => self.buffer.move_end(),
            WordBackward => self.buffer.move_word_backward(),
            WordForward => self.buffer.move_word_forward(),
            KillToEnd => self.buffer.kill_to_end(),
            KillToStart => self.buffer.kill_to_start(),
            KillWordBackward => self.buffer.kill_word_backward(),
            Yank => self.buffer.yank(),
            RecallBackward => self.recall(1, RecallMode::Exact),
            RecallForward => self.recall(-1, RecallMode::Exact),
            SearchBackward => self.recall(1, RecallMode::Prefix),
            SearchForward => self.recall(-1, RecallMode::Prefix),
            Submit => {
                let line = self.buffer.take_line();
                self.history.record(&line);
                return Step::Submit(line);
            }
            Abandon => {
                self.buffer.take_line();
                self.history.reset_recall();
                return Step::Abandon;
            }
        }
        Step::Continue
    }

    fn recall(&mut self, n: i32, mode: RecallMode) {
        let current = self.buffer.text();
        if let Some(text) = self.history.recall(n, mode, &current) {
            let text = text.to_owned();
            self.buffer.set_text(&text);
        }
    }
}

// ── TerminalEditor ────────────────────────────────────────────────────────────

/// Raw mode for as long as the guard lives.
struct RawModeGuard(());

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self(()))
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Line source that edits in raw mode and keeps persistent history.
pub struct TerminalEditor {
    state: LineState,
    decoder: KeyDecoder,
    history_path: Option<PathBuf>,
}

impl TerminalEditor {
    /// An editor whose history is loaded from, and saved back to,
    /// [`history_path`].
    pub fn new() -> Self {
        let path = history_path();
        let history = match &path {
            Some(p) => InputHistory::load(p, HISTORY_SIZE).unwrap_or_else(|e| {
                log::warn!("cannot read history {}: {e}", p.display());
                InputHistory::new(HISTORY_SIZE)
            }),
            None => InputHistory::new(HISTORY_SIZE),
        };
        Self::with_history(history, path)
    }

    pub fn with_history(history: InputHistory, history_path: Option<PathBuf>) -> Self {
        Self { state: LineState::new(history), decoder: KeyDecoder::new(), history_path }
    }

    pub fn history(&self) -> &InputHistory {
        &self.state.history
    }

    /// Run one editing session over the host's streams.  The terminal must
    /// already be in raw mode.
    fn edit(&mut self, host: &Host, prompt: &str) -> io::Result<Option<String>> {
        host.with_out(|w| self.render(w, prompt))?;
        loop {
            let Some(byte) = host.read_byte()? else {
                host.write_out("\r\n");
                return Ok(None);
            };
            let Some(action) = self.decoder.push(byte) else {
                continue;
            };
            match self.state.apply(action) {
                Step::Continue => {}
                Step::Submit(line) => {
                    host.write_out("\r\n");
                    return Ok(Some(line));
                }
                Step::Abandon => host.write_out("^C\r\n"),
                Step::EndOfInput => {
                    host.write_out("\r\n");
                    return Ok(None);
                }
            }
            host.with_out(|w| self.render(w, prompt))?;
        }
    }

    /// Redraw the prompt line and place the cursor.
    fn render<W: Write>(&self, mut w: W, prompt: &str) -> io::Result<()> {
        let column = prompt.chars().count() + self.state.buffer.pos();
        queue!(
            w,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print(prompt),
            Print(self.state.buffer.text()),
            cursor::MoveToColumn(u16::try_from(column).unwrap_or(u16::MAX)),
        )?;
        w.flush()
    }
}

impl Default for TerminalEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl LineSource for TerminalEditor {
    fn read_line(&mut self, host: &Host, prompt: &str) -> io::Result<Option<String>> {
        let _raw = RawModeGuard::enable()?;
        self.edit(host, prompt)
    }
}

impl Drop for TerminalEditor {
    fn drop(&mut self) {
        if let Some(path) = &self.history_path {
            if let Err(e) = self.state.history.save(path) {
                log::warn!("cannot save history {}: {e}", path.display());
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
