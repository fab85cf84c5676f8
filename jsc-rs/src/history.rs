//! Interactive input history: storage, recall, and on-disk persistence.
//!
//! ## Recall modes
//!
//! | Mode | Bound to | Behaviour |
//! |------|----------|-----------|
//! | [`RecallMode::Exact`]  | Up / Down, `^P` / `^N` | Step n entries back/forward |
//! | [`RecallMode::Prefix`] | PgUp / PgDn            | Find nth entry starting with the saved line |
//!
//! ## Persistence
//!
//! History is stored one entry per line, oldest first, at
//! [`history_path`].  `JSC_HISTORY` overrides the location; setting it to
//! the empty string disables persistence.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Entries kept in memory and on disk.
pub const HISTORY_SIZE: usize = 1000;

/// Environment variable overriding the history file location.
pub const HISTORY_ENV: &str = "JSC_HISTORY";

// ── RecallMode ────────────────────────────────────────────────────────────────

/// How [`InputHistory::recall`] searches the history buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecallMode {
    /// Move n entries back (n>0) or forward (n<0).
    Exact,
    /// Find the nth entry whose text starts with the saved line.
    Prefix,
}

// ── InputHistory ──────────────────────────────────────────────────────────────

/// Bounded list of input lines, newest at index 0.
///
/// The line being edited is not stored in `entries`; it is kept in
/// `saved_line` while the user scrolls through history.
#[derive(Debug, Clone)]
pub struct InputHistory {
    entries: VecDeque<String>,
    max_size: usize,
    /// `0` = at the live editing line; `n` = n entries back.
    recall_pos: usize,
    saved_line: String,
}

impl InputHistory {
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_size: max_size.max(1),
            recall_pos: 0,
            saved_line: String::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, oldest first.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().rev().map(String::as_str)
    }

    // ── Recording ─────────────────────────────────────────────────────────────

    /// Record `line` as the most recent input and return to the live line.
    ///
    /// Blank lines and consecutive duplicates are not stored.
    pub fn record(&mut self, line: &str) {
        self.reset_recall();

        if line.trim().is_empty() {
            return;
        }
        if self.entries.front().is_some_and(|e| e == line) {
            return;
        }
        self.entries.push_front(line.to_owned());
        self.entries.truncate(self.max_size);
    }

    // ── Recall ────────────────────────────────────────────────────────────────

    /// Scroll by `n` steps (positive = older, negative = newer).
    ///
    /// `current` is the live editing text; it is saved on the first step
    /// away from the live line and used as the prefix in
    /// [`RecallMode::Prefix`].  Returns `None` at either boundary.
    pub fn recall(&mut self, n: i32, mode: RecallMode, current: &str) -> Option<&str> {
        if self.recall_pos == 0 {
            self.saved_line = current.to_owned();
        }

        match mode {
            RecallMode::Exact => {
                let target = self.recall_pos as i64 + i64::from(n);
                if target < 0 {
                    if self.recall_pos == 0 {
                        return None;
                    }
                    self.recall_pos = 0;
                } else if target as usize > self.entries.len() {
                    return None;
                } else {
                    self.recall_pos = target as usize;
                }
            }
            RecallMode::Prefix => {
                let steps = n.unsigned_abs() as usize;
                let matches = |e: &String| e.starts_with(self.saved_line.as_str());
                if n > 0 {
                    let found = (self.recall_pos..self.entries.len())
                        .filter(|&i| matches(&self.entries[i]))
                        .nth(steps.saturating_sub(1))?;
                    self.recall_pos = found + 1;
                } else {
                    if self.recall_pos == 0 {
                        return None;
                    }
                    let found = (0..self.recall_pos - 1)
                        .rev()
                        .filter(|&i| matches(&self.entries[i]))
                        .nth(steps.saturating_sub(1));
                    self.recall_pos = found.map_or(0, |i| i + 1);
                }
            }
        }

        if self.recall_pos == 0 {
            Some(&self.saved_line)
        } else {
            self.entries.get(self.recall_pos - 1).map(String::as_str)
        }
    }

    /// Return to the live line without touching the stored entries.
    pub fn reset_recall(&mut self) {
        self.recall_pos = 0;
        self.saved_line.clear();
    }

    // ── Persistence ───────────────────────────────────────────────────────────

    /// Read a history file.  A missing file yields an empty history.
    pub fn load(path: &Path, max_size: usize) -> io::Result<Self> {
        let mut history = Self::new(max_size);
        let file = match fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(history),
            Err(e) => return Err(e),
        };
        for line in BufReader::new(file).lines() {
            history.record(&line?);
        }
        Ok(history)
    }

    /// Write every entry to `path`, oldest first, creating parent
    /// directories as needed.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut w = BufWriter::new(fs::File::create(path)?);
        for entry in self.iter_oldest_first() {
            writeln!(w, "{entry}")?;
        }
        w.flush()
    }
}

/// Where interactive history is kept, or `None` when persistence is off.
pub fn history_path() -> Option<PathBuf> {
    match std::env::var_os(HISTORY_ENV) {
        Some(p) if p.is_empty() => None,
        Some(p) => Some(PathBuf::from(p)),
        None => directories::ProjectDirs::from("", "", "jsc")
            .map(|dirs| dirs.data_dir().join("history")),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
