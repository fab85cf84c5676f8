//! The interactive read-eval-print loop.

use std::io;
use std::rc::Rc;

use crate::driver::Outcome;
use crate::host::Host;
use crate::namespace::{Namespace, INTERACTIVE_SOURCE};

pub const PROMPT: &str = "> ";

/// Where the loop gets its lines from.
pub trait LineSource {
    /// Show `prompt` and read one line.  `None` ends the session.
    fn read_line(&mut self, host: &Host, prompt: &str) -> io::Result<Option<String>>;
}

/// Plain reader used when no terminal line editor is available.
///
/// Reads up to `\n` or end-of-input; an empty line ends the session just as
/// end-of-input does.
#[derive(Debug, Default)]
pub struct FallbackReader;

impl LineSource for FallbackReader {
    fn read_line(&mut self, host: &Host, prompt: &str) -> io::Result<Option<String>> {
        host.write_out(prompt);
        Ok(host.read_line()?.filter(|line| !line.is_empty()))
    }
}

/// The line source for `host`: the terminal editor when stdin and stdout
/// are terminals, the plain reader otherwise.
pub fn line_source_for(host: &Host) -> Box<dyn LineSource> {
    #[cfg(feature = "line-editor")]
    if host.is_interactive_terminal() {
        return Box::new(crate::editor::TerminalEditor::new());
    }
    #[cfg(not(feature = "line-editor"))]
    let _ = host;
    Box::new(FallbackReader)
}

/// Read, evaluate and print until the line source runs dry or `quit()` is
/// called.
pub fn run_interactive(namespace: &mut Namespace, source: &mut dyn LineSource) -> Outcome {
    let host = Rc::clone(namespace.host());

    loop {
        let line = match source.read_line(&host, PROMPT) {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("cannot read interactive input: {e}");
                break;
            }
        };

        let result = namespace.evaluate(line.as_bytes(), INTERACTIVE_SOURCE);
        if host.quit_requested() {
            return Outcome::Quit;
        }
        match result {
            Ok(value) => {
                let text = namespace.display(&value);
                host.write_out(&format!("{text}\n"));
            }
            Err(err) => {
                let report = namespace.exception_report(&err);
                host.write_err(&format!("Exception: {}\n", report.message));
            }
        }
    }

    host.write_out("\n");
    Outcome::Success
}

// ── Tests ─────────────────────────────────────────────────────────────────────
