//! Process-side state shared by every namespace of one shell run.
//!
//! A [`Host`] owns the standard streams (or test doubles for them), the
//! engine options, the profiler, the stack of source frames currently being
//! evaluated, and the pending `quit()` request.  Namespaces hold an
//! `Rc<Host>`; everything runs on one thread, so interior mutability is
//! enough.

use std::cell::{Cell, RefCell};
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

use crate::error::LoadError;
use crate::options::EngineOptions;
use crate::profiler::Profiler;

#[cfg(feature = "sampling")]
use crate::profiler::SamplingFlags;

// ── HostIo ────────────────────────────────────────────────────────────────────

/// The three streams scripts and runners talk to.
pub struct HostIo {
    pub out: Box<dyn Write>,
    pub err: Box<dyn Write>,
    pub input: Box<dyn BufRead>,
}

impl HostIo {
    pub fn stdio() -> Self {
        Self {
            out: Box::new(io::stdout()),
            err: Box::new(io::stderr()),
            input: Box::new(BufReader::new(io::stdin())),
        }
    }
}

/// An in-memory output sink that can be cloned and read back.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Return and clear everything written so far.
    pub fn take(&self) -> String {
        let bytes = std::mem::take(&mut *self.0.borrow_mut());
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Host ──────────────────────────────────────────────────────────────────────

pub struct Host {
    io: RefCell<HostIo>,
    is_stdio: bool,
    options: EngineOptions,
    /// Names of the sources being evaluated, outermost first.
    frames: RefCell<Vec<String>>,
    quit: Cell<bool>,
    profiler: RefCell<Option<Profiler>>,
    #[cfg(feature = "sampling")]
    sampling: RefCell<SamplingFlags>,
}

impl Host {
    /// A host bound to the process's real stdin/stdout/stderr.
    pub fn stdio(options: EngineOptions) -> Self {
        let mut host = Self::with_io(HostIo::stdio(), options);
        host.is_stdio = true;
        host
    }

    pub fn with_io(io: HostIo, options: EngineOptions) -> Self {
        Self {
            io: RefCell::new(io),
            is_stdio: false,
            options,
            frames: RefCell::new(Vec::new()),
            quit: Cell::new(false),
            profiler: RefCell::new(None),
            #[cfg(feature = "sampling")]
            sampling: RefCell::new(SamplingFlags::default()),
        }
    }

    /// A host writing into the returned buffers and reading `input`.
    ///
    /// Returns `(host, stdout, stderr)`.
    pub fn captured(
        input: &str,
        options: EngineOptions,
    ) -> (Rc<Self>, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let io = HostIo {
            out: Box::new(out.clone()),
            err: Box::new(err.clone()),
            input: Box::new(io::Cursor::new(input.as_bytes().to_vec())),
        };
        (Rc::new(Self::with_io(io, options)), out, err)
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// `true` when stdin and stdout are the process's own and both are
    /// terminals.
    pub fn is_interactive_terminal(&self) -> bool {
        self.is_stdio && stdio_is_tty()
    }

    // ── Output ────────────────────────────────────────────────────────────

    /// Write `text` to standard output and flush.
    pub fn write_out(&self, text: &str) {
        let mut io = self.io.borrow_mut();
        if let Err(e) = io.out.write_all(text.as_bytes()).and_then(|()| io.out.flush()) {
            log::debug!("stdout write failed: {e}");
        }
    }

    /// Write `text` to the diagnostic stream and flush.
    pub fn write_err(&self, text: &str) {
        let mut io = self.io.borrow_mut();
        if let Err(e) = io.err.write_all(text.as_bytes()).and_then(|()| io.err.flush()) {
            log::debug!("stderr write failed: {e}");
        }
    }

    /// Run `f` with direct access to standard output.
    pub fn with_out<R>(&self, f: impl FnOnce(&mut dyn Write) -> R) -> R {
        let mut io = self.io.borrow_mut();
        f(io.out.as_mut())
    }

    /// Run `f` with direct access to the diagnostic stream.
    pub fn with_err<R>(&self, f: impl FnOnce(&mut dyn Write) -> R) -> R {
        let mut io = self.io.borrow_mut();
        f(io.err.as_mut())
    }

    pub fn report_load_error(&self, err: &LoadError) {
        self.write_err(&format!("{err}\n"));
    }

    // ── Input ─────────────────────────────────────────────────────────────

    /// Read bytes up to `\n` or end-of-input, newline excluded.
    ///
    /// Returns `None` only when end-of-input is hit before any byte.
    pub fn read_line(&self) -> io::Result<Option<String>> {
        let mut io = self.io.borrow_mut();
        let mut line = Vec::new();
        let n = io.input.read_until(b'\n', &mut line)?;
        if n == 0 {
            return Ok(None);
        }
        if line.last() == Some(&b'\n') {
            line.pop();
        }
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }

    /// Read a single byte, `None` at end-of-input.
    ///
    /// Shares the buffer used by [`read_line`](Self::read_line), so the
    /// line editor and `readline()` never steal input from each other.
    pub fn read_byte(&self) -> io::Result<Option<u8>> {
        let mut io = self.io.borrow_mut();
        let byte = io.input.fill_buf()?.first().copied();
        if byte.is_some() {
            io.input.consume(1);
        }
        Ok(byte)
    }

    // ── Frames ────────────────────────────────────────────────────────────

    /// Record that `source` is being evaluated until the guard drops.
    pub fn enter_frame(self: &Rc<Self>, source: &str) -> FrameGuard {
        self.frames.borrow_mut().push(source.to_owned());
        FrameGuard { host: Rc::clone(self) }
    }

    /// Active frames, innermost first.
    pub fn frames(&self) -> Vec<String> {
        self.frames.borrow().iter().rev().cloned().collect()
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────

    pub fn request_quit(&self) {
        self.quit.set(true);
    }

    pub fn quit_requested(&self) -> bool {
        self.quit.get()
    }

    // ── Profiling ─────────────────────────────────────────────────────────

    pub fn enable_profiler(&self) {
        self.profiler.borrow_mut().get_or_insert_with(Profiler::new);
    }

    pub fn profiling(&self) -> bool {
        self.profiler.borrow().is_some()
    }

    /// Run `f` on the profiler if profiling is enabled.
    pub fn with_profiler<R>(&self, f: impl FnOnce(&mut Profiler) -> R) -> Option<R> {
        self.profiler.borrow_mut().as_mut().map(f)
    }

    #[cfg(feature = "sampling")]
    pub fn sampling_flags(&self) -> std::cell::RefMut<'_, SamplingFlags> {
        self.sampling.borrow_mut()
    }
}

/// Pops the frame pushed by [`Host::enter_frame`].
pub struct FrameGuard {
    host: Rc<Host>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.host.frames.borrow_mut().pop();
    }
}

#[cfg(unix)]
fn stdio_is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 && libc::isatty(libc::STDOUT_FILENO) != 0 }
}

#[cfg(not(unix))]
fn stdio_is_tty() -> bool {
    use std::io::IsTerminal;
    io::stdin().is_terminal() && io::stdout().is_terminal()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
