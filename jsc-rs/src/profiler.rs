//! Profiling and sampling instrumentation.
//!
//! The batch runner brackets each unit with [`Profiler::start_sampling`] /
//! [`Profiler::stop_sampling`] when `-p <file>` is given, and the driver
//! calls [`Profiler::save`] before exiting.  A failed save is reported but
//! never changes the exit status.
//!
//! With the `sampling` feature, scripts can also toggle [`SamplingFlags`]
//! through `setSamplingFlags()` / `clearSamplingFlags()`, and the batch dumps
//! the collected samples to stderr at the end of the run.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::ProfileError;
use crate::stopwatch::StopWatch;

// ── Sample ────────────────────────────────────────────────────────────────────

/// Timing of one profiled unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    /// File path or `[Command Line]`.
    pub source: String,
    pub elapsed_ms: u64,
    /// `false` when the unit ended with an exception.
    pub completed: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    tool: &'static str,
    version: &'static str,
    total_ms: u64,
    samples: &'a [Sample],
}

// ── Profiler ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Profiler {
    samples: Vec<Sample>,
    current: Option<(String, StopWatch)>,
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin timing `source`.  An unfinished sample is discarded.
    pub fn start_sampling(&mut self, source: &str) {
        if let Some((stale, _)) = self.current.take() {
            log::debug!("discarding unfinished sample for {stale}");
        }
        self.current = Some((source.to_owned(), StopWatch::started()));
    }

    /// Finish the current sample.  Does nothing if none was started.
    pub fn stop_sampling(&mut self, completed: bool) {
        if let Some((source, mut sw)) = self.current.take() {
            sw.stop();
            self.samples.push(Sample { source, elapsed_ms: sw.elapsed_ms(), completed });
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn total_ms(&self) -> u64 {
        self.samples.iter().map(|s| s.elapsed_ms).sum()
    }

    /// Human-readable summary of the collected samples.
    pub fn dump_sample_data(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "Sampled {} unit(s), {} ms total", self.samples.len(), self.total_ms())?;
        for (i, s) in self.samples.iter().enumerate() {
            let status = if s.completed { "ok" } else { "exception" };
            writeln!(w, "    {i}   {} ms   {status}   {}", s.elapsed_ms, s.source)?;
        }
        w.flush()
    }

    /// Write the JSON report to `path`.
    pub fn write_report(&self, path: &Path) -> Result<(), ProfileError> {
        let io_err = |source| ProfileError::Io { path: path.to_owned(), source };
        let file = File::create(path).map_err(io_err)?;
        let mut w = BufWriter::new(file);
        let report = Report {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            total_ms: self.total_ms(),
            samples: &self.samples,
        };
        serde_json::to_writer_pretty(&mut w, &report)?;
        w.write_all(b"\n").map_err(io_err)?;
        w.flush().map_err(io_err)
    }

    /// Save the report, returning whether it was written.
    pub fn save(&self, path: &Path) -> bool {
        match self.write_report(path) {
            Ok(()) => {
                log::info!("profile written to {}", path.display());
                true
            }
            Err(e) => {
                log::error!("{e}");
                false
            }
        }
    }
}

// ── SamplingFlags ─────────────────────────────────────────────────────────────

/// Thirty-two script-controlled sampling flags, numbered 1 through 32.
#[cfg(feature = "sampling")]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SamplingFlags(u32);

#[cfg(feature = "sampling")]
impl SamplingFlags {
    /// Set `flag`; numbers outside `1..=32` are ignored.
    pub fn set(&mut self, flag: u32) {
        if (1..=32).contains(&flag) {
            self.0 |= 1 << (flag - 1);
        }
    }

    pub fn clear(&mut self, flag: u32) {
        if (1..=32).contains(&flag) {
            self.0 &= !(1 << (flag - 1));
        }
    }

    pub fn is_set(&self, flag: u32) -> bool {
        (1..=32).contains(&flag) && self.0 & (1 << (flag - 1)) != 0
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
