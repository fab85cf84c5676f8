//! The batch runner: evaluates every execution unit in order.

use std::path::Path;
use std::rc::Rc;

use crate::cli::ExecutionUnit;
use crate::driver::Outcome;
#[cfg(feature = "sampling")]
use crate::host::Host;
use crate::loader::load_script;
use crate::namespace::{Namespace, COMMAND_LINE_SOURCE};
use crate::stopwatch::StopWatch;

/// Run `units` against `namespace`, stopping early on unreadable files or
/// `quit()`.
///
/// A unit that throws marks the batch failed but the next unit still runs.
/// With `dump` set, each unit's completion value is printed as
/// `End: <value>`.
pub fn run_batch(namespace: &mut Namespace, units: &[ExecutionUnit], dump: bool) -> Outcome {
    let host = Rc::clone(namespace.host());
    let mut success = true;

    for unit in units {
        let script;
        let (source, name): (&[u8], &str) = if unit.is_file {
            script = match load_script(Path::new(&unit.source_text)) {
                Ok(script) => script,
                Err(e) => {
                    host.report_load_error(&e);
                    return Outcome::Failure;
                }
            };
            (script.source(), unit.source_text.as_str())
        } else {
            (unit.source_text.as_bytes(), COMMAND_LINE_SOURCE)
        };

        host.with_profiler(|p| p.start_sampling(name));
        let mut sw = StopWatch::started();
        let result = namespace.evaluate(source, name);
        sw.stop();
        host.with_profiler(|p| p.stop_sampling(result.is_ok()));
        log::debug!("{name}: {} ms", sw.elapsed_ms());

        if host.quit_requested() {
            return Outcome::Quit;
        }

        match result {
            Ok(value) => {
                if dump {
                    let text = namespace.display(&value);
                    host.write_out(&format!("End: {text}\n"));
                }
            }
            Err(err) => {
                success = false;
                let report = namespace.exception_report(&err);
                host.write_err(&format!("Exception: {}\n", report.message));
                if let Some(stack) = report.stack {
                    host.write_err(&format!("{stack}\n"));
                }
            }
        }
    }

    #[cfg(feature = "sampling")]
    dump_sampling(&host);

    if success {
        Outcome::Success
    } else {
        Outcome::Failure
    }
}

#[cfg(feature = "sampling")]
fn dump_sampling(host: &Host) {
    use std::io::Write as _;

    let flags = host.sampling_flags().bits();
    if flags == 0 && !host.profiling() {
        return;
    }
    host.with_err(|w| {
        if let Err(e) = writeln!(w, "Sampling flags: {flags:#010x}") {
            log::debug!("cannot write sampling flags: {e}");
        }
        if let Some(Err(e)) = host.with_profiler(|p| p.dump_sample_data(w)) {
            log::debug!("cannot write sample data: {e}");
        }
    });
}

// ── Tests ─────────────────────────────────────────────────────────────────────
