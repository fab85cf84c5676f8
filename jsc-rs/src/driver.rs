//! Runs an [`ExecutionPlan`] and turns its outcome into an exit status.

use std::rc::Rc;

use crate::batch::run_batch;
use crate::cli::ExecutionPlan;
use crate::host::Host;
use crate::namespace::Namespace;
use crate::repl::{line_source_for, run_interactive};

/// Exit status after an uncaught exception or unreadable file.
pub const FAILURE_STATUS: u8 = 3;

/// Exit status for malformed command lines.
pub const USAGE_STATUS: u8 = 1;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    /// `quit()` was called.
    Quit,
}

impl Outcome {
    pub fn exit_status(self) -> u8 {
        match self {
            Outcome::Success | Outcome::Quit => 0,
            Outcome::Failure => FAILURE_STATUS,
        }
    }
}

/// Run the batch and, if it succeeded and the plan asks for it, the
/// interactive loop, all in one namespace.
pub fn run_plan(plan: &ExecutionPlan, host: &Rc<Host>) -> Outcome {
    let mut namespace = match Namespace::new(Rc::clone(host), &plan.trailing_arguments) {
        Ok(ns) => ns,
        Err(e) => {
            host.write_err(&format!("cannot create global namespace: {e}\n"));
            return Outcome::Failure;
        }
    };

    let outcome = run_batch(&mut namespace, &plan.units, plan.dump_bytecode);
    if outcome != Outcome::Success || !plan.interactive {
        return outcome;
    }

    let mut source = line_source_for(host);
    match run_interactive(&mut namespace, source.as_mut()) {
        Outcome::Quit => Outcome::Quit,
        // The interactive session never changes the batch result.
        _ => outcome,
    }
}

/// Report the exit status and save the profile as the plan asks; returns
/// the status to exit with.
///
/// A `quit()` skips both: the process just ends successfully.
pub fn finish(plan: &ExecutionPlan, host: &Host, outcome: Outcome) -> u8 {
    let status = outcome.exit_status();
    if outcome == Outcome::Quit {
        return status;
    }

    if plan.report_exit_code {
        host.write_out(&format!("jsc exiting {status}\n"));
    }

    if let Some(path) = &plan.profile_output {
        let saved = host.with_profiler(|p| p.save(path)).unwrap_or(false);
        if !saved {
            host.write_err("could not save profiler output.\n");
        }
    }

    status
}

// ── Tests ─────────────────────────────────────────────────────────────────────
