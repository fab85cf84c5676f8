use std::io;
use std::process::ExitCode;
use std::rc::Rc;

use env_logger::Env;

use jsc::cli::{self, CliAction};
use jsc::driver::{self, USAGE_STATUS};
use jsc::host::Host;
use jsc::signals;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().filter_or("JSC_LOG", "warn")).init();

    // ── Command line ──────────────────────────────────────────────────────────
    let plan = match cli::parse_args() {
        Ok(CliAction::Run(plan)) => plan,
        Ok(CliAction::Help) => {
            eprint!("{}", cli::usage());
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("jsc: {e}");
            eprint!("{}", cli::usage());
            return ExitCode::from(USAGE_STATUS);
        }
    };
    log::debug!("execution plan: {plan:?}");

    // ── Engine options ────────────────────────────────────────────────────────
    if plan.dump_options {
        if let Err(e) = plan.options.dump(&mut io::stderr()) {
            log::error!("cannot dump options: {e}");
        }
    }
    if plan.exit_after_options {
        return ExitCode::SUCCESS;
    }

    if plan.crash_on_signal {
        signals::install_crash_handlers();
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    let host = Rc::new(Host::stdio(plan.options.clone()));
    if plan.profile_enabled() {
        host.enable_profiler();
    }

    let outcome = driver::run_plan(&plan, &host);
    ExitCode::from(driver::finish(&plan, &host, outcome))
}
