//! Crash signal handling for `-s`.
//!
//! With the handlers installed, a fatal signal terminates the process
//! immediately with the signal number as its exit status instead of
//! producing a core dump or a crash report.

/// Signals treated as crashes.
#[cfg(unix)]
pub const CRASH_SIGNALS: [libc::c_int; 4] = [libc::SIGILL, libc::SIGFPE, libc::SIGBUS, libc::SIGSEGV];

#[cfg(unix)]
extern "C" fn terminate(signal: libc::c_int) {
    // Only async-signal-safe calls are allowed here.
    unsafe { libc::_exit(signal) }
}

/// Install the terminate handler for every signal in [`CRASH_SIGNALS`].
#[cfg(unix)]
pub fn install_crash_handlers() {
    for signal in CRASH_SIGNALS {
        // SAFETY: `terminate` only calls `_exit`, which is async-signal-safe.
        let previous = unsafe { libc::signal(signal, terminate as libc::sighandler_t) };
        if previous == libc::SIG_ERR {
            log::warn!("cannot install handler for signal {signal}");
        }
    }
    log::debug!("crash signal handlers installed");
}

#[cfg(not(unix))]
pub fn install_crash_handlers() {
    log::warn!("-s is only supported on Unix platforms");
}
