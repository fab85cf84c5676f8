//! Native functions installed on every global object.
//!
//! Each entry in the tables below becomes a global function.  The closure
//! registered with the engine captures the shared [`Host`] so output,
//! input, frames and the quit flag all go through one place.

use std::path::Path;
use std::rc::Rc;

use boa_engine::{Context, JsNativeError, JsResult, JsString, JsValue, NativeFunction};

use super::{check_syntax, evaluate, Namespace};
use crate::host::Host;
use crate::loader::{load_script, ScriptBuffer};
use crate::stopwatch::{precise_time, StopWatch};

pub type HostFn = fn(&Rc<Host>, &[JsValue], &mut Context) -> JsResult<JsValue>;

/// A named native function and its declared `length`.
pub struct HostFunction {
    pub name: &'static str,
    pub arity: usize,
    pub call: HostFn,
}

const fn entry(name: &'static str, arity: usize, call: HostFn) -> HostFunction {
    HostFunction { name, arity, call }
}

static CORE: &[HostFunction] = &[
    entry("debug", 1, debug),
    entry("describe", 1, describe),
    entry("print", 1, print),
    entry("quit", 0, quit),
    entry("gc", 0, gc),
    entry("version", 1, version),
    entry("run", 1, run),
    entry("load", 1, load),
    entry("checkSyntax", 1, check_syntax_fn),
    entry("jscStack", 1, jsc_stack),
    entry("readline", 0, readline),
    entry("preciseTime", 0, precise_time_fn),
];

#[cfg(debug_assertions)]
static DEBUG_ONLY: &[HostFunction] = &[
    entry("dumpCallFrame", 0, dump_call_frame),
    entry("releaseExecutableMemory", 0, release_executable_memory),
];

#[cfg(feature = "sampling")]
static SAMPLING: &[HostFunction] = &[
    entry("setSamplingFlags", 1, set_sampling_flags),
    entry("clearSamplingFlags", 1, clear_sampling_flags),
];

/// Every host function this build provides.
pub fn host_functions() -> Vec<&'static HostFunction> {
    let mut all: Vec<&'static HostFunction> = CORE.iter().collect();
    #[cfg(debug_assertions)]
    all.extend(DEBUG_ONLY);
    #[cfg(feature = "sampling")]
    all.extend(SAMPLING);
    all
}

/// Bind every host function into `context`'s global object.
pub fn register(context: &mut Context, host: &Rc<Host>) -> JsResult<()> {
    for function in host_functions() {
        let host = Rc::clone(host);
        let call = function.call;
        // SAFETY: the closure captures an `Rc<Host>` and a fn pointer, neither
        // of which holds garbage-collected values.
        let native = unsafe {
            NativeFunction::from_closure(move |_this, args, context| call(&host, args, context))
        };
        context.register_global_builtin_callable(
            JsString::from(function.name),
            function.arity,
            native,
        )?;
    }
    Ok(())
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn arg(args: &[JsValue], index: usize) -> JsValue {
    args.get(index).cloned().unwrap_or_else(JsValue::undefined)
}

fn arg_string(args: &[JsValue], index: usize, context: &mut Context) -> JsResult<String> {
    Ok(arg(args, index).to_string(context)?.to_std_string_escaped())
}

fn open_script(host: &Host, path: &str) -> JsResult<ScriptBuffer> {
    load_script(Path::new(path)).map_err(|e| {
        host.report_load_error(&e);
        JsNativeError::error().with_message("Could not open file.").into()
    })
}

/// Whether a script file shares the caller's global object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    /// Evaluate in the caller's namespace (`load`).
    Shared,
    /// Evaluate in a brand-new namespace (`run`).
    Isolated,
}

/// Read `path` and evaluate it.
///
/// Shared evaluation returns the script's completion value.  Isolated
/// evaluation returns the wall-clock milliseconds it took; the fresh
/// namespace gets an empty `arguments` array.  Either way an exception
/// thrown by the script is rethrown to the caller.
pub fn execute_file(
    host: &Rc<Host>,
    context: &mut Context,
    path: &str,
    isolation: Isolation,
) -> JsResult<JsValue> {
    let script = open_script(host, path)?;
    match isolation {
        Isolation::Shared => evaluate(host, context, script.source(), path),
        Isolation::Isolated => {
            let mut namespace = Namespace::new(Rc::clone(host), &[])?;
            let mut sw = StopWatch::started();
            let result = namespace.evaluate(script.source(), path);
            sw.stop();
            result?;
            Ok(JsValue::from(sw.elapsed_ms() as f64))
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print(host: &Rc<Host>, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let mut parts = Vec::with_capacity(args.len());
    for value in args {
        parts.push(value.to_string(context)?.to_std_string_escaped());
    }
    host.write_out(&format!("{}\n", parts.join(" ")));
    Ok(JsValue::undefined())
}

fn debug(host: &Rc<Host>, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let text = arg_string(args, 0, context)?;
    host.write_err(&format!("--> {text}\n"));
    Ok(JsValue::undefined())
}

fn describe(host: &Rc<Host>, args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    let value = arg(args, 0);
    host.write_err(&format!("--> {}\n", value.display()));
    Ok(JsValue::undefined())
}

/// The engine's call stack, innermost first.
///
/// Script top levels (`<main>` in the engine) are named after the host frame
/// that evaluated them, so `load`ed files show their path.
fn call_stack(host: &Host, context: &Context) -> Vec<String> {
    let mut scripts = host.frames().into_iter();
    context
        .stack_trace()
        .map(|frame| {
            let name = frame.code_block().name().to_std_string_escaped();
            match name.as_str() {
                "<main>" => scripts.next().unwrap_or(name),
                "" => "<anonymous>".to_owned(),
                _ => name,
            }
        })
        .collect()
}

fn jsc_stack(host: &Rc<Host>, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let mut text = String::from("--> Stack trace:\n");
    for (i, frame) in call_stack(host, context).iter().enumerate() {
        text.push_str(&format!("    {i}   {frame}\n"));
    }
    host.write_err(&text);
    Ok(JsValue::undefined())
}

// ── Engine ────────────────────────────────────────────────────────────────────

fn gc(_host: &Rc<Host>, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    boa_gc::force_collect();
    Ok(JsValue::undefined())
}

fn version(_host: &Rc<Host>, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    // Language-version switching is not supported; the call is accepted and ignored.
    Ok(JsValue::undefined())
}

fn quit(host: &Rc<Host>, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    log::debug!("quit() requested");
    host.request_quit();
    // A runtime-limit error cannot be caught by the script.
    Err(JsNativeError::runtime_limit().with_message("quit() called").into())
}

// ── Scripts ───────────────────────────────────────────────────────────────────

fn run(host: &Rc<Host>, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let path = arg_string(args, 0, context)?;
    execute_file(host, context, &path, Isolation::Isolated)
}

fn load(host: &Rc<Host>, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let path = arg_string(args, 0, context)?;
    execute_file(host, context, &path, Isolation::Shared)
}

fn check_syntax_fn(host: &Rc<Host>, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let path = arg_string(args, 0, context)?;
    let script = open_script(host, &path)?;
    let mut sw = StopWatch::started();
    let result = check_syntax(host, context, script.source(), &path);
    sw.stop();
    result?;
    Ok(JsValue::from(sw.elapsed_ms() as f64))
}

// ── Input and time ────────────────────────────────────────────────────────────

fn readline(host: &Rc<Host>, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    let line = host
        .read_line()
        .map_err(|e| JsNativeError::error().with_message(format!("readline failed: {e}")))?
        .unwrap_or_default();
    Ok(JsValue::from(JsString::from(line.as_str())))
}

fn precise_time_fn(_host: &Rc<Host>, _args: &[JsValue], _context: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(precise_time()))
}

// ── Debug builds ──────────────────────────────────────────────────────────────

#[cfg(debug_assertions)]
fn dump_call_frame(host: &Rc<Host>, _args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    match call_stack(host, context).first() {
        Some(frame) => host.write_err(&format!("--> frame: {frame}\n")),
        None => host.write_err("--> frame: <none>\n"),
    }
    Ok(JsValue::undefined())
}

#[cfg(debug_assertions)]
fn release_executable_memory(
    _host: &Rc<Host>,
    _args: &[JsValue],
    _context: &mut Context,
) -> JsResult<JsValue> {
    boa_gc::force_collect();
    Ok(JsValue::undefined())
}

// ── Sampling ──────────────────────────────────────────────────────────────────

#[cfg(feature = "sampling")]
fn sampling_args(args: &[JsValue], context: &mut Context) -> JsResult<Vec<u32>> {
    let mut flags = Vec::with_capacity(args.len());
    for value in args {
        let n = value.to_number(context)?;
        if n.is_finite() && n >= 0.0 {
            flags.push(n as u32);
        }
    }
    Ok(flags)
}

#[cfg(feature = "sampling")]
fn set_sampling_flags(host: &Rc<Host>, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    for flag in sampling_args(args, context)? {
        host.sampling_flags().set(flag);
    }
    Ok(JsValue::null())
}

#[cfg(feature = "sampling")]
fn clear_sampling_flags(host: &Rc<Host>, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    for flag in sampling_args(args, context)? {
        host.sampling_flags().clear(flag);
    }
    Ok(JsValue::null())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;
    use crate::host::SharedBuffer;
    use crate::namespace::COMMAND_LINE_SOURCE;
    use crate::options::EngineOptions;

    struct Fixture {
        ns: Namespace,
        out: SharedBuffer,
        err: SharedBuffer,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_input("")
        }

        fn with_input(input: &str) -> Self {
            let (host, out, err) = Host::captured(input, EngineOptions::new());
            let args = vec!["first".to_owned(), "second".to_owned()];
            let ns = Namespace::new(host, &args).unwrap();
            Self { ns, out, err, dir: tempfile::tempdir().unwrap() }
        }

        /// Write `body` to a script file and return its path as a JS string
        /// literal.
        fn script(&self, name: &str, body: &str) -> String {
            let path = self.dir.path().join(name);
            std::fs::File::create(&path).unwrap().write_all(body.as_bytes()).unwrap();
            serde_json::to_string(path.to_str().unwrap()).unwrap()
        }

        fn eval(&mut self, code: &str) -> JsResult<JsValue> {
            self.ns.evaluate(code.as_bytes(), COMMAND_LINE_SOURCE)
        }

        fn eval_display(&mut self, code: &str) -> String {
            let value = self.eval(code).unwrap();
            self.ns.display(&value)
        }

        fn error_message(&mut self, code: &str) -> String {
            let err = self.eval(code).unwrap_err();
            self.ns.exception_report(&err).message
        }
    }

    #[test]
    fn every_host_function_is_installed() {
        let mut f = Fixture::new();
        for function in host_functions() {
            let code = format!("typeof {}", function.name);
            assert_eq!(f.eval_display(&code), "function", "{} missing", function.name);
        }
    }

    #[test]
    fn print_joins_arguments_with_spaces() {
        let mut f = Fixture::new();
        f.eval("print('a', 1, true, null)").unwrap();
        assert_eq!(f.out.contents(), "a 1 true null\n");
    }

    #[test]
    fn print_without_arguments_prints_newline() {
        let mut f = Fixture::new();
        f.eval("print()").unwrap();
        assert_eq!(f.out.contents(), "\n");
    }

    #[test]
    fn print_propagates_to_string_exceptions() {
        let mut f = Fixture::new();
        let message = f.error_message("print({ toString() { throw new Error('nope'); } })");
        assert_eq!(message, "Error: nope");
        assert_eq!(f.out.contents(), "");
    }

    #[test]
    fn debug_writes_to_error_stream() {
        let mut f = Fixture::new();
        let value = f.eval("debug('hi')").unwrap();
        assert!(value.is_undefined());
        assert_eq!(f.err.contents(), "--> hi\n");
        assert_eq!(f.out.contents(), "");
    }

    #[test]
    fn describe_writes_engine_rendering() {
        let mut f = Fixture::new();
        f.eval("describe(42)").unwrap();
        assert_eq!(f.err.contents(), "--> 42\n");
    }

    #[test]
    fn jsc_stack_lists_current_frames() {
        let mut f = Fixture::new();
        f.eval("jscStack()").unwrap();
        assert_eq!(f.err.contents(), "--> Stack trace:\n    0   [Command Line]\n");
    }

    #[test]
    fn jsc_stack_lists_nested_functions() {
        let mut f = Fixture::new();
        f.eval("function inner() { jscStack(); } function outer() { inner(); } outer();")
            .unwrap();
        assert_eq!(
            f.err.contents(),
            "--> Stack trace:\n    0   inner\n    1   outer\n    2   [Command Line]\n"
        );
    }

    #[test]
    fn jsc_stack_inside_loaded_file_shows_both_frames() {
        let mut f = Fixture::new();
        let path = f.script("inner.js", "jscStack();");
        f.eval(&format!("load({path})")).unwrap();
        let err = f.err.contents();
        assert!(err.starts_with("--> Stack trace:\n    0   "));
        assert!(err.contains("inner.js\n"));
        assert!(err.ends_with("    1   [Command Line]\n"));
    }

    #[test]
    fn gc_and_version_return_undefined() {
        let mut f = Fixture::new();
        assert!(f.eval("gc()").unwrap().is_undefined());
        assert!(f.eval("version(170)").unwrap().is_undefined());
    }

    #[test]
    fn quit_sets_flag_and_unwinds() {
        let mut f = Fixture::new();
        assert!(f.eval("quit(); print('after')").is_err());
        assert!(f.ns.host().quit_requested());
        assert_eq!(f.out.contents(), "");
    }

    #[test]
    fn quit_cannot_be_caught() {
        let mut f = Fixture::new();
        let code = "try { quit(); } catch (e) { print('caught ' + e); } print('still running');";
        assert!(f.eval(code).is_err());
        assert!(f.ns.host().quit_requested());
        assert_eq!(f.out.contents(), "");
    }

    #[test]
    fn quit_inside_loaded_file_stops_the_caller() {
        let mut f = Fixture::new();
        let path = f.script("bye.js", "quit();");
        let code =
            format!("try {{ load({path}); }} catch (e) {{ print('caught'); }} print('after');");
        assert!(f.eval(&code).is_err());
        assert_eq!(f.out.contents(), "");
    }

    #[test]
    fn load_does_not_drain_callers_jobs() {
        let mut f = Fixture::new();
        let path = f.script("empty.js", "1;");
        let code = format!(
            "Promise.resolve().then(() => print('job')); load({path}); print('after load');"
        );
        f.eval(&code).unwrap();
        assert_eq!(f.out.contents(), "after load\njob\n");
    }

    #[test]
    fn load_shares_global_namespace() {
        let mut f = Fixture::new();
        let path = f.script("shared.js", "var loaded = 42;");
        f.eval(&format!("load({path})")).unwrap();
        assert_eq!(f.eval_display("loaded"), "42");
    }

    #[test]
    fn load_returns_completion_value() {
        let mut f = Fixture::new();
        let path = f.script("value.js", "6 * 7");
        assert_eq!(f.eval_display(&format!("load({path})")), "42");
    }

    #[test]
    fn load_sees_callers_arguments() {
        let mut f = Fixture::new();
        let path = f.script("args.js", "print(arguments.length);");
        f.eval(&format!("load({path})")).unwrap();
        assert_eq!(f.out.contents(), "2\n");
    }

    #[test]
    fn load_neutralizes_shebang() {
        let mut f = Fixture::new();
        let path = f.script("tool.js", "#!/usr/bin/env jsc\nprint('ran');");
        f.eval(&format!("load({path})")).unwrap();
        assert_eq!(f.out.contents(), "ran\n");
    }

    #[test]
    fn load_rethrows_script_exceptions() {
        let mut f = Fixture::new();
        let path = f.script("bad.js", "throw new TypeError('bad');");
        assert_eq!(f.error_message(&format!("load({path})")), "TypeError: bad");
    }

    #[test]
    fn run_uses_an_isolated_namespace() {
        let mut f = Fixture::new();
        let path = f.script("isolated.js", "var ranVar = 1; print(arguments.length);");
        assert_eq!(f.eval_display(&format!("typeof run({path})")), "number");
        assert_eq!(f.eval_display("typeof ranVar"), "undefined");
        assert_eq!(f.out.contents(), "0\n");
    }

    #[test]
    fn run_cannot_see_callers_globals() {
        let mut f = Fixture::new();
        f.eval("var callerOnly = 1;").unwrap();
        let path = f.script("peek.js", "print(typeof callerOnly);");
        f.eval(&format!("run({path})")).unwrap();
        assert_eq!(f.out.contents(), "undefined\n");
    }

    #[test]
    fn run_rethrows_script_exceptions() {
        let mut f = Fixture::new();
        let path = f.script("throws.js", "throw new RangeError('deep');");
        assert_eq!(f.error_message(&format!("run({path})")), "RangeError: deep");
    }

    #[test]
    fn missing_file_throws_could_not_open() {
        let mut f = Fixture::new();
        for function in ["load", "run", "checkSyntax"] {
            let message = f.error_message(&format!("{function}('/no/such/file.js')"));
            assert_eq!(message, "Error: Could not open file.", "{function}");
        }
        assert!(f.err.contents().contains("Could not open file: /no/such/file.js"));
    }

    #[test]
    fn check_syntax_returns_elapsed_time_without_running() {
        let mut f = Fixture::new();
        let path = f.script("ok.js", "print('should not run');");
        assert_eq!(f.eval_display(&format!("typeof checkSyntax({path})")), "number");
        assert_eq!(f.out.contents(), "");
    }

    #[test]
    fn check_syntax_throws_syntax_error() {
        let mut f = Fixture::new();
        let path = f.script("broken.js", "print('x'); (");
        let message = f.error_message(&format!("checkSyntax({path})"));
        assert!(message.starts_with("SyntaxError"), "{message}");
        assert_eq!(f.out.contents(), "");
    }

    #[test]
    fn readline_reads_one_line() {
        let mut f = Fixture::with_input("first line\nsecond");
        assert_eq!(f.eval_display("readline()"), "first line");
        assert_eq!(f.eval_display("readline()"), "second");
        assert_eq!(f.eval_display("readline()"), "");
    }

    #[test]
    fn precise_time_is_seconds_since_epoch() {
        let mut f = Fixture::new();
        // 2001-09-09 in seconds; any sane clock is past it.
        assert_eq!(f.eval_display("preciseTime() > 1e9"), "true");
        assert_eq!(f.eval_display("preciseTime() < 1e11"), "true");
    }

    #[cfg(debug_assertions)]
    #[test]
    fn dump_call_frame_names_innermost_frame() {
        let mut f = Fixture::new();
        f.eval("dumpCallFrame()").unwrap();
        assert_eq!(f.err.contents(), "--> frame: [Command Line]\n");
    }

    #[cfg(feature = "sampling")]
    #[test]
    fn sampling_flags_are_script_controlled() {
        let mut f = Fixture::new();
        assert!(f.eval("setSamplingFlags(1, 3, 99)").unwrap().is_null());
        assert_eq!(f.ns.host().sampling_flags().bits(), 0b101);
        f.eval("clearSamplingFlags(1)").unwrap();
        assert_eq!(f.ns.host().sampling_flags().bits(), 0b100);
    }
}
