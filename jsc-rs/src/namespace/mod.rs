//! The global namespace scripts run against.
//!
//! A [`Namespace`] is one engine [`Context`] with the host functions, the
//! typed-array constructors and the `arguments` array bound into its global
//! object.  The batch runner and the interactive loop share a single
//! namespace, so top-level bindings made by one unit are visible to the
//! next.  The `run()` host function builds a fresh namespace per call.
//!
//! # Source names
//!
//! | Where the code came from | Name reported to the engine |
//! |--------------------------|-----------------------------|
//! | `-f path` / bare path    | the path                    |
//! | `-e code`                | [`COMMAND_LINE_SOURCE`]     |
//! | interactive line         | [`INTERACTIVE_SOURCE`]      |

pub mod functions;
pub mod typed_arrays;

use std::path::Path;
use std::rc::Rc;

use boa_engine::object::builtins::JsArray;
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsError, JsResult, JsString, JsValue, Script, Source};

use crate::host::Host;

/// Source name for `-e` units.
pub const COMMAND_LINE_SOURCE: &str = "[Command Line]";
/// Source name for lines typed at the interactive prompt.
pub const INTERACTIVE_SOURCE: &str = "Interpreter";

// ── Namespace ─────────────────────────────────────────────────────────────────

pub struct Namespace {
    context: Context,
    host: Rc<Host>,
}

impl Namespace {
    /// Build a namespace whose `arguments` global holds `arguments`.
    pub fn new(host: Rc<Host>, arguments: &[String]) -> JsResult<Self> {
        let mut context = Context::default();
        host.options().apply(&mut context);
        functions::register(&mut context, &host)?;
        typed_arrays::register(&mut context)?;
        bind_arguments(&mut context, arguments)?;
        Ok(Self { context, host })
    }

    pub fn host(&self) -> &Rc<Host> {
        &self.host
    }

    /// Evaluate `source` as a script named `name`, then drain the promise
    /// jobs it queued.
    pub fn evaluate(&mut self, source: &[u8], name: &str) -> JsResult<JsValue> {
        let result = evaluate(&self.host, &mut self.context, source, name);
        self.context.run_jobs();
        result
    }

    /// Parse `source` without running it.
    pub fn check_syntax(&mut self, source: &[u8], name: &str) -> JsResult<()> {
        check_syntax(&self.host, &mut self.context, source, name)
    }

    /// Stringify `value` the way `String(value)` would.
    pub fn display(&mut self, value: &JsValue) -> String {
        display_value(value, &mut self.context)
    }

    pub fn exception_report(&mut self, err: &JsError) -> ExceptionReport {
        ExceptionReport::new(err, &mut self.context)
    }
}

fn bind_arguments(context: &mut Context, arguments: &[String]) -> JsResult<()> {
    let values = arguments.iter().map(|a| JsValue::from(JsString::from(a.as_str())));
    let array = JsArray::from_iter(values, context);
    context.register_global_property(js_string!("arguments"), array, Attribute::all())
}

// ── Evaluation primitives ─────────────────────────────────────────────────────

/// Evaluate `source` in `context`, recording `name` as the active frame.
///
/// Shared by [`Namespace::evaluate`] and the `load` host function, which
/// only has the caller's context at hand.  Pending jobs are left queued;
/// only a top-level evaluation drains them.
pub(crate) fn evaluate(
    host: &Rc<Host>,
    context: &mut Context,
    source: &[u8],
    name: &str,
) -> JsResult<JsValue> {
    let _frame = host.enter_frame(name);
    let path = Path::new(name);
    context.eval(Source::from_bytes(source).with_path(path))
}

pub(crate) fn check_syntax(
    host: &Rc<Host>,
    context: &mut Context,
    source: &[u8],
    name: &str,
) -> JsResult<()> {
    let _frame = host.enter_frame(name);
    let path = Path::new(name);
    Script::parse(Source::from_bytes(source).with_path(path), None, context).map(|_| ())
}

/// `String(value)`, falling back to the engine's debug rendering when the
/// conversion itself throws.
pub fn display_value(value: &JsValue, context: &mut Context) -> String {
    match value.to_string(context) {
        Ok(s) => s.to_std_string_escaped(),
        Err(_) => value.display().to_string(),
    }
}

// ── ExceptionReport ───────────────────────────────────────────────────────────

/// The operator-facing rendering of an uncaught exception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionReport {
    /// The stringified exception value.
    pub message: String,
    /// The exception's `stack` property, unless undefined or null.
    pub stack: Option<String>,
}

impl ExceptionReport {
    pub fn new(err: &JsError, context: &mut Context) -> Self {
        // Errors raised by the engine or host are reported as-is; some kinds
        // (runtime limits) have no script-visible object.
        if let Some(native) = err.as_native() {
            return Self { message: native.to_string(), stack: None };
        }
        let value = err.to_opaque(context);
        let message = display_value(&value, context);
        let stack = value
            .as_object()
            .and_then(|obj| obj.get(js_string!("stack"), context).ok())
            .filter(|stack| !stack.is_null_or_undefined())
            .map(|stack| display_value(&stack, context));
        Self { message, stack }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::EngineOptions;

    fn namespace(args: &[&str]) -> Namespace {
        let (host, _out, _err) = Host::captured("", EngineOptions::new());
        let args: Vec<String> = args.iter().map(|&s| s.to_owned()).collect();
        Namespace::new(host, &args).unwrap()
    }

    fn eval_display(ns: &mut Namespace, code: &str) -> String {
        let value = ns.evaluate(code.as_bytes(), COMMAND_LINE_SOURCE).unwrap();
        ns.display(&value)
    }

    #[test]
    fn top_level_state_persists_between_evaluations() {
        let mut ns = namespace(&[]);
        ns.evaluate(b"var x = 2;", COMMAND_LINE_SOURCE).unwrap();
        assert_eq!(eval_display(&mut ns, "x + 3"), "5");
    }

    #[test]
    fn function_declarations_persist() {
        let mut ns = namespace(&[]);
        ns.evaluate(b"function double(n) { return n * 2; }", COMMAND_LINE_SOURCE).unwrap();
        assert_eq!(eval_display(&mut ns, "double(21)"), "42");
    }

    #[test]
    fn independent_namespaces_do_not_share_state() {
        let mut a = namespace(&[]);
        let mut b = namespace(&[]);
        a.evaluate(b"var onlyInA = 1;", COMMAND_LINE_SOURCE).unwrap();
        assert_eq!(eval_display(&mut b, "typeof onlyInA"), "undefined");
    }

    #[test]
    fn arguments_are_bound_in_order() {
        let mut ns = namespace(&["alpha", "beta"]);
        assert_eq!(eval_display(&mut ns, "arguments.length"), "2");
        assert_eq!(eval_display(&mut ns, "arguments[0] + ',' + arguments[1]"), "alpha,beta");
    }

    #[test]
    fn arguments_is_empty_without_trailing_args() {
        let mut ns = namespace(&[]);
        assert_eq!(eval_display(&mut ns, "Array.isArray(arguments) && arguments.length"), "0");
    }

    #[test]
    fn display_of_undefined() {
        let mut ns = namespace(&[]);
        assert_eq!(eval_display(&mut ns, "undefined"), "undefined");
    }

    #[test]
    fn syntax_check_does_not_execute() {
        let mut ns = namespace(&[]);
        ns.check_syntax(b"var neverSet = 1;", COMMAND_LINE_SOURCE).unwrap();
        assert_eq!(eval_display(&mut ns, "typeof neverSet"), "undefined");
    }

    #[test]
    fn syntax_check_reports_errors() {
        let mut ns = namespace(&[]);
        let err = ns.check_syntax(b"var = ;", COMMAND_LINE_SOURCE).unwrap_err();
        let report = ns.exception_report(&err);
        assert!(report.message.starts_with("SyntaxError"), "{}", report.message);
    }

    #[test]
    fn exception_report_of_error_object() {
        let mut ns = namespace(&[]);
        let err = ns.evaluate(b"throw new TypeError('bad')", COMMAND_LINE_SOURCE).unwrap_err();
        let report = ns.exception_report(&err);
        assert_eq!(report.message, "TypeError: bad");
    }

    #[test]
    fn exception_report_includes_stack_property() {
        let mut ns = namespace(&[]);
        let code = b"throw { toString() { return 'boom'; }, stack: 'at top' }";
        let err = ns.evaluate(code, COMMAND_LINE_SOURCE).unwrap_err();
        let report = ns.exception_report(&err);
        assert_eq!(report.message, "boom");
        assert_eq!(report.stack.as_deref(), Some("at top"));
    }

    #[test]
    fn exception_report_skips_null_stack() {
        let mut ns = namespace(&[]);
        let code = b"throw { toString() { return 'boom'; }, stack: null }";
        let err = ns.evaluate(code, COMMAND_LINE_SOURCE).unwrap_err();
        assert_eq!(ns.exception_report(&err).stack, None);
    }

    #[test]
    fn thrown_primitive_is_reported() {
        let mut ns = namespace(&[]);
        let err = ns.evaluate(b"throw 42", COMMAND_LINE_SOURCE).unwrap_err();
        let report = ns.exception_report(&err);
        assert_eq!(report.message, "42");
        assert_eq!(report.stack, None);
    }

    #[test]
    fn promise_jobs_run_before_evaluate_returns() {
        let mut ns = namespace(&[]);
        let code = b"var settled = 'no'; Promise.resolve().then(() => { settled = 'yes'; });";
        ns.evaluate(code, COMMAND_LINE_SOURCE).unwrap();
        assert_eq!(eval_display(&mut ns, "settled"), "yes");
    }

    #[test]
    fn frames_are_released_after_evaluation() {
        let mut ns = namespace(&[]);
        let _ = ns.evaluate(b"throw 1", COMMAND_LINE_SOURCE);
        assert!(ns.host().frames().is_empty());
    }

    #[test]
    fn engine_options_are_applied() {
        let mut options = EngineOptions::new();
        options.set_option("strictMode=true");
        let (host, _out, _err) = Host::captured("", options);
        let mut ns = Namespace::new(host, &[]).unwrap();
        // Assigning to an undeclared name throws in strict code.
        assert!(ns.evaluate(b"undeclared = 1", COMMAND_LINE_SOURCE).is_err());
    }
}
