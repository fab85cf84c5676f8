//! Engine-level runtime options (`--name=value` on the command line).
//!
//! | Option                   | Type  | Default    | Effect                                  |
//! |--------------------------|-------|------------|-----------------------------------------|
//! | `loopIterationLimit`     | u64   | `u64::MAX` | abort loops after this many iterations  |
//! | `recursionLimit`         | usize | 512        | maximum call depth                      |
//! | `stackSizeLimit`         | usize | 10240      | maximum engine value-stack size         |
//! | `strictMode`             | bool  | false      | evaluate everything as strict code      |
//! | `dumpGeneratedBytecodes` | bool  | false      | trace bytecode (needs `trace` feature)  |
//!
//! The options are applied to every engine context the shell creates,
//! including the isolated ones made by the `run()` host function.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::OnceLock;

use boa_engine::Context;
use regex::Regex;

// ── EngineOptions ─────────────────────────────────────────────────────────────

/// Current values of every engine option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    pub stack_size_limit: usize,
    pub strict_mode: bool,
    pub dump_generated_bytecodes: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            loop_iteration_limit: u64::MAX,
            recursion_limit: 512,
            stack_size_limit: 1024 * 10,
            strict_mode: false,
            dump_generated_bytecodes: false,
        }
    }
}

/// One row of the option table.
struct OptionSpec {
    name: &'static str,
    description: &'static str,
    get: fn(&EngineOptions) -> String,
    set: fn(&mut EngineOptions, &str) -> bool,
}

static OPTIONS: &[OptionSpec] = &[
    OptionSpec {
        name: "loopIterationLimit",
        description: "maximum iterations of a single loop before it throws",
        get: |o| o.loop_iteration_limit.to_string(),
        set: |o, v| parse_into(v, &mut o.loop_iteration_limit),
    },
    OptionSpec {
        name: "recursionLimit",
        description: "maximum call depth",
        get: |o| o.recursion_limit.to_string(),
        set: |o, v| parse_into(v, &mut o.recursion_limit),
    },
    OptionSpec {
        name: "stackSizeLimit",
        description: "maximum size of the engine value stack",
        get: |o| o.stack_size_limit.to_string(),
        set: |o, v| parse_into(v, &mut o.stack_size_limit),
    },
    OptionSpec {
        name: "strictMode",
        description: "evaluate all code in strict mode",
        get: |o| o.strict_mode.to_string(),
        set: |o, v| parse_bool(v).map(|b| o.strict_mode = b).is_some(),
    },
    OptionSpec {
        name: "dumpGeneratedBytecodes",
        description: "trace generated bytecode (diagnostic builds)",
        get: |o| o.dump_generated_bytecodes.to_string(),
        set: |o, v| parse_bool(v).map(|b| o.dump_generated_bytecodes = b).is_some(),
    },
];

fn parse_into<T: std::str::FromStr>(value: &str, slot: &mut T) -> bool {
    match value.parse() {
        Ok(v) => {
            *slot = v;
            true
        }
        Err(_) => false,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)=(.*)$").expect("option pattern is valid")
    })
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an assignment of the form `name=value` (leading `--` already
    /// stripped).
    ///
    /// Returns `false`, leaving the options untouched, when the name is
    /// unknown, the `=value` part is missing, or the value does not parse.
    pub fn set_option(&mut self, assignment: &str) -> bool {
        let Some(caps) = assignment_re().captures(assignment) else {
            return false;
        };
        let (name, value) = (&caps[1], &caps[2]);
        match OPTIONS.iter().find(|opt| opt.name == name) {
            Some(opt) => {
                let mut updated = self.clone();
                if (opt.set)(&mut updated, value) {
                    *self = updated;
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    /// Current value of the named option, formatted as on the command line.
    pub fn get(&self, name: &str) -> Option<String> {
        OPTIONS
            .iter()
            .find(|opt| opt.name == name)
            .map(|opt| (opt.get)(self))
    }

    /// Names of every known option, in table order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        OPTIONS.iter().map(|opt| opt.name)
    }

    /// Format every option as `   name=value   ... description`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for opt in OPTIONS {
            let _ = writeln!(out, "   {}={}   ... {}", opt.name, (opt.get)(self), opt.description);
        }
        out
    }

    /// Write [`render`](Self::render) output to `w`.
    pub fn dump(&self, w: &mut dyn Write) -> io::Result<()> {
        w.write_all(self.render().as_bytes())?;
        w.flush()
    }

    /// Push the options into an engine context.
    pub fn apply(&self, context: &mut Context) {
        let limits = context.runtime_limits_mut();
        limits.set_loop_iteration_limit(self.loop_iteration_limit);
        limits.set_recursion_limit(self.recursion_limit);
        limits.set_stack_size_limit(self.stack_size_limit);
        context.strict(self.strict_mode);

        #[cfg(feature = "trace")]
        context.set_trace(self.dump_generated_bytecodes);

        #[cfg(not(feature = "trace"))]
        if self.dump_generated_bytecodes {
            log::warn!("bytecode dumping requires a build with the `trace` feature");
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
