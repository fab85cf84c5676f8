//! Command-line argument parsing.
//!
//! Usage:
//!   jsc [options] [files] [-- arguments]
//!
//! Parsing never exits the process: help requests and malformed flags come
//! back as values and `main` decides what to print and which status to use.

use std::path::PathBuf;

use crate::error::CliError;
use crate::options::EngineOptions;

// ── Public types ──────────────────────────────────────────────────────────────

/// One script scheduled to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionUnit {
    /// `true` when `source_text` is a path, `false` for inline code.
    pub is_file: bool,
    pub source_text: String,
}

impl ExecutionUnit {
    pub fn file(path: impl Into<String>) -> Self {
        Self { is_file: true, source_text: path.into() }
    }

    pub fn inline(code: impl Into<String>) -> Self {
        Self { is_file: false, source_text: code.into() }
    }
}

/// The fully parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Scripts to run, in command-line order.
    pub units: Vec<ExecutionUnit>,
    /// Enter the read-eval-print loop after the batch (`-i`, or no units).
    pub interactive: bool,
    /// Print `End: <result>` after each unit (`-d`).
    pub dump_bytecode: bool,
    /// Print `jsc exiting <code>` before terminating (`-x`).
    pub report_exit_code: bool,
    /// Profiling report destination (`-p <path>`); `None` = profiling off.
    pub profile_output: Option<PathBuf>,
    /// Install crash-terminate signal handlers (`-s`).
    pub crash_on_signal: bool,
    /// Everything after `--`, passed to scripts as `arguments`.
    pub trailing_arguments: Vec<String>,
    /// Engine options with command-line overrides applied.
    pub options: EngineOptions,
    /// Dump all engine options to stderr once parsing is done.
    pub dump_options: bool,
    /// Exit successfully right after the options dump (`--options`).
    pub exit_after_options: bool,
}

impl ExecutionPlan {
    pub fn profile_enabled(&self) -> bool {
        self.profile_output.is_some()
    }
}

/// What `main` should do with the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Run the plan.
    Run(ExecutionPlan),
    /// `-h` / `--help`: print usage and exit successfully.
    Help,
}

// ── Parsing ───────────────────────────────────────────────────────────────────

/// Parse `std::env::args()`.
pub fn parse_args() -> Result<CliAction, CliError> {
    let raw: Vec<String> = std::env::args().collect();
    parse_argv(raw.get(1..).unwrap_or_default())
}

/// Parse a slice of argument strings, program name excluded.
pub fn parse_argv(argv: &[String]) -> Result<CliAction, CliError> {
    let mut plan = ExecutionPlan::default();
    let mut i = 0;

    while i < argv.len() {
        let arg = argv[i].as_str();
        match arg {
            "-f" => {
                let path = value_after(argv, &mut i, "-f")?;
                plan.units.push(ExecutionUnit::file(path));
            }
            "-e" => {
                let code = value_after(argv, &mut i, "-e")?;
                plan.units.push(ExecutionUnit::inline(code));
            }
            "-p" => {
                let path = value_after(argv, &mut i, "-p")?;
                plan.profile_output = Some(PathBuf::from(path));
            }
            "-i" => plan.interactive = true,
            "-d" => {
                plan.dump_bytecode = true;
                plan.options.dump_generated_bytecodes = true;
            }
            "-s" => plan.crash_on_signal = true,
            "-x" => plan.report_exit_code = true,
            "--" => {
                i += 1;
                break;
            }
            "-h" | "--help" => return Ok(CliAction::Help),
            "--options" => {
                plan.dump_options = true;
                plan.exit_after_options = true;
            }
            "--dumpOptions" => plan.dump_options = true,
            _ => {
                let is_option = arg
                    .strip_prefix("--")
                    .is_some_and(|assignment| plan.options.set_option(assignment));
                // Anything unrecognised, including unknown `--flags`, is a
                // script file.
                if !is_option {
                    plan.units.push(ExecutionUnit::file(arg));
                }
            }
        }
        i += 1;
    }

    plan.trailing_arguments = argv.get(i..).unwrap_or_default().to_vec();

    if plan.units.is_empty() {
        plan.interactive = true;
    }

    Ok(CliAction::Run(plan))
}

/// Consume the token following a value-taking flag.
fn value_after(argv: &[String], i: &mut usize, flag: &'static str) -> Result<String, CliError> {
    *i += 1;
    argv.get(*i).cloned().ok_or(CliError::MissingValue { flag })
}

// ── Usage ─────────────────────────────────────────────────────────────────────

/// The usage statement printed for `-h` and for malformed command lines.
pub fn usage() -> String {
    let mut text = String::new();
    text.push_str("Usage: jsc [options] [files] [-- arguments]\n");
    text.push_str("  -d         Dumps bytecode (debug builds only)\n");
    text.push_str("  -e         Evaluate argument as script code\n");
    text.push_str("  -f         Specifies a source file (deprecated)\n");
    text.push_str("  -h|--help  Prints this help message\n");
    text.push_str("  -i         Enables interactive mode (default if no files are specified)\n");
    if cfg!(unix) {
        text.push_str("  -s         Installs signal handlers that exit on a crash (Unix platforms only)\n");
    }
    text.push_str("  -p <file>  Outputs profiling data to a file\n");
    text.push_str("  -x         Output exit code before terminating\n");
    text.push('\n');
    text.push_str("  --options                  Dumps all engine options and exits\n");
    text.push_str("  --dumpOptions              Dumps all engine options before continuing\n");
    text.push_str("  --<engine option>=<value>  Sets the specified engine option\n");
    text.push('\n');
    text
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|&s| s.to_owned()).collect()
    }

    fn plan(args: &[&str]) -> ExecutionPlan {
        match parse_argv(&argv(args)).unwrap() {
            CliAction::Run(p) => p,
            other => panic!("expected a plan, got {other:?}"),
        }
    }

    #[test]
    fn empty_args_are_interactive() {
        let p = plan(&[]);
        assert!(p.interactive);
        assert!(p.units.is_empty());
    }

    #[test]
    fn bare_filename_is_a_file_unit() {
        let p = plan(&["test.js"]);
        assert_eq!(p.units, vec![ExecutionUnit::file("test.js")]);
        assert!(!p.interactive);
    }

    #[test]
    fn units_keep_command_line_order() {
        let p = plan(&["-e", "var x = 2;", "-f", "a.js", "b.js", "-e", "x"]);
        assert_eq!(
            p.units,
            vec![
                ExecutionUnit::inline("var x = 2;"),
                ExecutionUnit::file("a.js"),
                ExecutionUnit::file("b.js"),
                ExecutionUnit::inline("x"),
            ]
        );
    }

    #[test]
    fn bool_flags() {
        let p = plan(&["-d", "-x", "-s", "-i", "a.js"]);
        assert!(p.dump_bytecode);
        assert!(p.options.dump_generated_bytecodes);
        assert!(p.report_exit_code);
        assert!(p.crash_on_signal);
        assert!(p.interactive);
    }

    #[test]
    fn profile_flag_takes_a_path() {
        let p = plan(&["-p", "out.json", "a.js"]);
        assert!(p.profile_enabled());
        assert_eq!(p.profile_output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn double_dash_collects_trailing_arguments() {
        let p = plan(&["a.js", "--", "-f", "x", "--help"]);
        assert_eq!(p.units, vec![ExecutionUnit::file("a.js")]);
        assert_eq!(p.trailing_arguments, argv(&["-f", "x", "--help"]));
    }

    #[test]
    fn double_dash_without_units_is_interactive() {
        let p = plan(&["--", "one", "two"]);
        assert!(p.interactive);
        assert_eq!(p.trailing_arguments, argv(&["one", "two"]));
    }

    #[test]
    fn help_flags() {
        assert_eq!(parse_argv(&argv(&["-h"])).unwrap(), CliAction::Help);
        assert_eq!(parse_argv(&argv(&["a.js", "--help"])).unwrap(), CliAction::Help);
    }

    #[test]
    fn help_after_double_dash_is_an_argument() {
        let p = plan(&["--", "-h"]);
        assert_eq!(p.trailing_arguments, argv(&["-h"]));
    }

    #[test]
    fn missing_values() {
        for flag in ["-f", "-e", "-p"] {
            let err = parse_argv(&argv(&["a.js", flag])).unwrap_err();
            assert_eq!(err, CliError::MissingValue { flag });
        }
    }

    #[test]
    fn options_flags() {
        let p = plan(&["--options"]);
        assert!(p.dump_options && p.exit_after_options);
        let p = plan(&["--dumpOptions", "a.js"]);
        assert!(p.dump_options && !p.exit_after_options);
    }

    #[test]
    fn engine_option_is_consumed() {
        let p = plan(&["--recursionLimit=100", "a.js"]);
        assert_eq!(p.options.recursion_limit, 100);
        assert_eq!(p.units, vec![ExecutionUnit::file("a.js")]);
    }

    #[test]
    fn unknown_double_dash_flag_falls_through_to_file() {
        let p = plan(&["--frobnicate"]);
        assert_eq!(p.units, vec![ExecutionUnit::file("--frobnicate")]);
        assert!(!p.interactive);
    }

    #[test]
    fn bad_option_value_falls_through_to_file() {
        let p = plan(&["--recursionLimit=many"]);
        assert_eq!(p.units, vec![ExecutionUnit::file("--recursionLimit=many")]);
        assert_eq!(p.options.recursion_limit, EngineOptions::new().recursion_limit);
    }

    #[test]
    fn unknown_single_dash_flag_is_a_file() {
        let p = plan(&["-z"]);
        assert_eq!(p.units, vec![ExecutionUnit::file("-z")]);
    }

    #[test]
    fn value_flags_accept_dash_values() {
        let p = plan(&["-e", "-1"]);
        assert_eq!(p.units, vec![ExecutionUnit::inline("-1")]);
    }

    #[test]
    fn usage_mentions_every_flag() {
        let text = usage();
        for flag in ["-d", "-e", "-f", "-h|--help", "-i", "-p <file>", "-x", "--options", "--dumpOptions"] {
            assert!(text.contains(flag), "usage is missing {flag}");
        }
    }
}
