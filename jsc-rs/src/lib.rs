//! `jsc`: a command-line host shell for a JavaScript engine.
//!
//! The shell parses its command line into an [`cli::ExecutionPlan`], binds
//! a small set of host functions into a global [`namespace::Namespace`],
//! evaluates every scheduled script in order, and optionally drops into an
//! interactive prompt.  Exit status is 0 on success, 3 after an uncaught
//! exception and 1 for a malformed command line.

pub mod batch;
pub mod cli;
pub mod driver;
pub mod error;
pub mod host;
pub mod loader;
pub mod namespace;
pub mod options;
pub mod profiler;
pub mod repl;
pub mod signals;
pub mod stopwatch;

#[cfg(feature = "line-editor")]
pub mod editor;
#[cfg(feature = "line-editor")]
pub mod history;

pub use cli::{CliAction, ExecutionPlan, ExecutionUnit};
pub use driver::Outcome;
pub use host::Host;
pub use namespace::Namespace;
pub use options::EngineOptions;
