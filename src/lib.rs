//! A small line-oriented command interpreter.
//!
//! Each input line is split on `&` into commands that run concurrently. A
//! command is a whitespace-separated list of words with an optional trailing
//! `> file` redirection. The builtins `exit`, `cd` and `path` change the
//! interpreter itself; any other program is looked up in the search path and
//! started as a child process. A line is finished only once every child it
//! started has exited.
//!
//! The main entry point is [`Interpreter`]. The public modules [`command`] and
//! [`env`] expose traits and types for plugging in your own commands and for
//! inspecting the interpreter state.

mod builtin;
pub mod cli;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod external;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod parser;

pub use config::Config;
pub use error::{ERROR_MESSAGE, ShellError, ShellResult};
pub use io_adapters::MemWriter;

/// Just a convenient re-export of the command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
