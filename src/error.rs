use std::collections::TryReserveError;
use std::io::{self, Write};
use thiserror::Error;

/// The only diagnostic a user ever sees, whatever went wrong.
pub const ERROR_MESSAGE: &str = "An error has occurred\n";

/// Everything that can go wrong while processing a line.
///
/// The variants keep the precise cause for logging and tests. None of this
/// detail reaches the user: [`report`] collapses every variant into
/// [`ERROR_MESSAGE`].
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("command has more than {limit} tokens")]
    TooManyTokens { limit: usize },

    #[error("redirection without a command")]
    RedirectWithoutCommand,

    #[error("more than one output redirection")]
    DuplicateRedirect,

    #[error("missing redirection target")]
    MissingRedirectTarget,

    #[error("unexpected token after redirection target: {0}")]
    TrailingAfterRedirect(String),

    #[error("{name}: expected {expected} argument(s), got {got}")]
    BuiltinUsage {
        name: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("cd: {path}: {source}")]
    ChangeDir { path: String, source: io::Error },

    #[error("{0}: command not found")]
    NotFound(String),

    #[error("cannot open {path} for output: {source}")]
    RedirectOpen { path: String, source: io::Error },

    #[error("cannot execute {path}: {source}")]
    Exec { path: String, source: io::Error },

    #[error("cannot create a process for {path}: {source}")]
    Fork { path: String, source: io::Error },

    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("waiting for child failed: {0}")]
    Wait(io::Error),

    #[error("invalid startup arguments: {0}")]
    Startup(String),

    #[error("cannot read input: {0}")]
    Input(io::Error),
}

pub type ShellResult<T> = Result<T, ShellError>;

impl ShellError {
    /// Errors after which the interpreter cannot safely continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ShellError::Fork { .. } | ShellError::Allocation(_) | ShellError::Wait(_)
        )
    }

    /// Errors that skip the remaining fragments of the current line.
    pub fn aborts_line(&self) -> bool {
        matches!(self, ShellError::TooManyTokens { .. })
    }
}

/// Writes the uniform diagnostic for `err` and logs the real cause.
pub fn report(err: &ShellError, sink: &mut dyn Write) {
    tracing::debug!(error = %err, fatal = err.is_fatal(), "reporting error");
    // Nothing sensible remains to be done if stderr itself is gone.
    let _ = sink.write_all(ERROR_MESSAGE.as_bytes());
    let _ = sink.flush();
}
