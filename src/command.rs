use crate::env::Environment;
use crate::error::ShellResult;
use crate::external::Batch;
use crate::parser::Command;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

pub const EXIT_SUCCESS: ExitCode = 0;
pub const EXIT_FAILURE: ExitCode = 1;

/// Object-safe trait for any command that can be executed by the shell.
///
/// This is implemented by built-ins via a blanket impl and by external commands.
pub trait ExecutableCommand {
    /// Executes the command.
    ///
    /// Builtins act on `env` directly. External commands start a child
    /// process and hand it to `batch`; they never wait for it.
    fn execute(self: Box<Self>, env: &mut Environment, batch: &mut Batch) -> ShellResult<()>;
}

/// Factory that tries to create an executable command from a parsed [`Command`].
///
/// Returns `None` when the factory doesn't own the program name, and
/// `Some(Err(_))` when it does but the command cannot run (wrong arguments,
/// program not found).
pub trait CommandFactory {
    fn try_create(
        &self,
        env: &Environment,
        cmd: &Command,
    ) -> Option<ShellResult<Box<dyn ExecutableCommand>>>;
}
