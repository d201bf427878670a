use crate::command::{CommandFactory, ExecutableCommand};
use crate::env::Environment;
use crate::error::{ShellError, ShellResult};
use crate::external::Batch;
use crate::interpreter::Factory;
use crate::parser::Command;
use std::env;
use std::path::PathBuf;

/// Built-in commands known to the shell at compile time.
///
/// Builtins run synchronously inside the interpreter process, never in a
/// child, because their whole point is to change the interpreter itself.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "cd" or "path".
    fn name() -> &'static str;

    /// Validates the operands (everything after the name).
    fn from_args(args: &[String]) -> ShellResult<Self>;

    /// Executes the command against the interpreter environment.
    fn execute(self, env: &mut Environment) -> ShellResult<()>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, env: &mut Environment, _batch: &mut Batch) -> ShellResult<()> {
        tracing::debug!(builtin = T::name(), "running builtin");
        T::execute(*self, env)
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        cmd: &Command,
    ) -> Option<ShellResult<Box<dyn ExecutableCommand>>> {
        if cmd.program() == Some(T::name()) {
            Some(T::from_args(cmd.operands()).map(|b| Box::new(b) as Box<dyn ExecutableCommand>))
        } else {
            None
        }
    }
}

fn expect_operands(name: &'static str, args: &[String], expected: usize) -> ShellResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ShellError::BuiltinUsage {
            name,
            expected,
            got: args.len(),
        })
    }
}

/// Leave the shell. Takes no operands.
///
/// Termination is requested through [`Environment::should_exit`]; children
/// still running are not waited for.
#[derive(Debug)]
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_args(args: &[String]) -> ShellResult<Self> {
        expect_operands(Self::name(), args, 0)?;
        Ok(Exit)
    }

    fn execute(self, env: &mut Environment) -> ShellResult<()> {
        env.should_exit = true;
        Ok(())
    }
}

/// Change the working directory of the interpreter. Takes exactly one operand.
#[derive(Debug)]
pub struct Cd {
    pub target: PathBuf,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn from_args(args: &[String]) -> ShellResult<Self> {
        expect_operands(Self::name(), args, 1)?;
        Ok(Cd {
            target: PathBuf::from(&args[0]),
        })
    }

    fn execute(self, env: &mut Environment) -> ShellResult<()> {
        env::set_current_dir(&self.target).map_err(|source| ShellError::ChangeDir {
            path: self.target.display().to_string(),
            source,
        })?;
        env.current_dir = env::current_dir().unwrap_or_else(|_| env.current_dir.join(&self.target));
        tracing::debug!(cwd = %env.current_dir.display(), "changed directory");
        Ok(())
    }
}

/// Replace the search path with the operands, in order. Zero operands clear it.
#[derive(Debug)]
pub struct Path {
    pub dirs: Vec<String>,
}

impl BuiltinCommand for Path {
    fn name() -> &'static str {
        "path"
    }

    fn from_args(args: &[String]) -> ShellResult<Self> {
        Ok(Path {
            dirs: args.to_vec(),
        })
    }

    fn execute(self, env: &mut Environment) -> ShellResult<()> {
        env.search_path.replace(&self.dirs)?;
        tracing::debug!(dirs = ?self.dirs, "search path replaced");
        Ok(())
    }
}
