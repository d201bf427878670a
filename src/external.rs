use crate::command::{CommandFactory, ExecutableCommand};
use crate::env::{Environment, SearchPath};
use crate::error::{ShellError, ShellResult};
use crate::interpreter::Factory;
use crate::parser::Command;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};

/// Permission bits for files created by output redirection (owner rwx).
const REDIRECT_MODE: u32 = 0o700;

/// Command that is not a builtin, already resolved to an executable.
#[derive(Debug)]
pub struct ExternalCommand {
    executable: PathBuf,
    args: Vec<String>,
    output_file: Option<String>,
}

impl ExternalCommand {
    pub fn new(executable: PathBuf, args: Vec<String>, output_file: Option<String>) -> Self {
        Self {
            executable,
            args,
            output_file,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        cmd: &Command,
    ) -> Option<ShellResult<Box<dyn ExecutableCommand>>> {
        let name = cmd.program()?;
        Some(match find_command_path(&env.search_path, name) {
            Some(executable) => Ok(Box::new(ExternalCommand::new(
                executable,
                cmd.args.clone(),
                cmd.output_file.clone(),
            ))),
            None => Err(ShellError::NotFound(name.to_string())),
        })
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, _env: &mut Environment, batch: &mut Batch) -> ShellResult<()> {
        let child = self.spawn()?;
        batch.push(child);
        Ok(())
    }
}

impl ExternalCommand {
    /// Start the program without waiting for it.
    ///
    /// With an output file, both stdout and stderr of the child go to it.
    fn spawn(&self) -> ShellResult<Child> {
        let mut process = std::process::Command::new(&self.executable);
        if let Some((arg0, rest)) = self.args.split_first() {
            process.arg0(arg0).args(rest);
        }

        if let Some(path) = &self.output_file {
            let file = open_output(path)?;
            let err_file = file.try_clone().map_err(|source| ShellError::RedirectOpen {
                path: path.clone(),
                source,
            })?;
            process.stdout(Stdio::from(file)).stderr(Stdio::from(err_file));
        }

        let path = self.executable.display().to_string();
        let child = process.spawn().map_err(|source| {
            // EAGAIN / ENOMEM mean no process could be created at all.
            if matches!(source.kind(), ErrorKind::WouldBlock | ErrorKind::OutOfMemory) {
                ShellError::Fork { path, source }
            } else {
                ShellError::Exec { path, source }
            }
        })?;
        tracing::debug!(pid = child.id(), executable = %self.executable.display(), "spawned");
        Ok(child)
    }
}

fn open_output(path: &str) -> ShellResult<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .mode(REDIRECT_MODE)
        .open(path)
        .map_err(|source| ShellError::RedirectOpen {
            path: path.to_string(),
            source,
        })
}

/// Resolve a program name the way this shell does.
///
/// Behavior:
/// - Absolute name (starts with `/`): returned verbatim, without checking it exists.
/// - Anything else: each directory of `search_path` is tried in order and the
///   first `dir/name` that is a regular, executable file wins.
/// - Empty name, or no match: `None`.
pub fn find_command_path(search_path: &SearchPath, name: &str) -> Option<PathBuf> {
    if name.is_empty() {
        return None;
    }
    if name.starts_with('/') {
        return Some(PathBuf::from(name));
    }
    for dir in search_path.iter() {
        // An empty entry means the working directory. The candidate must keep a
        // separator, otherwise spawning would search the process PATH instead.
        let dir = if dir.is_empty() { "." } else { dir };
        let candidate = Path::new(dir).join(name);
        if is_executable_file(&candidate) {
            tracing::trace!(dir, name, "resolved");
            return Some(candidate);
        }
        tracing::trace!(dir, name, "not here");
    }
    None
}

fn is_executable_file(path: &Path) -> bool {
    match path.metadata() {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

/// Children started for one input line.
///
/// Every external command on a line adds exactly one child. The line is not
/// finished until [`Batch::wait_all`] has reaped all of them. Dropping a batch
/// neither waits for nor kills its children.
#[derive(Debug, Default)]
pub struct Batch {
    children: Vec<Child>,
}

impl Batch {
    pub fn push(&mut self, child: Child) {
        self.children.push(child);
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Wait for every child, in start order, regardless of how each one ended.
    pub fn wait_all(self) -> ShellResult<()> {
        for mut child in self.children {
            let pid = child.id();
            let status = child.wait().map_err(ShellError::Wait)?;
            tracing::debug!(pid, %status, "child finished");
        }
        Ok(())
    }
}
