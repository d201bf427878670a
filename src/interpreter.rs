use crate::command::{CommandFactory, EXIT_FAILURE, EXIT_SUCCESS, ExecutableCommand, ExitCode};
use crate::config::Config;
use crate::env::{Environment, SearchPath};
use crate::error::{ShellError, ShellResult, report};
use crate::external::Batch;
use crate::lexer;
use crate::parser::{self, Command};
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{BufRead, Write};

/// Factory allows creating instances of ExecutableCommand.
///
/// Only support commands defined in this crate — BuiltinCommand and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Line-oriented command interpreter.
///
/// Each input line is split on `&` into commands that run concurrently.
/// Builtins run in order inside the interpreter; every other command becomes a
/// child process. The line ends only after all of its children have exited.
///
/// Example
/// ```
/// use ampsh::{Config, Interpreter};
/// let mut sh = Interpreter::with_config(Config::default());
/// sh.run_line("path /usr/bin /bin").unwrap();
/// assert_eq!(sh.env().search_path.len(), 2);
/// ```
pub struct Interpreter {
    config: Config,
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    stderr: Box<dyn Write>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    ///
    /// Factories are asked in order; the first one that claims a program name wins.
    pub fn new(config: Config, commands: Vec<Box<dyn CommandFactory>>) -> Self {
        let env = Environment::new(SearchPath::new(config.default_search_path.clone()));
        Self {
            config,
            env,
            commands,
            stderr: Box::new(std::io::stderr()),
        }
    }

    /// Create an interpreter with the builtins `exit`, `cd`, `path` and the
    /// external command launcher.
    pub fn with_config(config: Config) -> Self {
        use crate::builtin::{Cd, Exit, Path};
        use crate::external::ExternalCommand;
        Self::new(
            config,
            vec![
                Box::new(Factory::<Exit>::default()),
                Box::new(Factory::<Cd>::default()),
                Box::new(Factory::<Path>::default()),
                Box::new(Factory::<ExternalCommand>::default()),
            ],
        )
    }

    /// Send diagnostics somewhere other than the process's standard error.
    pub fn with_stderr(mut self, sink: impl Write + 'static) -> Self {
        self.stderr = Box::new(sink);
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Whether `exit` has been run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Process one input line from start to end.
    ///
    /// Commands are dispatched left to right. Non-fatal errors are reported
    /// and the next command is tried. After `exit` the function returns at
    /// once without waiting for children. Otherwise every child started for
    /// the line is waited for before returning.
    ///
    /// Only fatal errors are returned; they have not been reported yet.
    pub fn run_line(&mut self, line: &str) -> ShellResult<()> {
        let mut batch = Batch::default();
        for fragment in lexer::split_line(line) {
            if let Err(err) = self.dispatch(fragment, &mut batch) {
                if err.is_fatal() {
                    return Err(err);
                }
                report(&err, &mut *self.stderr);
                if err.aborts_line() {
                    break;
                }
            }
            if self.env.should_exit {
                tracing::debug!(pending = batch.len(), "exit requested");
                return Ok(());
            }
        }
        tracing::debug!(children = batch.len(), "waiting for line");
        batch.wait_all()
    }

    fn dispatch(&mut self, fragment: &str, batch: &mut Batch) -> ShellResult<()> {
        let tokens = lexer::split_into_tokens(fragment, self.config.max_tokens)?;
        let cmd = parser::parse_command(tokens)?;
        if cmd.args.is_empty() {
            return Ok(());
        }
        tracing::debug!(args = ?cmd.args, output = ?cmd.output_file, "dispatching");
        let executable = self.create(&cmd)?;
        executable.execute(&mut self.env, batch)
    }

    fn create(&self, cmd: &Command) -> ShellResult<Box<dyn ExecutableCommand>> {
        for factory in &self.commands {
            if let Some(res) = factory.try_create(&self.env, cmd) {
                return res;
            }
        }
        Err(ShellError::NotFound(cmd.program().unwrap_or_default().to_string()))
    }

    /// Run every line of `input` without prompting, as for a script file.
    ///
    /// Lines are read as raw bytes; invalid UTF-8 is replaced rather than
    /// ending the session.
    pub fn run_script<R: BufRead>(&mut self, mut input: R) -> ExitCode {
        let mut lines_read = 0usize;
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match input.read_until(b'\n', &mut buf) {
                Ok(0) => return self.finish(lines_read),
                Ok(_) => {
                    lines_read += 1;
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if let Some(code) = self.feed(&line) {
                        return code;
                    }
                }
                Err(err) => return self.fail(ShellError::Input(err)),
            }
        }
    }

    /// Read lines interactively with a prompt until `exit` or end of input.
    pub fn repl(&mut self) -> anyhow::Result<ExitCode> {
        let mut rl = DefaultEditor::new().context("failed to create line editor")?;
        let mut lines_read = 0usize;

        loop {
            match rl.readline(&self.config.prompt) {
                Ok(line) => {
                    lines_read += 1;
                    if !line.trim().is_empty() {
                        rl.add_history_entry(line.as_str())
                            .context("failed to record history")?;
                    }
                    if let Some(code) = self.feed(&line) {
                        return Ok(code);
                    }
                }
                Err(ReadlineError::Eof) => return Ok(self.finish(lines_read)),
                Err(ReadlineError::Interrupted) => {
                    tracing::debug!("interrupted");
                    return Ok(EXIT_FAILURE);
                }
                Err(ReadlineError::Io(err)) => return Ok(self.fail(ShellError::Input(err))),
                Err(err) => return Err(anyhow::Error::new(err).context("failed to read line")),
            }
        }
    }

    /// Run one line; `Some(code)` means the session is over.
    fn feed(&mut self, line: &str) -> Option<ExitCode> {
        match self.run_line(line) {
            Ok(()) if self.env.should_exit => Some(EXIT_SUCCESS),
            Ok(()) => None,
            Err(err) => Some(self.fail(err)),
        }
    }

    /// Report `err` and give the failure status to exit with.
    pub(crate) fn fail(&mut self, err: ShellError) -> ExitCode {
        report(&err, &mut *self.stderr);
        EXIT_FAILURE
    }

    /// End of input: success only if at least one line was read.
    fn finish(&mut self, lines_read: usize) -> ExitCode {
        if lines_read == 0 {
            report(
                &ShellError::Input(std::io::ErrorKind::UnexpectedEof.into()),
                &mut *self.stderr,
            );
            EXIT_FAILURE
        } else {
            EXIT_SUCCESS
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ERROR_MESSAGE;
    use crate::io_adapters::MemWriter;
    use crate::test_support::{lock_process_state, make_unique_temp_dir, write_script};
    use std::cell::RefCell;
    use std::env as stdenv;
    use std::fs;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use std::rc::Rc;

    fn interpreter(config: Config) -> (Interpreter, Rc<RefCell<Vec<u8>>>) {
        let (sink, handle) = MemWriter::with_handle();
        (Interpreter::with_config(config).with_stderr(sink), handle)
    }

    fn errors(handle: &Rc<RefCell<Vec<u8>>>) -> usize {
        let text = String::from_utf8(handle.borrow().clone()).unwrap();
        assert_eq!(text, ERROR_MESSAGE.repeat(text.len() / ERROR_MESSAGE.len()));
        text.len() / ERROR_MESSAGE.len()
    }

    fn config_with_path(dir: &Path) -> Config {
        Config {
            default_search_path: vec![dir.to_string_lossy().to_string()],
            ..Config::default()
        }
    }

    /// A program that writes its name and arguments to stdout.
    fn tool_dir(tag: &str) -> PathBuf {
        let dir = make_unique_temp_dir(tag).unwrap();
        write_script(&dir, "tool", "echo \"tool $*\"").unwrap();
        dir
    }

    #[test]
    fn test_single_external_with_redirect() {
        let _lock = lock_process_state();
        let dir = tool_dir("single");
        let out = dir.join("out.txt");
        let (mut sh, stderr) = interpreter(config_with_path(&dir));

        sh.run_line(&format!("tool a b > {}\n", out.display())).unwrap();

        assert_eq!(fs::read_to_string(&out).unwrap(), "tool a b\n");
        assert_eq!(errors(&stderr), 0);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_malformed_redirections_are_reported_and_not_run() {
        let _lock = lock_process_state();
        let dir = tool_dir("bad_syntax");
        let out = dir.join("out.txt");
        let (mut sh, stderr) = interpreter(config_with_path(&dir));
        let out = out.display();

        for line in [
            format!("> {out}"),
            format!("tool > {out} > {out}"),
            "tool >".to_string(),
            format!("tool > {out} extra"),
        ] {
            sh.run_line(&line).unwrap();
        }

        assert_eq!(errors(&stderr), 4);
        assert!(!dir.join("out.txt").exists());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_path_is_visible_later_on_the_same_line() {
        let _lock = lock_process_state();
        let dir = tool_dir("path_same_line");
        let out = dir.join("out.txt");
        let (mut sh, stderr) = interpreter(Config {
            default_search_path: vec!["/nonexistent_ampsh_dir".to_string()],
            ..Config::default()
        });

        sh.run_line(&format!("tool > {}", out.display())).unwrap();
        assert_eq!(errors(&stderr), 1);
        assert!(!out.exists());

        sh.run_line(&format!("path /a {} & tool x > {}", dir.display(), out.display()))
            .unwrap();
        assert_eq!(errors(&stderr), 1);
        assert_eq!(fs::read_to_string(&out).unwrap(), "tool x\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_empty_path_breaks_relative_but_not_absolute_names() {
        let _lock = lock_process_state();
        let dir = tool_dir("empty_path");
        let out = dir.join("out.txt");
        let (mut sh, stderr) = interpreter(config_with_path(&dir));

        sh.run_line("path").unwrap();
        assert!(sh.env().search_path.is_empty());

        sh.run_line(&format!("tool > {}", out.display())).unwrap();
        assert_eq!(errors(&stderr), 1);
        assert!(!out.exists());

        let tool = dir.join("tool");
        sh.run_line(&format!("{} abs > {}", tool.display(), out.display()))
            .unwrap();
        assert_eq!(errors(&stderr), 1);
        assert_eq!(fs::read_to_string(&out).unwrap(), "tool abs\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_line_waits_for_every_child() {
        let _lock = lock_process_state();
        let dir = make_unique_temp_dir("barrier").unwrap();
        for (name, delay) in [("one", "0.4"), ("two", "0.1"), ("three", "0.2")] {
            write_script(&dir, name, &format!("sleep {delay}\necho {name}")).unwrap();
        }
        let (mut sh, stderr) = interpreter(config_with_path(&dir));
        let d = dir.display();

        sh.run_line(&format!(
            "one > {d}/1.txt & two > {d}/2.txt & three > {d}/3.txt"
        ))
        .unwrap();

        assert_eq!(fs::read_to_string(dir.join("1.txt")).unwrap(), "one\n");
        assert_eq!(fs::read_to_string(dir.join("2.txt")).unwrap(), "two\n");
        assert_eq!(fs::read_to_string(dir.join("3.txt")).unwrap(), "three\n");
        assert_eq!(errors(&stderr), 0);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_failed_fragment_does_not_stop_the_line() {
        let _lock = lock_process_state();
        let dir = tool_dir("keep_going");
        let out = dir.join("out.txt");
        let (mut sh, stderr) = interpreter(config_with_path(&dir));

        sh.run_line(&format!(
            "missing & > nowhere & cd & tool ok > {}",
            out.display()
        ))
        .unwrap();

        assert_eq!(errors(&stderr), 3);
        assert_eq!(fs::read_to_string(&out).unwrap(), "tool ok\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_blank_fragments_are_ignored() {
        let (mut sh, stderr) = interpreter(Config::default());
        sh.run_line("  &  \t & \n").unwrap();
        sh.run_line("\n").unwrap();
        assert_eq!(errors(&stderr), 0);
    }

    #[test]
    fn test_token_overflow_aborts_rest_of_line() {
        let _lock = lock_process_state();
        let dir = tool_dir("overflow");
        let out = dir.join("out.txt");
        let (mut sh, stderr) = interpreter(Config {
            max_tokens: 3,
            ..config_with_path(&dir)
        });

        sh.run_line(&format!("tool a b c & tool > {}", out.display()))
            .unwrap();
        assert_eq!(errors(&stderr), 1);
        assert!(!out.exists());

        sh.run_line(&format!("tool > {}", out.display())).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), "tool \n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_exit_with_argument_is_an_error() {
        let (mut sh, stderr) = interpreter(Config::default());
        sh.run_line("exit 1").unwrap();
        assert!(!sh.should_exit());
        assert_eq!(errors(&stderr), 1);
    }

    #[test]
    fn test_exit_stops_the_line() {
        let _lock = lock_process_state();
        let dir = tool_dir("exit_stops");
        let out = dir.join("out.txt");
        let (mut sh, stderr) = interpreter(config_with_path(&dir));

        sh.run_line(&format!("exit & tool > {}", out.display()))
            .unwrap();

        assert!(sh.should_exit());
        assert!(!out.exists());
        assert_eq!(errors(&stderr), 0);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_cd_affects_relative_resolution() {
        let _lock = lock_process_state();
        let base = make_unique_temp_dir("cd_resolve").unwrap();
        let bin = base.join("bin");
        fs::create_dir(&bin).unwrap();
        write_script(&bin, "tool", "echo moved").unwrap();
        let out = base.join("out.txt");
        let orig = stdenv::current_dir().unwrap();

        let (mut sh, stderr) = interpreter(Config {
            default_search_path: vec!["bin".to_string()],
            ..Config::default()
        });
        sh.run_line(&format!("tool > {}", out.display())).unwrap();
        let before = errors(&stderr);

        sh.run_line(&format!("cd {} & tool > {}", base.display(), out.display()))
            .unwrap();
        let after = errors(&stderr);

        sh.run_line("cd").unwrap();
        sh.run_line("cd a b").unwrap();
        sh.run_line("cd /nonexistent_ampsh_dir").unwrap();
        let cwd_after_bad_cd = stdenv::current_dir().unwrap();
        let usage_errors = errors(&stderr) - after;

        stdenv::set_current_dir(&orig).unwrap();

        assert_eq!(before, 1);
        assert_eq!(after, 1);
        assert_eq!(fs::read_to_string(&out).unwrap(), "moved\n");
        assert_eq!(usage_errors, 3);
        assert_eq!(
            fs::canonicalize(cwd_after_bad_cd).unwrap(),
            fs::canonicalize(&base).unwrap()
        );
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    fn test_script_with_no_lines_fails() {
        let (mut sh, stderr) = interpreter(Config::default());
        let code = sh.run_script(Cursor::new(Vec::new()));
        assert_eq!(code, EXIT_FAILURE);
        assert_eq!(errors(&stderr), 1);
    }

    #[test]
    fn test_script_with_lines_succeeds() {
        let (mut sh, stderr) = interpreter(Config::default());
        let code = sh.run_script(Cursor::new(b"\npath /usr/bin\n".to_vec()));
        assert_eq!(code, EXIT_SUCCESS);
        assert_eq!(errors(&stderr), 0);
        assert_eq!(sh.env().search_path.iter().collect::<Vec<_>>(), vec!["/usr/bin"]);
    }

    #[test]
    fn test_script_errors_do_not_change_exit_status() {
        let (mut sh, stderr) = interpreter(Config::default());
        let code = sh.run_script(Cursor::new(b"exit now\n> x\n".to_vec()));
        assert_eq!(code, EXIT_SUCCESS);
        assert_eq!(errors(&stderr), 2);
    }

    #[test]
    fn test_script_survives_invalid_utf8() {
        let (mut sh, stderr) = interpreter(Config::default());
        let code = sh.run_script(Cursor::new(b"path /x\xff\npath /after\n".to_vec()));
        assert_eq!(code, EXIT_SUCCESS);
        assert_eq!(errors(&stderr), 0);
        assert_eq!(sh.env().search_path.iter().collect::<Vec<_>>(), vec!["/after"]);
    }

    #[test]
    fn test_empty_path_entry_runs_program_from_working_directory() {
        let _lock = lock_process_state();
        let dir = make_unique_temp_dir("cwd_entry").unwrap();
        write_script(&dir, "ls", "echo mine").unwrap();
        let out = dir.join("out.txt");
        let orig = stdenv::current_dir().unwrap();
        stdenv::set_current_dir(&dir).unwrap();

        let (mut sh, stderr) = interpreter(Config {
            default_search_path: vec![String::new()],
            ..Config::default()
        });
        let res = sh.run_line(&format!("ls > {}", out.display()));
        stdenv::set_current_dir(&orig).unwrap();

        assert!(res.is_ok());
        assert_eq!(errors(&stderr), 0);
        assert_eq!(fs::read_to_string(&out).unwrap(), "mine\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_script_stops_at_exit() {
        let _lock = lock_process_state();
        let dir = tool_dir("script_exit");
        let out = dir.join("out.txt");
        let (mut sh, stderr) = interpreter(config_with_path(&dir));

        let script = format!("path\nexit\ntool > {}\n", out.display());
        let code = sh.run_script(Cursor::new(script.into_bytes()));

        assert_eq!(code, EXIT_SUCCESS);
        assert!(sh.env().search_path.is_empty());
        assert!(!out.exists());
        assert_eq!(errors(&stderr), 0);
        let _ = fs::remove_dir_all(dir);
    }
}
