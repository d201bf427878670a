use crate::command::{EXIT_FAILURE, EXIT_SUCCESS, ExitCode};
use crate::error::ShellError;
use crate::interpreter::Interpreter;
use argh::{EarlyExit, FromArgs};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
/// Line-oriented shell. Commands joined with `&` run concurrently.
pub struct Cli {
    #[argh(positional)]
    /// script to run line by line; commands are read interactively when omitted.
    pub script: Option<PathBuf>,
}

/// Start a session from the full argument vector (program name first).
///
/// More than one operand, or a script that cannot be opened, is reported as
/// the uniform error and yields a failure status.
pub fn run(args: &[String], mut sh: Interpreter) -> anyhow::Result<ExitCode> {
    let (name, rest) = match args.split_first() {
        Some((name, rest)) => (name.as_str(), rest),
        None => ("ampsh", &[][..]),
    };
    let rest: Vec<&str> = rest.iter().map(String::as_str).collect();

    let cli = match Cli::from_args(&[name], &rest) {
        Ok(cli) => cli,
        Err(EarlyExit {
            output,
            status: Ok(()),
        }) => {
            println!("{}", output);
            return Ok(EXIT_SUCCESS);
        }
        Err(EarlyExit {
            output,
            status: Err(()),
        }) => return Ok(sh.fail(ShellError::Startup(output))),
    };

    match cli.script {
        Some(path) => {
            tracing::debug!(script = %path.display(), "script mode");
            match File::open(&path) {
                Ok(file) => Ok(sh.run_script(BufReader::new(file))),
                Err(err) => Ok(sh.fail(ShellError::Input(err))),
            }
        }
        None => {
            tracing::debug!("interactive mode");
            sh.repl()
        }
    }
}
