use crate::error::{ShellError, ShellResult};

/// Token that introduces an output redirection.
pub const REDIRECT_MARKER: &str = ">";

/// One parsed invocation: the argument vector and an optional output file.
///
/// `args[0]` is the program name. A `Command` only exists for well-formed
/// input; malformed redirections are reported by [`parse_command`] as errors
/// and never reach execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub args: Vec<String>,
    pub output_file: Option<String>,
}

impl Command {
    /// Program name, if the command has any tokens at all.
    pub fn program(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Arguments after the program name.
    pub fn operands(&self) -> &[String] {
        self.args.get(1..).unwrap_or(&[])
    }
}

/// Turn a token sequence into a [`Command`].
///
/// At most one `>` is allowed. It must not be the first token and must be
/// followed by exactly one more token, the output file, which ends the
/// command.
pub fn parse_command(tokens: Vec<String>) -> ShellResult<Command> {
    let mut args = Vec::with_capacity(tokens.len());
    let mut output_file = None;
    let mut tokens = tokens.into_iter().enumerate();

    while let Some((i, token)) = tokens.next() {
        if token != REDIRECT_MARKER {
            args.push(token);
            continue;
        }
        if i == 0 {
            return Err(ShellError::RedirectWithoutCommand);
        }
        if output_file.is_some() {
            return Err(ShellError::DuplicateRedirect);
        }
        match (tokens.next(), tokens.next()) {
            (None, _) => return Err(ShellError::MissingRedirectTarget),
            (Some((_, target)), _) if target == REDIRECT_MARKER => {
                return Err(ShellError::DuplicateRedirect);
            }
            (Some((_, target)), None) => output_file = Some(target),
            (Some(_), Some((_, extra))) if extra == REDIRECT_MARKER => {
                return Err(ShellError::DuplicateRedirect);
            }
            (Some(_), Some((_, extra))) => {
                return Err(ShellError::TrailingAfterRedirect(extra));
            }
        }
    }

    Ok(Command { args, output_file })
}
