/// Default upper bound on the number of tokens in one command.
pub const MAX_TOKENS_PER_COMMAND: usize = 100;

/// Tunables of an [`Interpreter`](crate::Interpreter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Prompt printed before each interactive line.
    pub prompt: String,
    /// Search path installed when the interpreter starts.
    pub default_search_path: Vec<String>,
    /// Commands with more tokens than this are rejected.
    pub max_tokens: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: "ampsh> ".to_string(),
            default_search_path: vec!["/bin".to_string()],
            max_tokens: MAX_TOKENS_PER_COMMAND,
        }
    }
}
