use crate::error::ShellResult;
use std::env as stdenv;
use std::path::PathBuf;

/// Ordered list of directories searched for external programs.
///
/// The list is only ever replaced as a whole; see [`SearchPath::replace`].
/// Duplicates and empty or relative entries are kept as given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<String>,
}

impl SearchPath {
    pub fn new(dirs: Vec<String>) -> Self {
        Self { dirs }
    }

    /// Replace the whole search path with `dirs`, keeping their order.
    ///
    /// An empty slice clears the path, after which only absolute program
    /// names can run. Fails only if the new list cannot be allocated.
    pub fn replace(&mut self, dirs: &[String]) -> ShellResult<()> {
        let mut next: Vec<String> = Vec::new();
        next.try_reserve_exact(dirs.len())?;
        next.extend(dirs.iter().cloned());
        self.dirs = next;
        Ok(())
    }

    /// Directories in search order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.dirs.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.dirs.len()
    }
}

/// Mutable interpreter state that builtins act on.
///
/// The environment contains:
/// - `search_path`: directories used to resolve external programs.
/// - `current_dir`: the working directory, kept in step with the process.
/// - `should_exit`: set by `exit`; the line coordinator stops as soon as it sees it.
#[derive(Debug, Clone)]
pub struct Environment {
    pub search_path: SearchPath,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the process working directory and start from `search_path`.
    pub fn new(search_path: SearchPath) -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            search_path,
            current_dir,
            should_exit: false,
        }
    }
}
