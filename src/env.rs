use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Mutable, user-level view of the process environment used by the interpreter.
///
/// The environment contains:
/// - `vars`: a map of environment variables that will be visible to executed commands.
/// - `current_dir`: the working directory for command execution.
/// - `should_exit`: a flag that the session loop checks to know when to terminate.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The current working directory for command execution.
    pub current_dir: PathBuf,
    /// When set to true, indicates that the interactive loop should exit.
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    ///
    /// This copies variables from `std::env::vars()` and initializes `current_dir`
    /// from `std::env::current_dir()`. The `should_exit` flag is initialized to `false`.
    pub fn new() -> Self {
        let mut vars = HashMap::new();
        for (k, v) in stdenv::vars() {
            vars.insert(k, v);
        }
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    /// Get the value of an environment variable.
    ///
    /// Looks up the key in `self.vars` first, falling back to `std::env::var`.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    /// Set or override an environment variable in `self.vars`.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// The executable search path (PATH), re-read on every lookup so that
    /// mutations between commands are observed.
    pub fn search_path(&self) -> Option<String> {
        self.get_var("PATH")
    }

    /// The user's home directory (HOME), used by `cd` and `cd ~`.
    pub fn home_dir(&self) -> Option<String> {
        self.get_var("HOME")
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::collections::HashMap;
    use std::env as stdenv;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment {
            vars: HashMap::new(),
            current_dir: stdenv::current_dir().unwrap(),
            should_exit: false,
        };

        // initially absent
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert_eq!(env.search_path(), env.get_var("PATH"));
    }

    #[test]
    fn test_home_dir_comes_from_vars_first() {
        let mut env = Environment::new();
        env.set_var("HOME", "/somewhere/else");
        assert_eq!(env.home_dir(), Some("/somewhere/else".to_string()));
    }
}
