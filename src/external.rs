use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Result, anyhow};
use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Command that is not a builtin: a freshly resolved executable plus the
/// argument vector to launch it with. Resolution happens anew on every
/// dispatch; nothing is cached across invocations.
pub struct ExternalCommand {
    name: String,
    path: OsString,
    args: Vec<OsString>,
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = env.search_path()?;
        let executable = find_command_path(OsStr::new(&search_paths), Path::new(name))?;
        Some(Box::new(ExternalCommand {
            name: name.to_string(),
            path: executable.as_os_str().to_owned(),
            args: args.iter().map(|x| x.into()).collect(),
        }))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        stdin: Box<dyn Stdin>,
        stdout: Box<dyn Stdout>,
        stderr: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let spawned = std::process::Command::new(&self.path)
            .args(&self.args)
            .stdin(stdin.stdio())
            .stdout(stdout.stdio())
            .stderr(stderr.stdio())
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir)
            .spawn();

        // Launch failures stay command-local; the session keeps running.
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                return Err(match e.kind() {
                    io::ErrorKind::NotFound => anyhow!("{}: command not found", self.name),
                    io::ErrorKind::PermissionDenied => {
                        anyhow!("{}: Permission denied", self.name)
                    }
                    _ => anyhow!("{}: {}", self.name, e),
                });
            }
        };

        let exit_status = child.wait()?;
        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it exists and is executable.
/// - Relative with multiple components (e.g., `bin/sh`): likewise.
/// - `./foo` on Unix or any `./`-prefixed path on other platforms: likewise.
/// - Single path component (no separators): search each directory named in
///   `search_paths`, in order, and return the first entry that exists and
///   carries executable permission.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned
/// `PathBuf` when the result is discovered via the search-path lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let search_in_current_dir = cfg!(not(unix)) || path.starts_with("./");
    if search_in_current_dir && is_executable(path) {
        return Some(Cow::Borrowed(path));
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, None) => {
            // Empty path -> not found
            None
        }
        (Some(x), None) => {
            // Single component -> search the search path
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => {
            // Multiple components -> resolve against the current dir
            find_by_path(path).map(Cow::Borrowed)
        }
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    for dir in std::env::split_paths(search_paths) {
        let path = dir.join(cmd);
        if let Some(path) = find_by_path(&path) {
            return Some(path.to_owned());
        }
    }
    None
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if is_executable(path) { Some(path) } else { None }
}

/// A search-path candidate matches only when it is a file the caller could
/// actually execute.
#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
