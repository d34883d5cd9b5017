use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::external::find_command_path;
use crate::interpreter::Factory;
use anyhow::{Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

/// Names dispatched in-process, in the order `type` reports them.
/// Builtin lookup always precedes the search-path lookup.
pub(crate) const BUILTIN_NAMES: &[&str] = &["cat", "cd", "echo", "exit", "pwd", "type"];

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and executed directly
/// in-process without spawning a child process.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "echo" or "cd".
    fn name() -> &'static str;

    /// Executes the command using the provided IO streams and environment.
    ///
    /// Return value follows shell conventions: 0 for success, non-zero for
    /// error. An `Err` carries a user-facing message that the dispatch layer
    /// writes to the error stream as exit code 1.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        mut stdin: Box<dyn Stdin>,
        mut stdout: Box<dyn Stdout>,
        mut stderr: Box<dyn Stdout>,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match T::execute(*self, &mut stdin, &mut stdout, &mut stderr, env) {
            Ok(code) => Ok(code),
            Err(e) => {
                writeln!(stderr, "{}", e)?;
                Ok(1)
            }
        }
    }
}

/// Fallback command produced when argh rejects the argument list; replays
/// argh's own output (help text or error) on the matching stream.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(
        self: Box<Self>,
        _stdin: Box<dyn Stdin>,
        mut stdout: Box<dyn Stdout>,
        mut stderr: Box<dyn Stdout>,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.is_error {
            stderr.write_all(self.output.as_bytes())?;
            Ok(1)
        } else {
            stdout.write_all(self.output.as_bytes())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name == T::name() {
            Some(match T::from_args(&[name], args) {
                Ok(cmd) => Box::new(cmd),
                Err(EarlyExit { output, status }) => Box::new(InvalidArgs {
                    output,
                    is_error: status.is_err(),
                }),
            })
        } else {
            None
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.to_string_lossy())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// A target of `~`, or no target at all, selects the HOME directory.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let typed = self.target.as_deref().unwrap_or("~");
        let target = if typed == "~" {
            PathBuf::from(env.home_dir().ok_or_else(|| anyhow!("cd: HOME not set"))?)
        } else {
            PathBuf::from(typed)
        };

        let new_dir = if target.is_absolute() {
            target
        } else {
            env.current_dir.join(target)
        };

        // The working directory is only updated once the change has fully
        // succeeded; on any failure it stays where it was.
        let canonical = change_dir(&new_dir).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => anyhow!("cd: {}: No such file or directory", typed),
            _ => anyhow!("cd: {}: {}", typed, e),
        })?;
        env.current_dir = canonical;
        Ok(0)
    }
}

fn change_dir(path: &Path) -> io::Result<PathBuf> {
    let canonical = fs::canonicalize(path)?;
    env::set_current_dir(&canonical)?;
    Ok(canonical)
}

#[derive(FromArgs)]
/// Terminate the session. Only a status of 0 is accepted.
pub struct Exit {
    #[argh(positional, greedy)]
    /// numeric exit status; must be 0.
    pub status: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.status.len() == 1 && self.status[0] == "0" {
            env.should_exit = true;
            Ok(0)
        } else {
            Err(anyhow!("exit: missing or invalid argument"))
        }
    }
}

#[derive(FromArgs)]
/// write the arguments to standard output, separated by spaces.
/// by default, a trailing newline is printed.
pub struct Echo {
    #[argh(switch, short = 'n')]
    /// do not output the trailing newline.
    pub no_newline: bool,

    #[argh(positional, greedy)]
    /// values to print as-is, separated by spaces.
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        let s = self.args.join(" ");
        if self.no_newline {
            write!(stdout, "{}", s)?;
        } else {
            writeln!(stdout, "{}", s)?;
        }
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Report how a command name would be dispatched: as a shell builtin or as
/// an executable found on the search path.
pub struct Type {
    #[argh(positional)]
    /// command name to look up.
    pub name: Option<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _stderr: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let name = self.name.ok_or_else(|| anyhow!("type: missing argument"))?;

        if BUILTIN_NAMES.contains(&name.as_str()) {
            writeln!(stdout, "{} is a shell builtin", name)?;
            return Ok(0);
        }

        let search_paths = env.search_path().unwrap_or_default();
        match find_command_path(OsStr::new(&search_paths), Path::new(&name)) {
            Some(path) => {
                writeln!(stdout, "{} is {}", name, path.display())?;
                Ok(0)
            }
            None => Err(anyhow!("{}: not found", name)),
        }
    }
}

#[derive(FromArgs)]
/// Concatenate files and write their raw contents to standard output,
/// with no inserted separators.
pub struct Cat {
    #[argh(positional, greedy)]
    /// paths of the files to print, in order.
    pub files: Vec<String>,
}

impl BuiltinCommand for Cat {
    fn name() -> &'static str {
        "cat"
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        if self.files.is_empty() {
            return Err(anyhow!("cat: missing operand"));
        }

        // A missing file is reported per-path; the remaining files still print.
        let mut status = 0;
        for path in &self.files {
            match File::open(path) {
                Ok(mut f) => {
                    io::copy(&mut f, stdout)?;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    writeln!(stderr, "cat: {}: No such file or directory", path)?;
                    status = 1;
                }
                Err(e) => {
                    writeln!(stderr, "cat: {}: {}", path, e)?;
                    status = 1;
                }
            }
        }
        Ok(status)
    }
}
