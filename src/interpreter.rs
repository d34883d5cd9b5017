use crate::command::{CommandFactory, ExitCode, Stdin, Stdout};
use crate::env::Environment;
use crate::lexer::{self, ParsedCommand};
use crate::redirect;
use anyhow::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{Read, Write};
use std::process::Stdio;

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

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// The interpreter maintains an [`Environment`] and a list of [`CommandFactory`] objects
/// that are queried in order to create commands by name; builtin factories come
/// before the external-command factory, so builtins shadow executables of the
/// same name. See [`Default`] for the factories included out of the box.
///
/// Example
/// ```
/// use picosh::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.run("echo", &["hello", "world"]).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
        }
    }

    /// Run a single command invocation by name with arguments on the
    /// process streams.
    ///
    /// Returns the command's exit code or an error if the command cannot be created
    /// or fails to execute.
    pub fn run(&mut self, name: &str, args: &[&str]) -> Result<ExitCode> {
        let stdin = InheritedStdin(std::io::stdin().lock());
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, args) {
                return cmd.execute(
                    Box::new(stdin),
                    Box::new(InheritedStdout(std::io::stdout())),
                    Box::new(InheritedStderr(std::io::stderr())),
                    &mut self.env,
                );
            }
        }
        Err(anyhow::anyhow!("command not found: {}", name))
    }

    /// Tokenize one raw input line and execute the result.
    pub fn execute_line(&mut self, line: &str) -> Result<ExitCode> {
        let parsed = lexer::tokenize(line);
        self.execute_command(&parsed)
    }

    /// Execute one parsed command: open redirection targets, pick the stream
    /// handles, and dispatch to the first factory that recognizes the name.
    ///
    /// The stream handles live exactly as long as this call; a redirection
    /// file is closed on every exit path when its box drops.
    pub fn execute_command(&mut self, parsed: &ParsedCommand) -> Result<ExitCode> {
        if parsed.is_empty() {
            // Nothing to run. A redirect on an empty line creates no file.
            return Ok(0);
        }

        let stdout: Box<dyn Stdout> = match &parsed.stdout_redirect {
            Some(spec) => match redirect::open_target(spec) {
                Ok(file) => Box::new(file),
                Err(_) => {
                    eprintln!("Error opening {}", spec.target);
                    return Ok(1);
                }
            },
            None => Box::new(InheritedStdout(std::io::stdout())),
        };

        let mut stderr: Box<dyn Stdout> = match &parsed.stderr_redirect {
            Some(spec) => match redirect::open_target(spec) {
                Ok(file) => Box::new(file),
                Err(_) => {
                    eprintln!("Error opening {}", spec.target);
                    return Ok(1);
                }
            },
            None => Box::new(InheritedStderr(std::io::stderr())),
        };

        let stdin: Box<dyn Stdin> = Box::new(InheritedStdin(std::io::stdin().lock()));
        let name = parsed.args[0].as_str();
        let args: Vec<&str> = parsed.args.iter().skip(1).map(String::as_str).collect();

        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, &args) {
                return cmd.execute(stdin, stdout, stderr, &mut self.env);
            }
        }

        writeln!(stderr, "{}: command not found", name)?;
        Ok(127)
    }

    /// The interactive session loop: prompt, read, tokenize, dispatch, and
    /// repeat until `exit 0`, end of input, or an interrupt.
    pub fn repl(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new()?;

        loop {
            match rl.readline("$ ") {
                Ok(line) => {
                    // Command failures are reported and the session continues;
                    // only the conditions below end the loop.
                    if let Err(e) = self.execute_line(&line) {
                        eprintln!("{}", e);
                    }
                    if self.env.should_exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("Bye!");
                    break;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `cat`, `cd`, `echo`, `exit`, `pwd`, `type`
    /// - the external command launcher
    fn default() -> Self {
        use crate::builtin::*;
        use crate::external::ExternalCommand;
        Self::new(vec![
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Exit>::default()),
            Box::new(Factory::<Type>::default()),
            Box::new(Factory::<Cat>::default()),
            Box::new(Factory::<ExternalCommand>::default()),
        ])
    }
}

struct InheritedStdin<'a>(std::io::StdinLock<'a>);

impl Read for InheritedStdin<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl Stdin for InheritedStdin<'_> {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

struct InheritedStdout(std::io::Stdout);

impl Write for InheritedStdout {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl Stdout for InheritedStdout {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

struct InheritedStderr(std::io::Stderr);

impl Write for InheritedStderr {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}

impl Stdout for InheritedStderr {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::inherit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!(
            "interp_test_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    fn interpreter_in(dir: &PathBuf) -> Interpreter {
        let mut sh = Interpreter::default();
        sh.env.current_dir = dir.clone();
        sh
    }

    #[test]
    fn test_truncate_redirect_overwrites_on_each_run() {
        let dir = make_unique_temp_dir("trunc");
        let f = dir.join("f.txt");
        let mut sh = interpreter_in(&dir);

        for _ in 0..2 {
            let code = sh
                .execute_line(&format!("echo a > {}", f.display()))
                .unwrap();
            assert_eq!(code, 0);
        }

        assert_eq!(fs::read_to_string(&f).unwrap(), "a\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_append_redirect_accumulates() {
        let dir = make_unique_temp_dir("append");
        let f = dir.join("f.txt");
        let mut sh = interpreter_in(&dir);

        for _ in 0..2 {
            let code = sh
                .execute_line(&format!("echo a >> {}", f.display()))
                .unwrap();
            assert_eq!(code, 0);
        }

        assert_eq!(fs::read_to_string(&f).unwrap(), "a\na\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_builtin_stdout_honors_redirect() {
        let dir = make_unique_temp_dir("pwd_redir");
        let f = dir.join("out.txt");
        let mut sh = interpreter_in(&dir);

        sh.execute_line(&format!("pwd > {}", f.display())).unwrap();

        assert_eq!(
            fs::read_to_string(&f).unwrap(),
            format!("{}\n", dir.to_string_lossy())
        );
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_command_not_found_goes_to_redirected_stderr() {
        let dir = make_unique_temp_dir("notfound");
        let e = dir.join("err.txt");
        let mut sh = interpreter_in(&dir);

        let code = sh
            .execute_line(&format!("no_such_command_xyz 2> {}", e.display()))
            .unwrap();

        assert_eq!(code, 127);
        assert_eq!(
            fs::read_to_string(&e).unwrap(),
            "no_such_command_xyz: command not found\n"
        );
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_builtin_error_goes_to_redirected_stderr() {
        let dir = make_unique_temp_dir("cat_err");
        let e = dir.join("err.txt");
        let missing = dir.join("missing.txt");
        let mut sh = interpreter_in(&dir);

        let code = sh
            .execute_line(&format!("cat {} 2> {}", missing.display(), e.display()))
            .unwrap();

        assert_eq!(code, 1);
        assert_eq!(
            fs::read_to_string(&e).unwrap(),
            format!(
                "cat: {}: No such file or directory\n",
                missing.to_string_lossy()
            )
        );
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_empty_line_is_a_no_op() {
        let dir = make_unique_temp_dir("empty");
        let mut sh = interpreter_in(&dir);

        assert_eq!(sh.execute_line("").unwrap(), 0);
        assert_eq!(sh.execute_line("   ").unwrap(), 0);
    }

    #[test]
    fn test_redirect_without_command_creates_no_file() {
        let dir = make_unique_temp_dir("redir_only");
        let f = dir.join("untouched.txt");
        let mut sh = interpreter_in(&dir);

        let code = sh.execute_line(&format!("> {}", f.display())).unwrap();

        assert_eq!(code, 0);
        assert!(!f.exists());
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_exit_zero_requests_loop_termination() {
        let dir = make_unique_temp_dir("exit");
        let mut sh = interpreter_in(&dir);

        assert_eq!(sh.execute_line("exit 0").unwrap(), 0);
        assert!(sh.env.should_exit);
    }

    #[test]
    fn test_exit_with_bad_argument_keeps_session_alive() {
        let dir = make_unique_temp_dir("exit_bad");
        let e = dir.join("err.txt");
        let mut sh = interpreter_in(&dir);

        let code = sh
            .execute_line(&format!("exit 1 2> {}", e.display()))
            .unwrap();

        assert_eq!(code, 1);
        assert!(!sh.env.should_exit);
        assert_eq!(
            fs::read_to_string(&e).unwrap(),
            "exit: missing or invalid argument\n"
        );
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_quoted_arguments_reach_the_builtin_intact() {
        let dir = make_unique_temp_dir("quoted");
        let f = dir.join("out.txt");
        let mut sh = interpreter_in(&dir);

        sh.execute_line(&format!("echo 'a b'  c > {}", f.display()))
            .unwrap();

        assert_eq!(fs::read_to_string(&f).unwrap(), "a b c\n");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    #[cfg(unix)]
    fn test_external_command_runs_with_redirected_stdout() {
        let dir = make_unique_temp_dir("external");
        let f = dir.join("out.txt");
        let mut sh = interpreter_in(&dir);

        let code = sh
            .execute_line(&format!("sh -c \"printf ext\" > {}", f.display()))
            .unwrap();

        assert_eq!(code, 0);
        assert_eq!(fs::read_to_string(&f).unwrap(), "ext");
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_run_dispatches_builtins_by_name() {
        let mut sh = Interpreter::default();
        assert_eq!(sh.run("echo", &[]).unwrap(), 0);
        assert!(sh.run("no_such_command_xyz", &[]).is_err());
    }
}
