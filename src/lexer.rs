//! Lexical analysis for a single shell command line.
//!
//! One left-to-right scan turns the raw line into a [`ParsedCommand`]:
//! fully-resolved argument strings plus the stdout/stderr redirection
//! directives found along the way. Quoting, escaping and redirection
//! operators are handled by an explicit finite-state machine so every
//! edge case is testable on its own.

/// Where a redirected stream should go and how the file is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectionSpec {
    /// Target path, quotes and escapes already applied.
    pub target: String,
    /// Open in append mode instead of truncate-create mode.
    pub append: bool,
}

/// The result of tokenizing one input line.
///
/// `args[0]` is the command name when present. Arguments never contain a
/// redirection operator or its target; at most one redirection is kept per
/// stream (the last occurrence on the line wins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub args: Vec<String>,
    pub stdout_redirect: Option<RedirectionSpec>,
    pub stderr_redirect: Option<RedirectionSpec>,
}

impl ParsedCommand {
    /// True when the line held no command word at all (blank or only redirects).
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Which output stream a redirection operator named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RedirectStream {
    Stdout,
    Stderr,
}

/// Quoting state of the scan position. The three quoting modes are mutually
/// exclusive; `Start` is "between words", `ReadingWord` is an unquoted word
/// in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingSingleQuote,
    ReadingDoubleQuote,
}

/// Where the word currently being accumulated will land once it is flushed:
/// the argument vector, or the pending redirection target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Argument,
    RedirectTarget { stream: RedirectStream, append: bool },
}

struct TokenizerFsm {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    sink: Sink,
    buffer: String,
    parsed: ParsedCommand,
}

impl TokenizerFsm {
    fn new(line: &str) -> Self {
        TokenizerFsm {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            sink: Sink::Argument,
            buffer: String::new(),
            parsed: ParsedCommand::default(),
        }
    }

    /// Run the scan to completion.
    ///
    /// This is a total function: an unterminated quote does not fail, the
    /// text accumulated so far simply completes the final word.
    fn run(mut self) -> ParsedCommand {
        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch),
                LexingState::ReadingSingleQuote => self.handle_single_quote(ch),
                LexingState::ReadingDoubleQuote => self.handle_double_quote(ch),
            }
        }

        if self.state != LexingState::Start {
            self.flush_word();
        }

        self.parsed
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            c if c.is_whitespace() => {}
            '\\' => self.escape_next(),
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '>' if self.sink == Sink::Argument => self.begin_redirect(RedirectStream::Stdout),
            // A stream-number digit counts as an operator prefix only at a
            // token boundary; glued to a word it stays argument text.
            '1' | '2' if self.sink == Sink::Argument && self.peek_char() == Some('>') => {
                self.read_char();
                let stream = if ch == '2' {
                    RedirectStream::Stderr
                } else {
                    RedirectStream::Stdout
                };
                self.begin_redirect(stream);
            }
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char) {
        match ch {
            c if c.is_whitespace() => self.flush_word(),
            '\\' => self.escape_next(),
            '\'' => self.state = LexingState::ReadingSingleQuote,
            '"' => self.state = LexingState::ReadingDoubleQuote,
            '>' if self.sink == Sink::Argument => self.begin_redirect(RedirectStream::Stdout),
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::ReadingWord,
            '\\' => match self.peek_char() {
                Some(c @ ('"' | '\\' | '$' | '\n')) => {
                    self.read_char();
                    self.buffer.push(c);
                }
                // Backslash before anything else: both characters survive.
                _ => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    /// Backslash outside quotes escapes exactly the next character; the
    /// backslash itself is dropped. A trailing backslash at end of input
    /// stays literal.
    fn escape_next(&mut self) {
        match self.read_char() {
            Some(c) => self.buffer.push(c),
            None => self.buffer.push('\\'),
        }
        self.state = LexingState::ReadingWord;
    }

    /// Arm the pending-redirect sink after a `>` (or `N>`) was consumed,
    /// taking an optional second `>` for append mode. Any in-progress
    /// argument is flushed first; the operator never joins it.
    fn begin_redirect(&mut self, stream: RedirectStream) {
        if self.state == LexingState::ReadingWord {
            self.flush_word();
        }
        let append = self.peek_char() == Some('>');
        if append {
            self.read_char();
        }
        self.sink = Sink::RedirectTarget { stream, append };
        self.state = LexingState::Start;
    }

    /// Complete the word in progress into the active sink and return to the
    /// between-words state. Callers guarantee a word actually started, so an
    /// empty buffer here is a deliberately empty argument (e.g. `""`).
    fn flush_word(&mut self) {
        let word = std::mem::take(&mut self.buffer);
        match self.sink {
            Sink::Argument => self.parsed.args.push(word),
            Sink::RedirectTarget { stream, append } => {
                // An operator that never got a target is dropped.
                if !word.is_empty() {
                    let spec = RedirectionSpec {
                        target: word,
                        append,
                    };
                    match stream {
                        RedirectStream::Stdout => self.parsed.stdout_redirect = Some(spec),
                        RedirectStream::Stderr => self.parsed.stderr_redirect = Some(spec),
                    }
                }
                self.sink = Sink::Argument;
            }
        }
        self.state = LexingState::Start;
    }
}

/// Tokenize one input line into arguments and redirection directives.
///
/// Applies POSIX-like quoting rules: single quotes are fully literal, double
/// quotes allow `\"`, `\\`, `\$` and backslash-newline escapes, a backslash
/// outside quotes escapes any single character, and `>`-family operators are
/// recognized only outside quotes.
pub fn tokenize(line: &str) -> ParsedCommand {
    TokenizerFsm::new(line).run()
}
