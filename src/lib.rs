//! A tiny interactive shell-like command runner.
//!
//! This crate provides the building blocks of a single-user command
//! interpreter: a tokenizer for POSIX-like quoting and output redirection, a
//! small set of built-in commands implemented in Rust, and discovery and
//! launching of external programs through the process search path. It is
//! intentionally small and easy to read.
//!
//! The main entry point is [`Interpreter`], which runs the interactive
//! session loop or executes single commands by name. The public modules
//! [`command`], [`env`] and [`lexer`] expose the traits and types for
//! implementing your own commands, interacting with the process environment,
//! and tokenizing command lines.

mod builtin;
pub mod command;
pub mod env;
mod external;
mod interpreter;
pub mod lexer;
mod redirect;

/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::Interpreter;
