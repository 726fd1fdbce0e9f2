//! Console output.
//!
//! All writes to stdout and stderr go through here; everything else logs
//! through `tracing`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use serde::Serialize;
use std::io::{self, Write};

/// Print a line of command output to stdout.
pub fn line(text: impl std::fmt::Display) {
    println!("{text}");
}

/// Print a value as pretty JSON to stdout.
pub fn json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Error serializing JSON response: {e}"),
    }
}

/// Print a diagnostic report to stderr.
pub fn report(report: &miette::Report) {
    eprintln!("{report:?}");
    // Ensure output is flushed before the process exits
    let _ = io::stderr().flush();
}

/// Print a question to stderr without a trailing newline.
pub fn ask(question: &str) {
    eprint!("{question} [y/N] ");
    let _ = io::stderr().flush();
}

/// Print a status message to stderr.
pub fn status(text: impl std::fmt::Display) {
    eprintln!("{text}");
}
