//! CLI binary for taskpad.
//!
//! This binary is a thin wrapper that parses arguments and delegates to the
//! library.

use std::process::ExitCode;

use clap::Parser;
use taskpad::cli::{run, Cli};

fn main() -> ExitCode {
    let output = run(Cli::parse());

    for line in output.stdout {
        println!("{line}");
    }
    for line in output.stderr {
        eprintln!("{line}");
    }

    output.exit_code
}
