//! # shot-ledger CLI
//!
//! Command-line interface for Shot Ledger.
//!
//! ## Usage
//! ```bash
//! shot-ledger open ~/Events/Offsite
//! shot-ledger capture Eng "John Doe" --image ~/tether/latest.jpg
//! shot-ledger export ~/offsite.xlsx --verbose
//! ```

mod cli;

use console::style;
use std::process::ExitCode;

fn main() -> ExitCode {
    shot_ledger::init_tracing();

    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
