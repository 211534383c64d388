//! RepostDupe - Near-Duplicate Image Repost Detector
//!
//! Entry point for the repostdupe maintenance CLI.

use clap::Parser;
use repostdupe::{cli::Cli, error::ExitCode};

fn main() {
    let cli = Cli::parse();

    match repostdupe::run_app(cli) {
        Ok(code) => std::process::exit(code.as_i32()),
        Err(err) => {
            let exit_code = ExitCode::GeneralError;
            eprintln!("[{}] Error: {:#}", exit_code.code_prefix(), err);
            std::process::exit(exit_code.as_i32());
        }
    }
}
