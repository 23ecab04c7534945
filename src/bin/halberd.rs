//! Halberd CLI binary.

use std::io::Write;
use std::process;

use clap::Parser;
use halberd::cli::{args::HalberdArgs, commands::execute_command};
use log::LevelFilter;

fn main() {
    let args = HalberdArgs::parse();

    let level = match args.verbosity() {
        0 => LevelFilter::Error,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    if let Err(e) = execute_command(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
