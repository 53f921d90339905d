// Copyright 2025 Cornell University
// released under MIT License

use std::path::PathBuf;

use anyhow::Context;
use clap::ColorChoice;
use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use log::info;
use tbgen::backends::generate;
use tbgen::diagnostic::DiagnosticHandler;
use tbgen::output::{default_output_path, write_atomic};
use tbgen::setup::{load_harness, InputFormat};

/// Generates a self-checking VHDL test bench from a list of test cases
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Test case description (.json or .tbv)
    #[arg(value_name = "TEST_CASES")]
    test_cases: PathBuf,

    /// Where to write the test bench (default: `<entity>_tb.vhd`)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Input encoding; `auto` picks one from the file extension
    #[arg(long, value_enum, default_value_t = InputFormat::Auto)]
    format: InputFormat,

    /// Load and generate, but do not write anything
    #[arg(long)]
    check: bool,

    /// Pass in `--color never` to suppress colored error messages.
    #[arg(long, value_name = "COLOR_CHOICE", default_value = "auto")]
    color: ColorChoice,

    /// Users can specify `-v` or `--verbose` to toggle logging
    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}

/// Example:
/// `cargo run -- tests/inputs/counter.tbv counter_tb.vhd -v`
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // For concision, we disable timestamps in the log
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    let handler = &mut DiagnosticHandler::new(cli.color);
    let spec = load_harness(&cli.test_cases, cli.format, handler)
        .with_context(|| format!("failed to load `{}`", cli.test_cases.display()))?;
    let vhdl = generate(&spec)?;

    if cli.check {
        info!("`{}` is valid, nothing written", cli.test_cases.display());
        return Ok(());
    }

    let output = cli.output.unwrap_or_else(|| default_output_path(&spec));
    println!("Writing test bench VHDL to {}", output.display());
    write_atomic(&output, &vhdl)?;
    println!("Testbench entity is called '{}'", spec.testbench_name());
    Ok(())
}
