// folio CLI entry point.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod exit_code;
mod output;

use exit_code::ExitCode;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "folio", about = "Versioned, deduplicating store for research documents")]
struct Cli {
    /// Store root holding the documents and `.folio/` state.
    #[arg(long, global = true, env = "FOLIO_ROOT", default_value = ".")]
    root: PathBuf,

    /// Force JSON output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ctx = commands::Context { root: cli.root, format: OutputFormat::detect(cli.json) };

    match commands::run(&ctx, cli.command) {
        Ok(()) => ExitCode::Success.into(),
        Err(error) => {
            output::print_anyhow_error(ctx.format, &error);
            ExitCode::from_error(&error).into()
        }
    }
}
