use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{prelude::*, EnvFilter};

mod cli;

/// Root CLI struct
#[derive(Parser, Debug)]
#[command(name = "casm", about = "Cairo bytecode virtual machine", version)]
pub struct Cli {
    #[command(subcommand)]
    action: Actions,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// CLI actions
#[derive(Debug, Parser)]
pub enum Actions {
    #[command(alias = "execute")]
    Run(cli::RunCmd),
    Assemble(cli::AssembleCmd),
    Disassemble(cli::DisassembleCmd),
}

impl Cli {
    pub fn execute(&self) -> anyhow::Result<()> {
        match &self.action {
            Actions::Run(run) => run.execute(),
            Actions::Assemble(assemble) => assemble.execute(),
            Actions::Disassemble(disassemble) => disassemble.execute(),
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let format = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();
    tracing_subscriber::registry().with(filter).with(format).init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.execute() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
