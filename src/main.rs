use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod rx;
mod stats;
mod tools;
mod tx;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = cli::Cli::parse();
    match args.cmd {
        cli::Cmd::Rx(opts) => rx::run(opts),
        cli::Cmd::Tx(opts) => tx::run(opts),
        cli::Cmd::Eui(opts) => tools::eui(opts),
        cli::Cmd::Boot(opts) => tools::boot(opts),
        cli::Cmd::Reg(opts) => tools::reg(opts),
        cli::Cmd::Cnt(opts) => tools::cnt(opts),
    }
}
