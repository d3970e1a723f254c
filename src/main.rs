use clap::Parser;
use restful_filters::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => cli::serve::run().await,
        Command::Mask(args) => cli::mask::run(args),
    }
}
