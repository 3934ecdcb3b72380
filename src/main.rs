//! cfn-ir CLI: parse CloudFormation templates into a typed IR.

use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "cfn-ir",
    version,
    about = "Parse CloudFormation templates into a typed IR with a reference graph"
)]
struct Cli {
    #[command(subcommand)]
    command: cfn_ir::cli::Commands,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = cfn_ir::cli::dispatch(cli.command) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
