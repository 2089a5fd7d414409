mod commands;
mod opts;
mod output;
mod util;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::pod::{HashArgs, InspectArgs, ObserveArgs};
use opts::GlobalOpts;

#[derive(Parser, Debug)]
#[command(name = "spice", version, about = "Spice pod runtime CLI")]
struct Cli {
    #[command(flatten)]
    opts: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Pod manifest commands
    #[command(subcommand)]
    Pod(PodCommand),
}

#[derive(Subcommand, Debug)]
enum PodCommand {
    /// Show a pod's identity, window, fields and expressions
    Inspect(InspectArgs),

    /// Print the manifest's identity hash
    Hash(HashArgs),

    /// Fetch and add observations, then print the cached buckets
    Observe(ObserveArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    util::load_dotenv()?;
    util::setup_logging();

    let cli = Cli::parse();
    let opts = &cli.opts;

    match cli.command {
        Command::Pod(cmd) => match cmd {
            PodCommand::Inspect(args) => commands::pod::cmd_inspect(opts, &args),
            PodCommand::Hash(args) => commands::pod::cmd_hash(opts, &args),
            PodCommand::Observe(args) => commands::pod::cmd_observe(opts, &args).await,
        },
    }
}
