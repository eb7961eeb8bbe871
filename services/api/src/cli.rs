use crate::demo::{run_demo, run_duplicate_scan, DemoArgs, DuplicateScanArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use contractor_registry::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Contractor Registry",
    about = "Run and demonstrate employer identity review from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Offline duplicate tooling over an employer register export
    Duplicates {
        #[command(subcommand)]
        command: DuplicatesCommand,
    },
    /// Run an end-to-end review demo: aliases, decisions, queue, clusters and merge impact
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum DuplicatesCommand {
    /// Cluster the pending employers in a CSV export
    Scan(DuplicateScanArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Load the demo register into the in-memory store before serving
    #[arg(long)]
    pub(crate) seed_demo: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Duplicates {
            command: DuplicatesCommand::Scan(args),
        } => run_duplicate_scan(args),
        Command::Demo(args) => run_demo(args),
    }
}
