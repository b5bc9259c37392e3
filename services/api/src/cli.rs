use crate::commands::{
    run_admin_list, run_export, run_followups, run_import, AdminListArgs, ExportArgs,
    FollowupsArgs, ImportArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use job_tracker::error::AppError;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "job-tracker",
    about = "Track job applications over HTTP or from the command line",
    version
)]
struct Cli {
    /// JSON snapshot file holding the records (overrides APP_DATA_FILE)
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Back-office views over stored applications
    Admin {
        #[command(subcommand)]
        command: AdminCommand,
    },
    /// Write every stored application as CSV or JSON
    Export(ExportArgs),
    /// Bulk-create applications from a CSV or JSON file
    Import(ImportArgs),
    /// List upcoming follow-ups, soonest first
    Followups(FollowupsArgs),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Print the admin list table
    List(AdminListArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let data_file = cli.data_file;
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args, data_file).await,
        Command::Admin {
            command: AdminCommand::List(args),
        } => run_admin_list(args, data_file),
        Command::Export(args) => run_export(args, data_file),
        Command::Import(args) => run_import(args, data_file),
        Command::Followups(args) => run_followups(args, data_file),
    }
}
