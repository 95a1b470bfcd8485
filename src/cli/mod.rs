pub mod process;
pub mod report;
pub mod server_path;

use std::{net::SocketAddr, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use process::{restart_server, stop_servers};
use report::{
    print_stats, print_suggestions, process_history_command, process_log_command,
    HistoryCommand, LogCommand,
};
use tracing::level_filters::LevelFilter;

use crate::{
    server::{args::DEFAULT_ADDRESS, start_server},
    stats::service::StatsService,
    storage::file_store::FileStore,
    utils::{
        clock::DefaultClock,
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Focuslog", version, long_about = None)]
#[command(about = "Logging of focused work sessions with levels, streaks and suggestions", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a detached server for the application")]
    Init {
        #[arg(long, default_value = DEFAULT_ADDRESS, help = "Address the server listens on")]
        addr: SocketAddr,
    },
    #[command(
        about = "Run the server directly in current console. Useful for debugging"
    )]
    Serve {
        #[arg(long, default_value = DEFAULT_ADDRESS, help = "Address the server listens on")]
        addr: SocketAddr,
    },
    #[command(about = "Stop currently running server.")]
    Stop {},
    #[command(about = "Display level, points and streak")]
    Stats {},
    #[command(about = "Display nodes you are likely to work on right now")]
    Suggest {},
    #[command(about = "Display totals of every active day")]
    History {
        #[command(flatten)]
        command: HistoryCommand,
    },
    #[command(about = "Log a session that ends now")]
    Log {
        #[command(flatten)]
        command: LogCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    let app_dir = resolve_application_path(args.dir.clone())?;
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    match args.commands {
        Commands::Init { addr } => restart_server(args.dir, addr),
        Commands::Stop {} => stop_servers(),
        Commands::Serve { addr } => start_server(app_dir, addr).await,
        Commands::Stats {} => {
            print_stats(&local_service(app_dir)?).await;
            Ok(())
        }
        Commands::Suggest {} => {
            print_suggestions(&local_service(app_dir)?).await;
            Ok(())
        }
        Commands::History { command } => {
            process_history_command(&local_service(app_dir)?, command).await
        }
        Commands::Log { command } => process_log_command(&local_service(app_dir)?, command).await,
    }
}

/// Reads the same data directory the server uses.
fn local_service(app_dir: PathBuf) -> Result<StatsService<FileStore>> {
    let store = FileStore::new(app_dir.join("data"))?;
    Ok(StatsService::new(store, Box::new(DefaultClock)))
}
