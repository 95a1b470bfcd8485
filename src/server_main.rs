// This runs the server on windows without creating a console. Disable during development to see
// stdout.
#![windows_subsystem = "windows"]

use std::{env::args, path::PathBuf};

use anyhow::Result;
use clap::Parser;
use focuslog::{
    server::{args::ServerArgs, start_server},
    utils::{
        dir::resolve_application_path,
        logging::{SERVER_PREFIX, enable_logging},
        runtime::multi_thread_runtime,
    },
};

fn main() -> Result<()> {
    run_service(args().collect::<Vec<_>>())
}

fn run_service(command_args: Vec<String>) -> Result<()> {
    let args = ServerArgs::parse_from(&command_args);
    // The daemon moves to the root directory, so relative paths have to be resolved first.
    let app_dir = std::fs::canonicalize(resolve_application_path(args.dir.clone())?)?;

    if !args.force {
        #[cfg(feature = "win")]
        {
            let mut command_args = command_args;
            println!("Starting detached process");
            use std::os::windows::process::CommandExt;
            use windows::Win32::System::Threading::DETACHED_PROCESS;

            command_args.push("--force".into());
            let process_name = std::env::current_exe()?;
            println!("Process {:?}", process_name);
            let mut command = std::process::Command::new(process_name);
            command.args(command_args.into_iter().skip(1));
            command.creation_flags(DETACHED_PROCESS.0);
            command.stdin(std::process::Stdio::null());
            command.stdout(std::process::Stdio::null());
            command.stderr(std::process::Stdio::null());
            #[allow(clippy::zombie_processes)]
            command.spawn()?;
            println!("Created server");
            return Ok(());
        }
        #[cfg(unix)]
        {
            use daemonize::Daemonize;
            use tracing::error;

            let daemonize = Daemonize::new()
                .stdout(daemonize::Stdio::devnull())
                .stderr(daemonize::Stdio::devnull())
                .execute();
            match daemonize {
                daemonize::Outcome::Parent(parent) => {
                    parent
                        .inspect_err(|e| error!("Failed to create server on parent side {e:?}"))?;
                    println!("Created server");
                    return Ok(());
                }
                daemonize::Outcome::Child(_) => (),
            }
        }
    }

    run(args, app_dir)
}

fn run(args: ServerArgs, app_dir: PathBuf) -> Result<()> {
    enable_logging(SERVER_PREFIX, &app_dir, args.log, args.log_console)?;
    multi_thread_runtime()?.block_on(async move { start_server(app_dir, args.addr).await })?;
    Ok(())
}
