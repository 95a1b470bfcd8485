use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    process::Stdio,
};

use anyhow::Result;
use sysinfo::{get_current_pid, Signal, System};
use tracing::info;

use crate::utils::dir::resolve_application_path;

use super::server_path::to_server_path;

/// Terminates every process started from the executable at `name`, except for this one.
pub fn kill_previous_servers(name: &Path) -> Result<()> {
    let system = System::new_all();
    let current_id = get_current_pid().map_err(|e| anyhow::anyhow!(e))?;
    for (pid, process) in system.processes().iter() {
        if *pid == current_id {
            continue;
        }
        if matches!(process.parent(), Some(p) if p == current_id) {
            continue;
        }

        if process
            .exe()
            .filter(|v| v.exists())
            .filter(|v| name == *v)
            .is_some()
        {
            info!("Stopping server with pid {pid}");
            // This will forcefully terminate the process on Windows. Anything better will require a
            // lot more work.
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
            process.wait();
        }
    }
    Ok(())
}

/// Shuts down previous servers and starts a new one. The server binary detaches itself, so the
/// spawned process exits right after forking.
pub fn restart_server(dir: Option<PathBuf>, addr: SocketAddr) -> Result<()> {
    let server_path = to_server_path(std::env::current_exe()?);
    kill_previous_servers(&server_path)?;

    let mut command = std::process::Command::new(&server_path);
    command.args(["--addr".to_string(), addr.to_string()]);
    if let Some(dir) = dir {
        command
            .arg("--dir")
            .arg(std::fs::canonicalize(resolve_application_path(Some(dir))?)?);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::null());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    println!("Spawning {}", server_path.display());
    let mut child = command.spawn()?;
    // Without detaching support the child is the server itself.
    if cfg!(any(unix, feature = "win")) {
        child.wait()?;
    }
    println!("Success");
    Ok(())
}

pub fn stop_servers() -> Result<()> {
    kill_previous_servers(&to_server_path(std::env::current_exe()?))
}
