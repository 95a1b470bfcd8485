use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use tracing::level_filters::LevelFilter;

pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Parser)]
pub struct ServerArgs {
  /// Run in the current process instead of detaching.
  #[arg(long)]
  pub force: bool,
  #[arg(long)]
  pub dir: Option<PathBuf>,
  #[arg(long, default_value = DEFAULT_ADDRESS)]
  pub addr: SocketAddr,
  /// This option is for debugging purposes only.
  #[arg(long = "log-console")]
  pub log_console : bool,
  #[arg(long = "log-filter")]
  pub log: Option<LevelFilter>
}
