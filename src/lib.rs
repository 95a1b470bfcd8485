//! Server and cli for logging focused work sessions. Sessions are turned into points, levels,
//! day streaks and suggestions of what to work on at the current time of day.
//!

pub mod cli;
pub mod server;
pub mod stats;
pub mod storage;
pub mod utils;
