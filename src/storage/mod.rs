//!  Storage is organized through the [store::SessionStore] trait.
//!  The basic idea is:
//!   - Sessions are the only source of truth, everything else is derived from them.
//!   - Nodes are a small registry that sessions point to and that is bumped on every use.
//!   - [file_store::FileStore] keeps sessions in record files, one per UTC day, while
//!     [memory_store::MemoryStore] keeps everything in memory for fixtures and quick runs.

pub mod entities;
pub mod file_store;
pub mod ingest;
mod lines;
pub mod memory_store;
pub mod queries;
pub mod store;
