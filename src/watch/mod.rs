//! Arrival detection: snapshots, the WAV completeness gate and the polling
//! loop that ties them to the transfer pipeline.

pub mod runner;
pub mod snapshot;
pub mod wav;

pub use runner::{CycleReport, WatchLoop};
pub use snapshot::{diff, snapshot, DirectorySnapshot, FileStamp};
