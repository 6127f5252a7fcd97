//! wavegate - WAV import watcher daemon
//!
//! Watches a directory for audio recordings being written by another
//! process, waits until each file is completely written, then moves it into
//! a queue area, converts it with an external encoder and tags the result.
//!
//! # Architecture
//!
//! The pipeline is a single polling loop; one cycle runs to completion
//! before the next snapshot is taken:
//!
//! ```text
//! snapshot → diff → completeness gate → queue move → convert → tag
//! ```
//!
//! The queue move is the commit point: once a file leaves the watch
//! directory it can never be re-detected, so nothing is processed twice,
//! and a crash mid-conversion leaves it recoverable in the queue area.
//!
//! # Modules
//!
//! - `watch`: Snapshot diffing, WAV completeness check, polling loop
//! - `transfer`: Path allocation and the move → convert → tag sequence
//! - `adapters`: External converter (sox) and tagger (metaflac)
//! - `daemon`: PID-file start/stop/status control
//! - `config`: YAML configuration
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the watcher
//! wavegate start
//!
//! # One polling cycle only
//! wavegate start --once
//!
//! # Control a running daemon
//! wavegate status
//! wavegate stop
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod transfer;
pub mod watch;

// Re-export main types at crate root for convenience
pub use adapters::{Converter, MetaflacTagger, SoxConverter, TagSet, Tagger};
pub use config::{Config, ConfigError};
pub use transfer::{CandidateFile, ProcessingRecord, TransferCoordinator, TransferError};
pub use watch::{CycleReport, DirectorySnapshot, WatchLoop};
