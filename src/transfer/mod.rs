//! Queue handoff: path allocation and the move → convert → tag sequence.

pub mod coordinator;
pub mod paths;

pub use coordinator::{CandidateFile, ProcessingRecord, TransferCoordinator, TransferError};
pub use paths::{allocate_output_path, queue_path};
