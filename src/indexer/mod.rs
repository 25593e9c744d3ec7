// Indexer Coordinator (§4.9): keeps the three stores in sync with the file
// system.

pub mod coordinator;

pub use coordinator::{IndexHealth, IndexOptions, IndexReport, IndexerCoordinator, ProgressEvent, Status};
