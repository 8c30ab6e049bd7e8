//! Asynchronous tile loading
//!
//! The view thread talks to a single worker through ordered channels:
//! [`messages::WorkerCommand`] one way and [`messages::TileEvent`] the other.

pub mod coordinator;
pub mod messages;
pub mod worker;

pub use coordinator::LoadCoordinator;
pub use messages::{RegionOutcome, TileEvent, WorkerCommand};
pub use worker::TileWorker;
