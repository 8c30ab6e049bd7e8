//! # tileview
//!
//! Tile engine for a slippy map backed by a local tile tree.
//!
//! The crate projects geographic coordinates onto a planar scene, works out
//! which tiles a viewport needs, and loads them on a dedicated worker thread
//! with an LRU cache and coarser-ancestor fallback. The view side only ever
//! receives ordered show/hide/finished events, so painting stays with the
//! embedding application.

pub mod background;
pub mod core;
pub mod prelude;
pub mod tiles;
pub use crate::core::constants;

// Re-export public API
pub use background::{
    coordinator::LoadCoordinator,
    messages::{RegionOutcome, TileEvent},
};

pub use core::{
    config::{TileServiceConfig, YAxisConvention},
    geo::{Coordinate, CoordinateProjector, ScenePoint},
    viewport::{ScreenPoint, TileRangeCalculator, Viewport},
};

pub use tiles::{
    CacheEntry, CacheStats, FileTileSource, RenderableTile, SourceRegistry, TileAddress,
    TileCache, TileHandle, TilePlacement, TileRegion, TileSource, VisibilityTracker,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, TileError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum TileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Failed to start tile worker: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("Tile worker is no longer running")]
    WorkerDisconnected,

    #[error("Source registry full: at most {0} tile sources per service")]
    SourceRegistryFull(usize),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Error = TileError;

/// Initializes `env_logger` from `RUST_LOG`. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
