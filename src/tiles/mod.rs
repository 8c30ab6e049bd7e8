//! Tile addressing, caching and visibility
//!
//! Everything here runs on the worker thread except [`TileAddress`] and
//! [`TileRegion`], which are plain values shared with the view side.

pub mod address;
pub mod cache;
pub mod loader;
pub mod source;
pub mod visibility;

// Re-exports for convenience
pub use address::{TileAddress, TileRegion};
pub use cache::{CacheEntry, CacheStats, TileCache};
pub use loader::{FileTileSource, RenderableTile, TileHandle, TilePlacement};
pub use source::{SourceRegistry, TileSource};
pub use visibility::{VisibilityChange, VisibilityTracker};
