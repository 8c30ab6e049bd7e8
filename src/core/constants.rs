//! Engine-wide constants for the tile scene.
//! Keeping them in a single place makes it easier to tweak the magic numbers.

/// Zoom level at which one tile pixel equals one scene unit.
/// Lower zooms are magnified onto the scene, higher ones shrunk.
pub const ZOOM_BASE: u8 = 10;

/// Square raster tile edge in pixels.
pub const TILE_LEN: u32 = 256;

/// Side length of the square scene every zoom level is laid out on.
pub const SCENE_LEN: f64 = ((1u64 << ZOOM_BASE) * TILE_LEN as u64) as f64;

/// Web Mercator latitude limit; the projection diverges towards the poles.
pub const MAX_LATITUDE: f64 = 85.0511287798;

/// Deepest zoom level the engine addresses (x/y must fit the packed key).
pub const MAX_ZOOM: u8 = 20;

/// Default number of cache entries (loaded or negative).
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Extensions probed, in order, for every tile file.
pub const DEFAULT_TILE_EXTENSIONS: [&str; 2] = ["jpg", "png"];

/// Zoom delta applied per wheel notch.
pub const DEFAULT_ZOOM_STEP: f64 = 0.2;

/// Zoom level a fresh view starts at.
pub const DEFAULT_INITIAL_ZOOM: f64 = 2.0;

/// Stacking offset so finer tiles are drawn above substituted ancestors.
pub const TILE_Z_OFFSET: i32 = 20;
