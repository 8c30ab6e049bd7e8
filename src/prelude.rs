//! Prelude module for common tileview types
//!
//! This module re-exports the most commonly used types for easy importing
//! with `use tileview::prelude::*;`

pub use crate::core::{
    config::{TileServiceConfig, YAxisConvention},
    geo::{Coordinate, CoordinateProjector, ScenePoint},
    viewport::{ScreenPoint, TileRangeCalculator, Viewport},
};

pub use crate::tiles::{
    FileTileSource, RenderableTile, TileAddress, TileHandle, TilePlacement, TileRegion,
    TileSource,
};

pub use crate::background::{LoadCoordinator, RegionOutcome, TileEvent};

pub use crate::{Error as TileError, Result};

pub use std::{sync::Arc, time::Duration};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};
