//! Filesystem tile loading and the renderable handles it produces

use super::address::TileAddress;
use super::source::TileSource;
use crate::core::config::YAxisConvention;
use crate::core::constants::{TILE_LEN, TILE_Z_OFFSET, ZOOM_BASE};
use crate::core::geo::ScenePoint;
use crate::Result;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared handle to a loaded tile. The cache, the visible set and the
/// presentation layer may all hold one at the same time.
pub type TileHandle = Arc<RenderableTile>;

/// Where a tile sits on the scene.
///
/// The tile is scaled by `2^(ZOOM_BASE - zoom)` first and then moved by
/// `TILE_LEN * (x - n/2, y - n/2)` in its own scaled frame, so every zoom
/// level covers the same world-sized square centered on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePlacement {
    pub scale: f64,
    /// Top-left corner in scene units
    pub offset: ScenePoint,
    /// Edge length in scene units
    pub side: f64,
    /// Stacking order; finer zoom levels draw above coarser ones
    pub z_value: i32,
}

impl TilePlacement {
    pub fn for_address(address: &TileAddress) -> Self {
        let tile_count = address.tile_count() as f64;
        let scale = 2_f64.powi(ZOOM_BASE as i32 - address.zoom as i32);
        let tile_len = TILE_LEN as f64;
        let offset = ScenePoint::new(
            tile_len * (address.x as f64 - tile_count / 2.0),
            tile_len * (address.y as f64 - tile_count / 2.0),
        )
        .multiply(scale);
        Self {
            scale,
            offset,
            side: tile_len * scale,
            z_value: address.zoom as i32 - TILE_Z_OFFSET,
        }
    }

    /// Checks whether a scene point falls on this tile
    pub fn contains(&self, point: &ScenePoint) -> bool {
        point.x >= self.offset.x
            && point.x < self.offset.x + self.side
            && point.y >= self.offset.y
            && point.y < self.offset.y + self.side
    }
}

/// A decoded tile image together with its placement on the scene
#[derive(Debug)]
pub struct RenderableTile {
    address: TileAddress,
    path: Option<PathBuf>,
    image: RgbaImage,
    placement: TilePlacement,
}

impl RenderableTile {
    pub fn from_image(address: TileAddress, image: RgbaImage) -> Self {
        Self {
            address,
            path: None,
            image,
            placement: TilePlacement::for_address(&address),
        }
    }

    /// Decode the file at `path` as the tile for `address`
    pub fn open(address: TileAddress, path: &Path) -> Result<Self> {
        let image = image::open(path)?.to_rgba8();
        Ok(Self {
            address,
            path: Some(path.to_path_buf()),
            image,
            placement: TilePlacement::for_address(&address),
        })
    }

    pub fn address(&self) -> TileAddress {
        self.address
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn placement(&self) -> &TilePlacement {
        &self.placement
    }
}

/// Tile tree on disk laid out as `{base}/{zoom}/{x}/{y}.{ext}`
#[derive(Debug, Clone)]
pub struct FileTileSource {
    source_id: u8,
    base_path: PathBuf,
    y_axis: YAxisConvention,
    extensions: Vec<String>,
}

impl FileTileSource {
    pub fn new(
        source_id: u8,
        base_path: impl Into<PathBuf>,
        y_axis: YAxisConvention,
        extensions: Vec<String>,
    ) -> Self {
        Self {
            source_id,
            base_path: base_path.into(),
            y_axis,
            extensions,
        }
    }

    pub fn source_id(&self) -> u8 {
        self.source_id
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn y_axis(&self) -> YAxisConvention {
        self.y_axis
    }

    pub fn set_y_axis(&mut self, y_axis: YAxisConvention) {
        self.y_axis = y_axis;
    }

    /// Row number as stored on disk. `None` when the address is outside the
    /// grid or its zoom is out of range.
    pub fn file_row(&self, address: &TileAddress) -> Option<u32> {
        if !address.is_valid() {
            return None;
        }
        match self.y_axis {
            YAxisConvention::Xyz => Some(address.y),
            YAxisConvention::Tms => address
                .tile_count()
                .checked_sub(address.y)
                .and_then(|rows| rows.checked_sub(1)),
        }
    }

    /// Candidate files for `address`, in probing order
    pub fn candidate_paths(&self, address: &TileAddress) -> Vec<PathBuf> {
        let Some(row) = self.file_row(address) else {
            return Vec::new();
        };
        let dir = self
            .base_path
            .join(address.zoom.to_string())
            .join(address.x.to_string());
        self.extensions
            .iter()
            .map(|ext| dir.join(format!("{}.{}", row, ext)))
            .collect()
    }
}

impl TileSource for FileTileSource {
    fn load(&self, address: &TileAddress) -> Option<RenderableTile> {
        let Some(path) = self
            .candidate_paths(address)
            .into_iter()
            .find(|path| path.is_file())
        else {
            log::debug!("no tile file for {:?}", address);
            return None;
        };

        match RenderableTile::open(*address, &path) {
            Ok(tile) => {
                log::debug!("loaded tile {:?} from {}", address, path.display());
                Some(tile)
            }
            Err(e) => {
                log::warn!("failed to decode tile {}: {}", path.display(), e);
                None
            }
        }
    }

    fn is_available(&self) -> bool {
        self.base_path.is_dir()
    }
}
