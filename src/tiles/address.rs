//! Tile identity and requested regions

use crate::core::constants::MAX_ZOOM;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

/// Half the diagonal of a unit cell; cells whose center lies within this
/// distance of a rotated region still overlap it.
const HALF_CELL_DIAGONAL: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// One grid cell of one tile source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileAddress {
    pub source_id: u8,
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileAddress {
    pub fn new(source_id: u8, zoom: u8, x: u32, y: u32) -> Self {
        Self {
            source_id,
            zoom,
            x,
            y,
        }
    }

    /// Packed key `source << 52 | zoom << 44 | x << 22 | y`, used for
    /// hashing and ordering.
    pub fn key(&self) -> u64 {
        ((self.source_id as u64) << 52)
            | ((self.zoom as u64) << 44)
            | ((self.x as u64) << 22)
            | self.y as u64
    }

    /// Number of tiles along one axis at this zoom. Saturates at `u32::MAX`
    /// for zoom levels whose grid does not fit.
    pub fn tile_count(&self) -> u32 {
        1u32.checked_shl(self.zoom as u32).unwrap_or(u32::MAX)
    }

    /// Parent cell one zoom level up. Must not be called at zoom 0.
    pub fn rise(&self) -> TileAddress {
        debug_assert!(self.zoom > 0, "rise() called on a zoom 0 tile");
        TileAddress::new(self.source_id, self.zoom - 1, self.x / 2, self.y / 2)
    }

    /// Gets the parent tile, or `None` at the root
    pub fn parent(&self) -> Option<TileAddress> {
        if self.zoom == 0 {
            None
        } else {
            Some(self.rise())
        }
    }

    /// Checks that the zoom is one the engine addresses and the cell lies
    /// inside its grid
    pub fn is_valid(&self) -> bool {
        let max_coord = self.tile_count();
        self.zoom <= MAX_ZOOM && self.x < max_coord && self.y < max_coord
    }

    pub fn with_source(mut self, source_id: u8) -> Self {
        self.source_id = source_id;
        self
    }
}

impl Hash for TileAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.key());
    }
}

impl PartialOrd for TileAddress {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TileAddress {
    fn cmp(&self, other: &Self) -> Ordering {
        // x and y beyond 22 bits overlap in the key, fall back to the fields
        self.key()
            .cmp(&other.key())
            .then_with(|| (self.x, self.y).cmp(&(other.x, other.y)))
    }
}

/// A requested block of tiles at one zoom level.
///
/// With `rotation_degrees == 0.0` the region is the axis-aligned rectangle
/// of `hor_count` × `ver_count` cells whose top-left cell is `origin`.
/// Otherwise the rectangle is anchored at the top-left corner of `origin`
/// and its edges run along the view axes, turned by `rotation_degrees`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileRegion {
    pub origin: TileAddress,
    pub rotation_degrees: f64,
    pub hor_count: u8,
    pub ver_count: u8,
}

impl TileRegion {
    pub fn new(origin: TileAddress, hor_count: u8, ver_count: u8) -> Self {
        Self {
            origin,
            rotation_degrees: 0.0,
            hor_count,
            ver_count,
        }
    }

    pub fn rotated(
        origin: TileAddress,
        rotation_degrees: f64,
        hor_count: u8,
        ver_count: u8,
    ) -> Self {
        Self {
            origin,
            rotation_degrees,
            hor_count,
            ver_count,
        }
    }

    /// Axis-aligned region spanning two corner cells (inclusive).
    pub fn from_corners(top_left: TileAddress, bottom_right: TileAddress) -> Self {
        let hor = bottom_right.x.saturating_sub(top_left.x).saturating_add(1);
        let ver = bottom_right.y.saturating_sub(top_left.y).saturating_add(1);
        Self::new(
            top_left,
            hor.min(u8::MAX as u32) as u8,
            ver.min(u8::MAX as u32) as u8,
        )
    }

    pub fn zoom(&self) -> u8 {
        self.origin.zoom
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation_degrees != 0.0
    }

    pub fn with_source(mut self, source_id: u8) -> Self {
        self.origin.source_id = source_id;
        self
    }

    /// Expands the region into its leaf cells, clipped to the zoom's grid.
    /// Zoom levels above [`MAX_ZOOM`] have no leaves.
    pub fn leaves(&self) -> BTreeSet<TileAddress> {
        if self.hor_count == 0 || self.ver_count == 0 {
            return BTreeSet::new();
        }
        if self.zoom() > MAX_ZOOM {
            log::debug!("zoom {} is out of range, region has no leaves", self.zoom());
            return BTreeSet::new();
        }
        if self.is_rotated() {
            self.rotated_leaves()
        } else {
            self.axis_aligned_leaves()
        }
    }

    fn axis_aligned_leaves(&self) -> BTreeSet<TileAddress> {
        let origin = self.origin;
        let tile_count = origin.tile_count() as u64;
        let x_end = (origin.x as u64 + self.hor_count as u64).min(tile_count);
        let y_end = (origin.y as u64 + self.ver_count as u64).min(tile_count);

        let mut leaves = BTreeSet::new();
        for x in origin.x as u64..x_end {
            for y in origin.y as u64..y_end {
                leaves.insert(TileAddress::new(origin.source_id, origin.zoom, x as u32, y as u32));
            }
        }
        leaves
    }

    fn rotated_leaves(&self) -> BTreeSet<TileAddress> {
        let origin = self.origin;
        let tile_count = origin.tile_count() as f64;
        let (sin, cos) = self.rotation_degrees.to_radians().sin_cos();
        // view axes expressed in tile units
        let u = (cos, -sin);
        let v = (sin, cos);
        let width = self.hor_count as f64;
        let height = self.ver_count as f64;
        let anchor = (origin.x as f64, origin.y as f64);

        let corners = [
            anchor,
            (anchor.0 + u.0 * width, anchor.1 + u.1 * width),
            (anchor.0 + v.0 * height, anchor.1 + v.1 * height),
            (
                anchor.0 + u.0 * width + v.0 * height,
                anchor.1 + u.1 * width + v.1 * height,
            ),
        ];
        let min_x = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);

        let x_begin = min_x.floor().max(0.0) as u64;
        let x_end = max_x.ceil().min(tile_count) as u64;
        let y_begin = min_y.floor().max(0.0) as u64;
        let y_end = max_y.ceil().min(tile_count) as u64;

        let mut leaves = BTreeSet::new();
        for x in x_begin..x_end {
            for y in y_begin..y_end {
                let dx = x as f64 + 0.5 - anchor.0;
                let dy = y as f64 + 0.5 - anchor.1;
                let along = dx * u.0 + dy * u.1;
                let across = dx * v.0 + dy * v.1;
                let inside = along >= -HALF_CELL_DIAGONAL
                    && along <= width + HALF_CELL_DIAGONAL
                    && across >= -HALF_CELL_DIAGONAL
                    && across <= height + HALF_CELL_DIAGONAL;
                if inside {
                    leaves.insert(TileAddress::new(
                        origin.source_id,
                        origin.zoom,
                        x as u32,
                        y as u32,
                    ));
                }
            }
        }
        leaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fxhash::FxHashSet;

    #[test]
    fn test_rise_halves_coordinates() {
        let leaf = TileAddress::new(3, 3, 5, 2);
        assert_eq!(leaf.rise(), TileAddress::new(3, 2, 2, 1));
        assert_eq!(leaf.rise().rise(), TileAddress::new(3, 1, 1, 0));
        assert_eq!(leaf.rise().rise().rise(), TileAddress::new(3, 0, 0, 0));
        assert_eq!(TileAddress::new(0, 0, 0, 0).parent(), None);
    }

    #[test]
    fn test_packed_key_layout() {
        let address = TileAddress::new(1, 2, 3, 4);
        assert_eq!(address.key(), (1u64 << 52) | (2u64 << 44) | (3u64 << 22) | 4);
    }

    #[test]
    fn test_ordering_follows_key() {
        let mut addresses = vec![
            TileAddress::new(0, 2, 1, 0),
            TileAddress::new(0, 1, 3, 3),
            TileAddress::new(1, 0, 0, 0),
            TileAddress::new(0, 2, 0, 3),
        ];
        addresses.sort();
        assert_eq!(
            addresses,
            vec![
                TileAddress::new(0, 1, 3, 3),
                TileAddress::new(0, 2, 0, 3),
                TileAddress::new(0, 2, 1, 0),
                TileAddress::new(1, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn test_structural_equality_and_hash() {
        let mut set = FxHashSet::default();
        set.insert(TileAddress::new(0, 4, 7, 9));
        assert!(set.contains(&TileAddress::new(0, 4, 7, 9)));
        assert!(!set.contains(&TileAddress::new(1, 4, 7, 9)));
    }

    #[test]
    fn test_axis_aligned_leaves_clip_to_grid() {
        let region = TileRegion::new(TileAddress::new(0, 2, 2, 3), 4, 4);
        let leaves = region.leaves();
        // zoom 2 is a 4x4 grid: x in 2..4, y in 3..4
        assert_eq!(leaves.len(), 2);
        assert!(leaves.contains(&TileAddress::new(0, 2, 2, 3)));
        assert!(leaves.contains(&TileAddress::new(0, 2, 3, 3)));
    }

    #[test]
    fn test_from_corners() {
        let region =
            TileRegion::from_corners(TileAddress::new(0, 3, 1, 2), TileAddress::new(0, 3, 4, 2));
        assert_eq!(region.hor_count, 4);
        assert_eq!(region.ver_count, 1);
        assert_eq!(region.leaves().len(), 4);
    }

    #[test]
    fn test_out_of_range_zoom_has_no_leaves() {
        let deep = TileAddress::new(0, 40, 0, 0);
        assert_eq!(deep.tile_count(), u32::MAX);
        assert!(!deep.is_valid());
        assert!(!TileAddress::new(0, MAX_ZOOM + 1, 0, 0).is_valid());
        assert!(TileAddress::new(0, MAX_ZOOM, 5, 5).is_valid());
        assert!(!TileAddress::new(0, 2, 4, 0).is_valid());

        assert!(TileRegion::new(deep, 3, 3).leaves().is_empty());
        assert!(TileRegion::rotated(deep, 30.0, 3, 3).leaves().is_empty());
    }

    #[test]
    fn test_empty_region_has_no_leaves() {
        let region = TileRegion::new(TileAddress::new(0, 3, 1, 1), 0, 5);
        assert!(region.leaves().is_empty());
    }

    #[test]
    fn test_rotated_leaves_cover_rotated_rectangle() {
        let origin = TileAddress::new(0, 5, 10, 10);
        let region = TileRegion::rotated(origin, 45.0, 2, 2);
        let leaves = region.leaves();

        // the anchor cell and the cells the rectangle sweeps over along both axes
        assert!(leaves.contains(&TileAddress::new(0, 5, 10, 10)));
        // u = (cos45, -sin45) heads up-right, v = (sin45, cos45) heads down-right
        assert!(leaves.contains(&TileAddress::new(0, 5, 11, 9)));
        assert!(leaves.contains(&TileAddress::new(0, 5, 11, 11)));
        // far away cells are excluded
        assert!(!leaves.contains(&TileAddress::new(0, 5, 7, 7)));
        assert!(!leaves.contains(&TileAddress::new(0, 5, 14, 14)));
        for leaf in &leaves {
            assert_eq!(leaf.zoom, 5);
        }
    }

    #[test]
    fn test_rotated_leaves_are_deterministic() {
        let region = TileRegion::rotated(TileAddress::new(0, 6, 20, 30), 30.0, 5, 4);
        assert_eq!(region.leaves(), region.leaves());
    }
}
