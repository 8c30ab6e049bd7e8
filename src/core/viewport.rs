use crate::core::constants::{MAX_ZOOM, SCENE_LEN, ZOOM_BASE};
use crate::core::geo::{Coordinate, CoordinateProjector, ScenePoint};
use crate::tiles::address::{TileAddress, TileRegion};
use serde::{Deserialize, Serialize};

/// A point in view pixels, origin at the top-left of the view
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// The current view of the map: what scene point sits in the middle, how
/// far it is zoomed, how large the view is and how it is rotated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// Scene point under the center of the view
    pub center: ScenePoint,
    /// Fractional zoom level
    pub zoom: f64,
    /// View size in pixels
    pub width: f64,
    pub height: f64,
    /// Clockwise rotation of the map on screen, in `[0, 360)`
    pub rotation_degrees: f64,
    pub max_zoom: u8,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(800.0, 600.0, crate::core::constants::DEFAULT_INITIAL_ZOOM)
    }
}

impl Viewport {
    /// Creates a new viewport centered on the scene origin
    pub fn new(width: f64, height: f64, zoom: f64) -> Self {
        Self {
            center: ScenePoint::default(),
            zoom: zoom.clamp(0.0, MAX_ZOOM as f64),
            width: width.max(0.0),
            height: height.max(0.0),
            rotation_degrees: 0.0,
            max_zoom: MAX_ZOOM,
        }
    }

    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom.min(MAX_ZOOM);
        self.zoom = self.zoom.clamp(0.0, self.max_zoom as f64);
        self
    }

    /// Sets the zoom level, clamping to `[0, max_zoom]`
    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(0.0, self.max_zoom as f64);
    }

    pub fn zoom_by(&mut self, delta: f64) {
        self.set_zoom(self.zoom + delta);
    }

    /// View pixels per scene unit
    pub fn scale(&self) -> f64 {
        2_f64.powf(self.zoom - ZOOM_BASE as f64)
    }

    /// Width and height of the view measured in scene units
    pub fn scene_extent(&self) -> (f64, f64) {
        let scale = self.scale();
        (self.width / scale, self.height / scale)
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    pub fn set_rotation(&mut self, degrees: f64) {
        self.rotation_degrees = if degrees.is_finite() {
            degrees.rem_euclid(360.0)
        } else {
            0.0
        };
    }

    pub fn center_on(&mut self, coord: &Coordinate) {
        self.center = CoordinateProjector::to_scene(coord);
    }

    pub fn center_coordinate(&self) -> Coordinate {
        CoordinateProjector::to_coordinate(&self.center)
    }

    /// Moves the view by a pixel offset measured along the screen axes
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        let offset = ScenePoint::new(dx, dy)
            .rotate(-self.rotation_degrees)
            .multiply(1.0 / self.scale());
        self.center = self.center.add(&offset);
    }

    /// Converts a view pixel to the scene point under it
    pub fn to_scene(&self, point: ScreenPoint) -> ScenePoint {
        let offset = ScenePoint::new(point.x - self.width / 2.0, point.y - self.height / 2.0)
            .rotate(-self.rotation_degrees)
            .multiply(1.0 / self.scale());
        self.center.add(&offset)
    }

    /// Converts a scene point to view pixels
    pub fn from_scene(&self, point: &ScenePoint) -> ScreenPoint {
        let offset = point
            .subtract(&self.center)
            .multiply(self.scale())
            .rotate(self.rotation_degrees);
        ScreenPoint::new(offset.x + self.width / 2.0, offset.y + self.height / 2.0)
    }

    /// Geographic coordinate under a view pixel
    pub fn to_coordinate(&self, point: ScreenPoint) -> Coordinate {
        CoordinateProjector::to_coordinate(&self.to_scene(point))
    }

    /// Scene positions of the view corners: top-left, top-right,
    /// bottom-right, bottom-left
    pub fn scene_corners(&self) -> [ScenePoint; 4] {
        [
            self.to_scene(ScreenPoint::new(0.0, 0.0)),
            self.to_scene(ScreenPoint::new(self.width, 0.0)),
            self.to_scene(ScreenPoint::new(self.width, self.height)),
            self.to_scene(ScreenPoint::new(0.0, self.height)),
        ]
    }
}

/// Turns a viewport into the tile region it needs.
///
/// The result depends only on the viewport, so an unchanged view always
/// yields an equal region.
#[derive(Debug, Clone, Copy)]
pub struct TileRangeCalculator {
    /// Extra tiles requested on every edge
    pub padding: u32,
}

impl Default for TileRangeCalculator {
    fn default() -> Self {
        Self { padding: 1 }
    }
}

impl TileRangeCalculator {
    pub fn new(padding: u32) -> Self {
        Self { padding }
    }

    /// Integer zoom whose tiles are requested for a fractional zoom
    pub fn tile_zoom(zoom: f64) -> u8 {
        (zoom.clamp(0.0, MAX_ZOOM as f64) + 0.5).floor() as u8
    }

    pub fn region_for(&self, viewport: &Viewport, source_id: u8) -> TileRegion {
        let zoom = Self::tile_zoom(viewport.zoom);
        if viewport.rotation_degrees == 0.0 {
            self.axis_aligned(viewport, zoom, source_id)
        } else {
            self.rotated(viewport, zoom, source_id)
        }
    }

    fn axis_aligned(&self, viewport: &Viewport, zoom: u8, source_id: u8) -> TileRegion {
        let tile_count = 1i64 << zoom;
        let padding = self.padding as i64;
        let top_left = viewport.to_scene(ScreenPoint::new(0.0, 0.0));
        let bottom_right = viewport.to_scene(ScreenPoint::new(viewport.width, viewport.height));

        let to_cell = |scene: f64| scene_to_tile(scene, tile_count as f64).floor() as i64;
        let clamp = |cell: i64| cell.clamp(0, tile_count - 1);
        let x_begin = clamp(to_cell(top_left.x) - padding);
        let y_begin = clamp(to_cell(top_left.y) - padding);
        let x_end = clamp(to_cell(bottom_right.x) + padding).max(x_begin);
        let y_end = clamp(to_cell(bottom_right.y) + padding).max(y_begin);

        TileRegion::new(
            TileAddress::new(source_id, zoom, x_begin as u32, y_begin as u32),
            count_to_u8(x_end - x_begin + 1),
            count_to_u8(y_end - y_begin + 1),
        )
    }

    fn rotated(&self, viewport: &Viewport, zoom: u8, source_id: u8) -> TileRegion {
        // The origin cell is floored from the anchor, which moves the anchor
        // by up to one cell diagonal along either view axis. Two cells of
        // pre-roll on top of the padding keep the view inside the region at
        // any rotation.
        self.rotated_with_pre_roll(viewport, zoom, source_id, self.padding + 2)
    }

    /// Rotated region whose origin is moved back `pre_roll` cells along
    /// both view axes
    fn rotated_with_pre_roll(
        &self,
        viewport: &Viewport,
        zoom: u8,
        source_id: u8,
        pre_roll: u32,
    ) -> TileRegion {
        let tile_count = (1i64 << zoom) as f64;
        let per_scene = tile_count / SCENE_LEN;
        let (width, height) = viewport.scene_extent();

        let top_left = viewport.to_scene(ScreenPoint::new(0.0, 0.0));
        let (sin, cos) = viewport.rotation_degrees.to_radians().sin_cos();
        // view axes in scene space
        let u = (cos, -sin);
        let v = (sin, cos);

        let back = pre_roll as f64;
        let anchor_x = scene_to_tile(top_left.x, tile_count) - back * (u.0 + v.0);
        let anchor_y = scene_to_tile(top_left.y, tile_count) - back * (u.1 + v.1);
        let origin_x = (anchor_x.floor() as i64).clamp(0, tile_count as i64 - 1);
        let origin_y = (anchor_y.floor() as i64).clamp(0, tile_count as i64 - 1);

        let extra = pre_roll as i64 + self.padding as i64 + 2;
        let hor_count = (width * per_scene).ceil() as i64 + extra;
        let ver_count = (height * per_scene).ceil() as i64 + extra;

        TileRegion::rotated(
            TileAddress::new(source_id, zoom, origin_x as u32, origin_y as u32),
            viewport.rotation_degrees,
            count_to_u8(hor_count),
            count_to_u8(ver_count),
        )
    }
}

/// Scene coordinate to fractional tile index on a grid of `tile_count` cells
fn scene_to_tile(scene: f64, tile_count: f64) -> f64 {
    (scene + SCENE_LEN / 2.0) / SCENE_LEN * tile_count
}

fn count_to_u8(count: i64) -> u8 {
    count.clamp(1, u8::MAX as i64) as u8
}
