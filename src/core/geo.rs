use crate::core::constants::{MAX_LATITUDE, SCENE_LEN};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// A geographical coordinate in degrees, plus an altitude carried along untouched
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
    pub altitude: f64,
}

impl Coordinate {
    /// Creates a new coordinate at zero altitude
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
            altitude: 0.0,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    /// Clamps latitude to the range the projection can represent
    pub fn clamp_lat(lat: f64) -> f64 {
        lat.clamp(-MAX_LATITUDE, MAX_LATITUDE)
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// A point on the planar scene; y grows downward
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenePoint {
    pub x: f64,
    pub y: f64,
}

impl ScenePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn add(&self, other: &ScenePoint) -> ScenePoint {
        ScenePoint::new(self.x + other.x, self.y + other.y)
    }

    pub fn subtract(&self, other: &ScenePoint) -> ScenePoint {
        ScenePoint::new(self.x - other.x, self.y - other.y)
    }

    pub fn multiply(&self, scalar: f64) -> ScenePoint {
        ScenePoint::new(self.x * scalar, self.y * scalar)
    }

    /// Rotates around the origin; positive degrees turn clockwise on a y-down plane.
    pub fn rotate(&self, degrees: f64) -> ScenePoint {
        let (sin, cos) = degrees.to_radians().sin_cos();
        ScenePoint::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Default for ScenePoint {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Spherical Mercator mapping between coordinates and the scene.
///
/// The scene is a square of side [`SCENE_LEN`] centered on the origin, so
/// (0°, 0°) lands on (0, 0) and the radius of the projection sphere is
/// `SCENE_LEN / 2π`. Both directions are pure and usable from any thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateProjector;

impl CoordinateProjector {
    /// Projects a coordinate onto the scene. Latitude is clamped to
    /// ±[`MAX_LATITUDE`] first.
    pub fn to_scene(coord: &Coordinate) -> ScenePoint {
        let lon_rad = coord.longitude.to_radians();
        let lat_rad = Coordinate::clamp_lat(coord.latitude).to_radians();
        let x = SCENE_LEN * lon_rad / (2.0 * PI);
        let y = SCENE_LEN / (2.0 * PI) * (FRAC_PI_4 + lat_rad / 2.0).tan().ln();
        // scene y grows downward, north is up
        ScenePoint::new(x, -y)
    }

    /// Inverse of [`CoordinateProjector::to_scene`]; altitude is zero.
    pub fn to_coordinate(point: &ScenePoint) -> Coordinate {
        let lon_rad = point.x * 2.0 * PI / SCENE_LEN;
        let lat_rad = 2.0 * (2.0 * PI * -point.y / SCENE_LEN).exp().atan() - FRAC_PI_2;
        Coordinate::new(lon_rad.to_degrees(), lat_rad.to_degrees())
    }
}
