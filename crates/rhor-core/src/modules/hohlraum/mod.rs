//! Hohlraum wall thickness along the detector line of sight and the
//! spectral correction for the energy lost in the wall.

mod correction;
mod geometry;
mod thickness;

pub use correction::{CorrectionError, HohlraumCorrector, ThicknessMode, WallStopping};
pub use geometry::{GeometryError, WallGeometry, WallLayer, parse_wall_geometry};
pub use thickness::{WallThickness, compute_wall_thickness};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionOptions {
    /// Lines of sight sampled uniformly across the angle range.
    pub angle_samples: usize,
    /// Largest angular miss (rad) accepted for a ray/surface intersection.
    pub intersection_tolerance: f64,
}

impl Default for CorrectionOptions {
    fn default() -> Self {
        Self {
            angle_samples: 25,
            intersection_tolerance: 1.0e-3,
        }
    }
}
