use super::CorrectionOptions;
use super::geometry::{GeometryError, WallGeometry, WallLayer};
use crate::common::constants::{DEG2RAD, UM_PER_CM};
use crate::domain::WallMaterial;
use crate::numerics::{golden_section_minimize, linear_grid, mean_and_sample_std, quadrature_sum};
use serde::{Deserialize, Serialize};

const INTERSECTION_MAX_ITERATIONS: usize = 200;
const INTERSECTION_RELATIVE_TOLERANCE: f64 = 1.0e-12;

/// Wall thickness per material along the line of sight, in um, with 1 sigma
/// uncertainties.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallThickness {
    pub au: f64,
    pub au_unc: f64,
    pub du: f64,
    pub du_unc: f64,
    pub al: f64,
    pub al_unc: f64,
}

impl WallThickness {
    pub fn new(au: f64, du: f64, al: f64) -> Self {
        Self {
            au,
            du,
            al,
            ..Self::default()
        }
    }

    pub fn with_uncertainties(mut self, au_unc: f64, du_unc: f64, al_unc: f64) -> Self {
        self.au_unc = au_unc;
        self.du_unc = du_unc;
        self.al_unc = al_unc;
        self
    }

    pub fn thickness(&self, material: WallMaterial) -> f64 {
        match material {
            WallMaterial::Au => self.au,
            WallMaterial::Du => self.du,
            WallMaterial::Al => self.al,
        }
    }

    pub fn uncertainty(&self, material: WallMaterial) -> f64 {
        match material {
            WallMaterial::Au => self.au_unc,
            WallMaterial::Du => self.du_unc,
            WallMaterial::Al => self.al_unc,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.au == 0.0 && self.du == 0.0 && self.al == 0.0
    }

    pub fn has_uncertainty(&self) -> bool {
        WallMaterial::ALL
            .into_iter()
            .any(|material| self.uncertainty(material) > 0.0)
    }

    /// Every material moved by `sigmas` standard deviations, floored at zero.
    pub fn shifted(&self, sigmas: f64) -> Self {
        let shift = |value: f64, unc: f64| (value + sigmas * unc).max(0.0);
        Self {
            au: shift(self.au, self.au_unc),
            du: shift(self.du, self.du_unc),
            al: shift(self.al, self.al_unc),
            ..*self
        }
    }
}

/// Ray from the origin at polar angle `theta` (rad, from +z) meeting a layer.
/// Returns the `(r, z)` point and the angular residual.
fn intersect(layer: &WallLayer, theta: f64) -> ([f64; 2], f64) {
    let mismatch = |z: f64| (layer.radius_at(z).atan2(z) - theta).abs();
    let (low, high) = layer.z_range();
    let tolerance = INTERSECTION_RELATIVE_TOLERANCE * low.abs().max(high.abs()).max(1.0);
    let (z, residual) =
        golden_section_minimize(mismatch, low, high, tolerance, INTERSECTION_MAX_ITERATIONS);
    ([layer.radius_at(z), z], residual)
}

/// Thickness (cm) of each sampled ray through one layer pair, or `None`
/// when any ray misses a surface by more than the tolerance.
fn pair_thicknesses(
    inner: &WallLayer,
    outer: &WallLayer,
    angles: &[f64],
    tolerance: f64,
) -> Option<Vec<f64>> {
    let mut thicknesses = Vec::with_capacity(angles.len());
    for &theta in angles {
        let (inner_point, inner_residual) = intersect(inner, theta);
        let (outer_point, outer_residual) = intersect(outer, theta);
        if !(inner_residual <= tolerance && outer_residual <= tolerance) {
            tracing::warn!(
                inner = inner.index,
                outer = outer.index,
                theta_deg = theta / DEG2RAD,
                inner_residual,
                outer_residual,
                "line of sight misses wall layer, skipping pair"
            );
            return None;
        }
        let dr = outer_point[0] - inner_point[0];
        let dz = outer_point[1] - inner_point[1];
        thicknesses.push((dr * dr + dz * dz).sqrt());
    }
    Some(thicknesses)
}

/// Wall thickness along lines of sight spread uniformly over
/// `[theta_min_deg, theta_max_deg]`.
pub fn compute_wall_thickness(
    geometry: &WallGeometry,
    theta_min_deg: f64,
    theta_max_deg: f64,
    options: &CorrectionOptions,
) -> Result<WallThickness, GeometryError> {
    if !theta_min_deg.is_finite() || !theta_max_deg.is_finite() {
        return Err(GeometryError::InvalidAngles {
            theta_min: theta_min_deg,
            theta_max: theta_max_deg,
        });
    }
    let samples = options.angle_samples.max(1);
    let angles: Vec<f64> = if samples == 1 || theta_min_deg == theta_max_deg {
        vec![0.5 * (theta_min_deg + theta_max_deg) * DEG2RAD]
    } else {
        linear_grid(theta_min_deg * DEG2RAD, theta_max_deg * DEG2RAD, samples).unwrap_or_default()
    };

    let mut means: Vec<(WallMaterial, f64, f64)> = Vec::new();
    for (inner, outer) in geometry.pairs() {
        let Some(thicknesses) =
            pair_thicknesses(inner, outer, &angles, options.intersection_tolerance)
        else {
            continue;
        };
        let (mean, std) = mean_and_sample_std(&thicknesses);
        tracing::debug!(
            inner = inner.index,
            material = %inner.material,
            thickness_um = mean * UM_PER_CM,
            "wall layer thickness"
        );
        means.push((inner.material, mean * UM_PER_CM, std * UM_PER_CM));
    }

    let per_material = |material: WallMaterial| -> (f64, f64) {
        let selected: Vec<&(WallMaterial, f64, f64)> = means
            .iter()
            .filter(|(layer_material, _, _)| *layer_material == material)
            .collect();
        let total: f64 = selected.iter().map(|(_, mean, _)| mean).sum();
        let uncertainties: Vec<f64> = selected.iter().map(|(_, _, std)| *std).collect();
        (total, quadrature_sum(&uncertainties))
    };
    let (au, au_unc) = per_material(WallMaterial::Au);
    let (du, du_unc) = per_material(WallMaterial::Du);
    let (al, al_unc) = per_material(WallMaterial::Al);
    Ok(WallThickness {
        au,
        au_unc,
        du,
        du_unc,
        al,
        al_unc,
    })
}
