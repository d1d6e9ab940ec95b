use crate::domain::{RhorError, WallMaterial};
use crate::numerics::interpolate_linear;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("wall layer {layer} needs at least 2 points, got {points}")]
    TooFewPoints { layer: usize, points: usize },
    #[error("wall layer {layer} has a non-finite or negative point (r={r}, z={z})")]
    InvalidPoint { layer: usize, r: f64, z: f64 },
    #[error("wall layer {layer} mixes materials {first} and {second}")]
    MixedLayer {
        layer: usize,
        first: WallMaterial,
        second: WallMaterial,
    },
    #[error("wall geometry line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("angle range must be finite, got [{theta_min}, {theta_max}] degrees")]
    InvalidAngles { theta_min: f64, theta_max: f64 },
}

impl From<GeometryError> for RhorError {
    fn from(error: GeometryError) -> Self {
        RhorError::input_validation("INPUT.WALL_GEOMETRY", error.to_string())
    }
}

/// One wall surface as an `(r, z)` polyline in cm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallLayer {
    pub index: usize,
    pub material: WallMaterial,
    /// `[r, z]` pairs, kept sorted by `z`.
    pub points: Vec<[f64; 2]>,
}

impl WallLayer {
    pub fn new(index: usize, material: WallMaterial, mut points: Vec<[f64; 2]>) -> Result<Self, GeometryError> {
        if points.len() < 2 {
            return Err(GeometryError::TooFewPoints {
                layer: index,
                points: points.len(),
            });
        }
        if let Some([r, z]) = points
            .iter()
            .copied()
            .find(|[r, z]| !r.is_finite() || !z.is_finite() || *r < 0.0)
        {
            return Err(GeometryError::InvalidPoint { layer: index, r, z });
        }
        points.sort_by(|lhs, rhs| lhs[1].total_cmp(&rhs[1]));

        Ok(Self {
            index,
            material,
            points,
        })
    }

    pub fn z_range(&self) -> (f64, f64) {
        (self.points[0][1], self.points[self.points.len() - 1][1])
    }

    /// Radius at height `z`, clamped to the end points outside the range.
    pub fn radius_at(&self, z: f64) -> f64 {
        let zs: Vec<f64> = self.points.iter().map(|[_, z]| *z).collect();
        let rs: Vec<f64> = self.points.iter().map(|[r, _]| *r).collect();
        interpolate_linear(z, &zs, &rs).unwrap_or(f64::NAN)
    }
}

/// Wall layers ordered by index; consecutive layers form (inner, outer) pairs.
///
/// A trailing layer without a partner, or a pair whose two surfaces are
/// different materials, cannot give a thickness. Such layers are kept but
/// left out of [`WallGeometry::pairs`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<WallLayer>", into = "Vec<WallLayer>")]
pub struct WallGeometry {
    layers: Vec<WallLayer>,
}

impl WallGeometry {
    pub fn new(mut layers: Vec<WallLayer>) -> Self {
        layers.sort_by_key(|layer| layer.index);
        let geometry = Self { layers };
        for layer in geometry.unpaired_layers() {
            tracing::warn!(
                layer = layer.index,
                material = %layer.material,
                layers = geometry.layers.len(),
                "wall layer has no usable partner, skipping it"
            );
        }
        geometry
    }

    pub fn layers(&self) -> &[WallLayer] {
        &self.layers
    }

    /// `(inner, outer)` surface pairs of one material, in layer-index order.
    pub fn pairs(&self) -> impl Iterator<Item = (&WallLayer, &WallLayer)> {
        self.layers
            .chunks_exact(2)
            .filter(|pair| pair[0].material == pair[1].material)
            .map(|pair| (&pair[0], &pair[1]))
    }

    /// Layers that take no part in any pair.
    pub fn unpaired_layers(&self) -> Vec<&WallLayer> {
        let mismatched = self
            .layers
            .chunks_exact(2)
            .filter(|pair| pair[0].material != pair[1].material)
            .flatten();
        mismatched
            .chain(self.layers.chunks_exact(2).remainder())
            .collect()
    }
}

impl TryFrom<Vec<WallLayer>> for WallGeometry {
    type Error = GeometryError;

    fn try_from(layers: Vec<WallLayer>) -> Result<Self, Self::Error> {
        let layers = layers
            .into_iter()
            .map(|layer| WallLayer::new(layer.index, layer.material, layer.points))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WallGeometry::new(layers))
    }
}

impl From<WallGeometry> for Vec<WallLayer> {
    fn from(geometry: WallGeometry) -> Self {
        geometry.layers
    }
}

/// Parse whitespace-separated `layer material r_cm z_cm` rows, one point per
/// line. Blank lines and `#` comments are ignored.
pub fn parse_wall_geometry(source: &str) -> Result<WallGeometry, GeometryError> {
    let mut layers: BTreeMap<usize, (WallMaterial, Vec<[f64; 2]>)> = BTreeMap::new();

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let content = line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = content.split_whitespace().collect();
        let [layer_token, material_token, r_token, z_token] = tokens.as_slice() else {
            return Err(GeometryError::Parse {
                line: line_number,
                message: format!("expected 'layer material r z', found '{content}'"),
            });
        };
        let layer = layer_token.parse::<usize>().map_err(|_| GeometryError::Parse {
            line: line_number,
            message: format!("layer index '{layer_token}' is not a non-negative integer"),
        })?;
        let material = material_token
            .parse::<WallMaterial>()
            .map_err(|error| GeometryError::Parse {
                line: line_number,
                message: error.message().to_string(),
            })?;
        let r = parse_coordinate(r_token, line_number)?;
        let z = parse_coordinate(z_token, line_number)?;

        let entry = layers.entry(layer).or_insert_with(|| (material, Vec::new()));
        if entry.0 != material {
            return Err(GeometryError::MixedLayer {
                layer,
                first: entry.0,
                second: material,
            });
        }
        entry.1.push([r, z]);
    }

    let layers = layers
        .into_iter()
        .map(|(index, (material, points))| WallLayer::new(index, material, points))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(WallGeometry::new(layers))
}

fn parse_coordinate(token: &str, line: usize) -> Result<f64, GeometryError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| GeometryError::Parse {
            line,
            message: format!("'{token}' is not a finite coordinate"),
        })
}
