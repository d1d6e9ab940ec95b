use crate::domain::{RhorError, Spectrum, WallMaterial};
use crate::modules::fit::FitOptions;
use crate::modules::hohlraum::{CorrectionOptions, ThicknessMode, WallGeometry, WallStopping, WallThickness};
use crate::modules::rhor::ShellModelParameters;
use crate::stopping::{StoppingTableError, load_stopping_table};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_ENERGY_SYSTEMATIC_MEV: f64 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("failed to read analysis request '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("analysis request '{path}' is not valid: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    StoppingTable(#[from] StoppingTableError),
}

impl From<RequestError> for RhorError {
    fn from(error: RequestError) -> Self {
        match error {
            RequestError::Read { .. } => RhorError::io_system("IO.REQUEST_READ", error.to_string()),
            RequestError::Parse { .. } => RhorError::input_validation("INPUT.REQUEST", error.to_string()),
            RequestError::StoppingTable(error) => error.into(),
        }
    }
}

/// Hohlraum wall seen by the detector: polylines plus line-of-sight angle
/// range, or a thickness measured elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallSource {
    Geometry {
        layers: WallGeometry,
        theta_min_deg: f64,
        theta_max_deg: f64,
    },
    Thickness(WallThickness),
}

impl WallSource {
    pub fn thickness_mode(&self) -> ThicknessMode {
        match self {
            Self::Geometry {
                layers,
                theta_min_deg,
                theta_max_deg,
            } => ThicknessMode::FromWall {
                geometry: layers.clone(),
                theta_min_deg: *theta_min_deg,
                theta_max_deg: *theta_max_deg,
            },
            Self::Thickness(thickness) => ThicknessMode::FromExplicitThickness(*thickness),
        }
    }
}

/// Optional stopping tables replacing the built-in wall stopping per
/// material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoppingTablePaths {
    #[serde(rename = "Au")]
    pub au: Option<PathBuf>,
    #[serde(rename = "DU")]
    pub du: Option<PathBuf>,
    #[serde(rename = "Al")]
    pub al: Option<PathBuf>,
}

impl StoppingTablePaths {
    fn entries(&self) -> [(WallMaterial, Option<&PathBuf>); 3] {
        [
            (WallMaterial::Au, self.au.as_ref()),
            (WallMaterial::Du, self.du.as_ref()),
            (WallMaterial::Al, self.al.as_ref()),
        ]
    }

    /// Relative paths are taken relative to `base`.
    pub fn resolved_against(&self, base: &Path) -> Self {
        let resolve = |path: &Option<PathBuf>| {
            path.as_ref().map(|path| {
                if path.is_relative() {
                    base.join(path)
                } else {
                    path.clone()
                }
            })
        };
        Self {
            au: resolve(&self.au),
            du: resolve(&self.du),
            al: resolve(&self.al),
        }
    }

    pub fn load(&self) -> Result<WallStopping, StoppingTableError> {
        let mut stopping = WallStopping::default();
        for (material, path) in self.entries() {
            if let Some(path) = path {
                stopping = stopping.with_material(material, Arc::new(load_stopping_table(path)?));
            }
        }
        Ok(stopping)
    }
}

/// Everything one shot analysis needs. Only `spectrum` is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub spectrum: Spectrum,
    #[serde(default)]
    pub wall: Option<WallSource>,
    /// `[amplitude, mean, sigma]`; estimated from the spectrum when absent.
    #[serde(default)]
    pub guess: Option<[f64; 3]>,
    #[serde(default)]
    pub fit: FitOptions,
    #[serde(default)]
    pub correction: CorrectionOptions,
    #[serde(default)]
    pub shell: ShellModelParameters,
    /// Energy calibration systematic (MeV).
    #[serde(default = "default_energy_systematic")]
    pub energy_systematic_mev: f64,
    #[serde(default)]
    pub stopping_tables: StoppingTablePaths,
}

fn default_energy_systematic() -> f64 {
    DEFAULT_ENERGY_SYSTEMATIC_MEV
}

impl AnalysisRequest {
    pub fn new(spectrum: Spectrum) -> Self {
        Self {
            spectrum,
            wall: None,
            guess: None,
            fit: FitOptions::default(),
            correction: CorrectionOptions::default(),
            shell: ShellModelParameters::default(),
            energy_systematic_mev: DEFAULT_ENERGY_SYSTEMATIC_MEV,
            stopping_tables: StoppingTablePaths::default(),
        }
    }

    pub fn with_wall(mut self, wall: WallSource) -> Self {
        self.wall = Some(wall);
        self
    }
}

/// Read a JSON request; stopping-table paths resolve against the request's
/// directory.
pub fn load_analysis_request(path: &Path) -> Result<AnalysisRequest, RequestError> {
    let source = std::fs::read_to_string(path).map_err(|source| RequestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut request: AnalysisRequest =
        serde_json::from_str(&source).map_err(|source| RequestError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    request.stopping_tables = request.stopping_tables.resolved_against(base);
    tracing::debug!(
        path = %path.display(),
        bins = request.spectrum.len(),
        wall = request.wall.is_some(),
        "loaded analysis request"
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::{AnalysisRequest, RequestError, StoppingTablePaths, WallSource, load_analysis_request};
    use crate::domain::{RhorError, RhorErrorCategory, WallMaterial};
    use crate::modules::hohlraum::ThicknessMode;
    use crate::modules::rhor::ShellParameter;
    use crate::stopping::StoppingPower;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const MINIMAL: &str = r#"{"spectrum": [
        {"energy": 10.0, "yield": 1.0, "error": 1.0},
        {"energy": 10.5, "yield": 3.0, "error": 1.5}
    ]}"#;

    #[test]
    fn minimal_request_takes_defaults() {
        let request: AnalysisRequest = serde_json::from_str(MINIMAL).expect("request should parse");
        assert_eq!(request.spectrum.len(), 2);
        assert!(request.wall.is_none());
        assert_eq!(request.energy_systematic_mev, 0.1);
        assert_eq!(request.shell.value(ShellParameter::InnerRadius), 0.09);
        assert_eq!(request.correction.angle_samples, 25);
    }

    #[test]
    fn wall_accepts_explicit_thickness_or_geometry() {
        let source = r#"{
            "spectrum": [{"energy": 10.0, "yield": 1.0, "error": 1.0}],
            "wall": {"thickness": {"au": 12.0, "au_unc": 1.0}},
            "shell": {"P0": {"value": 30.0, "sigma": 1.0}}
        }"#;
        let request: AnalysisRequest = serde_json::from_str(source).expect("request should parse");
        let Some(WallSource::Thickness(thickness)) = request.wall else {
            panic!("expected explicit thickness");
        };
        assert_eq!(thickness.thickness(WallMaterial::Au), 12.0);
        assert_eq!(thickness.al, 0.0);
        assert_eq!(request.shell.value(ShellParameter::FillPressure), 30.0);

        let source = r#"{
            "spectrum": [{"energy": 10.0, "yield": 1.0, "error": 1.0}],
            "wall": {"geometry": {
                "layers": [
                    {"index": 0, "material": "Au", "points": [[0.28, -1.0], [0.28, 1.0]]},
                    {"index": 1, "material": "Au", "points": [[0.29, -1.0], [0.29, 1.0]]}
                ],
                "theta_min_deg": 80.0,
                "theta_max_deg": 100.0
            }}
        }"#;
        let request: AnalysisRequest = serde_json::from_str(source).expect("request should parse");
        let mode = request.wall.expect("wall should be present").thickness_mode();
        assert!(matches!(mode, ThicknessMode::FromWall { theta_min_deg, .. } if theta_min_deg == 80.0));
    }

    #[test]
    fn stopping_tables_resolve_relative_to_request() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::write(temp.path().join("al.dat"), "# keV keV/um\n1000 40\n10000 8\n20000 5\n")
            .expect("table should be written");
        let request_path = temp.path().join("request.json");
        let source = MINIMAL.replacen('{', r#"{"stopping_tables": {"Al": "al.dat"},"#, 1);
        fs::write(&request_path, source).expect("request should be written");

        let request = load_analysis_request(&request_path).expect("request should load");
        assert_eq!(request.stopping_tables.al, Some(temp.path().join("al.dat")));
        let stopping = request.stopping_tables.load().expect("tables should load");
        let dedx = stopping.for_material(WallMaterial::Al).dedx(10.0);
        assert!((dedx - 0.008).abs() < 1.0e-12);
    }

    #[test]
    fn absolute_paths_are_kept() {
        let paths = StoppingTablePaths {
            au: Some(PathBuf::from("/data/au.dat")),
            ..StoppingTablePaths::default()
        };
        let resolved = paths.resolved_against(Path::new("/requests"));
        assert_eq!(resolved.au, Some(PathBuf::from("/data/au.dat")));
        assert_eq!(resolved.du, None);
    }

    #[test]
    fn unreadable_and_malformed_requests_map_to_categories() {
        let temp = TempDir::new().expect("tempdir should be created");
        let missing = load_analysis_request(&temp.path().join("missing.json")).expect_err("missing file");
        assert!(matches!(missing, RequestError::Read { .. }));
        assert_eq!(RhorError::from(missing).category(), RhorErrorCategory::IoSystemError);

        let path = temp.path().join("bad.json");
        fs::write(&path, r#"{"spectrum": [{"energy": 2.0, "yield": 1, "error": 1}, {"energy": 1.0, "yield": 1, "error": 1}]}"#)
            .expect("request should be written");
        let error = load_analysis_request(&path).expect_err("decreasing energies");
        assert!(error.to_string().contains("strictly increasing"));
        assert_eq!(RhorError::from(error).category(), RhorErrorCategory::InputValidationError);
    }
}
