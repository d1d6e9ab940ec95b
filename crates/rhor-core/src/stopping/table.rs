use super::StoppingPower;
use crate::domain::RhorError;
use crate::numerics::interpolate_linear;
use std::path::{Path, PathBuf};

const KEV_PER_MEV: f64 = 1.0e3;

#[derive(Debug, thiserror::Error)]
pub enum StoppingTableError {
    #[error("failed to read stopping table '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stopping table line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("stopping table needs at least 2 rows, got {rows}")]
    TooFewRows { rows: usize },
}

impl From<StoppingTableError> for RhorError {
    fn from(error: StoppingTableError) -> Self {
        match error {
            StoppingTableError::Read { .. } => {
                RhorError::io_system("IO.STOPPING_TABLE", error.to_string())
            }
            _ => RhorError::input_validation("INPUT.STOPPING_TABLE", error.to_string()),
        }
    }
}

/// Stopping power interpolated from a measured or precomputed table.
///
/// Above the last row the last value is held; below the first row the
/// stopping falls off as `sqrt(E)` towards zero.
#[derive(Debug, Clone, PartialEq)]
pub struct TabulatedStopping {
    energies_mev: Vec<f64>,
    dedx_mev_per_um: Vec<f64>,
}

impl TabulatedStopping {
    pub fn new(energies_mev: Vec<f64>, dedx_mev_per_um: Vec<f64>) -> Result<Self, StoppingTableError> {
        let rows = energies_mev.len().min(dedx_mev_per_um.len());
        if rows < 2 || energies_mev.len() != dedx_mev_per_um.len() {
            return Err(StoppingTableError::TooFewRows { rows });
        }
        for index in 1..rows {
            if energies_mev[index] <= energies_mev[index - 1] {
                return Err(StoppingTableError::Parse {
                    line: index + 1,
                    message: format!(
                        "energy {} keV does not increase past {} keV",
                        energies_mev[index] * KEV_PER_MEV,
                        energies_mev[index - 1] * KEV_PER_MEV
                    ),
                });
            }
        }

        Ok(Self {
            energies_mev,
            dedx_mev_per_um,
        })
    }

    pub fn len(&self) -> usize {
        self.energies_mev.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energies_mev.is_empty()
    }

    /// Tabulated energy range in MeV.
    pub fn energy_range(&self) -> (f64, f64) {
        (self.energies_mev[0], self.energies_mev[self.energies_mev.len() - 1])
    }
}

impl StoppingPower for TabulatedStopping {
    fn dedx(&self, energy_mev: f64) -> f64 {
        if energy_mev.is_nan() {
            return f64::NAN;
        }
        if energy_mev <= 0.0 {
            return 0.0;
        }

        let (low, _) = self.energy_range();
        if energy_mev < low {
            return self.dedx_mev_per_um[0] * (energy_mev / low).sqrt();
        }
        interpolate_linear(energy_mev, &self.energies_mev, &self.dedx_mev_per_um)
            .map_or(f64::NAN, |value| value.max(0.0))
    }
}

/// Parse `energy(keV) stopping(keV/um)` rows. Blank lines and `#` comments
/// are skipped; extra columns are ignored.
pub fn parse_stopping_table(source: &str) -> Result<TabulatedStopping, StoppingTableError> {
    let mut energies = Vec::new();
    let mut stopping = Vec::new();
    let mut line_numbers = Vec::new();

    for (index, line) in source.lines().enumerate() {
        let line_number = index + 1;
        let content = line.split('#').next().unwrap_or_default().trim();
        if content.is_empty() {
            continue;
        }

        let mut tokens = content.split_whitespace();
        let (Some(energy_token), Some(stopping_token)) = (tokens.next(), tokens.next()) else {
            return Err(StoppingTableError::Parse {
                line: line_number,
                message: format!("expected two columns, found '{content}'"),
            });
        };
        let energy_kev = parse_numeric_token(energy_token, line_number)?;
        let stopping_kev_per_um = parse_numeric_token(stopping_token, line_number)?;
        if energy_kev <= 0.0 || stopping_kev_per_um < 0.0 {
            return Err(StoppingTableError::Parse {
                line: line_number,
                message: format!(
                    "energy must be positive and stopping non-negative, got {energy_kev} and {stopping_kev_per_um}"
                ),
            });
        }

        energies.push(energy_kev / KEV_PER_MEV);
        stopping.push(stopping_kev_per_um / KEV_PER_MEV);
        line_numbers.push(line_number);
    }

    TabulatedStopping::new(energies, stopping).map_err(|error| match error {
        StoppingTableError::Parse { line, message } => StoppingTableError::Parse {
            line: line_numbers.get(line - 1).copied().unwrap_or(line),
            message,
        },
        other => other,
    })
}

pub fn load_stopping_table(path: &Path) -> Result<TabulatedStopping, StoppingTableError> {
    let source = std::fs::read_to_string(path).map_err(|source| StoppingTableError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_stopping_table(&source)?;
    tracing::debug!(path = %path.display(), rows = table.len(), "loaded stopping table");
    Ok(table)
}

fn parse_numeric_token(token: &str, line: usize) -> Result<f64, StoppingTableError> {
    let normalized = token.trim_end_matches([',', ';']).replace(['D', 'd'], "E");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| StoppingTableError::Parse {
            line,
            message: format!("'{token}' is not a finite number"),
        })
}
