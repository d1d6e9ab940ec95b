pub mod errors;

pub use errors::{RhorError, RhorErrorCategory, RhorResult};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Flat named-value output consumed by persistence and reporting layers.
pub type AnalysisRecord = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WallMaterial {
    Au,
    #[serde(rename = "DU")]
    Du,
    Al,
}

impl WallMaterial {
    pub const ALL: [WallMaterial; 3] = [WallMaterial::Au, WallMaterial::Du, WallMaterial::Al];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Au => "Au",
            Self::Du => "DU",
            Self::Al => "Al",
        }
    }
}

impl Display for WallMaterial {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).as_str())
    }
}

impl FromStr for WallMaterial {
    type Err = RhorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        WallMaterial::ALL
            .into_iter()
            .find(|material| material.as_str().eq_ignore_ascii_case(normalized))
            .ok_or_else(|| {
                RhorError::input_validation(
                    "INPUT.WALL_MATERIAL",
                    format!("unknown wall material '{normalized}', expected Au, DU or Al"),
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectrumBin {
    /// Bin centre energy (MeV).
    pub energy: f64,
    /// Differential yield (protons / MeV).
    #[serde(rename = "yield")]
    pub yield_per_mev: f64,
    #[serde(rename = "error")]
    pub stat_error: f64,
}

impl SpectrumBin {
    pub const fn new(energy: f64, yield_per_mev: f64, stat_error: f64) -> Self {
        Self {
            energy,
            yield_per_mev,
            stat_error,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpectrumError {
    #[error("spectrum must contain at least one bin")]
    Empty,
    #[error("spectrum bin {index} has a non-finite {field}: {value}")]
    NonFinite {
        index: usize,
        field: &'static str,
        value: f64,
    },
    #[error(
        "spectrum energies must be strictly increasing, bin {index} has {current} after {previous}"
    )]
    NonIncreasingEnergy {
        index: usize,
        previous: f64,
        current: f64,
    },
}

impl From<SpectrumError> for RhorError {
    fn from(error: SpectrumError) -> Self {
        RhorError::input_validation("INPUT.SPECTRUM", error.to_string())
    }
}

/// Binned proton spectrum with strictly increasing bin energies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<SpectrumBin>", into = "Vec<SpectrumBin>")]
pub struct Spectrum {
    bins: Vec<SpectrumBin>,
}

impl Spectrum {
    pub fn new(bins: Vec<SpectrumBin>) -> Result<Self, SpectrumError> {
        if bins.is_empty() {
            return Err(SpectrumError::Empty);
        }

        for (index, bin) in bins.iter().enumerate() {
            for (field, value) in [
                ("energy", bin.energy),
                ("yield", bin.yield_per_mev),
                ("error", bin.stat_error),
            ] {
                if !value.is_finite() {
                    return Err(SpectrumError::NonFinite {
                        index,
                        field,
                        value,
                    });
                }
            }
            if index > 0 {
                let previous = bins[index - 1].energy;
                if bin.energy <= previous {
                    return Err(SpectrumError::NonIncreasingEnergy {
                        index,
                        previous,
                        current: bin.energy,
                    });
                }
            }
        }

        Ok(Self { bins })
    }

    pub fn from_triplets(triplets: &[(f64, f64, f64)]) -> Result<Self, SpectrumError> {
        Self::new(
            triplets
                .iter()
                .map(|&(energy, yield_per_mev, stat_error)| {
                    SpectrumBin::new(energy, yield_per_mev, stat_error)
                })
                .collect(),
        )
    }

    pub fn bins(&self) -> &[SpectrumBin] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn energies(&self) -> Vec<f64> {
        self.bins.iter().map(|bin| bin.energy).collect()
    }

    /// Half of the spacing to the next bin; the last bin reuses the previous
    /// spacing. NaN for a single-bin spectrum.
    pub fn half_width(&self, index: usize) -> f64 {
        let count = self.bins.len();
        if count < 2 || index >= count {
            return f64::NAN;
        }
        let spacing = if index + 1 < count {
            self.bins[index + 1].energy - self.bins[index].energy
        } else {
            self.bins[index].energy - self.bins[index - 1].energy
        };
        0.5 * spacing
    }

    /// Integrated yield, sum of `yield * bin width`.
    pub fn total_yield(&self) -> f64 {
        self.bins
            .iter()
            .enumerate()
            .map(|(index, bin)| bin.yield_per_mev * 2.0 * self.half_width(index))
            .filter(|value| value.is_finite())
            .sum()
    }

    /// Yield-weighted mean energy, NaN when the spectrum carries no yield.
    pub fn mean_energy(&self) -> f64 {
        let mut weighted = 0.0;
        let mut total = 0.0;
        for bin in &self.bins {
            weighted += bin.energy * bin.yield_per_mev;
            total += bin.yield_per_mev;
        }
        if total == 0.0 {
            f64::NAN
        } else {
            weighted / total
        }
    }
}

impl TryFrom<Vec<SpectrumBin>> for Spectrum {
    type Error = SpectrumError;

    fn try_from(bins: Vec<SpectrumBin>) -> Result<Self, Self::Error> {
        Spectrum::new(bins)
    }
}

impl From<Spectrum> for Vec<SpectrumBin> {
    fn from(spectrum: Spectrum) -> Self {
        spectrum.bins
    }
}

#[cfg(test)]
mod tests {
    use super::{Spectrum, SpectrumBin, SpectrumError, WallMaterial};

    #[test]
    fn spectrum_rejects_non_increasing_energies() {
        let error = Spectrum::from_triplets(&[(10.0, 1.0, 0.1), (10.0, 2.0, 0.1)])
            .expect_err("duplicate energy should be rejected");
        assert_eq!(
            error,
            SpectrumError::NonIncreasingEnergy {
                index: 1,
                previous: 10.0,
                current: 10.0,
            }
        );
        assert_eq!(Spectrum::new(Vec::new()), Err(SpectrumError::Empty));
    }

    #[test]
    fn spectrum_rejects_non_finite_values() {
        let error = Spectrum::new(vec![SpectrumBin::new(1.0, f64::NAN, 0.1)])
            .expect_err("NaN yield should be rejected");
        assert!(matches!(
            error,
            SpectrumError::NonFinite { index: 0, field: "yield", .. }
        ));
    }

    #[test]
    fn half_width_reuses_previous_spacing_for_last_bin() {
        let spectrum =
            Spectrum::from_triplets(&[(10.0, 1.0, 0.1), (10.5, 1.0, 0.1), (10.75, 1.0, 0.1)])
                .expect("spectrum");
        assert_eq!(spectrum.half_width(0), 0.25);
        assert_eq!(spectrum.half_width(1), 0.125);
        assert_eq!(spectrum.half_width(2), 0.125);
        assert!(spectrum.half_width(3).is_nan());
    }

    #[test]
    fn total_yield_and_mean_use_bin_widths() {
        let spectrum =
            Spectrum::from_triplets(&[(9.0, 2.0, 0.1), (10.0, 4.0, 0.1), (11.0, 2.0, 0.1)])
                .expect("spectrum");
        assert!((spectrum.total_yield() - 8.0).abs() < 1.0e-12);
        assert!((spectrum.mean_energy() - 10.0).abs() < 1.0e-12);
    }

    #[test]
    fn spectrum_round_trips_through_json_bins() {
        let json = r#"[{"energy": 10.0, "yield": 3.0, "error": 0.5},
                       {"energy": 10.2, "yield": 4.0, "error": 0.5}]"#;
        let spectrum: Spectrum = serde_json::from_str(json).expect("spectrum should parse");
        assert_eq!(spectrum.len(), 2);
        assert_eq!(spectrum.bins()[1].yield_per_mev, 4.0);

        let invalid = r#"[{"energy": 10.0, "yield": 3.0, "error": 0.5},
                          {"energy": 9.0, "yield": 4.0, "error": 0.5}]"#;
        assert!(serde_json::from_str::<Spectrum>(invalid).is_err());
    }

    #[test]
    fn wall_material_parses_case_insensitively() {
        assert_eq!("du".parse::<WallMaterial>().expect("DU"), WallMaterial::Du);
        assert_eq!(" Au ".parse::<WallMaterial>().expect("Au"), WallMaterial::Au);
        assert!("Pb".parse::<WallMaterial>().is_err());
        assert_eq!(WallMaterial::Du.to_string(), "DU");
    }
}
