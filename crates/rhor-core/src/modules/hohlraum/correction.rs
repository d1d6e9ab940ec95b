use super::CorrectionOptions;
use super::geometry::{GeometryError, WallGeometry};
use super::thickness::{WallThickness, compute_wall_thickness};
use crate::domain::{RhorError, Spectrum, SpectrumBin, SpectrumError, WallMaterial};
use crate::modules::fit::{FitError, FitOptions, best_fit};
use crate::stopping::{BetheStopping, SharedStopping};
use std::sync::Arc;

/// Order in which a detected proton is traced back through the wall.
const UPSTREAM_ORDER: [WallMaterial; 3] = [WallMaterial::Al, WallMaterial::Du, WallMaterial::Au];

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CorrectionError {
    #[error("hohlraum correction needs at least 2 bins to infer bin widths")]
    SingleBin,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error("corrected spectrum is invalid: {0}")]
    Spectrum(#[from] SpectrumError),
    #[error("refit for correction uncertainty failed: {0}")]
    Fit(#[from] FitError),
}

impl From<CorrectionError> for RhorError {
    fn from(error: CorrectionError) -> Self {
        match error {
            CorrectionError::Geometry(error) => error.into(),
            CorrectionError::Fit(error) => error.into(),
            other => RhorError::computation("RUN.HOHLRAUM_CORRECTION", other.to_string()),
        }
    }
}

/// Stopping models for the three wall materials.
#[derive(Debug, Clone)]
pub struct WallStopping {
    au: SharedStopping,
    du: SharedStopping,
    al: SharedStopping,
}

impl Default for WallStopping {
    fn default() -> Self {
        Self {
            au: Arc::new(BetheStopping::gold()),
            du: Arc::new(BetheStopping::depleted_uranium()),
            al: Arc::new(BetheStopping::aluminum()),
        }
    }
}

impl WallStopping {
    pub fn with_material(mut self, material: WallMaterial, stopping: SharedStopping) -> Self {
        match material {
            WallMaterial::Au => self.au = stopping,
            WallMaterial::Du => self.du = stopping,
            WallMaterial::Al => self.al = stopping,
        }
        self
    }

    pub fn for_material(&self, material: WallMaterial) -> &SharedStopping {
        match material {
            WallMaterial::Au => &self.au,
            WallMaterial::Du => &self.du,
            WallMaterial::Al => &self.al,
        }
    }
}

/// Where the wall thickness comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ThicknessMode {
    FromWall {
        geometry: WallGeometry,
        theta_min_deg: f64,
        theta_max_deg: f64,
    },
    FromExplicitThickness(WallThickness),
}

/// Undoes the energy loss of protons crossing the hohlraum wall.
#[derive(Debug, Clone)]
pub struct HohlraumCorrector {
    thickness: WallThickness,
    stopping: WallStopping,
}

impl HohlraumCorrector {
    pub fn new(
        mode: ThicknessMode,
        stopping: WallStopping,
        options: &CorrectionOptions,
    ) -> Result<Self, CorrectionError> {
        let thickness = match mode {
            ThicknessMode::FromWall {
                geometry,
                theta_min_deg,
                theta_max_deg,
            } => compute_wall_thickness(&geometry, theta_min_deg, theta_max_deg, options)?,
            ThicknessMode::FromExplicitThickness(thickness) => thickness,
        };
        tracing::debug!(
            au_um = thickness.au,
            du_um = thickness.du,
            al_um = thickness.al,
            "hohlraum wall thickness"
        );
        Ok(Self {
            thickness,
            stopping,
        })
    }

    pub fn thickness(&self) -> WallThickness {
        self.thickness
    }

    /// Energy before the wall for a proton detected at `energy_mev`.
    pub fn upstream_energy(&self, energy_mev: f64, thickness: &WallThickness) -> f64 {
        UPSTREAM_ORDER.into_iter().fold(energy_mev, |energy, material| {
            self.stopping
                .for_material(material)
                .ein(energy, thickness.thickness(material))
        })
    }

    pub fn correct(&self, spectrum: &Spectrum) -> Result<Spectrum, CorrectionError> {
        self.correct_with(spectrum, &self.thickness)
    }

    /// Maps every bin centre and edge upstream and rescales the yield by the
    /// change in bin width.
    pub fn correct_with(
        &self,
        spectrum: &Spectrum,
        thickness: &WallThickness,
    ) -> Result<Spectrum, CorrectionError> {
        if spectrum.len() < 2 {
            return Err(CorrectionError::SingleBin);
        }
        if thickness.is_zero() {
            return Ok(spectrum.clone());
        }

        let bins = spectrum
            .bins()
            .iter()
            .enumerate()
            .map(|(index, bin)| {
                let half_width = spectrum.half_width(index);
                let energy = self.upstream_energy(bin.energy, thickness);
                let low = self.upstream_energy(bin.energy - half_width, thickness);
                let high = self.upstream_energy(bin.energy + half_width, thickness);
                let width_ratio = 2.0 * half_width / (high - low);

                let yield_per_mev = bin.yield_per_mev * width_ratio;
                let stat_error = if bin.yield_per_mev == 0.0 {
                    bin.stat_error
                } else {
                    bin.stat_error * yield_per_mev / bin.yield_per_mev
                };
                SpectrumBin::new(energy, yield_per_mev, stat_error)
            })
            .collect();
        Ok(Spectrum::new(bins)?)
    }

    /// Half the spread of the fitted mean when every wall thickness moves by
    /// one standard deviation, symmetrized about the nominal fit.
    pub fn correction_uncertainty(
        &self,
        spectrum: &Spectrum,
        guess: [f64; 3],
        fit_options: &FitOptions,
    ) -> Result<f64, CorrectionError> {
        if !self.thickness.has_uncertainty() {
            return Ok(0.0);
        }

        let fitted_mean = |thickness: &WallThickness| -> Result<f64, CorrectionError> {
            let corrected = self.correct_with(spectrum, thickness)?;
            Ok(best_fit(&corrected, guess, fit_options)?[1])
        };
        let nominal = fitted_mean(&self.thickness)?;
        let thicker = fitted_mean(&self.thickness.shifted(1.0))?;
        let thinner = fitted_mean(&self.thickness.shifted(-1.0))?;
        let uncertainty = 0.5 * ((thicker - nominal).abs() + (nominal - thinner).abs());
        tracing::debug!(nominal, thicker, thinner, uncertainty, "hohlraum correction uncertainty");
        Ok(uncertainty)
    }
}

#[cfg(test)]
mod tests {
    use super::{CorrectionError, HohlraumCorrector, ThicknessMode, WallStopping};
    use crate::domain::{Spectrum, SpectrumBin, WallMaterial};
    use crate::modules::fit::{FitOptions, best_fit, gaussian};
    use crate::modules::hohlraum::{CorrectionOptions, WallThickness};
    use crate::stopping::StoppingPower;

    fn gaussian_spectrum(mean: f64) -> Spectrum {
        let bins = (0..81)
            .map(|index| {
                let energy = 6.0 + 0.1 * index as f64;
                let expected = gaussian(energy, 1.0e5, mean, 0.4);
                SpectrumBin::new(energy, expected, (expected + 25.0).sqrt())
            })
            .collect();
        Spectrum::new(bins).expect("spectrum should be valid")
    }

    fn corrector(thickness: WallThickness) -> HohlraumCorrector {
        HohlraumCorrector::new(
            ThicknessMode::FromExplicitThickness(thickness),
            WallStopping::default(),
            &CorrectionOptions::default(),
        )
        .expect("explicit thickness needs no geometry")
    }

    #[test]
    fn zero_thickness_leaves_spectrum_unchanged() {
        let spectrum = gaussian_spectrum(10.0);
        let corrected = corrector(WallThickness::default())
            .correct(&spectrum)
            .expect("correction should succeed");
        for (raw, fixed) in spectrum.bins().iter().zip(corrected.bins()) {
            assert!((raw.energy - fixed.energy).abs() < 1.0e-12);
            assert!((raw.yield_per_mev - fixed.yield_per_mev).abs() < 1.0e-9 * raw.yield_per_mev.max(1.0));
        }
    }

    #[test]
    fn correction_raises_mean_energy() {
        let spectrum = gaussian_spectrum(10.0);
        let hohlraum = corrector(WallThickness::new(10.0, 0.0, 5.0));
        let corrected = hohlraum.correct(&spectrum).expect("correction should succeed");

        let [_, raw_mean, _] =
            best_fit(&spectrum, [1.0e5, 10.0, 0.4], &FitOptions::default()).expect("raw fit");
        let [_, corrected_mean, _] =
            best_fit(&corrected, [1.0e5, 10.4, 0.4], &FitOptions::default()).expect("corrected fit");
        assert!(corrected_mean > raw_mean + 0.1, "{corrected_mean} vs {raw_mean}");

        let expected = WallStopping::default()
            .for_material(WallMaterial::Au)
            .ein(WallStopping::default().for_material(WallMaterial::Al).ein(10.0, 5.0), 10.0);
        assert!((hohlraum.upstream_energy(10.0, &hohlraum.thickness()) - expected).abs() < 1.0e-12);
    }

    #[test]
    fn zero_yield_bins_keep_their_raw_error() {
        let spectrum = Spectrum::from_triplets(&[(9.0, 0.0, 3.0), (10.0, 50.0, 5.0), (11.0, 10.0, 2.0)])
            .expect("spectrum should be valid");
        let corrected = corrector(WallThickness::new(20.0, 0.0, 0.0))
            .correct(&spectrum)
            .expect("correction should succeed");
        assert_eq!(corrected.bins()[0].yield_per_mev, 0.0);
        assert_eq!(corrected.bins()[0].stat_error, 3.0);
        let bin = corrected.bins()[1];
        assert!((bin.stat_error / bin.yield_per_mev - 5.0 / 50.0).abs() < 1.0e-12);
        assert!(bin.yield_per_mev > 50.0);
    }

    #[test]
    fn single_bin_spectrum_is_rejected() {
        let spectrum = Spectrum::from_triplets(&[(10.0, 1.0, 1.0)]).expect("spectrum should be valid");
        let error = corrector(WallThickness::new(5.0, 0.0, 0.0))
            .correct(&spectrum)
            .expect_err("single bin has no width");
        assert_eq!(error, CorrectionError::SingleBin);
    }

    #[test]
    fn correction_uncertainty_tracks_thickness_uncertainty() {
        let spectrum = gaussian_spectrum(10.0);
        let guess = [1.0e5, 10.5, 0.4];
        let options = FitOptions::default();

        let exact = corrector(WallThickness::new(10.0, 0.0, 0.0));
        assert_eq!(
            exact
                .correction_uncertainty(&spectrum, guess, &options)
                .expect("no uncertainty"),
            0.0
        );

        let uncertain = corrector(WallThickness::new(10.0, 0.0, 0.0).with_uncertainties(2.0, 0.0, 0.0));
        let uncertainty = uncertain
            .correction_uncertainty(&spectrum, guess, &options)
            .expect("uncertainty should compute");
        assert!(uncertainty > 0.01 && uncertainty < 0.5, "uncertainty {uncertainty}");
    }
}
