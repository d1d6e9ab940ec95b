use super::StoppingPower;
use crate::common::constants::{BETHE_K, M_ELECTRON_MEV, M_PROTON_MEV, UM_PER_CM};

/// Cold-matter Bethe stopping for protons in a solid.
///
/// Below the energy where the Bethe bracket peaks the formula is no longer
/// meaningful; there the stopping falls off as `sqrt(E)` (velocity-
/// proportional electronic stopping) so it stays finite down to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct BetheStopping {
    name: &'static str,
    z_over_a: f64,
    density: f64,
    mean_excitation_mev: f64,
    peak_energy_mev: f64,
}

impl BetheStopping {
    /// `mean_excitation_ev` is the material's mean excitation energy `I`.
    pub fn new(name: &'static str, z_over_a: f64, density: f64, mean_excitation_ev: f64) -> Self {
        let mean_excitation_mev = mean_excitation_ev * 1.0e-6;
        let peak_beta2 = std::f64::consts::E * mean_excitation_mev / (2.0 * M_ELECTRON_MEV);
        let peak_energy_mev = M_PROTON_MEV * (1.0 / (1.0 - peak_beta2).sqrt() - 1.0);
        Self {
            name,
            z_over_a,
            density,
            mean_excitation_mev,
            peak_energy_mev,
        }
    }

    pub fn gold() -> Self {
        Self::new("Au", 79.0 / 196.967, 19.32, 790.0)
    }

    pub fn depleted_uranium() -> Self {
        Self::new("DU", 92.0 / 238.029, 19.05, 890.0)
    }

    pub fn aluminum() -> Self {
        Self::new("Al", 13.0 / 26.982, 2.699, 166.0)
    }

    pub fn ch() -> Self {
        Self::new("CH", 7.0 / 13.019, 1.044, 64.7)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn peak_energy_mev(&self) -> f64 {
        self.peak_energy_mev
    }

    fn bethe_mev_per_cm(&self, energy_mev: f64) -> f64 {
        let gamma = 1.0 + energy_mev / M_PROTON_MEV;
        let beta2 = 1.0 - 1.0 / (gamma * gamma);
        let argument = 2.0 * M_ELECTRON_MEV * beta2 * gamma * gamma / self.mean_excitation_mev;
        BETHE_K * self.z_over_a * self.density / beta2 * (argument.ln() - beta2)
    }
}

impl StoppingPower for BetheStopping {
    fn dedx(&self, energy_mev: f64) -> f64 {
        if energy_mev.is_nan() {
            return f64::NAN;
        }
        if energy_mev <= 0.0 {
            return 0.0;
        }

        let per_cm = if energy_mev >= self.peak_energy_mev {
            self.bethe_mev_per_cm(energy_mev)
        } else {
            self.bethe_mev_per_cm(self.peak_energy_mev)
                * (energy_mev / self.peak_energy_mev).sqrt()
        };
        (per_cm / UM_PER_CM).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::BetheStopping;
    use crate::stopping::StoppingPower;

    #[test]
    fn gold_stopping_near_ten_mev_matches_tabulated_magnitude() {
        let dedx = BetheStopping::gold().dedx(10.0);
        assert!(dedx > 0.030 && dedx < 0.045, "Au dE/dx at 10 MeV = {dedx}");
    }

    #[test]
    fn stopping_peaks_at_low_energy_and_vanishes_at_zero() {
        let aluminum = BetheStopping::aluminum();
        let peak = aluminum.peak_energy_mev();
        assert!(peak > 0.1 && peak < 0.4);
        assert!(aluminum.dedx(peak) > aluminum.dedx(5.0 * peak));
        assert!(aluminum.dedx(peak) > aluminum.dedx(0.2 * peak));
        assert_eq!(aluminum.dedx(0.0), 0.0);
        assert!(aluminum.dedx(f64::NAN).is_nan());
    }

    #[test]
    fn stopping_is_continuous_at_the_peak() {
        let gold = BetheStopping::gold();
        let peak = gold.peak_energy_mev();
        let below = gold.dedx(peak * (1.0 - 1.0e-9));
        let above = gold.dedx(peak * (1.0 + 1.0e-9));
        assert!((below - above).abs() / above < 1.0e-6);
    }

    #[test]
    fn thin_layers_downshift_and_ein_reverses() {
        let gold = BetheStopping::gold();
        let after = gold.eout(12.0, 25.0);
        assert!(after < 12.0 && after > 10.0);
        let before = gold.ein(after, 25.0);
        assert!((before - 12.0).abs() < 1.0e-3);
        assert_eq!(gold.eout(3.0, 1.0e4), 0.0);
    }

    #[test]
    fn plastic_is_far_less_stopping_than_gold_per_micron() {
        let plastic = BetheStopping::ch();
        let dedx = plastic.dedx(10.0);
        assert!(dedx > 0.004 && dedx < 0.0055, "CH dE/dx at 10 MeV = {dedx}");
        assert!(dedx < 0.2 * BetheStopping::gold().dedx(10.0));
        assert_eq!(plastic.name(), "CH");
        assert_eq!(plastic.density(), 1.044);
    }
}
