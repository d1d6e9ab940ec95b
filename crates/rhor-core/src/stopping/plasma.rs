use super::StoppingPower;
use crate::common::Species;
use crate::common::constants::{
    AMU, E_CHARGE_SQ, ERG_PER_KEV, ERG_PER_MEV, HBAR, M_ELECTRON, M_PROTON_AMU, PI, UM_PER_CM,
};
use crate::numerics::{chandrasekhar_mu, chandrasekhar_mu_derivative, stable_sum};

const MIN_TEMPERATURE_KEV: f64 = 1.0e-3;
/// Field species lighter than this (amu) are treated as electrons.
const ELECTRON_MASS_CUTOFF_AMU: f64 = 0.01;
const COLLECTIVE_FACTOR: f64 = 1.123;

/// One thermal population of the background plasma.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpecies {
    /// Number density, cm^-3.
    pub density: f64,
    pub charge: f64,
    pub mass_amu: f64,
    pub temperature_kev: f64,
}

impl FieldSpecies {
    pub fn new(density: f64, charge: f64, mass_amu: f64, temperature_kev: f64) -> Self {
        Self {
            density,
            charge,
            mass_amu,
            temperature_kev,
        }
    }

    pub fn ion(species: Species, density: f64, temperature_kev: f64) -> Self {
        Self::new(density, species.charge, species.mass_amu, temperature_kev)
    }

    pub fn electrons(density: f64, temperature_kev: f64) -> Self {
        Self::new(density, -1.0, M_ELECTRON / AMU, temperature_kev)
    }

    pub fn is_electron(&self) -> bool {
        self.mass_amu < ELECTRON_MASS_CUTOFF_AMU
    }

    fn temperature_erg(&self) -> f64 {
        self.temperature_kev.max(MIN_TEMPERATURE_KEV) * ERG_PER_KEV
    }

    fn mass_g(&self) -> f64 {
        self.mass_amu * AMU
    }
}

/// Li-Petrasso stopping of a fast ion in a fully ionized multi-species
/// plasma.
#[derive(Debug, Clone, PartialEq)]
pub struct PlasmaStopping {
    test_charge: f64,
    test_mass_amu: f64,
    field: Vec<FieldSpecies>,
    debye_length: f64,
}

impl PlasmaStopping {
    /// Proton stopping in the given field populations. Species with
    /// non-positive density are dropped.
    pub fn new(field: Vec<FieldSpecies>) -> Self {
        Self::with_test_particle(1.0, M_PROTON_AMU, field)
    }

    pub fn with_test_particle(test_charge: f64, test_mass_amu: f64, field: Vec<FieldSpecies>) -> Self {
        let field: Vec<FieldSpecies> = field
            .into_iter()
            .filter(|species| species.density > 0.0 && species.density.is_finite())
            .collect();
        let inverse_square: Vec<f64> = field
            .iter()
            .map(|species| {
                4.0 * PI * species.density * species.charge * species.charge * E_CHARGE_SQ
                    / species.temperature_erg()
            })
            .collect();
        let inverse_square = stable_sum(&inverse_square);
        let debye_length = if inverse_square > 0.0 {
            1.0 / inverse_square.sqrt()
        } else {
            f64::INFINITY
        };

        Self {
            test_charge,
            test_mass_amu,
            field,
            debye_length,
        }
    }

    pub fn field(&self) -> &[FieldSpecies] {
        &self.field
    }

    /// Total Debye length (cm), infinite for an empty plasma.
    pub fn debye_length(&self) -> f64 {
        self.debye_length
    }

    /// Coulomb logarithm of the test particle against `species` at test
    /// speed squared `test_v2`, clamped to at least one.
    fn coulomb_log(&self, species: &FieldSpecies, test_v2: f64) -> f64 {
        let test_mass = self.test_mass_amu * AMU;
        let field_mass = species.mass_g();
        let reduced_mass = test_mass * field_mass / (test_mass + field_mass);
        let relative_v2 = test_v2 + 2.0 * species.temperature_erg() / field_mass;

        let classical =
            (self.test_charge * species.charge).abs() * E_CHARGE_SQ / (reduced_mass * relative_v2);
        let quantum = HBAR / (2.0 * reduced_mass * relative_v2.sqrt());
        let impact_min = (classical * classical + quantum * quantum).sqrt();
        (self.debye_length / impact_min).ln().max(1.0)
    }

    /// Energy loss rate (erg/cm) against one population.
    fn species_dedx(&self, species: &FieldSpecies, test_v2: f64) -> f64 {
        let field_mass = species.mass_g();
        let field_v2 = 2.0 * species.temperature_erg() / field_mass;
        let x = test_v2 / field_v2;
        let plasma_frequency_sq =
            4.0 * PI * species.density * species.charge * species.charge * E_CHARGE_SQ / field_mass;

        let ln_lambda = self.coulomb_log(species, test_v2);
        let mu = chandrasekhar_mu(x);
        let mu_prime = chandrasekhar_mu_derivative(x);
        let mass_ratio = species.mass_amu / self.test_mass_amu;
        let g = mu - mass_ratio * (mu_prime - (mu + mu_prime) / ln_lambda);

        let mut bracket = g * ln_lambda;
        if species.is_electron() && x > 1.0 {
            bracket += (COLLECTIVE_FACTOR * x.sqrt()).ln();
        }

        self.test_charge * self.test_charge * E_CHARGE_SQ * plasma_frequency_sq / test_v2 * bracket
    }
}

impl StoppingPower for PlasmaStopping {
    fn dedx(&self, energy_mev: f64) -> f64 {
        if energy_mev.is_nan() {
            return f64::NAN;
        }
        if energy_mev <= 0.0 || self.field.is_empty() {
            return 0.0;
        }

        let test_v2 = 2.0 * energy_mev * ERG_PER_MEV / (self.test_mass_amu * AMU);
        let contributions: Vec<f64> = self
            .field
            .iter()
            .map(|species| self.species_dedx(species, test_v2))
            .collect();
        let erg_per_cm = stable_sum(&contributions);
        if erg_per_cm.is_nan() {
            return f64::NAN;
        }
        (erg_per_cm / ERG_PER_MEV / UM_PER_CM).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldSpecies, PlasmaStopping};
    use crate::common::DEUTERIUM;
    use crate::common::constants::AMU;
    use crate::stopping::StoppingPower;

    fn deuterium_plasma(rho: f64, temperature_kev: f64) -> PlasmaStopping {
        let ions = rho / (DEUTERIUM.mass_amu * AMU);
        PlasmaStopping::new(vec![
            FieldSpecies::ion(DEUTERIUM, ions, temperature_kev),
            FieldSpecies::electrons(ions, temperature_kev),
        ])
    }

    #[test]
    fn empty_plasma_does_not_stop() {
        let vacuum = PlasmaStopping::new(Vec::new());
        assert_eq!(vacuum.dedx(14.7), 0.0);
        assert_eq!(vacuum.eout(14.7, 1.0e3), 14.7);
        assert!(vacuum.debye_length().is_infinite());

        let zero_density = PlasmaStopping::new(vec![FieldSpecies::electrons(0.0, 1.0)]);
        assert!(zero_density.field().is_empty());
        assert_eq!(zero_density.dedx(14.7), 0.0);
    }

    #[test]
    fn dense_deuterium_stopping_has_expected_magnitude() {
        let plasma = deuterium_plasma(1.0, 1.0);
        let dedx = plasma.dedx(14.7);
        assert!(dedx > 2.0e-3 && dedx < 5.0e-3, "dE/dx = {dedx} MeV/um");

        let after = plasma.eout(14.7, 1.0e3);
        assert!(after > 10.0 && after < 12.5, "E after 0.1 g/cm^2 = {after}");
    }

    #[test]
    fn stopping_scales_nearly_linearly_with_density() {
        let single = deuterium_plasma(1.0, 1.0).dedx(14.7);
        let double = deuterium_plasma(2.0, 1.0).dedx(14.7);
        let ratio = double / single;
        assert!(ratio > 1.7 && ratio < 2.0, "density ratio gave {ratio}");
    }

    #[test]
    fn electron_population_is_recognised() {
        assert!(FieldSpecies::electrons(1.0, 1.0).is_electron());
        assert!(!FieldSpecies::ion(DEUTERIUM, 1.0, 1.0).is_electron());
    }

    #[test]
    fn cold_and_slow_limits_stay_finite() {
        let plasma = deuterium_plasma(10.0, 0.0);
        for energy in [0.02, 0.5, 3.0, 14.7] {
            let dedx = plasma.dedx(energy);
            assert!(dedx.is_finite() && dedx >= 0.0, "dE/dx({energy}) = {dedx}");
        }
        assert_eq!(plasma.dedx(0.0), 0.0);
    }
}
