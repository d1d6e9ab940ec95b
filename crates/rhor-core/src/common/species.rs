//! Ion species and compound compositions used by the capsule model.

use super::constants::AMU;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Species {
    pub symbol: &'static str,
    /// Nuclear charge (fully ionized).
    pub charge: f64,
    pub mass_amu: f64,
}

pub const HYDROGEN: Species = Species {
    symbol: "H",
    charge: 1.0,
    mass_amu: 1.007_825,
};

pub const DEUTERIUM: Species = Species {
    symbol: "D",
    charge: 1.0,
    mass_amu: 2.014_102,
};

pub const HELIUM3: Species = Species {
    symbol: "3He",
    charge: 2.0,
    mass_amu: 3.016_029,
};

pub const CARBON: Species = Species {
    symbol: "C",
    charge: 6.0,
    mass_amu: 12.0,
};

/// Fixed atomic-fraction mixture of species.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Compound {
    pub name: &'static str,
    pub components: &'static [(Species, f64)],
    /// Room-temperature solid density, g/cm^3.
    pub solid_density: f64,
}

/// Plastic ablator, equal H and C atomic fractions.
pub const CH: Compound = Compound {
    name: "CH",
    components: &[(HYDROGEN, 0.5), (CARBON, 0.5)],
    solid_density: 1.044,
};

impl Compound {
    pub fn mean_mass_amu(&self) -> f64 {
        self.components
            .iter()
            .map(|(species, fraction)| species.mass_amu * fraction)
            .sum()
    }

    pub fn mean_charge(&self) -> f64 {
        self.components
            .iter()
            .map(|(species, fraction)| species.charge * fraction)
            .sum()
    }

    /// Atom number density (cm^-3) at mass density `rho` (g/cm^3).
    pub fn atom_density(&self, rho: f64) -> f64 {
        rho / (self.mean_mass_amu() * AMU)
    }

    /// Per-species ion densities at mass density `rho`.
    pub fn ion_densities(&self, rho: f64) -> Vec<(Species, f64)> {
        let atoms = self.atom_density(rho);
        self.components
            .iter()
            .map(|&(species, fraction)| (species, atoms * fraction))
            .collect()
    }

    pub fn electron_density(&self, rho: f64) -> f64 {
        self.atom_density(rho) * self.mean_charge()
    }
}

#[cfg(test)]
mod tests {
    use super::{CH, DEUTERIUM, HELIUM3};

    #[test]
    fn ch_composition_is_normalized() {
        let total: f64 = CH.components.iter().map(|(_, fraction)| fraction).sum();
        assert!((total - 1.0).abs() < 1.0e-12);
        assert!((CH.mean_charge() - 3.5).abs() < 1.0e-12);
        assert!((CH.mean_mass_amu() - 6.503_912_5).abs() < 1.0e-9);
    }

    #[test]
    fn ch_electron_density_at_solid_density() {
        let electrons = CH.electron_density(CH.solid_density);
        assert!(electrons > 3.3e23 && electrons < 3.5e23);
        let ions: f64 = CH
            .ion_densities(1.0)
            .iter()
            .map(|(species, density)| species.charge * density)
            .sum();
        assert!((ions - CH.electron_density(1.0)).abs() / ions < 1.0e-12);
    }

    #[test]
    fn fuel_species_charges() {
        assert_eq!(DEUTERIUM.charge, 1.0);
        assert_eq!(HELIUM3.charge, 2.0);
    }
}
