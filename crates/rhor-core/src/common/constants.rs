//! Physical constants (CGS unless noted) shared by the stopping-power and
//! capsule models.

pub const PI: f64 = std::f64::consts::PI;
pub const FOUR_THIRDS_PI: f64 = 4.0 * PI / 3.0;
pub const DEG2RAD: f64 = PI / 180.0;

/// Elementary charge squared, erg cm.
pub const E_CHARGE_SQ: f64 = 2.307_077_552e-19;
/// Reduced Planck constant, erg s.
pub const HBAR: f64 = 1.054_571_817e-27;
/// Speed of light, cm/s.
pub const C_LIGHT: f64 = 2.997_924_58e10;
/// Atomic mass unit, g.
pub const AMU: f64 = 1.660_539_066_6e-24;
/// Electron mass, g.
pub const M_ELECTRON: f64 = 9.109_383_7e-28;
/// Electron rest energy, MeV.
pub const M_ELECTRON_MEV: f64 = 0.510_998_95;
/// Proton rest energy, MeV.
pub const M_PROTON_MEV: f64 = 938.272_088;
/// Proton mass, amu.
pub const M_PROTON_AMU: f64 = 1.007_276_467;
pub const AVOGADRO: f64 = 6.022_140_76e23;
/// Loschmidt number, molecules / cm^3 / atm at 0 C.
pub const LOSCHMIDT: f64 = 2.686_780_1e19;

pub const ERG_PER_MEV: f64 = 1.602_176_634e-6;
pub const ERG_PER_KEV: f64 = 1.602_176_634e-9;
pub const UM_PER_CM: f64 = 1.0e4;
pub const MG_PER_G: f64 = 1.0e3;

/// Bethe prefactor `4 pi N_A r_e^2 m_e c^2`, MeV cm^2 / mol.
pub const BETHE_K: f64 = 0.307_075;

#[cfg(test)]
mod tests {
    use super::{
        AMU, AVOGADRO, C_LIGHT, DEG2RAD, ERG_PER_KEV, ERG_PER_MEV, FOUR_THIRDS_PI, M_ELECTRON,
        M_ELECTRON_MEV, PI,
    };

    #[test]
    fn derived_constants_are_consistent() {
        assert!((FOUR_THIRDS_PI * 3.0 / 4.0 - PI).abs() < 1.0e-15);
        assert!((DEG2RAD * 180.0 - PI).abs() < 1.0e-15);
        assert!((ERG_PER_MEV / ERG_PER_KEV - 1.0e3).abs() < 1.0e-9);
        assert!((AMU * AVOGADRO - 1.0).abs() < 1.0e-6);
    }

    #[test]
    fn electron_rest_energy_matches_mass() {
        let rest_energy_mev = M_ELECTRON * C_LIGHT * C_LIGHT / ERG_PER_MEV;
        assert!((rest_energy_mev - M_ELECTRON_MEV).abs() < 1.0e-6);
    }
}
