use super::params::{ShellModelParameters, ShellParameter};
use crate::common::constants::{AMU, FOUR_THIRDS_PI, LOSCHMIDT, PI, UM_PER_CM};
use crate::common::{CH, DEUTERIUM, HELIUM3};
use crate::stopping::{FieldSpecies, PlasmaStopping, StoppingPower};

/// Slices per region in the energy-loss integration.
pub const STEPS_PER_REGION: usize = 100;

/// Radii (cm) and densities (g/cm^3) of the compressed capsule at one
/// shell radius.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressedProfile {
    pub rcm: f64,
    pub inner_radius: f64,
    pub outer_radius: f64,
    /// End of the exponential ablator ramp.
    pub ramp_radius: f64,
    /// End of the constant-density ablator tail.
    pub tail_radius: f64,
    pub rho_gas: f64,
    pub rho_mix: f64,
    pub rho_shell: f64,
}

/// Layered capsule: fuel with mixed-in shell material, a dense shell, and
/// an ablated plasma that falls off exponentially before a flat tail.
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardRhoRModel {
    params: ShellModelParameters,
    shell_mass: f64,
    fuel_mass: f64,
    fill_ion_density: f64,
}

impl ForwardRhoRModel {
    pub fn new(params: ShellModelParameters) -> Self {
        use ShellParameter::*;

        let inner = params.value(InnerRadius);
        let outer = params.value(OuterRadius);
        let shell_mass = CH.solid_density * FOUR_THIRDS_PI * (outer.powi(3) - inner.powi(3));

        // D2 is diatomic, 3He monatomic: one gas particle per fD/2 + f3He ions.
        let particles_per_ion = 0.5 * params.value(DeuteriumFraction) + params.value(Helium3Fraction);
        let fill_ion_density = LOSCHMIDT * params.value(FillPressure) / particles_per_ion;
        let mass_per_ion = (params.value(DeuteriumFraction) * DEUTERIUM.mass_amu
            + params.value(Helium3Fraction) * HELIUM3.mass_amu)
            * AMU;
        let fuel_mass = fill_ion_density * mass_per_ion * FOUR_THIRDS_PI * inner.powi(3);

        Self {
            params,
            shell_mass,
            fuel_mass,
            fill_ion_density,
        }
    }

    pub fn params(&self) -> &ShellModelParameters {
        &self.params
    }

    /// Initial shell mass (g).
    pub fn shell_mass(&self) -> f64 {
        self.shell_mass
    }

    pub fn fuel_mass(&self) -> f64 {
        self.fuel_mass
    }

    pub fn mix_mass(&self) -> f64 {
        self.params.value(ShellParameter::MixFraction) * self.shell_mass
    }

    pub fn remaining_shell_mass(&self) -> f64 {
        self.params.value(ShellParameter::RemainingMass) * self.shell_mass
    }

    pub fn ablated_mass(&self) -> f64 {
        let remaining = self.params.value(ShellParameter::RemainingMass);
        let mix = self.params.value(ShellParameter::MixFraction);
        ((1.0 - remaining - mix) * self.shell_mass).max(0.0)
    }

    /// Compressed layout at shell radius `rcm` (cm); `None` when the shell
    /// would reach the centre.
    pub fn profile(&self, rcm: f64) -> Option<CompressedProfile> {
        use ShellParameter::*;

        let half_shell = 0.5 * self.params.value(ShellThickness);
        if !(rcm > half_shell) || !rcm.is_finite() {
            return None;
        }
        let inner_radius = rcm - half_shell;
        let outer_radius = rcm + half_shell;
        let fuel_volume = FOUR_THIRDS_PI * inner_radius.powi(3);
        let shell_volume = FOUR_THIRDS_PI * (outer_radius.powi(3) - inner_radius.powi(3));

        let (ramp_radius, tail_radius) = self.ablator_radii(outer_radius);
        Some(CompressedProfile {
            rcm,
            inner_radius,
            outer_radius,
            ramp_radius,
            tail_radius,
            rho_gas: self.fuel_mass / fuel_volume,
            rho_mix: self.mix_mass() / fuel_volume,
            rho_shell: self.remaining_shell_mass() / shell_volume,
        })
    }

    fn ablator_radii(&self, outer_radius: f64) -> (f64, f64) {
        use ShellParameter::*;

        let ablated = self.ablated_mass();
        if ablated <= 0.0 {
            return (outer_radius, outer_radius);
        }
        let peak = self.params.value(AblatorPeakDensity);
        let floor = self.params.value(AblatorFloorDensity);
        let scale = self.params.value(AblatorScaleLength);

        let ramp_radius = outer_radius + scale * (peak / floor).ln().max(0.0);
        let ramp_mass = exponential_shell_mass(peak, scale, outer_radius, ramp_radius);
        if ramp_mass >= ablated {
            return (ramp_radius, ramp_radius);
        }
        let tail_radius =
            (ramp_radius.powi(3) + 3.0 * (ablated - ramp_mass) / (4.0 * PI * floor)).cbrt();
        (ramp_radius, tail_radius)
    }

    pub fn rho_gas(&self, rcm: f64) -> f64 {
        self.profile(rcm).map_or(f64::NAN, |profile| profile.rho_gas)
    }

    pub fn rho_mix(&self, rcm: f64) -> f64 {
        self.profile(rcm).map_or(f64::NAN, |profile| profile.rho_mix)
    }

    pub fn rho_shell(&self, rcm: f64) -> f64 {
        self.profile(rcm).map_or(f64::NAN, |profile| profile.rho_shell)
    }

    /// Ablated plasma density at radius `r`, zero outside the ablator.
    pub fn rho_abl(&self, rcm: f64, r: f64) -> f64 {
        let Some(profile) = self.profile(rcm) else {
            return f64::NAN;
        };
        self.ablator_density(&profile, r)
    }

    fn ablator_density(&self, profile: &CompressedProfile, r: f64) -> f64 {
        let peak = self.params.value(ShellParameter::AblatorPeakDensity);
        let floor = self.params.value(ShellParameter::AblatorFloorDensity);
        let scale = self.params.value(ShellParameter::AblatorScaleLength);
        if profile.tail_radius <= profile.outer_radius
            || r < profile.outer_radius
            || r > profile.tail_radius
        {
            0.0
        } else if r <= profile.ramp_radius {
            peak * (-(r - profile.outer_radius) / scale).exp()
        } else {
            floor
        }
    }

    /// Deuterium ion density (cm^-3) in the compressed fuel.
    pub fn n_d(&self, rcm: f64) -> f64 {
        self.fuel_ion_density(rcm) * self.params.value(ShellParameter::DeuteriumFraction)
    }

    pub fn n_he3(&self, rcm: f64) -> f64 {
        self.fuel_ion_density(rcm) * self.params.value(ShellParameter::Helium3Fraction)
    }

    /// Electron density of the fuel and the mix together.
    pub fn n_e_gas(&self, rcm: f64) -> f64 {
        let fuel = self.n_d(rcm) * DEUTERIUM.charge + self.n_he3(rcm) * HELIUM3.charge;
        fuel + CH.electron_density(self.rho_mix(rcm))
    }

    pub fn n_e_shell(&self, rcm: f64) -> f64 {
        CH.electron_density(self.rho_shell(rcm))
    }

    fn fuel_ion_density(&self, rcm: f64) -> f64 {
        let Some(profile) = self.profile(rcm) else {
            return f64::NAN;
        };
        let compression = (self.params.value(ShellParameter::InnerRadius) / profile.inner_radius).powi(3);
        self.fill_ion_density * compression
    }

    /// Areal densities in g/cm^2.
    pub fn rhor_gas(&self, rcm: f64) -> f64 {
        self.profile(rcm)
            .map_or(f64::NAN, |profile| profile.rho_gas * profile.inner_radius)
    }

    pub fn rhor_mix(&self, rcm: f64) -> f64 {
        self.profile(rcm)
            .map_or(f64::NAN, |profile| profile.rho_mix * profile.inner_radius)
    }

    pub fn rhor_shell(&self, rcm: f64) -> f64 {
        self.profile(rcm).map_or(f64::NAN, |profile| {
            profile.rho_shell * (profile.outer_radius - profile.inner_radius)
        })
    }

    pub fn rhor_abl(&self, rcm: f64) -> f64 {
        use ShellParameter::*;

        let Some(profile) = self.profile(rcm) else {
            return f64::NAN;
        };
        let peak = self.params.value(AblatorPeakDensity);
        let floor = self.params.value(AblatorFloorDensity);
        let scale = self.params.value(AblatorScaleLength);
        let ramp = profile.ramp_radius - profile.outer_radius;
        let tail = profile.tail_radius - profile.ramp_radius;
        if ramp <= 0.0 && tail <= 0.0 {
            return 0.0;
        }
        peak * scale * (1.0 - (-ramp / scale).exp()) + floor * tail
    }

    pub fn rhor_total(&self, rcm: f64) -> f64 {
        self.rhor_gas(rcm) + self.rhor_mix(rcm) + self.rhor_shell(rcm) + self.rhor_abl(rcm)
    }

    /// `(fuel + mix, shell, ablator)`; the parts add up to
    /// [`rhor_total`](Self::rhor_total) exactly.
    pub fn rhor_parts(&self, rcm: f64) -> (f64, f64, f64) {
        (
            self.rhor_gas(rcm) + self.rhor_mix(rcm),
            self.rhor_shell(rcm),
            self.rhor_abl(rcm),
        )
    }

    /// Proton energy (MeV) after crossing the capsule from the centre,
    /// zero once ranged out or for an unphysical `rcm`.
    pub fn eout(&self, rcm: f64) -> f64 {
        use ShellParameter::*;

        let Some(profile) = self.profile(rcm) else {
            return 0.0;
        };
        let gas_temperature = self.params.value(GasTemperature);
        let mix_temperature = self.params.value(MixTemperature);
        let shell_temperature = self.params.value(ShellTemperature);
        let ablator_temperature = self.params.value(AblatorTemperature);

        let n_d = self.n_d(rcm);
        let n_he3 = self.n_he3(rcm);
        let mut fuel = vec![
            FieldSpecies::ion(DEUTERIUM, n_d, gas_temperature),
            FieldSpecies::ion(HELIUM3, n_he3, gas_temperature),
            FieldSpecies::electrons(self.n_e_gas(rcm), gas_temperature),
        ];
        fuel.extend(
            CH.ion_densities(profile.rho_mix)
                .into_iter()
                .map(|(species, density)| FieldSpecies::ion(species, density, mix_temperature)),
        );
        let fuel = PlasmaStopping::new(fuel);
        let shell = PlasmaStopping::new(ch_plasma(profile.rho_shell, shell_temperature));

        let mut energy = self.params.value(BirthEnergy);
        energy = step_uniform(&fuel, energy, profile.inner_radius);
        energy = step_uniform(&shell, energy, profile.outer_radius - profile.inner_radius);

        let ramp_width = (profile.ramp_radius - profile.outer_radius) / STEPS_PER_REGION as f64;
        for step in 0..STEPS_PER_REGION {
            if energy <= 0.0 || ramp_width <= 0.0 {
                break;
            }
            let midpoint = profile.outer_radius + (step as f64 + 0.5) * ramp_width;
            let density = self.ablator_density(&profile, midpoint);
            let slice = PlasmaStopping::new(ch_plasma(density, ablator_temperature));
            energy = slice.eout(energy, ramp_width * UM_PER_CM);
        }

        let tail_density = self.params.value(AblatorFloorDensity);
        let tail = PlasmaStopping::new(ch_plasma(tail_density, ablator_temperature));
        energy = step_uniform(&tail, energy, profile.tail_radius - profile.ramp_radius);
        energy.max(0.0)
    }
}

/// Mass (g) of a spherical shell from `r1` to `r2` with density
/// `peak * exp(-(r - r1) / scale)`.
fn exponential_shell_mass(peak: f64, scale: f64, r1: f64, r2: f64) -> f64 {
    let moment = |r: f64| r * r + 2.0 * scale * r + 2.0 * scale * scale;
    4.0 * PI * peak * scale * (moment(r1) - (-(r2 - r1) / scale).exp() * moment(r2))
}

/// Fully ionized CH at mass density `rho`, ions and electrons in equilibrium.
fn ch_plasma(rho: f64, temperature_kev: f64) -> Vec<FieldSpecies> {
    let mut field: Vec<FieldSpecies> = CH
        .ion_densities(rho)
        .into_iter()
        .map(|(species, density)| FieldSpecies::ion(species, density, temperature_kev))
        .collect();
    field.push(FieldSpecies::electrons(CH.electron_density(rho), temperature_kev));
    field
}

/// Uniform region of width `width_cm` split into equal slices.
fn step_uniform(stopping: &PlasmaStopping, energy: f64, width_cm: f64) -> f64 {
    let slice_um = width_cm * UM_PER_CM / STEPS_PER_REGION as f64;
    if !(slice_um > 0.0) {
        return energy;
    }
    let mut energy = energy;
    for _ in 0..STEPS_PER_REGION {
        if energy <= 0.0 {
            return 0.0;
        }
        energy = stopping.eout(energy, slice_um);
    }
    energy
}
