pub mod constants;
pub mod species;

pub use species::{CARBON, CH, Compound, DEUTERIUM, HELIUM3, HYDROGEN, Species};
