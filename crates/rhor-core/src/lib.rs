//! Areal density of imploded capsules from wedge range filter proton
//! spectra.

pub mod common;
pub mod domain;
pub mod modules;
pub mod numerics;
pub mod stopping;

pub use domain::{AnalysisRecord, RhorError, RhorErrorCategory, RhorResult, Spectrum, SpectrumBin, WallMaterial};
