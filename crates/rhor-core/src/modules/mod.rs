pub mod analysis;
pub mod fit;
pub mod hohlraum;
pub mod rhor;
pub mod serialization;
