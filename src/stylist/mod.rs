pub mod backend;
pub mod error;
pub mod looks;
pub mod profile;

#[cfg(test)]
pub mod mock;

pub use backend::{ResponsePart, StylistBackend, SynthesisRequest, SynthesisResponse};
pub use error::StylistError;
pub use looks::generate_looks;
pub use profile::{analyze_profile, ProfileAnalysis};
