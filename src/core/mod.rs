//! Pipeline orchestration: dataset acquisition, grooming, optimization,
//! reconstruction, and the driver sequencing them.

pub mod dataset;
pub mod driver;
pub mod files;
pub mod groom;
pub mod optimize;
pub mod reconstruct;

pub use dataset::CaseInputs;
pub use driver::{Driver, Gate, NoGate, PipelineOutputs, RunConfig};
pub use files::FileList;
pub use optimize::ParticleFiles;
