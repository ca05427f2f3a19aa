//! shapepipe - statistical shape modeling pipeline runner
//!
//! Orchestrates an external shape-modeling toolkit (a set of command-line
//! executables) across three demo datasets: ellipsoid, left atrium, and
//! femur. The pipeline itself does no image processing or optimization; it
//! acquires a dataset, threads ordered per-subject file lists through the
//! grooming, optimization, and reconstruction tools, and surfaces any
//! external-tool failure unchanged.
//!
//! # Modules
//!
//! - `toolkit`: the external-executable seam (parameter sets, subprocess
//!   invocation, the `Toolkit` trait tests stub out)
//! - `core`: the driver and stage implementations
//! - `cases`: per-use-case catalog (archives, globs, presets, quirks)
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the left atrium demo with single-scale optimization
//! shapepipe run left_atrium --use-single-scale
//!
//! # Quick smoke run
//! shapepipe run ellipsoid --tiny-test
//! ```

pub mod cases;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod toolkit;

// Re-export main types at crate root for convenience
pub use cases::{CaseSpec, CuttingPlane, OptimizeParams, ReferenceHeuristic, UseCase};
pub use config::Settings;
pub use core::{Driver, FileList, Gate, NoGate, ParticleFiles, PipelineOutputs, RunConfig};
pub use error::PipelineError;
pub use toolkit::{ExternalToolkit, ParamSet, ParamValue, Toolkit};
