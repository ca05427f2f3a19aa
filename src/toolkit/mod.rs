//! External toolkit interface.
//!
//! All heavy computation (image grooming, particle optimization, surface
//! reconstruction) happens inside a pre-built native toolkit invoked as a set
//! of command-line executables. The pipeline treats each executable as an
//! opaque subprocess: it predicts the output paths, serializes a parameter
//! set to flags, and waits for the process to exit.
//!
//! The `Toolkit` trait is the seam that lets tests substitute a recording
//! fake for the real executables.

pub mod external;
pub mod params;

use async_trait::async_trait;

use crate::error::PipelineError;

pub use external::ExternalToolkit;
pub use params::{ParamSet, ParamValue};

/// Names of the external executables. Part of the versioned compatibility
/// surface; renaming one silently breaks against an installed toolkit.
pub mod tools {
    pub const RESAMPLE: &str = "ResampleVolumesToBeIsotropic";
    pub const PAD: &str = "PadVolumeWithConstant";
    pub const COM_ALIGN: &str = "TranslateShapeToImageOrigin";
    pub const RIGID_ALIGN: &str = "ICPRigid3DImageRegistration";
    pub const CLIP: &str = "ClipVolume";
    pub const BOUNDING_BOX: &str = "FindLargestBoundingBox";
    pub const CROP: &str = "CropImages";
    pub const DISTANCE_TRANSFORM: &str = "FastMarching";
    pub const REFLECT_MESH: &str = "ReflectMesh";
    pub const REFLECT_VOLUME: &str = "ReflectVolumes";
    pub const MESH_TO_VOLUME: &str = "MeshToVolume";
    pub const OPTIMIZE_SINGLE: &str = "ShapeWorksRun";
    pub const OPTIMIZE_MULTI: &str = "ShapeWorksRunMultiScale";
    pub const MEAN_SURFACE: &str = "ReconstructMeanSurface";
    pub const SURFACE: &str = "ReconstructSurface";
    pub const PCA_MODES: &str = "ReconstructSamplesAlongPCAModes";
    pub const VIEWER: &str = "ShapeWorksView2";
}

/// Trait for invoking external toolkit executables.
#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Run a batch tool to completion, capturing its output. A non-zero exit
    /// status becomes `PipelineError::ToolFailed` with the tool's own
    /// diagnostic.
    async fn run(&self, tool: &str, params: &ParamSet) -> Result<(), PipelineError>;

    /// Launch an interactive tool (the viewer) with inherited stdio and
    /// block until it exits.
    async fn launch(&self, tool: &str, params: &ParamSet) -> Result<(), PipelineError>;
}
