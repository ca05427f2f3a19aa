//! Pipeline driver.
//!
//! Runs the fixed stage sequence for one use case: acquire the dataset,
//! groom, optimize, reconstruct, and optionally launch the viewer. Stages
//! execute strictly in order; every external invocation blocks until the
//! tool exits, and the first failure aborts the remainder of the run with
//! the tool's own diagnostic.
//!
//! Interactive confirmation is injected through the `Gate` trait so the
//! sequencing logic stays testable without a terminal; the default gate is
//! a no-op.

use tracing::{info, instrument};

use crate::cases::{CaseSpec, CuttingPlane, UseCase};
use crate::config::Settings;
use crate::error::PipelineError;
use crate::toolkit::Toolkit;

use super::dataset;
use super::files::FileList;
use super::groom;
use super::optimize::{self, ParticleFiles};
use super::reconstruct;

/// Number of subjects kept in tiny-test mode.
const TINY_TEST_SUBJECTS: usize = 3;

/// Immutable per-run toggles, selected once at pipeline start.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    /// Pause at each stage boundary for confirmation.
    pub interactive: bool,
    /// Skip grooming and feed the shipped pre-prepped segmentations
    /// directly into the distance-transform stage.
    pub start_with_prepped_data: bool,
    /// Groom the raw-image modality alongside the segmentations.
    pub start_with_image_and_segmentation_data: bool,
    /// Single-scale optimization instead of the multi-scale schedule.
    pub use_single_scale: bool,
    /// Short smoke run: three subjects, reduced iterations, no viewer.
    pub tiny_test: bool,
}

/// Per-stage confirmation hook. Implementations may block (terminal prompt)
/// or do nothing; they cannot fail the pipeline.
pub trait Gate: Send + Sync {
    /// Called at each stage boundary with the stage banner.
    fn wait(&self, _stage: &str) {}

    /// Chance to override the case's default cutting plane before clipping.
    fn cutting_plane(&self, default: CuttingPlane) -> CuttingPlane {
        default
    }
}

/// Default gate: proceed through every stage without pausing.
pub struct NoGate;

impl Gate for NoGate {}

static NO_GATE: NoGate = NoGate;

/// File lists produced by a completed run, for callers that want to chain
/// further analysis.
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub distance_transforms: FileList,
    pub particles: ParticleFiles,
    pub local_meshes: FileList,
    pub world_meshes: FileList,
}

pub struct Driver<'a> {
    toolkit: &'a dyn Toolkit,
    gate: &'a dyn Gate,
    settings: &'a Settings,
    config: RunConfig,
}

impl<'a> Driver<'a> {
    pub fn new(toolkit: &'a dyn Toolkit, settings: &'a Settings, config: RunConfig) -> Self {
        Self {
            toolkit,
            gate: &NO_GATE,
            settings,
            config,
        }
    }

    pub fn with_gate(mut self, gate: &'a dyn Gate) -> Self {
        self.gate = gate;
        self
    }

    /// Run the full pipeline for a use-case selector. An unrecognized
    /// selector fails before any filesystem effect.
    #[instrument(skip(self))]
    pub async fn run(&self, use_case: &str) -> Result<PipelineOutputs, PipelineError> {
        let case = UseCase::parse(use_case)?.spec();
        self.run_case(&case).await
    }

    async fn run_case(&self, case: &CaseSpec) -> Result<PipelineOutputs, PipelineError> {
        // Resolve and validate the optimization preset up front so a bad
        // configuration fails before any stage runs.
        let mut opt_params = if self.config.use_single_scale {
            case.single_scale.clone()
        } else {
            case.multi_scale.clone()
        };
        if self.config.tiny_test {
            opt_params = opt_params.tiny();
        }
        opt_params.validate()?;

        info!(use_case = %case.use_case, "starting pipeline");

        self.gate.wait("Step 1. Extract data");
        let (working, mut inputs) = dataset::acquire(
            case,
            self.settings,
            self.config.start_with_image_and_segmentation_data,
            self.config.start_with_prepped_data,
        )
        .await?;
        if self.config.tiny_test {
            inputs.subjects = inputs.subjects.truncated(TINY_TEST_SUBJECTS);
            inputs.images = inputs.images.truncated(TINY_TEST_SUBJECTS);
        }
        info!(subjects = inputs.subjects.len(), "dataset ready");

        let prep_dir = working.join("PrepOutput");
        tokio::fs::create_dir_all(&prep_dir).await?;

        let dt_input = if self.config.start_with_prepped_data {
            // Pre-prepped data skips grooming but still picks the matching
            // distance-transform input list.
            inputs.subjects.clone()
        } else {
            self.gate.wait("Step 2. Groom - data pre-processing");

            let mut segmentations = inputs.subjects.clone();
            let mut images = if inputs.images.is_empty() {
                None
            } else {
                Some(inputs.images.clone())
            };

            if let Some(mesh_input) = &case.mesh_input {
                let (segs, imgs) = groom::convert_meshes(
                    self.toolkit,
                    &prep_dir,
                    &segmentations,
                    images.as_ref(),
                    mesh_input,
                )
                .await?;
                segmentations = segs;
                images = imgs;
            }

            let (segmentations, images) = groom::resample(
                self.toolkit,
                &prep_dir,
                &segmentations,
                images.as_ref(),
                1.0,
            )
            .await?;

            let (segmentations, images) =
                groom::pad(self.toolkit, &prep_dir, &segmentations, images.as_ref(), 10).await?;

            let (segmentations, images) =
                groom::com_align(self.toolkit, &prep_dir, &segmentations, images.as_ref())
                    .await?;

            // Selected once per run from the aligned population and reused
            // for every subject.
            let reference = case
                .reference
                .select(&segmentations)
                .ok_or_else(|| PipelineError::MissingInput("reference".into()))?
                .clone();
            info!(reference = %reference.display(), "selected rigid-alignment reference");

            let (segmentations, images) = groom::rigid_align(
                self.toolkit,
                &prep_dir,
                &segmentations,
                images.as_ref(),
                &reference,
            )
            .await?;

            let segmentations = match case.cutting_plane {
                Some(default) => {
                    let plane = if self.config.interactive {
                        self.gate.cutting_plane(default)
                    } else {
                        default
                    };
                    groom::clip(self.toolkit, &prep_dir, &segmentations, &plane).await?
                }
                None => segmentations,
            };

            let (segmentations, _images) =
                groom::crop(self.toolkit, &prep_dir, &segmentations, images.as_ref()).await?;

            segmentations
        };

        self.gate.wait("Step 3. Groom - convert to distance transforms");
        let distance_transforms =
            groom::distance_transform(self.toolkit, &prep_dir, &dt_input).await?;

        self.gate.wait("Step 4. Optimize - particle based optimization");
        let point_dir = working.join("PointFiles");
        tokio::fs::create_dir_all(&point_dir).await?;
        let particles = optimize::run_optimization(
            self.toolkit,
            &point_dir,
            &distance_transforms,
            &opt_params,
        )
        .await?;
        let number_of_particles = opt_params.final_particles();

        self.gate
            .wait("Step 5. Analysis - reconstruct the dense mean surface");
        let mean_prefix = reconstruct::mean_surface(
            self.toolkit,
            &working.join("MeanReconstruction"),
            case.output_prefix,
            &distance_transforms,
            &particles,
            number_of_particles,
        )
        .await?;

        self.gate
            .wait("Step 6. Analysis - reconstruct dense surfaces in local coordinates");
        let local_meshes = reconstruct::subject_surfaces(
            self.toolkit,
            &working.join("MeshFiles-Local"),
            case.output_prefix,
            &particles.local,
            &mean_prefix,
            number_of_particles,
        )
        .await?;

        self.gate
            .wait("Step 7. Analysis - reconstruct dense surfaces in world coordinates");
        let world_meshes = reconstruct::subject_surfaces(
            self.toolkit,
            &working.join("MeshFiles-World"),
            case.output_prefix,
            &particles.world,
            &mean_prefix,
            number_of_particles,
        )
        .await?;

        self.gate
            .wait("Step 8. Analysis - reconstruct samples along dominant PCA modes");
        reconstruct::pca_mode_samples(
            self.toolkit,
            &working.join("PCAModesFiles"),
            case.output_prefix,
            &particles.world,
            &mean_prefix,
            number_of_particles,
        )
        .await?;

        if !self.config.tiny_test {
            self.gate.wait("Step 9. Analysis - launch viewer");
            reconstruct::launch_viewer(self.toolkit, &distance_transforms, &particles).await?;
        }

        info!(use_case = %case.use_case, "pipeline complete");
        Ok(PipelineOutputs {
            distance_transforms,
            particles,
            local_meshes,
            world_meshes,
        })
    }
}
