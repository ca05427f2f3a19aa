//! Use-case catalog.
//!
//! Each demo dataset carries its own archive name, working-directory layout,
//! discovery globs, optimization presets, and grooming quirks (paired raw
//! images for the left atrium, mesh inputs and a cutting plane for the
//! femur). The reference-selection heuristic is deliberately per use case
//! rather than unified; the datasets were tuned independently.

use std::fmt;
use std::path::PathBuf;

use crate::core::files::FileList;
use crate::error::PipelineError;
use crate::toolkit::ParamSet;

/// The fixed set of supported demo datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseCase {
    Ellipsoid,
    LeftAtrium,
    Femur,
}

impl UseCase {
    /// Parse the CLI selector. Unrecognized values fail before any side
    /// effect happens.
    pub fn parse(name: &str) -> Result<Self, PipelineError> {
        match name {
            "ellipsoid" => Ok(UseCase::Ellipsoid),
            "left_atrium" => Ok(UseCase::LeftAtrium),
            "femur" => Ok(UseCase::Femur),
            other => Err(PipelineError::UnsupportedUseCase(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            UseCase::Ellipsoid => "ellipsoid",
            UseCase::LeftAtrium => "left_atrium",
            UseCase::Femur => "femur",
        }
    }

    pub fn spec(self) -> CaseSpec {
        match self {
            UseCase::Ellipsoid => CaseSpec {
                use_case: self,
                archive: "ellipsoid.zip",
                working_dir: "TestEllipsoids",
                output_prefix: "ellipsoid",
                seg_glob: "Ellipsoids_UnPrepped/*.nrrd",
                prepped_glob: "Ellipsoids_Prepped/*.nrrd",
                image_glob: None,
                mesh_input: None,
                cutting_plane: None,
                reference: ReferenceHeuristic::MedianIndex,
                single_scale: OptimizeParams::ellipsoid_single_scale(),
                multi_scale: OptimizeParams::ellipsoid_multi_scale(),
            },
            UseCase::LeftAtrium => CaseSpec {
                use_case: self,
                archive: "leftatrium.zip",
                working_dir: "TestLeftAtrium",
                output_prefix: "leftatrium",
                seg_glob: "segmentation_LGE/*.nrrd",
                prepped_glob: "segmentation_LGE/*.nrrd",
                image_glob: Some("LGE/*.nrrd"),
                mesh_input: None,
                cutting_plane: None,
                reference: ReferenceHeuristic::MedianIndex,
                single_scale: OptimizeParams::left_atrium_single_scale(),
                multi_scale: OptimizeParams::left_atrium_multi_scale(),
            },
            UseCase::Femur => CaseSpec {
                use_case: self,
                archive: "femurdata.zip",
                working_dir: "TestFemur",
                output_prefix: "femur",
                seg_glob: "femurdata/*.ply",
                prepped_glob: "femurdata/prepped/*.nrrd",
                image_glob: Some("femurdata/*_1x_hip.nrrd"),
                mesh_input: Some(MeshInput {
                    image_suffix: "1x_hip",
                    left_suffix: "L_femur",
                    right_suffix: "R_femur",
                    reference_side: Side::Left,
                }),
                // Default shaft cutting plane; interactive runs may override it.
                cutting_plane: Some(CuttingPlane {
                    points: [
                        [100.0, 100.0, -38.0],
                        [-100.0, 100.0, -38.0],
                        [100.0, -100.0, -38.0],
                    ],
                }),
                reference: ReferenceHeuristic::MedianIndex,
                single_scale: OptimizeParams::femur_single_scale(),
                multi_scale: OptimizeParams::femur_multi_scale(),
            },
        }
    }
}

impl fmt::Display for UseCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the driver needs to know about one use case.
#[derive(Debug, Clone)]
pub struct CaseSpec {
    pub use_case: UseCase,
    /// Archive filename, fixed per dataset; also the remote fetch key.
    pub archive: &'static str,
    /// Working-directory name under the output root.
    pub working_dir: &'static str,
    /// Filename prefix for reconstruction outputs.
    pub output_prefix: &'static str,
    /// Segmentation (or mesh, for mesh-input cases) discovery glob,
    /// relative to the working directory.
    pub seg_glob: &'static str,
    /// Discovery glob for the pre-prepped-data path.
    pub prepped_glob: &'static str,
    /// Paired raw-image discovery glob, when the dataset ships one.
    pub image_glob: Option<&'static str>,
    /// Mesh-to-volume conversion settings, when inputs are meshes.
    pub mesh_input: Option<MeshInput>,
    /// Cutting plane for the clip stage, when the anatomy needs one.
    pub cutting_plane: Option<CuttingPlane>,
    pub reference: ReferenceHeuristic,
    pub single_scale: OptimizeParams,
    pub multi_scale: OptimizeParams,
}

/// Anatomical side of a mesh input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

/// Settings for grooming mesh inputs into binary volumes.
#[derive(Debug, Clone)]
pub struct MeshInput {
    /// Filename suffix identifying the paired raw image of a sample.
    pub image_suffix: &'static str,
    /// Filename suffix of left-side meshes.
    pub left_suffix: &'static str,
    /// Filename suffix of right-side meshes.
    pub right_suffix: &'static str,
    /// Side all samples are reflected onto before grooming.
    pub reference_side: Side,
}

impl MeshInput {
    /// Side of a mesh file, judged by its filename suffix.
    pub fn side_of(&self, stem: &str) -> Option<Side> {
        if stem.ends_with(self.left_suffix) {
            Some(Side::Left)
        } else if stem.ends_with(self.right_suffix) {
            Some(Side::Right)
        } else {
            None
        }
    }

    /// Sample identifier shared by a mesh and its paired image.
    pub fn sample_id<'a>(&self, stem: &'a str) -> &'a str {
        stem.strip_suffix(self.left_suffix)
            .or_else(|| stem.strip_suffix(self.right_suffix))
            .unwrap_or(stem)
            .trim_end_matches('_')
    }
}

/// Three points defining the clip plane, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CuttingPlane {
    pub points: [[f64; 3]; 3],
}

impl CuttingPlane {
    pub fn flattened(&self) -> [f64; 9] {
        let p = &self.points;
        [
            p[0][0], p[0][1], p[0][2], p[1][0], p[1][1], p[1][2], p[2][0], p[2][1], p[2][2],
        ]
    }
}

/// How the rigid-alignment reference subject is chosen.
///
/// Selected exactly once per run from the center-of-mass-aligned list and
/// reused for every subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceHeuristic {
    /// Middle entry of the (already sorted) list; a cheap stand-in for the
    /// population median shape.
    MedianIndex,
}

impl ReferenceHeuristic {
    pub fn select<'a>(&self, files: &'a FileList) -> Option<&'a PathBuf> {
        match self {
            ReferenceHeuristic::MedianIndex => files.get(files.len().saturating_sub(1) / 2),
        }
    }
}

/// Particle-optimization preset for one use case and scale mode.
///
/// Field names mirror the option names of the optimizer executables exactly;
/// `to_param_set` serializes them in the documented order.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizeParams {
    /// Fixed particle count (single-scale mode only).
    pub number_of_particles: Option<u32>,
    /// Initial particle count (multi-scale mode only); doubles per level.
    pub starting_particles: Option<u32>,
    /// Number of multi-scale levels.
    pub number_of_levels: Option<u32>,
    pub use_normals: u32,
    pub normal_weight: f64,
    pub checkpointing_interval: u32,
    pub keep_checkpoints: u32,
    pub iterations_per_split: u32,
    pub optimization_iterations: u32,
    pub starting_regularization: f64,
    pub ending_regularization: f64,
    pub recompute_regularization_interval: u32,
    pub domains_per_shape: u32,
    pub relative_weighting: f64,
    pub initial_relative_weighting: f64,
    pub procrustes_interval: u32,
    pub procrustes_scaling: u32,
    pub save_init_splits: u32,
    pub debug_projection: u32,
    pub verbosity: u32,
    pub use_statistics_in_init: Option<u32>,
}

impl OptimizeParams {
    fn base() -> Self {
        Self {
            number_of_particles: None,
            starting_particles: None,
            number_of_levels: None,
            use_normals: 0,
            normal_weight: 10.0,
            checkpointing_interval: 200,
            keep_checkpoints: 0,
            iterations_per_split: 4000,
            optimization_iterations: 4000,
            starting_regularization: 100.0,
            ending_regularization: 0.1,
            recompute_regularization_interval: 2,
            domains_per_shape: 1,
            relative_weighting: 10.0,
            initial_relative_weighting: 0.1,
            procrustes_interval: 0,
            procrustes_scaling: 0,
            save_init_splits: 0,
            debug_projection: 0,
            verbosity: 3,
            use_statistics_in_init: None,
        }
    }

    pub fn ellipsoid_single_scale() -> Self {
        Self {
            number_of_particles: Some(128),
            initial_relative_weighting: 0.01,
            ..Self::base()
        }
    }

    pub fn ellipsoid_multi_scale() -> Self {
        Self {
            starting_particles: Some(16),
            number_of_levels: Some(4),
            initial_relative_weighting: 0.01,
            ..Self::base()
        }
    }

    pub fn left_atrium_single_scale() -> Self {
        Self {
            number_of_particles: Some(1024),
            use_normals: 1,
            starting_regularization: 50000.0,
            relative_weighting: 50.0,
            ..Self::base()
        }
    }

    pub fn left_atrium_multi_scale() -> Self {
        Self {
            starting_particles: Some(128),
            number_of_levels: Some(4),
            use_normals: 1,
            starting_regularization: 50000.0,
            relative_weighting: 50.0,
            ..Self::base()
        }
    }

    pub fn femur_single_scale() -> Self {
        Self {
            number_of_particles: Some(1024),
            checkpointing_interval: 10,
            keep_checkpoints: 1,
            initial_relative_weighting: 1.0,
            procrustes_interval: 1,
            procrustes_scaling: 1,
            save_init_splits: 1,
            use_statistics_in_init: Some(0),
            ..Self::base()
        }
    }

    pub fn femur_multi_scale() -> Self {
        Self {
            starting_particles: Some(64),
            number_of_levels: Some(4),
            checkpointing_interval: 10,
            keep_checkpoints: 1,
            initial_relative_weighting: 1.0,
            procrustes_interval: 1,
            procrustes_scaling: 1,
            save_init_splits: 1,
            use_statistics_in_init: Some(0),
            ..Self::base()
        }
    }

    pub fn is_multi_scale(&self) -> bool {
        self.starting_particles.is_some()
    }

    /// Particle count of the finished model; for multi-scale this is the
    /// count after the last doubling level.
    pub fn final_particles(&self) -> u32 {
        if let Some(start) = self.starting_particles {
            let levels = self.number_of_levels.unwrap_or(1);
            start << levels.saturating_sub(1)
        } else {
            self.number_of_particles.unwrap_or(0)
        }
    }

    /// Reduced preset for quick smoke runs.
    pub fn tiny(&self) -> Self {
        let mut params = self.clone();
        if params.is_multi_scale() {
            params.starting_particles = Some(8);
            params.number_of_levels = Some(2);
        } else {
            params.number_of_particles = Some(32);
        }
        params.iterations_per_split = 25;
        params.optimization_iterations = 25;
        params
    }

    /// Construction-time validation: exactly one scale mode must be
    /// configured and the particle counts must be usable.
    pub fn validate(&self) -> Result<(), PipelineError> {
        match (self.number_of_particles, self.starting_particles) {
            (Some(_), Some(_)) => Err(PipelineError::InvalidParams(
                "both single-scale and multi-scale particle counts set".into(),
            )),
            (None, None) => Err(PipelineError::InvalidParams(
                "no particle count configured".into(),
            )),
            (Some(0), _) | (_, Some(0)) => Err(PipelineError::InvalidParams(
                "particle count must be positive".into(),
            )),
            (None, Some(_)) if self.number_of_levels.unwrap_or(0) == 0 => Err(
                PipelineError::InvalidParams("multi-scale mode needs at least one level".into()),
            ),
            _ => Ok(()),
        }
    }

    /// Serialize to the optimizer's flag vocabulary, in dictionary order.
    pub fn to_param_set(&self) -> ParamSet {
        let mut params = ParamSet::new();
        if let Some(n) = self.number_of_particles {
            params.insert("number_of_particles", (n as i64).into());
        }
        if let Some(n) = self.starting_particles {
            params.insert("starting_particles", (n as i64).into());
        }
        if let Some(n) = self.number_of_levels {
            params.insert("number_of_levels", (n as i64).into());
        }
        let mut params = params
            .set("use_normals", self.use_normals)
            .set("normal_weight", self.normal_weight)
            .set("checkpointing_interval", self.checkpointing_interval)
            .set("keep_checkpoints", self.keep_checkpoints)
            .set("iterations_per_split", self.iterations_per_split)
            .set("optimization_iterations", self.optimization_iterations)
            .set("starting_regularization", self.starting_regularization)
            .set("ending_regularization", self.ending_regularization)
            .set(
                "recompute_regularization_interval",
                self.recompute_regularization_interval,
            )
            .set("domains_per_shape", self.domains_per_shape)
            .set("relative_weighting", self.relative_weighting)
            .set("initial_relative_weighting", self.initial_relative_weighting)
            .set("procrustes_interval", self.procrustes_interval)
            .set("procrustes_scaling", self.procrustes_scaling)
            .set("save_init_splits", self.save_init_splits)
            .set("debug_projection", self.debug_projection)
            .set("verbosity", self.verbosity);
        if let Some(v) = self.use_statistics_in_init {
            params.insert("use_statistics_in_init", (v as i64).into());
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_cases() {
        assert_eq!(UseCase::parse("ellipsoid").unwrap(), UseCase::Ellipsoid);
        assert_eq!(UseCase::parse("left_atrium").unwrap(), UseCase::LeftAtrium);
        assert_eq!(UseCase::parse("femur").unwrap(), UseCase::Femur);
    }

    #[test]
    fn test_parse_unknown_case() {
        let err = UseCase::parse("sphere").unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedUseCase(ref s) if s == "sphere"));
    }

    #[test]
    fn test_left_atrium_preset_values() {
        let params = UseCase::LeftAtrium.spec().single_scale;
        assert_eq!(params.number_of_particles, Some(1024));
        assert_eq!(params.use_normals, 1);
        assert_eq!(params.relative_weighting, 50.0);
        assert_eq!(params.starting_regularization, 50000.0);
        assert_eq!(params.procrustes_interval, 0);
        params.validate().unwrap();
    }

    #[test]
    fn test_femur_preset_values() {
        let params = UseCase::Femur.spec().single_scale;
        assert_eq!(params.use_normals, 0);
        assert_eq!(params.procrustes_interval, 1);
        assert_eq!(params.procrustes_scaling, 1);
        assert_eq!(params.checkpointing_interval, 10);
        assert_eq!(params.use_statistics_in_init, Some(0));
    }

    #[test]
    fn test_final_particles_doubles_per_level() {
        let params = UseCase::LeftAtrium.spec().multi_scale;
        assert_eq!(params.starting_particles, Some(128));
        assert_eq!(params.number_of_levels, Some(4));
        assert_eq!(params.final_particles(), 1024);

        let single = UseCase::LeftAtrium.spec().single_scale;
        assert_eq!(single.final_particles(), 1024);
    }

    #[test]
    fn test_validation_rejects_ambiguous_mode() {
        let mut params = OptimizeParams::left_atrium_single_scale();
        params.starting_particles = Some(64);
        assert!(params.validate().is_err());

        params.starting_particles = None;
        params.number_of_particles = None;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_param_set_uses_exact_key_names() {
        let params = OptimizeParams::left_atrium_single_scale().to_param_set();
        let keys: Vec<&str> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                "number_of_particles",
                "use_normals",
                "normal_weight",
                "checkpointing_interval",
                "keep_checkpoints",
                "iterations_per_split",
                "optimization_iterations",
                "starting_regularization",
                "ending_regularization",
                "recompute_regularization_interval",
                "domains_per_shape",
                "relative_weighting",
                "initial_relative_weighting",
                "procrustes_interval",
                "procrustes_scaling",
                "save_init_splits",
                "debug_projection",
                "verbosity",
            ]
        );
    }

    #[test]
    fn test_tiny_preset_shrinks_work() {
        let tiny = UseCase::LeftAtrium.spec().single_scale.tiny();
        assert_eq!(tiny.number_of_particles, Some(32));
        assert_eq!(tiny.optimization_iterations, 25);
        tiny.validate().unwrap();
    }

    #[test]
    fn test_median_reference_selection() {
        let files = FileList::new(vec![
            PathBuf::from("a.nrrd"),
            PathBuf::from("b.nrrd"),
            PathBuf::from("c.nrrd"),
        ]);
        assert_eq!(
            ReferenceHeuristic::MedianIndex.select(&files).unwrap(),
            &PathBuf::from("b.nrrd")
        );
        assert!(ReferenceHeuristic::MedianIndex
            .select(&FileList::default())
            .is_none());
    }

    #[test]
    fn test_mesh_input_sides_and_sample_ids() {
        let input = UseCase::Femur.spec().mesh_input.unwrap();
        assert_eq!(input.side_of("n01_L_femur"), Some(Side::Left));
        assert_eq!(input.side_of("n01_R_femur"), Some(Side::Right));
        assert_eq!(input.side_of("n01_hip"), None);
        assert_eq!(input.sample_id("n01_L_femur"), "n01");
        assert_eq!(input.sample_id("n01_R_femur"), "n01");
    }
}
