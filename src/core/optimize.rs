//! Particle-based optimization stage.
//!
//! One invocation of the optimizer executable over the full
//! distance-transform list, in either single-scale or multi-scale mode.
//! The optimizer writes two particle files per subject (local-space and
//! world-space coordinates) whose names this stage predicts up front so the
//! reconstruction stages can consume them positionally.

use std::path::Path;

use tracing::info;

use crate::cases::OptimizeParams;
use crate::error::PipelineError;
use crate::toolkit::{tools, Toolkit};

use super::files::FileList;

/// Parallel local/world particle file lists; index i of either list belongs
/// to subject i of the distance-transform input list.
#[derive(Debug, Clone)]
pub struct ParticleFiles {
    pub local: FileList,
    pub world: FileList,
}

/// Run the optimizer once over the whole population.
pub async fn run_optimization(
    toolkit: &dyn Toolkit,
    point_dir: &Path,
    distance_transforms: &FileList,
    params: &OptimizeParams,
) -> Result<ParticleFiles, PipelineError> {
    params.validate()?;

    // Particle files land under a per-count subdirectory, e.g. PointFiles/1024
    let out_dir = point_dir.join(params.final_particles().to_string());
    tokio::fs::create_dir_all(&out_dir).await?;

    let tool = if params.is_multi_scale() {
        tools::OPTIMIZE_MULTI
    } else {
        tools::OPTIMIZE_SINGLE
    };

    info!(
        %tool,
        subjects = distance_transforms.len(),
        particles = params.final_particles(),
        "running particle optimization"
    );

    let invocation = params
        .to_param_set()
        .paths("inFilename", distance_transforms.paths())
        .path("out_dir", &out_dir);
    toolkit.run(tool, &invocation).await?;

    let strip = |stem: &str| stem.strip_suffix(".DT").unwrap_or(stem).to_string();
    let local = distance_transforms.mapped(&out_dir, |stem| {
        format!("{}_local.particles", strip(stem))
    });
    let world = distance_transforms.mapped(&out_dir, |stem| {
        format!("{}_world.particles", strip(stem))
    });

    Ok(ParticleFiles { local, world })
}
