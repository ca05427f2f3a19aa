//! Surface reconstruction stages.
//!
//! A dense template mesh is built once from the mean distance transform,
//! then warped per subject using that subject's particles (local and world
//! coordinate variants), and finally sampled along the dominant PCA modes
//! of the particle population. The parameter dictionaries here mirror the
//! reconstruction tools' documented option names exactly.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::PipelineError;
use crate::toolkit::{tools, ParamSet, Toolkit};

use super::files::FileList;
use super::optimize::ParticleFiles;

/// Reconstruct the dense mean surface from the sparse correspondence model.
/// One invocation over the whole population; returns the mean-output prefix
/// later stages warp from.
pub async fn mean_surface(
    toolkit: &dyn Toolkit,
    mean_dir: &Path,
    prefix_name: &str,
    distance_transforms: &FileList,
    particles: &ParticleFiles,
    number_of_particles: u32,
) -> Result<PathBuf, PipelineError> {
    tokio::fs::create_dir_all(mean_dir).await?;
    let mean_prefix = mean_dir.join(prefix_name);

    let params = ParamSet::new()
        .set("number_of_particles", number_of_particles)
        .path("out_prefix", &mean_prefix)
        .set("do_procrustes", 0u32)
        .set("do_procrustes_scaling", 0u32)
        .set("levelsetValue", 0.0)
        .set("targetReduction", 0.0)
        .set("featureAngle", 30u32)
        .set("lsSmootherIterations", 1u32)
        .set("meshSmootherIterations", 1u32)
        .set("preserveTopology", 1u32)
        .set("qcFixWinding", 1u32)
        .set("qcDoLaplacianSmoothingBeforeDecimation", 1u32)
        .set("qcDoLaplacianSmoothingAfterDecimation", 1u32)
        .set("qcSmoothingLambda", 0.5)
        .set("qcSmoothingIterations", 3u32)
        .set("qcDecimationPercentage", 0.9)
        .set("normalAngle", 90u32)
        .set("use_tps_transform", 0u32)
        .set("use_bspline_interpolation", 0u32)
        .set("display", 0u32)
        .set("glyph_radius", 1u32)
        .paths("inFilename", distance_transforms.paths())
        .paths("localPointsFilename", particles.local.paths())
        .paths("worldPointsFilename", particles.world.paths());

    toolkit.run(tools::MEAN_SURFACE, &params).await?;
    info!(prefix = %mean_prefix.display(), "mean surface reconstructed");
    Ok(mean_prefix)
}

/// Shared dictionary of the per-subject and PCA reconstruction tools.
fn surface_params(number_of_particles: u32, mean_prefix: &Path, out_prefix: &Path) -> ParamSet {
    ParamSet::new()
        .set("number_of_particles", number_of_particles)
        .path("mean_prefix", mean_prefix)
        .path("out_prefix", out_prefix)
        .set("use_tps_transform", 0u32)
        .set("use_bspline_interpolation", 0u32)
        .set("display", 0u32)
        .set("glyph_radius", 1u32)
}

/// Warp the template mesh to each subject, one invocation per subject in
/// list order. The output mesh list keeps the input's subject ordering.
pub async fn subject_surfaces(
    toolkit: &dyn Toolkit,
    mesh_dir: &Path,
    prefix_name: &str,
    point_files: &FileList,
    mean_prefix: &Path,
    number_of_particles: u32,
) -> Result<FileList, PipelineError> {
    tokio::fs::create_dir_all(mesh_dir).await?;
    let out_prefix = mesh_dir.join(prefix_name);

    for point_file in point_files {
        let params = surface_params(number_of_particles, mean_prefix, &out_prefix)
            .path("pointsFilename", point_file);
        toolkit.run(tools::SURFACE, &params).await?;
    }

    let meshes = point_files.mapped(mesh_dir, |stem| format!("{}.dense.vtk", stem));
    info!(subjects = meshes.len(), dir = %mesh_dir.display(), "dense surfaces reconstructed");
    Ok(meshes)
}

/// Synthesize sample meshes along the dominant PCA modes of the world-space
/// particle population. One invocation total.
pub async fn pca_mode_samples(
    toolkit: &dyn Toolkit,
    pca_dir: &Path,
    prefix_name: &str,
    world_points: &FileList,
    mean_prefix: &Path,
    number_of_particles: u32,
) -> Result<(), PipelineError> {
    tokio::fs::create_dir_all(pca_dir).await?;
    let out_prefix = pca_dir.join(prefix_name);

    let params = surface_params(number_of_particles, mean_prefix, &out_prefix)
        .set("maximum_variance_captured", 0.95)
        .set("maximum_std_dev", 2u32)
        .set("number_of_samples_per_mode", 10u32)
        .paths("worldPointsFilename", world_points.paths());

    toolkit.run(tools::PCA_MODES, &params).await?;
    info!(dir = %pca_dir.display(), "PCA mode samples reconstructed");
    Ok(())
}

/// Launch the interactive viewer on the sparse correspondence model and
/// block until the user closes it.
pub async fn launch_viewer(
    toolkit: &dyn Toolkit,
    distance_transforms: &FileList,
    particles: &ParticleFiles,
) -> Result<(), PipelineError> {
    let params = ParamSet::new()
        .paths("inFilename", distance_transforms.paths())
        .paths("localPointsFilename", particles.local.paths())
        .paths("worldPointsFilename", particles.world.paths());
    toolkit.launch(tools::VIEWER, &params).await
}
