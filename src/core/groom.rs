//! Grooming stages: normalize raw segmentations into the distance-transform
//! representation the optimizer expects.
//!
//! The ordered chain is resample, pad, center-of-mass align, rigid align to
//! a reference subject, optional clip-by-plane, crop to the population's
//! largest bounding box, then distance transform. Each stage derives one
//! scalar parameter set and applies it to the segmentation pass and, when a
//! paired raw-image list is present, to the image pass as well. Only the
//! in/out file flags differ between the two passes, which is what keeps the
//! two modalities registered.
//!
//! Output paths follow fixed suffix conventions (`.isores`, `.pad`, `.com`,
//! `.aligned`, `.clipped`, `.cropped`, `.DT`) so every stage can predict its
//! outputs before invoking the tool.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::cases::{CuttingPlane, MeshInput};
use crate::error::PipelineError;
use crate::toolkit::{tools, ParamSet, ParamValue, Toolkit};

use super::files::FileList;

/// Run one tool pass over a file list with shared scalar parameters.
async fn run_pass(
    toolkit: &dyn Toolkit,
    tool: &str,
    base: &ParamSet,
    inputs: &FileList,
    outputs: &FileList,
    binary: bool,
) -> Result<(), PipelineError> {
    let mut params = base.clone();
    if binary {
        params.insert("isBinaryImage", ParamValue::Flag);
    }
    let params = params
        .paths("inFilename", inputs.paths())
        .paths("outFilename", outputs.paths());
    toolkit.run(tool, &params).await
}

/// Apply one grooming stage to the segmentation list and (when present) the
/// paired raw-image list, reusing the same scalar parameters for both.
async fn paired_stage(
    toolkit: &dyn Toolkit,
    tool: &str,
    base: &ParamSet,
    out_dir: &Path,
    tag: &str,
    segmentations: &FileList,
    images: Option<&FileList>,
) -> Result<(FileList, Option<FileList>), PipelineError> {
    let seg_dir = out_dir.join("segmentations");
    tokio::fs::create_dir_all(&seg_dir).await?;
    let seg_out = segmentations.retargeted(&seg_dir, tag, "nrrd");
    run_pass(toolkit, tool, base, segmentations, &seg_out, true).await?;

    let img_out = match images {
        Some(imgs) => {
            let img_dir = out_dir.join("images");
            tokio::fs::create_dir_all(&img_dir).await?;
            let out = imgs.retargeted(&img_dir, tag, "nrrd");
            run_pass(toolkit, tool, base, imgs, &out, false).await?;
            Some(out)
        }
        None => None,
    };

    Ok((seg_out, img_out))
}

/// Isotropic resampling.
pub async fn resample(
    toolkit: &dyn Toolkit,
    prep_dir: &Path,
    segmentations: &FileList,
    images: Option<&FileList>,
    iso_spacing: f64,
) -> Result<(FileList, Option<FileList>), PipelineError> {
    let base = ParamSet::new().set("isoSpacing", iso_spacing);
    paired_stage(
        toolkit,
        tools::RESAMPLE,
        &base,
        &prep_dir.join("resampled"),
        "isores",
        segmentations,
        images,
    )
    .await
}

/// Constant-value padding.
pub async fn pad(
    toolkit: &dyn Toolkit,
    prep_dir: &Path,
    segmentations: &FileList,
    images: Option<&FileList>,
    padding_size: u32,
) -> Result<(FileList, Option<FileList>), PipelineError> {
    let base = ParamSet::new()
        .set("paddingSize", padding_size)
        .set("paddingValue", 0u32);
    paired_stage(
        toolkit,
        tools::PAD,
        &base,
        &prep_dir.join("padded"),
        "pad",
        segmentations,
        images,
    )
    .await
}

/// Center-of-mass alignment. The translation is derived from the
/// segmentation and the identical parameters are applied to the raw image.
pub async fn com_align(
    toolkit: &dyn Toolkit,
    prep_dir: &Path,
    segmentations: &FileList,
    images: Option<&FileList>,
) -> Result<(FileList, Option<FileList>), PipelineError> {
    let base = ParamSet::new().set("useCenterOfMass", 1u32);
    paired_stage(
        toolkit,
        tools::COM_ALIGN,
        &base,
        &prep_dir.join("com_aligned"),
        "com",
        segmentations,
        images,
    )
    .await
}

/// Rigid alignment of every subject to the single reference selected for
/// this run.
pub async fn rigid_align(
    toolkit: &dyn Toolkit,
    prep_dir: &Path,
    segmentations: &FileList,
    images: Option<&FileList>,
    reference: &Path,
) -> Result<(FileList, Option<FileList>), PipelineError> {
    let base = ParamSet::new()
        .path("refFilename", reference)
        .set("numIterations", 200u32);
    paired_stage(
        toolkit,
        tools::RIGID_ALIGN,
        &base,
        &prep_dir.join("aligned"),
        "aligned",
        segmentations,
        images,
    )
    .await
}

/// Clip segmentations by the configured cutting plane (segmentations only;
/// the raw images keep their full extent until cropping).
pub async fn clip(
    toolkit: &dyn Toolkit,
    prep_dir: &Path,
    segmentations: &FileList,
    plane: &CuttingPlane,
) -> Result<FileList, PipelineError> {
    let out_dir = prep_dir.join("clipped").join("segmentations");
    tokio::fs::create_dir_all(&out_dir).await?;

    let base = ParamSet::new().floats("cuttingPlanePoints", &plane.flattened());
    let outputs = segmentations.retargeted(&out_dir, "clipped", "nrrd");
    run_pass(toolkit, tools::CLIP, &base, segmentations, &outputs, true).await?;
    Ok(outputs)
}

/// Crop all subjects to the population's largest bounding box. The box is
/// computed once from the segmentations and the same box crops both
/// modalities.
pub async fn crop(
    toolkit: &dyn Toolkit,
    prep_dir: &Path,
    segmentations: &FileList,
    images: Option<&FileList>,
) -> Result<(FileList, Option<FileList>), PipelineError> {
    let out_dir = prep_dir.join("cropped");
    tokio::fs::create_dir_all(&out_dir).await?;

    let bb_file = out_dir.join("largest_bounding_box.txt");
    let bb_params = ParamSet::new()
        .set("paddingSize", 0u32)
        .paths("inFilename", segmentations.paths())
        .path("outFilename", &bb_file);
    toolkit.run(tools::BOUNDING_BOX, &bb_params).await?;

    let base = ParamSet::new().path("bbFilename", &bb_file);
    paired_stage(
        toolkit,
        tools::CROP,
        &base,
        &out_dir,
        "cropped",
        segmentations,
        images,
    )
    .await
}

/// Convert groomed segmentations to signed distance transforms.
pub async fn distance_transform(
    toolkit: &dyn Toolkit,
    prep_dir: &Path,
    segmentations: &FileList,
) -> Result<FileList, PipelineError> {
    let out_dir = prep_dir.join("distance_transforms");
    tokio::fs::create_dir_all(&out_dir).await?;

    let base = ParamSet::new()
        .set("isoValue", 0.0)
        .set("smoothingIterations", 1u32);
    let outputs = segmentations.retargeted(&out_dir, "DT", "nrrd");
    run_pass(
        toolkit,
        tools::DISTANCE_TRANSFORM,
        &base,
        segmentations,
        &outputs,
        false,
    )
    .await?;
    Ok(outputs)
}

/// Convert mesh inputs to binary volumes, reflecting every sample onto the
/// configured reference side first so left and right anatomy share one
/// shape space. Paired raw images are reflected with the same axis whenever
/// their mesh was.
pub async fn convert_meshes(
    toolkit: &dyn Toolkit,
    prep_dir: &Path,
    meshes: &FileList,
    images: Option<&FileList>,
    input: &MeshInput,
) -> Result<(FileList, Option<FileList>), PipelineError> {
    let out_dir = prep_dir.join("volumes");
    tokio::fs::create_dir_all(&out_dir).await?;

    let mut seg_out = Vec::with_capacity(meshes.len());
    let mut img_out = Vec::with_capacity(meshes.len());

    for mesh in meshes {
        let stem = mesh
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let side = input
            .side_of(&stem)
            .ok_or_else(|| PipelineError::MissingInput(mesh.clone()))?;
        let reflect = side != input.reference_side;

        let mesh_in = if reflect {
            let reflected = out_dir.join(format!("{}.reflect.ply", stem));
            let params = ParamSet::new()
                .set("axis", "X")
                .path("inFilename", mesh)
                .path("outFilename", &reflected);
            toolkit.run(tools::REFLECT_MESH, &params).await?;
            reflected
        } else {
            mesh.clone()
        };

        let seg = out_dir.join(format!("{}.nrrd", stem));
        let params = ParamSet::new()
            .set("spacing", 1.0)
            .path("inFilename", &mesh_in)
            .path("outFilename", &seg);
        toolkit.run(tools::MESH_TO_VOLUME, &params).await?;
        seg_out.push(seg);

        if let Some(imgs) = images {
            let image = pair_image(imgs, input, &stem)
                .ok_or_else(|| PipelineError::MissingInput(mesh.clone()))?;
            if reflect {
                let reflected = out_dir.join(format!("{}.img.reflect.nrrd", stem));
                let params = ParamSet::new()
                    .set("axis", "X")
                    .path("inFilename", image)
                    .path("outFilename", &reflected);
                toolkit.run(tools::REFLECT_VOLUME, &params).await?;
                img_out.push(reflected);
            } else {
                img_out.push(image.clone());
            }
        }
    }

    info!(subjects = seg_out.len(), "mesh inputs converted to volumes");
    let images = images.map(|_| FileList::new(img_out));
    Ok((FileList::new(seg_out), images))
}

/// The raw image paired with a mesh, matched on the shared sample id.
fn pair_image<'a>(
    images: &'a FileList,
    input: &MeshInput,
    mesh_stem: &str,
) -> Option<&'a PathBuf> {
    let wanted = format!("{}_{}", input.sample_id(mesh_stem), input.image_suffix);
    images.iter().find(|path| {
        path.file_stem()
            .map(|s| s.to_string_lossy() == wanted.as_str())
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cases::UseCase;

    #[test]
    fn test_pair_image_matches_sample_id() {
        let input = UseCase::Femur.spec().mesh_input.unwrap();
        let images = FileList::new(vec![
            PathBuf::from("/d/n01_1x_hip.nrrd"),
            PathBuf::from("/d/n02_1x_hip.nrrd"),
        ]);

        assert_eq!(
            pair_image(&images, &input, "n02_L_femur").unwrap(),
            &PathBuf::from("/d/n02_1x_hip.nrrd")
        );
        assert!(pair_image(&images, &input, "n03_L_femur").is_none());
    }
}
