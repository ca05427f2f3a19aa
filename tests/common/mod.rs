//! Shared test fixtures: a recording fake toolkit and dataset seeding.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;

use shapepipe::toolkit::{ParamSet, ParamValue, Toolkit};
use shapepipe::{PipelineError, Settings};

/// One recorded toolkit invocation.
#[derive(Debug, Clone)]
pub struct Call {
    pub tool: String,
    pub params: ParamSet,
    pub launched: bool,
}

/// Fake toolkit that records every invocation and touches the declared
/// output files instead of computing anything.
#[derive(Default)]
pub struct FakeToolkit {
    calls: Mutex<Vec<Call>>,
    fail_tool: Option<(String, i32)>,
}

impl FakeToolkit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake that fails with the given exit code whenever `tool` is invoked.
    pub fn failing(tool: &str, code: i32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_tool: Some((tool.to_string(), code)),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, tool: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.tool == tool)
            .collect()
    }

    pub fn count(&self, tool: &str) -> usize {
        self.calls_for(tool).len()
    }

    fn record(&self, tool: &str, params: &ParamSet, launched: bool) -> Result<(), PipelineError> {
        if let Some((fail_tool, code)) = &self.fail_tool {
            if fail_tool == tool {
                return Err(PipelineError::ToolFailed {
                    tool: tool.to_string(),
                    code: *code,
                    stderr: "stub failure".to_string(),
                });
            }
        }

        // Honor the output contract: later stages expect these files.
        if let Some(ParamValue::Paths(outputs)) = params.get("outFilename") {
            for path in outputs {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).unwrap();
                }
                std::fs::write(path, b"").unwrap();
            }
        }

        self.calls.lock().unwrap().push(Call {
            tool: tool.to_string(),
            params: params.clone(),
            launched,
        });
        Ok(())
    }
}

#[async_trait]
impl Toolkit for FakeToolkit {
    async fn run(&self, tool: &str, params: &ParamSet) -> Result<(), PipelineError> {
        self.record(tool, params, false)
    }

    async fn launch(&self, tool: &str, params: &ParamSet) -> Result<(), PipelineError> {
        self.record(tool, params, true)
    }
}

/// Settings pointing at a sandbox root, with an unroutable dataset URL so a
/// test can never hit the network by accident.
pub fn sandbox_settings(root: &Path) -> Settings {
    Settings {
        toolkit_bin: None,
        dataset_url: "http://127.0.0.1:9".to_string(),
        output_root: root.to_path_buf(),
        config_file: None,
    }
}

pub fn touch(path: &Path) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, b"").unwrap();
}

/// Lay down an already-extracted ellipsoid dataset with `n` subjects.
pub fn seed_ellipsoid(root: &Path, n: usize) {
    for i in 0..n {
        touch(&root.join(format!("TestEllipsoids/Ellipsoids_UnPrepped/seg_{:02}.nrrd", i)));
    }
}

/// Lay down an already-extracted left atrium dataset with `n` subjects,
/// both modalities.
pub fn seed_left_atrium(root: &Path, n: usize) {
    for i in 0..n {
        touch(&root.join(format!("TestLeftAtrium/segmentation_LGE/la_{:02}.nrrd", i)));
        touch(&root.join(format!("TestLeftAtrium/LGE/la_{:02}.nrrd", i)));
    }
}

/// Lay down an already-extracted femur dataset: one left and one right mesh
/// with their paired hip images.
pub fn seed_femur(root: &Path) {
    touch(&root.join("TestFemur/femurdata/n01_L_femur.ply"));
    touch(&root.join("TestFemur/femurdata/n02_R_femur.ply"));
    touch(&root.join("TestFemur/femurdata/n01_1x_hip.nrrd"));
    touch(&root.join("TestFemur/femurdata/n02_1x_hip.nrrd"));
}
