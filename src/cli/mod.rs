//! Command-line interface for shapepipe.
//!
//! `run` executes a full use-case pipeline; `check` probes the external
//! toolkit; `config` prints the resolved settings.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use crate::cases::CuttingPlane;
use crate::config::Settings;
use crate::core::{Driver, Gate, RunConfig};
use crate::error::PipelineError;
use crate::toolkit::ExternalToolkit;

/// shapepipe - statistical shape modeling pipeline runner
#[derive(Parser, Debug)]
#[command(name = "shapepipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a use-case pipeline end to end
    Run {
        /// Use case to run: ellipsoid, left_atrium, or femur
        use_case: String,

        /// Pause for confirmation at each stage
        #[arg(long)]
        interactive: bool,

        /// Start with already prepped data (skip grooming)
        #[arg(long)]
        start_with_prepped_data: bool,

        /// Groom raw images alongside the segmentations
        #[arg(long)]
        start_with_image_and_segmentation_data: bool,

        /// Single-scale optimization instead of multi-scale
        #[arg(long)]
        use_single_scale: bool,

        /// Run a short smoke test (3 subjects, reduced iterations)
        #[arg(long)]
        tiny_test: bool,

        /// Directory holding the toolkit executables
        #[arg(long, value_name = "DIR", env = "SHAPEPIPE_BIN")]
        toolkit_path: Option<PathBuf>,

        /// Root directory for working trees and downloads
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Check that the external toolkit is reachable
    Check {
        /// Directory holding the toolkit executables
        #[arg(long, value_name = "DIR", env = "SHAPEPIPE_BIN")]
        toolkit_path: Option<PathBuf>,
    },

    /// Show resolved configuration
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Run {
                use_case,
                interactive,
                start_with_prepped_data,
                start_with_image_and_segmentation_data,
                use_single_scale,
                tiny_test,
                toolkit_path,
                output_dir,
            } => {
                let mut settings = Settings::load()?;
                if let Some(bin) = toolkit_path {
                    settings.toolkit_bin = Some(bin);
                }
                if let Some(root) = output_dir {
                    settings.output_root = root;
                }

                let config = RunConfig {
                    interactive,
                    start_with_prepped_data,
                    start_with_image_and_segmentation_data,
                    use_single_scale,
                    tiny_test,
                };

                run_pipeline(&use_case, settings, config).await
            }
            Commands::Check { toolkit_path } => {
                let mut settings = Settings::load()?;
                if let Some(bin) = toolkit_path {
                    settings.toolkit_bin = Some(bin);
                }
                let toolkit = ExternalToolkit::new(settings.toolkit_bin);
                toolkit.check().await?;
                println!("toolkit OK");
                Ok(())
            }
            Commands::Config => {
                let settings = Settings::load()?;
                println!(
                    "toolkit bin:  {}",
                    settings
                        .toolkit_bin
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(search path)".into())
                );
                println!("dataset url:  {}", settings.dataset_url);
                println!("output root:  {}", settings.output_root.display());
                println!(
                    "config file:  {}",
                    settings
                        .config_file
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(none)".into())
                );
                Ok(())
            }
        }
    }
}

async fn run_pipeline(use_case: &str, settings: Settings, config: RunConfig) -> Result<()> {
    let toolkit = ExternalToolkit::new(settings.toolkit_bin.clone());
    let prompt_gate = PromptGate;
    let interactive = config.interactive;

    let driver = Driver::new(&toolkit, &settings, config);
    let driver = if interactive {
        driver.with_gate(&prompt_gate)
    } else {
        driver
    };

    // A ctrl-c becomes a distinct "interrupted" outcome rather than an
    // unhandled crash or a tool failure.
    let outputs = tokio::select! {
        result = driver.run(use_case) => result?,
        _ = tokio::signal::ctrl_c() => return Err(PipelineError::Interrupted.into()),
    };

    println!("\nShape modeling pipeline complete!");
    println!(
        "  {} subjects, {} local / {} world particle files",
        outputs.distance_transforms.len(),
        outputs.particles.local.len(),
        outputs.particles.world.len()
    );
    Ok(())
}

/// Terminal-backed confirmation gate for interactive runs.
struct PromptGate;

impl PromptGate {
    fn read_line(prompt: &str) -> String {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        let _ = std::io::stdin().read_line(&mut line);
        line.trim().to_string()
    }
}

impl Gate for PromptGate {
    fn wait(&self, stage: &str) {
        println!("\n{}\n", stage);
        Self::read_line("Press Enter to continue ");
    }

    fn cutting_plane(&self, default: CuttingPlane) -> CuttingPlane {
        println!("\nDefine three cutting-plane points (blank keeps the default).");
        let mut points = default.points;
        for (i, point) in points.iter_mut().enumerate() {
            for (axis, label) in ["x", "y", "z"].iter().enumerate() {
                let prompt = format!("point{} {}-value [{}]: ", i + 1, label, point[axis]);
                let entry = Self::read_line(&prompt);
                if entry.is_empty() {
                    continue;
                }
                match entry.parse::<f64>() {
                    Ok(value) => point[axis] = value,
                    Err(_) => warn!(%entry, "not a number, keeping default"),
                }
            }
        }
        CuttingPlane { points }
    }
}
