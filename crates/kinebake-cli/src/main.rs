//! kinebake - bake a root-pose and joint-angle motion into a
//! velocity-annotated NPZ artifact
//!
//! ```text
//! kinebake --input walk.npz --output walk --model g1.toml --z_offset -0.05
//! ```
//!
//! Writes `artifacts/walk:v0/motion.npz`. Log verbosity follows `RUST_LOG`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use kinebake_core::Evaluator;
use kinebake_fk::KinematicTree;
use kinebake_pipeline::{BakeConfig, Baker};
use tracing::info;

/// Motion post-processing: replay, differentiate, write
#[derive(Parser, Debug)]
#[command(name = "kinebake", version, about, long_about = None)]
struct Cli {
    /// Motion file (.npz or .json)
    #[arg(long)]
    input: PathBuf,

    /// Artifact name; output goes to {output_root}/{name}:{version}/
    #[arg(long)]
    output: String,

    /// Kinematic model (.toml or .json)
    #[arg(long)]
    model: PathBuf,

    /// Vertical offset added to every root position (meters)
    #[arg(long = "z_offset", allow_negative_numbers = true)]
    z_offset: Option<f64>,

    /// Override the motion's sample rate (frames per second)
    #[arg(long)]
    fps: Option<f64>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Root directory for artifacts
    #[arg(long)]
    output_root: Option<PathBuf>,

    /// Deflate archive entries
    #[arg(long)]
    compress: bool,
}

impl Cli {
    /// Config file (or defaults) with command-line overrides applied
    fn bake_config(&self) -> Result<BakeConfig> {
        let mut config = match &self.config {
            Some(path) => BakeConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => BakeConfig::default(),
        };

        if let Some(z_offset) = self.z_offset {
            config.z_offset = z_offset;
        }
        if let Some(fps) = self.fps {
            config.sample_rate_override = Some(fps);
        }
        if let Some(root) = &self.output_root {
            config.writer.output_root = root.clone();
        }
        if self.compress {
            config.writer.compress = true;
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kinebake=info,kinebake_pipeline=info,kinebake_fk=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = cli.bake_config()?;

    let tree = KinematicTree::load(&cli.model)
        .with_context(|| format!("loading model {}", cli.model.display()))?;
    info!(
        bodies = tree.num_bodies(),
        joints = tree.num_joints(),
        "Model ready"
    );

    let report = Baker::new(config, tree)
        .bake(&cli.input, &cli.output)
        .with_context(|| format!("baking {}", cli.input.display()))?;

    info!(
        path = %report.path.display(),
        frames = report.frames,
        fps = report.sample_rate.hz(),
        "Done"
    );
    Ok(())
}
