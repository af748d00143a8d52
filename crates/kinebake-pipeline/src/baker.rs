//! End-to-end bake: load, replay, estimate, write

use std::path::{Path, PathBuf};
use std::time::Instant;

use kinebake_core::{AnnotatedMotion, Evaluator, MotionResult, RawMotion, SampleRate};
use tracing::info;

use crate::{BakeConfig, FrameReplayer, MotionLoader, MotionWriter, VelocityEstimator};

/// Summary of a finished bake
#[derive(Debug, Clone, PartialEq)]
pub struct BakeReport {
    /// Written archive
    pub path: PathBuf,
    pub frames: usize,
    pub bodies: usize,
    pub joints: usize,
    pub sample_rate: SampleRate,
}

/// Runs the pipeline against one evaluator
pub struct Baker<E: Evaluator> {
    config: BakeConfig,
    evaluator: E,
}

impl<E: Evaluator> Baker<E> {
    pub fn new(config: BakeConfig, evaluator: E) -> Self {
        Baker { config, evaluator }
    }

    pub fn config(&self) -> &BakeConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Bake the motion file at `input` into artifact `output_name`
    pub fn bake<P: AsRef<Path>>(&mut self, input: P, output_name: &str) -> MotionResult<BakeReport> {
        // Reject a bad destination before doing any work
        MotionWriter::new(self.config.writer.clone()).artifact_path(output_name)?;

        let motion = MotionLoader::load(input, self.config.z_offset)?;
        self.bake_motion(motion, output_name)
    }

    /// Bake an already loaded motion (the z offset is not applied again)
    pub fn bake_motion(&mut self, motion: RawMotion, output_name: &str) -> MotionResult<BakeReport> {
        let started = Instant::now();
        let writer = MotionWriter::new(self.config.writer.clone());
        writer.artifact_path(output_name)?;

        let motion = match self.config.sample_rate_override {
            Some(hz) => {
                info!(from = motion.sample_rate.hz(), to = hz, "Overriding sample rate");
                motion.with_sample_rate(hz)?
            }
            None => motion,
        };

        let replayer = FrameReplayer::new(self.config.progress_interval);
        let series = replayer.replay(&motion, &mut self.evaluator)?;
        let velocities = VelocityEstimator::estimate(&series)?;
        let annotated = AnnotatedMotion::assemble(series, velocities)?;
        let path = writer.write(&annotated, output_name)?;

        let report = BakeReport {
            path,
            frames: annotated.num_frames(),
            bodies: annotated.num_bodies(),
            joints: annotated.num_joints(),
            sample_rate: annotated.sample_rate,
        };
        info!(
            path = ?report.path,
            frames = report.frames,
            bodies = report.bodies,
            joints = report.joints,
            duration_s = report.sample_rate.span(report.frames).as_secs_f64(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Bake complete"
        );
        Ok(report)
    }
}
