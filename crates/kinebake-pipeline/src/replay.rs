//! Frame replay - drive an evaluator through a raw motion
//!
//! Each frame is placed statically (all commanded velocities zero) and the
//! resolved body poses are captured. Evaluator-reported velocities are
//! discarded; velocities are recomputed from the captured poses afterwards.

use kinebake_core::{
    BodyFrameSample, BodySeries, Evaluator, FrameCapture, MotionError, MotionResult, PoseCommand,
    RawMotion,
};
use tracing::{debug, info};

/// Default progress logging period, in frames
pub const DEFAULT_PROGRESS_INTERVAL: usize = 30;

/// Replays motions frame by frame
#[derive(Debug, Clone)]
pub struct FrameReplayer {
    progress_interval: usize,
}

impl Default for FrameReplayer {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRESS_INTERVAL)
    }
}

impl FrameReplayer {
    /// `progress_interval` of 0 disables progress logging
    pub fn new(progress_interval: usize) -> Self {
        FrameReplayer { progress_interval }
    }

    pub fn progress_interval(&self) -> usize {
        self.progress_interval
    }

    /// Replay every frame in order, calling `set_state` exactly once per frame
    pub fn replay<E: Evaluator>(
        &self,
        motion: &RawMotion,
        evaluator: &mut E,
    ) -> MotionResult<BodySeries> {
        let frames = motion.num_frames();
        let bodies = evaluator.num_bodies();
        debug!(frames, bodies, joints = evaluator.num_joints(), "Starting replay");

        let mut captures = Vec::with_capacity(frames);
        for frame in 0..frames {
            let joint_position = motion.joint_angles[frame].clone();
            let command = PoseCommand::placement(
                motion.root_position[frame],
                motion.root_orientation[frame],
                &joint_position,
            );

            evaluator
                .set_state(&command)
                .map_err(|e| at_frame(frame, e))?;
            let states = evaluator
                .read_body_states()
                .map_err(|e| at_frame(frame, e))?;

            if states.len() != bodies {
                return Err(MotionError::EvaluatorFailed {
                    frame,
                    reason: format!("expected {} body states, got {}", bodies, states.len()),
                });
            }

            captures.push(FrameCapture {
                joint_position,
                bodies: states
                    .into_iter()
                    .map(|s| BodyFrameSample {
                        position: s.position,
                        orientation: s.orientation,
                    })
                    .collect(),
            });

            if self.progress_interval > 0 && frame % self.progress_interval == 0 {
                info!(frame, frames, "Replaying");
            }
        }

        Ok(BodySeries {
            sample_rate: motion.sample_rate,
            body_names: evaluator.body_names().to_vec(),
            joint_names: evaluator.joint_names().to_vec(),
            frames: captures,
        })
    }
}

/// Attach the frame index to an evaluator failure
fn at_frame(frame: usize, err: MotionError) -> MotionError {
    match err {
        MotionError::EvaluatorFailed { .. } => err,
        other => MotionError::EvaluatorFailed {
            frame,
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinebake_core::{BodyState, Quat, SampleRate, Vec3};

    /// Two bodies; the second sits one joint-angle above the root
    struct Stacked {
        body_names: Vec<String>,
        joint_names: Vec<String>,
        last: Option<PoseCommand>,
        calls: usize,
        fail_at: Option<usize>,
        short_at: Option<usize>,
    }

    impl Stacked {
        fn new() -> Self {
            Stacked {
                body_names: vec!["base".into(), "top".into()],
                joint_names: vec!["lift".into()],
                last: None,
                calls: 0,
                fail_at: None,
                short_at: None,
            }
        }
    }

    impl Evaluator for Stacked {
        fn body_names(&self) -> &[String] {
            &self.body_names
        }

        fn joint_names(&self) -> &[String] {
            &self.joint_names
        }

        fn set_state(&mut self, command: &PoseCommand) -> MotionResult<()> {
            if self.fail_at == Some(self.calls) {
                return Err(MotionError::EvaluatorRejected("diverged".into()));
            }
            assert!(command.is_static());
            self.calls += 1;
            self.last = Some(command.clone());
            Ok(())
        }

        fn read_body_states(&self) -> MotionResult<Vec<BodyState>> {
            let cmd = self.last.as_ref().ok_or(MotionError::StateNotResolved)?;
            let mut states = vec![
                BodyState::at(cmd.root_position, cmd.root_orientation),
                BodyState::at(
                    cmd.root_position + Vec3::new(0.0, 0.0, cmd.joint_positions[0]),
                    cmd.root_orientation,
                ),
            ];
            if self.short_at == Some(self.calls - 1) {
                states.pop();
            }
            Ok(states)
        }
    }

    fn motion(frames: usize) -> RawMotion {
        RawMotion::new(
            SampleRate::new(30.0).unwrap(),
            (0..frames).map(|i| Vec3::new(i as f64, 0.0, 0.8)).collect(),
            vec![Quat::identity(); frames],
            (0..frames).map(|i| vec![0.1 * i as f64]).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_one_set_state_per_frame() {
        let mut evaluator = Stacked::new();
        let series = FrameReplayer::default()
            .replay(&motion(5), &mut evaluator)
            .unwrap();

        assert_eq!(evaluator.calls, 5);
        assert_eq!(series.num_frames(), 5);
        assert_eq!(series.body_names, vec!["base", "top"]);
        assert_eq!(series.joint_names, vec!["lift"]);
        assert_eq!(series.frames[3].joint_position, vec![0.1 * 3.0]);
        assert_eq!(series.frames[3].bodies[0].position, Vec3::new(3.0, 0.0, 0.8));
        assert!((series.frames[3].bodies[1].position.z - 1.1).abs() < 1e-12);
    }

    #[test]
    fn test_failure_carries_frame() {
        let mut evaluator = Stacked::new();
        evaluator.fail_at = Some(2);
        let err = FrameReplayer::new(0)
            .replay(&motion(4), &mut evaluator)
            .unwrap_err();
        assert!(matches!(err, MotionError::EvaluatorFailed { frame: 2, .. }));
        assert!(err.is_evaluator());
    }

    #[test]
    fn test_body_count_mismatch() {
        let mut evaluator = Stacked::new();
        evaluator.short_at = Some(1);
        let err = FrameReplayer::default()
            .replay(&motion(3), &mut evaluator)
            .unwrap_err();
        assert!(matches!(err, MotionError::EvaluatorFailed { frame: 1, .. }));
    }
}
