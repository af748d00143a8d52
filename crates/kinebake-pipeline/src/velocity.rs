//! Finite-difference velocity estimation
//!
//! All rates are first-order forward differences over one frame period,
//! `v[i] = (x[i] - x[i-1]) / dt`. Frame 0 has no predecessor and copies
//! frame 1, so every output has the same length as its input.
//!
//! Angular velocity uses the component-wise quaternion difference
//! `w[i] = 2 * (q[i] - q[i-1]).xyz / dt`. This matches the exact body rate
//! only to first order for small per-frame rotations, and it is not
//! corrected for sign flips between neighbouring quaternions.

use kinebake_core::{
    BodySeries, FrameCapture, MotionError, MotionResult, Quat, Vec3, Velocities, MIN_FRAMES,
};
use rayon::prelude::*;
use tracing::debug;

/// Computes joint and body velocities for a replayed series
pub struct VelocityEstimator;

impl VelocityEstimator {
    pub fn estimate(series: &BodySeries) -> MotionResult<Velocities> {
        check_frames(series)?;
        let dt = series.sample_rate.dt();

        let joint_velocity = forward_difference(&series.frames, |prev, next| {
            next.joint_position
                .iter()
                .zip(&prev.joint_position)
                .map(|(x1, x0)| (x1 - x0) / dt)
                .collect::<Vec<f64>>()
        })?;

        let body_linear_velocity = forward_difference(&series.frames, |prev, next| {
            next.bodies
                .iter()
                .zip(&prev.bodies)
                .map(|(b1, b0)| (b1.position - b0.position) / dt)
                .collect::<Vec<Vec3>>()
        })?;

        let body_angular_velocity = forward_difference(&series.frames, |prev, next| {
            next.bodies
                .iter()
                .zip(&prev.bodies)
                .map(|(b1, b0)| quat_rate(b0.orientation, b1.orientation, dt))
                .collect::<Vec<Vec3>>()
        })?;

        debug!(
            frames = series.num_frames(),
            bodies = series.num_bodies(),
            joints = series.num_joints(),
            dt,
            "Estimated velocities"
        );

        Ok(Velocities {
            joint_velocity,
            body_linear_velocity,
            body_angular_velocity,
        })
    }
}

/// Forward difference over consecutive samples, frame 0 backfilled from frame 1
///
/// `diff(prev, next)` computes the rate between two neighbours. Pairs are
/// independent and evaluated in parallel; output order follows input order.
pub fn forward_difference<T, R, F>(samples: &[T], diff: F) -> MotionResult<Vec<R>>
where
    T: Sync,
    R: Send + Clone,
    F: Fn(&T, &T) -> R + Sync,
{
    if samples.len() < MIN_FRAMES {
        return Err(MotionError::TooFewFrames {
            required: MIN_FRAMES,
            actual: samples.len(),
        });
    }

    let mut rates: Vec<R> = samples
        .par_windows(2)
        .map(|pair| diff(&pair[0], &pair[1]))
        .collect();
    let first = rates[0].clone();
    rates.insert(0, first);
    Ok(rates)
}

/// Approximate angular rate between two orientations `dt` apart
pub fn quat_rate(prev: Quat, next: Quat, dt: f64) -> Vec3 {
    let dq = (next - prev).vector();
    2.0 * dq / dt
}

fn check_frames(series: &BodySeries) -> MotionResult<()> {
    let bodies = series.num_bodies();
    let joints = series.num_joints();
    let ragged = |c: &FrameCapture| c.bodies.len() != bodies || c.joint_position.len() != joints;

    if let Some((frame, capture)) = series.frames.iter().enumerate().find(|(_, c)| ragged(c)) {
        return Err(MotionError::shape(
            "body_series",
            format!("{} bodies and {} joints per frame", bodies, joints),
            format!(
                "{} bodies and {} joints at frame {}",
                capture.bodies.len(),
                capture.joint_position.len(),
                frame
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinebake_core::{BodyFrameSample, SampleRate};
    use proptest::prelude::*;

    fn series(hz: f64, poses: &[(Vec3, Quat)], joints: &[f64]) -> BodySeries {
        BodySeries {
            sample_rate: SampleRate::new(hz).unwrap(),
            body_names: vec!["pelvis".into()],
            joint_names: vec!["hip".into()],
            frames: poses
                .iter()
                .zip(joints)
                .map(|(&(position, orientation), &q)| FrameCapture {
                    joint_position: vec![q],
                    bodies: vec![BodyFrameSample {
                        position,
                        orientation,
                    }],
                })
                .collect(),
        }
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        a.distance(b) < 1e-9
    }

    #[test]
    fn test_linear_velocity_backfill() {
        let s = series(
            10.0,
            &[
                (Vec3::zero(), Quat::identity()),
                (Vec3::new(1.0, 0.0, 0.0), Quat::identity()),
            ],
            &[0.0, 0.5],
        );
        let v = VelocityEstimator::estimate(&s).unwrap();

        assert!(close(v.body_linear_velocity[0][0], Vec3::new(10.0, 0.0, 0.0)));
        assert!(close(v.body_linear_velocity[1][0], Vec3::new(10.0, 0.0, 0.0)));
        assert!((v.joint_velocity[0][0] - 5.0).abs() < 1e-9);
        assert!((v.joint_velocity[1][0] - 5.0).abs() < 1e-9);
        assert!(close(v.body_angular_velocity[0][0], Vec3::zero()));
    }

    #[test]
    fn test_quat_rate() {
        let w = quat_rate(Quat::identity(), Quat::new(0.1, 0.0, 0.0, 0.995), 0.1);
        assert!(close(w, Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_sign_flip_is_not_corrected() {
        let q = Quat::new(0.0, 0.0, 0.3827, 0.9239);
        let flipped = Quat::new(-q.x, -q.y, -q.z, -q.w);
        let w = quat_rate(q, flipped, 0.1);
        assert!(close(w, Vec3::new(0.0, 0.0, -2.0 * 2.0 * 0.3827 / 0.1)));
        assert!(w.distance(Vec3::zero()) > 1.0);
    }

    #[test]
    fn test_constant_pose_is_still() {
        let pose = (Vec3::new(0.3, -0.2, 0.8), Quat::new(0.0, 0.0, 0.3827, 0.9239));
        let s = series(30.0, &[pose; 4], &[0.2; 4]);
        let v = VelocityEstimator::estimate(&s).unwrap();
        for frame in 0..4 {
            assert!(close(v.body_linear_velocity[frame][0], Vec3::zero()));
            assert!(close(v.body_angular_velocity[frame][0], Vec3::zero()));
            assert_eq!(v.joint_velocity[frame][0], 0.0);
        }
    }

    #[test]
    fn test_too_few_frames() {
        let s = series(30.0, &[(Vec3::zero(), Quat::identity())], &[0.0]);
        assert!(matches!(
            VelocityEstimator::estimate(&s),
            Err(MotionError::TooFewFrames { actual: 1, .. })
        ));
    }

    #[test]
    fn test_ragged_series() {
        let mut s = series(30.0, &[(Vec3::zero(), Quat::identity()); 3], &[0.0; 3]);
        s.frames[2].bodies.clear();
        assert!(matches!(
            VelocityEstimator::estimate(&s),
            Err(MotionError::ShapeMismatch { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_first_row_copies_second(
            xs in prop::collection::vec(-10.0f64..10.0, 2..40),
            hz in 1.0f64..240.0,
        ) {
            let dt = 1.0 / hz;
            let rates = forward_difference(&xs, |a, b| (b - a) / dt).unwrap();
            prop_assert_eq!(rates.len(), xs.len());
            prop_assert_eq!(rates[0], rates[1]);
            for i in 1..xs.len() {
                prop_assert_eq!(rates[i], (xs[i] - xs[i - 1]) / dt);
            }
        }
    }
}
