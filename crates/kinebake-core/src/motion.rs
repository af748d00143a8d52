//! Motion records - raw input, replayed body series, annotated output

use crate::{MotionError, MotionResult, Quat, SampleRate, Vec3};

/// Minimum frames for finite-difference velocities
pub const MIN_FRAMES: usize = 2;

/// Root pose and joint-angle samples as read from a motion source
#[derive(Debug, Clone, PartialEq)]
pub struct RawMotion {
    /// Nominal sample rate
    pub sample_rate: SampleRate,
    /// Root position per frame (N)
    pub root_position: Vec<Vec3>,
    /// Root orientation per frame (N, xyzw)
    pub root_orientation: Vec<Quat>,
    /// Joint angles per frame (N x J)
    pub joint_angles: Vec<Vec<f64>>,
}

impl RawMotion {
    /// Build a motion, checking that all per-frame fields agree
    pub fn new(
        sample_rate: SampleRate,
        root_position: Vec<Vec3>,
        root_orientation: Vec<Quat>,
        joint_angles: Vec<Vec<f64>>,
    ) -> MotionResult<Self> {
        let motion = RawMotion {
            sample_rate,
            root_position,
            root_orientation,
            joint_angles,
        };
        motion.validate()?;
        Ok(motion)
    }

    /// Number of frames (N)
    pub fn num_frames(&self) -> usize {
        self.root_position.len()
    }

    /// Number of joints per frame (J)
    pub fn num_joints(&self) -> usize {
        self.joint_angles.first().map(Vec::len).unwrap_or(0)
    }

    /// Check shape consistency across fields
    pub fn validate(&self) -> MotionResult<()> {
        let frames = self.num_frames();

        if self.root_orientation.len() != frames {
            return Err(MotionError::FrameCountMismatch {
                field: "root_orientation".into(),
                expected: frames,
                actual: self.root_orientation.len(),
            });
        }
        if self.joint_angles.len() != frames {
            return Err(MotionError::FrameCountMismatch {
                field: "joint_angles".into(),
                expected: frames,
                actual: self.joint_angles.len(),
            });
        }
        if frames < MIN_FRAMES {
            return Err(MotionError::TooFewFrames {
                required: MIN_FRAMES,
                actual: frames,
            });
        }

        let joints = self.num_joints();
        if let Some((frame, row)) = self
            .joint_angles
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != joints)
        {
            return Err(MotionError::shape(
                "joint_angles",
                format!("{} values in every frame", joints),
                format!("{} values at frame {}", row.len(), frame),
            ));
        }

        Ok(())
    }

    /// Shift every root position vertically by `offset`
    pub fn apply_z_offset(&mut self, offset: f64) {
        for position in &mut self.root_position {
            position.z += offset;
        }
    }

    /// Replace the nominal sample rate (no resampling)
    pub fn with_sample_rate(mut self, hz: f64) -> MotionResult<Self> {
        self.sample_rate = SampleRate::new(hz)?;
        Ok(self)
    }

    /// Min and max root height
    pub fn z_range(&self) -> (f64, f64) {
        self.root_position
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                (lo.min(p.z), hi.max(p.z))
            })
    }
}

/// One body's world pose at one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyFrameSample {
    pub position: Vec3,
    pub orientation: Quat,
}

/// Everything captured for one replayed frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameCapture {
    /// Joint positions as commanded (J)
    pub joint_position: Vec<f64>,
    /// Resolved body poses (B)
    pub bodies: Vec<BodyFrameSample>,
}

/// Full replayed trajectory, handed from replay to velocity estimation
#[derive(Debug, Clone, PartialEq)]
pub struct BodySeries {
    pub sample_rate: SampleRate,
    pub body_names: Vec<String>,
    pub joint_names: Vec<String>,
    /// Per-frame captures (N)
    pub frames: Vec<FrameCapture>,
}

impl BodySeries {
    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }

    pub fn num_bodies(&self) -> usize {
        self.body_names.len()
    }

    pub fn num_joints(&self) -> usize {
        self.joint_names.len()
    }
}

/// Finite-difference velocities for a body series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Velocities {
    /// N x J
    pub joint_velocity: Vec<Vec<f64>>,
    /// N x B
    pub body_linear_velocity: Vec<Vec<Vec3>>,
    /// N x B
    pub body_angular_velocity: Vec<Vec<Vec3>>,
}

/// Velocity-annotated motion, ready to be written
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedMotion {
    pub sample_rate: SampleRate,
    /// N x J
    pub joint_position: Vec<Vec<f64>>,
    /// N x J
    pub joint_velocity: Vec<Vec<f64>>,
    /// N x B
    pub body_position: Vec<Vec<Vec3>>,
    /// N x B (xyzw)
    pub body_orientation: Vec<Vec<Quat>>,
    /// N x B
    pub body_linear_velocity: Vec<Vec<Vec3>>,
    /// N x B
    pub body_angular_velocity: Vec<Vec<Vec3>>,
    pub body_names: Vec<String>,
    pub joint_names: Vec<String>,
}

impl AnnotatedMotion {
    /// Combine a replayed series with its velocities
    pub fn assemble(series: BodySeries, velocities: Velocities) -> MotionResult<Self> {
        let frames = series.num_frames();
        for (field, len) in [
            ("joint_velocity", velocities.joint_velocity.len()),
            ("body_linear_velocity", velocities.body_linear_velocity.len()),
            ("body_angular_velocity", velocities.body_angular_velocity.len()),
        ] {
            if len != frames {
                return Err(MotionError::FrameCountMismatch {
                    field: field.into(),
                    expected: frames,
                    actual: len,
                });
            }
        }

        let mut joint_position = Vec::with_capacity(frames);
        let mut body_position = Vec::with_capacity(frames);
        let mut body_orientation = Vec::with_capacity(frames);
        for capture in series.frames {
            body_position.push(capture.bodies.iter().map(|b| b.position).collect());
            body_orientation.push(capture.bodies.iter().map(|b| b.orientation).collect());
            joint_position.push(capture.joint_position);
        }

        Ok(AnnotatedMotion {
            sample_rate: series.sample_rate,
            joint_position,
            joint_velocity: velocities.joint_velocity,
            body_position,
            body_orientation,
            body_linear_velocity: velocities.body_linear_velocity,
            body_angular_velocity: velocities.body_angular_velocity,
            body_names: series.body_names,
            joint_names: series.joint_names,
        })
    }

    pub fn num_frames(&self) -> usize {
        self.joint_position.len()
    }

    pub fn num_bodies(&self) -> usize {
        self.body_names.len()
    }

    pub fn num_joints(&self) -> usize {
        self.joint_names.len()
    }
}
