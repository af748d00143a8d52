//! Evaluator capability - the forward-kinematics collaborator
//!
//! An evaluator owns a mutable articulated body. Each `set_state` call places
//! the body and resolves every link's world pose; `read_body_states` reports
//! the result. Calls are order-dependent: a frame observes whatever state the
//! previous frame left behind.

use crate::{MotionResult, Quat, Vec3};

/// Full pose command for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct PoseCommand {
    pub root_position: Vec3,
    pub root_orientation: Quat,
    pub root_linear_velocity: Vec3,
    pub root_angular_velocity: Vec3,
    pub joint_positions: Vec<f64>,
    pub joint_velocities: Vec<f64>,
}

impl PoseCommand {
    /// Kinematic placement command: every velocity field is zero
    pub fn placement(root_position: Vec3, root_orientation: Quat, joint_positions: &[f64]) -> Self {
        PoseCommand {
            root_position,
            root_orientation,
            root_linear_velocity: Vec3::zero(),
            root_angular_velocity: Vec3::zero(),
            joint_positions: joint_positions.to_vec(),
            joint_velocities: vec![0.0; joint_positions.len()],
        }
    }

    /// True when no velocity is requested
    pub fn is_static(&self) -> bool {
        self.root_linear_velocity == Vec3::zero()
            && self.root_angular_velocity == Vec3::zero()
            && self.joint_velocities.iter().all(|v| *v == 0.0)
    }
}

/// World-frame state of one body as reported by an evaluator
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub orientation: Quat,
    /// Reported but not trusted
    pub linear_velocity: Vec3,
    /// Reported but not trusted
    pub angular_velocity: Vec3,
}

impl BodyState {
    pub fn at(position: Vec3, orientation: Quat) -> Self {
        BodyState {
            position,
            orientation,
            ..Default::default()
        }
    }
}

/// Forward-kinematics evaluator
pub trait Evaluator {
    /// Ordered body names, used verbatim as output labels
    fn body_names(&self) -> &[String];

    /// Ordered joint names, used verbatim as output labels
    fn joint_names(&self) -> &[String];

    /// Apply a pose and resolve forward kinematics
    fn set_state(&mut self, command: &PoseCommand) -> MotionResult<()>;

    /// Per-body world state after the last resolve, in `body_names` order
    fn read_body_states(&self) -> MotionResult<Vec<BodyState>>;

    fn num_bodies(&self) -> usize {
        self.body_names().len()
    }

    fn num_joints(&self) -> usize {
        self.joint_names().len()
    }
}

impl<E: Evaluator + ?Sized> Evaluator for &mut E {
    fn body_names(&self) -> &[String] {
        (**self).body_names()
    }

    fn joint_names(&self) -> &[String] {
        (**self).joint_names()
    }

    fn set_state(&mut self, command: &PoseCommand) -> MotionResult<()> {
        (**self).set_state(command)
    }

    fn read_body_states(&self) -> MotionResult<Vec<BodyState>> {
        (**self).read_body_states()
    }
}
