//! Kinematic tree evaluator
//!
//! Resolves world poses root to leaf. Bodies are stored in declaration
//! order, which is guaranteed to list every parent before its children.

use std::collections::HashMap;
use std::path::Path;

use kinebake_core::{
    BodyState, Evaluator, MotionError, MotionResult, PoseCommand, Quat, Vec3,
};
use tracing::debug;

use crate::{JointKind, ModelSpec};

#[derive(Debug, Clone)]
struct LinkJoint {
    kind: JointKind,
    /// Unit axis in the body frame
    axis: Vec3,
    /// Index into the command's joint positions
    index: usize,
}

#[derive(Debug, Clone)]
struct Link {
    parent: Option<usize>,
    offset: Vec3,
    rotation: Quat,
    joint: Option<LinkJoint>,
}

/// Stateful forward-kinematics evaluator over a fixed tree
#[derive(Debug, Clone)]
pub struct KinematicTree {
    origin: Vec3,
    links: Vec<Link>,
    body_names: Vec<String>,
    joint_names: Vec<String>,
    /// Poses from the last resolve
    poses: Option<Vec<BodyState>>,
    resolves: u64,
}

impl KinematicTree {
    /// Build and validate a tree from its description
    pub fn from_spec(spec: ModelSpec) -> MotionResult<Self> {
        if spec.bodies.is_empty() {
            return Err(MotionError::InvalidModel("model has no bodies".into()));
        }
        if !spec.origin.is_finite() {
            return Err(MotionError::InvalidModel("origin is not finite".into()));
        }

        let mut index: HashMap<String, usize> = HashMap::new();
        let mut links = Vec::with_capacity(spec.bodies.len());
        let mut body_names = Vec::with_capacity(spec.bodies.len());
        let mut joint_names: Vec<String> = Vec::new();

        for (i, body) in spec.bodies.into_iter().enumerate() {
            if index.contains_key(&body.name) {
                return Err(MotionError::InvalidModel(format!(
                    "duplicate body {:?}",
                    body.name
                )));
            }

            let parent = match (i, &body.parent) {
                (0, None) => None,
                (0, Some(p)) => {
                    return Err(MotionError::InvalidModel(format!(
                        "root body {:?} cannot have parent {:?}",
                        body.name, p
                    )))
                }
                (_, None) => {
                    return Err(MotionError::InvalidModel(format!(
                        "body {:?} has no parent; only the first body is the root",
                        body.name
                    )))
                }
                (_, Some(p)) => Some(*index.get(p).ok_or_else(|| {
                    MotionError::InvalidModel(format!(
                        "body {:?} names unknown or later parent {:?}",
                        body.name, p
                    ))
                })?),
            };

            if !body.offset.is_finite() || !body.rotation.is_finite() {
                return Err(MotionError::InvalidModel(format!(
                    "body {:?} has a non-finite offset or rotation",
                    body.name
                )));
            }

            let joint = match body.joint {
                Some(joint) => {
                    if joint_names.contains(&joint.name) {
                        return Err(MotionError::InvalidModel(format!(
                            "duplicate joint {:?}",
                            joint.name
                        )));
                    }
                    let axis = joint.axis.try_normalize().ok_or_else(|| {
                        MotionError::InvalidModel(format!("joint {:?} has a zero axis", joint.name))
                    })?;
                    joint_names.push(joint.name);
                    Some(LinkJoint {
                        kind: joint.kind,
                        axis,
                        index: joint_names.len() - 1,
                    })
                }
                None => None,
            };

            index.insert(body.name.clone(), i);
            body_names.push(body.name);
            links.push(Link {
                parent,
                offset: body.offset,
                rotation: body.rotation.normalize(),
                joint,
            });
        }

        debug!(
            bodies = body_names.len(),
            joints = joint_names.len(),
            "Kinematic tree built"
        );

        Ok(KinematicTree {
            origin: spec.origin,
            links,
            body_names,
            joint_names,
            poses: None,
            resolves: 0,
        })
    }

    /// Load a model file and build the tree
    pub fn load<P: AsRef<Path>>(path: P) -> MotionResult<Self> {
        Self::from_spec(ModelSpec::load(path)?)
    }

    /// Environment origin added to commanded root positions
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Number of successful `set_state` calls
    pub fn resolves(&self) -> u64 {
        self.resolves
    }

    fn resolve(&self, command: &PoseCommand) -> Vec<BodyState> {
        let root_position = command.root_position + self.origin;
        let root_orientation = command.root_orientation.normalize();

        let mut poses: Vec<BodyState> = Vec::with_capacity(self.links.len());
        for link in &self.links {
            let (frame_position, frame_orientation) = match link.parent {
                Some(parent) => (poses[parent].position, poses[parent].orientation),
                None => (root_position, root_orientation),
            };

            let mut position = frame_position + frame_orientation.rotate(link.offset);
            let mut orientation = frame_orientation * link.rotation;

            if let Some(joint) = &link.joint {
                let value = command.joint_positions[joint.index];
                match joint.kind {
                    JointKind::Hinge => {
                        orientation =
                            (orientation * Quat::from_axis_angle(joint.axis, value)).normalize();
                    }
                    JointKind::Slide => {
                        position += orientation.rotate(joint.axis.scale(value));
                    }
                }
            }

            poses.push(BodyState::at(position, orientation));
        }
        poses
    }
}

impl Evaluator for KinematicTree {
    fn body_names(&self) -> &[String] {
        &self.body_names
    }

    fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    fn set_state(&mut self, command: &PoseCommand) -> MotionResult<()> {
        if command.joint_positions.len() != self.joint_names.len() {
            return Err(MotionError::EvaluatorRejected(format!(
                "expected {} joint positions, got {}",
                self.joint_names.len(),
                command.joint_positions.len()
            )));
        }
        if !command.root_position.is_finite()
            || !command.root_orientation.is_finite()
            || command.joint_positions.iter().any(|v| !v.is_finite())
        {
            return Err(MotionError::EvaluatorRejected(
                "pose command contains non-finite values".into(),
            ));
        }

        self.poses = Some(self.resolve(command));
        self.resolves += 1;
        Ok(())
    }

    fn read_body_states(&self) -> MotionResult<Vec<BodyState>> {
        self.poses.clone().ok_or(MotionError::StateNotResolved)
    }
}
