//! Model description - bodies, offsets and joints
//!
//! A model is an ordered list of bodies. The first body is the root and is
//! placed by the commanded root pose; every other body names an earlier
//! body as its parent. A body carries at most one joint, which moves it
//! relative to its parent.
//!
//! ```toml
//! origin = [0.0, 0.0, 0.0]
//!
//! [[bodies]]
//! name = "pelvis"
//!
//! [[bodies]]
//! name = "left_hip_pitch_link"
//! parent = "pelvis"
//! offset = [0.0, 0.0645, -0.1027]
//! joint = { name = "left_hip_pitch_joint", axis = [0.0, 1.0, 0.0] }
//! ```

use std::path::Path;

use kinebake_core::{MotionError, MotionResult, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// How a joint moves its body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JointKind {
    /// Rotation about `axis` by the joint angle (radians)
    #[default]
    Hinge,
    /// Translation along `axis` by the joint displacement
    Slide,
}

/// Joint attached to a body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub name: String,
    /// Axis in the body frame
    pub axis: Vec3,
    #[serde(default)]
    pub kind: JointKind,
}

/// One rigid body of the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// Position in the parent frame
    #[serde(default)]
    pub offset: Vec3,
    /// Fixed orientation in the parent frame (xyzw)
    #[serde(default)]
    pub rotation: Quat,
    #[serde(default)]
    pub joint: Option<JointSpec>,
}

impl BodySpec {
    /// Root body at the commanded pose
    pub fn root(name: &str) -> Self {
        BodySpec {
            name: name.to_string(),
            parent: None,
            offset: Vec3::zero(),
            rotation: Quat::identity(),
            joint: None,
        }
    }

    /// Child body rigidly attached at `offset`
    pub fn child(name: &str, parent: &str, offset: Vec3) -> Self {
        BodySpec {
            parent: Some(parent.to_string()),
            offset,
            ..BodySpec::root(name)
        }
    }

    pub fn with_joint(mut self, name: &str, kind: JointKind, axis: Vec3) -> Self {
        self.joint = Some(JointSpec {
            name: name.to_string(),
            axis,
            kind,
        });
        self
    }
}

/// Complete model description
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Environment origin added to every commanded root position
    #[serde(default)]
    pub origin: Vec3,
    pub bodies: Vec<BodySpec>,
}

impl ModelSpec {
    pub fn from_toml_str(text: &str) -> MotionResult<Self> {
        toml::from_str(text).map_err(|e| MotionError::InvalidModel(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> MotionResult<Self> {
        serde_json::from_str(text).map_err(|e| MotionError::InvalidModel(e.to_string()))
    }

    /// Load a `.toml` or `.json` model file
    pub fn load<P: AsRef<Path>>(path: P) -> MotionResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MotionError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            other => Err(MotionError::InvalidModel(format!(
                "unsupported model extension {:?} (expected .toml or .json)",
                other.unwrap_or("")
            ))),
        }
    }
}
