//! Synthetic motions and models
//!
//! Motions are generated from a seed so failures reproduce exactly.

use std::f64::consts::PI;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use kinebake_core::{Quat, RawMotion, SampleRate, Vec3};
use kinebake_fk::{BodySpec, JointKind, ModelSpec};
use kinebake_npz::{NpyArray, NpzError, NpzWriter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use thiserror::Error;

/// Fixture I/O errors
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("NPZ error: {0}")]
    Npz(#[from] NpzError),

    #[error("Invalid fixture: {0}")]
    Invalid(String),
}

pub type FixtureResult<T> = Result<T, FixtureError>;

/// Random-walk motion generator
pub struct MotionGenerator {
    rng: StdRng,
    sample_rate: f64,
    joints: usize,
}

impl MotionGenerator {
    pub fn new(seed: u64, sample_rate: f64, joints: usize) -> Self {
        MotionGenerator {
            rng: StdRng::seed_from_u64(seed),
            sample_rate,
            joints,
        }
    }

    /// Walking-like motion: forward drift, yaw wander, periodic joints
    pub fn generate(&mut self, frames: usize) -> FixtureResult<RawMotion> {
        let dt = 1.0 / self.sample_rate;
        let mut position = Vec3::new(0.0, 0.0, 0.8);
        let mut yaw = 0.0f64;
        let phases: Vec<f64> = (0..self.joints)
            .map(|_| self.rng.gen_range(0.0..2.0 * PI))
            .collect();

        let mut root_position = Vec::with_capacity(frames);
        let mut root_orientation = Vec::with_capacity(frames);
        let mut joint_angles = Vec::with_capacity(frames);
        for i in 0..frames {
            let t = i as f64 * dt;
            yaw += self.rng.gen_range(-0.02..0.02);
            position.x += 0.8 * dt * yaw.cos();
            position.y += 0.8 * dt * yaw.sin();
            position.z = 0.8 + 0.02 * (4.0 * PI * t).sin();

            root_position.push(position);
            root_orientation.push(Quat::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), yaw));
            joint_angles.push(phases.iter().map(|p| 0.4 * (2.0 * PI * t + p).sin()).collect());
        }

        RawMotion::new(
            SampleRate::new(self.sample_rate).map_err(|e| FixtureError::Invalid(e.to_string()))?,
            root_position,
            root_orientation,
            joint_angles,
        )
        .map_err(|e| FixtureError::Invalid(e.to_string()))
    }
}

/// Root plus a serial chain of `joints` hinge links with alternating axes
pub fn chain_model(joints: usize) -> ModelSpec {
    let axes = [
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
    ];
    let mut bodies = vec![BodySpec::root("pelvis")];
    for j in 0..joints {
        let parent = bodies[j].name.clone();
        bodies.push(
            BodySpec::child(&format!("link_{}", j), &parent, Vec3::new(0.0, 0.0, -0.1))
                .with_joint(&format!("joint_{}", j), JointKind::Hinge, axes[j % axes.len()]),
        );
    }
    ModelSpec {
        origin: Vec3::zero(),
        bodies,
    }
}

/// Write `motion` as a `.json` motion file
pub fn write_json(dir: &Path, name: &str, motion: &RawMotion) -> FixtureResult<PathBuf> {
    let value = json!({
        "sample_rate": motion.sample_rate.hz(),
        "root_position": motion.root_position.iter().map(|p| p.to_array()).collect::<Vec<_>>(),
        "root_orientation": motion.root_orientation.iter().map(|q| q.to_array()).collect::<Vec<_>>(),
        "joint_angles": motion.joint_angles,
    });
    let path = dir.join(format!("{}.json", name));
    std::fs::write(&path, value.to_string())?;
    Ok(path)
}

/// Write `motion` as a `.npz` motion file with `f64` data
pub fn write_npz(dir: &Path, name: &str, motion: &RawMotion) -> FixtureResult<PathBuf> {
    let frames = motion.num_frames();
    let joints = motion.num_joints();
    let path = dir.join(format!("{}.npz", name));

    let mut npz = NpzWriter::new(BufWriter::new(File::create(&path)?));
    npz.add("sample_rate", &NpyArray::from_f64(vec![], vec![motion.sample_rate.hz()])?)?;
    npz.add(
        "root_position",
        &NpyArray::from_f64(
            vec![frames, 3],
            motion.root_position.iter().flat_map(|p| p.to_array()).collect(),
        )?,
    )?;
    npz.add(
        "root_orientation",
        &NpyArray::from_f64(
            vec![frames, 4],
            motion.root_orientation.iter().flat_map(|q| q.to_array()).collect(),
        )?,
    )?;
    npz.add(
        "joint_angles",
        &NpyArray::from_f64(
            vec![frames, joints],
            motion.joint_angles.iter().flatten().copied().collect(),
        )?,
    )?;
    npz.finish()?.into_inner().map_err(|e| e.into_error())?;
    Ok(path)
}
