//! Artifact writer - annotated motion to a versioned NPZ archive
//!
//! Layout on disk: `{output_root}/{name}:{version}/{file_name}`. The
//! archive is first written next to its destination as
//! `{file_name}.partial` and renamed into place once complete, so readers
//! never observe a truncated artifact.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use kinebake_core::{AnnotatedMotion, MotionError, MotionResult, Quat, Vec3};
use kinebake_npz::{NpyArray, NpzResult, NpzWriter};
use tracing::{info, warn};

use crate::WriterConfig;

const PARTIAL_SUFFIX: &str = ".partial";

/// Writes annotated motions as NPZ artifacts
#[derive(Debug, Clone, Default)]
pub struct MotionWriter {
    config: WriterConfig,
}

impl MotionWriter {
    pub fn new(config: WriterConfig) -> Self {
        MotionWriter { config }
    }

    pub fn config(&self) -> &WriterConfig {
        &self.config
    }

    /// Final archive path for an output name
    pub fn artifact_path(&self, name: &str) -> MotionResult<PathBuf> {
        if name.trim().is_empty() || name.contains(['/', '\\']) {
            return Err(MotionError::InvalidOutputName(name.to_string()));
        }
        Ok(self
            .config
            .output_root
            .join(format!("{}:{}", name, self.config.version))
            .join(&self.config.file_name))
    }

    /// Write `motion` under `name`, returning the archive path
    pub fn write(&self, motion: &AnnotatedMotion, name: &str) -> MotionResult<PathBuf> {
        let path = self.artifact_path(name)?;
        let dir = path.parent().unwrap_or(Path::new("."));
        fs::create_dir_all(dir).map_err(|e| MotionError::Write {
            path: dir.to_path_buf(),
            reason: e.to_string(),
        })?;

        let arrays = motion_arrays(motion).map_err(|e| MotionError::Write {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let partial = dir.join(format!("{}{}", self.config.file_name, PARTIAL_SUFFIX));
        let written = self
            .write_archive(&partial, &arrays)
            .and_then(|()| fs::rename(&partial, &path));
        if let Err(e) = written {
            if let Err(cleanup) = fs::remove_file(&partial) {
                warn!(path = ?partial, error = %cleanup, "Could not remove partial artifact");
            }
            return Err(MotionError::Write {
                path,
                reason: e.to_string(),
            });
        }

        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        info!(
            ?path,
            size_kib = size as f64 / 1024.0,
            frames = motion.num_frames(),
            "Wrote motion artifact"
        );
        for (entry, array) in &arrays {
            info!(entry, shape = ?array.shape(), dtype = %array.dtype(), "Artifact entry");
        }

        Ok(path)
    }

    fn write_archive(&self, path: &Path, arrays: &[(&str, NpyArray)]) -> std::io::Result<()> {
        let file = File::create(path)?;
        let mut npz = NpzWriter::with_compression(BufWriter::new(file), self.config.compress);
        for (name, array) in arrays {
            npz.add(name, array).map_err(std::io::Error::other)?;
        }
        let mut out = npz.finish().map_err(std::io::Error::other)?;
        out.flush()?;
        out.get_ref().sync_all()
    }
}

/// Entries in archive order, numeric data narrowed to `f32`
fn motion_arrays(motion: &AnnotatedMotion) -> NpzResult<Vec<(&'static str, NpyArray)>> {
    let frames = motion.num_frames();
    let bodies = motion.num_bodies();
    let joints = motion.num_joints();

    Ok(vec![
        ("sample_rate", NpyArray::scalar_f32(motion.sample_rate.hz() as f32)),
        ("joint_position", joint_matrix(&motion.joint_position, frames, joints)?),
        ("joint_velocity", joint_matrix(&motion.joint_velocity, frames, joints)?),
        ("body_position", vec3_grid(&motion.body_position, frames, bodies)?),
        ("body_orientation", quat_grid(&motion.body_orientation, frames, bodies)?),
        ("body_linear_velocity", vec3_grid(&motion.body_linear_velocity, frames, bodies)?),
        ("body_angular_velocity", vec3_grid(&motion.body_angular_velocity, frames, bodies)?),
        ("body_names", NpyArray::strings(motion.body_names.iter().cloned())),
        ("joint_names", NpyArray::strings(motion.joint_names.iter().cloned())),
    ])
}

fn joint_matrix(rows: &[Vec<f64>], frames: usize, joints: usize) -> NpzResult<NpyArray> {
    let values = rows.iter().flatten().map(|&x| x as f32).collect();
    NpyArray::from_f32(vec![frames, joints], values)
}

fn vec3_grid(rows: &[Vec<Vec3>], frames: usize, bodies: usize) -> NpzResult<NpyArray> {
    let values = rows
        .iter()
        .flatten()
        .flat_map(|v| v.to_array())
        .map(|x| x as f32)
        .collect();
    NpyArray::from_f32(vec![frames, bodies, 3], values)
}

fn quat_grid(rows: &[Vec<Quat>], frames: usize, bodies: usize) -> NpzResult<NpyArray> {
    let values = rows
        .iter()
        .flatten()
        .flat_map(|q| q.to_array())
        .map(|x| x as f32)
        .collect();
    NpyArray::from_f32(vec![frames, bodies, 4], values)
}
