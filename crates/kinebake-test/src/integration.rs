//! End-to-end bake tests
//!
//! Runs the full pipeline against synthetic inputs and checks the written
//! artifacts:
//! - load failures stop the run before the evaluator is touched
//! - the z offset reaches the replayed root body
//! - velocities follow forward differences with a backfilled first frame
//! - evaluator and write failures leave no artifact behind

use std::collections::HashMap;
use std::path::Path;

use kinebake_npz::{DType, NpzArchive, NpzResult};

// ============================================================================
// ARTIFACT VIEW
// ============================================================================

/// One decoded artifact entry
#[derive(Debug, Clone)]
pub struct Entry {
    pub dtype: DType,
    pub shape: Vec<usize>,
    /// Numeric data widened to `f64` (empty for name arrays)
    pub values: Vec<f64>,
    /// Name data (empty for numeric arrays)
    pub names: Vec<String>,
}

/// Every entry of a written artifact, keyed by name
#[derive(Debug, Clone)]
pub struct ArtifactView {
    entries: HashMap<String, Entry>,
}

impl ArtifactView {
    pub fn open<P: AsRef<Path>>(path: P) -> NpzResult<Self> {
        let mut archive = NpzArchive::open(path)?;
        let mut entries = HashMap::new();
        for name in archive.names() {
            let array = archive.array(&name)?;
            let names = array.as_strings().map(<[String]>::to_vec).unwrap_or_default();
            let values = if names.is_empty() && array.dtype().is_numeric() {
                array.to_f64_vec()?
            } else {
                Vec::new()
            };
            entries.insert(
                name,
                Entry {
                    dtype: array.dtype(),
                    shape: array.shape().to_vec(),
                    values,
                    names,
                },
            );
        }
        Ok(ArtifactView { entries })
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// `[x, y, z]` of one body at one frame from an `(N, B, 3)` entry
    pub fn vec3(&self, name: &str, frame: usize, body: usize) -> Option<[f64; 3]> {
        let entry = self.get(name)?;
        let bodies = *entry.shape.get(1)?;
        let at = (frame * bodies + body) * 3;
        let v = entry.values.get(at..at + 3)?;
        Some([v[0], v[1], v[2]])
    }
}
