//! Motion loading - `.npz` and `.json` sources
//!
//! Both containers carry the same four fields:
//!
//! | field              | shape  | notes                         |
//! |--------------------|--------|-------------------------------|
//! | `sample_rate`      | scalar | frames per second             |
//! | `root_position`    | N x 3  | world frame                   |
//! | `root_orientation` | N x 4  | quaternion, xyzw              |
//! | `joint_angles`     | N x J  | one column per actuated joint |

use std::path::Path;

use kinebake_core::{MotionError, MotionResult, Quat, RawMotion, SampleRate, Vec3};
use kinebake_npz::{NpyArray, NpzArchive, NpzError};
use serde::Deserialize;
use tracing::{debug, info, warn};

const SAMPLE_RATE: &str = "sample_rate";
const ROOT_POSITION: &str = "root_position";
const ROOT_ORIENTATION: &str = "root_orientation";
const JOINT_ANGLES: &str = "joint_angles";

/// Quaternion norm deviation tolerated without a warning
const UNIT_TOLERANCE: f64 = 1e-3;

/// Reads raw motion from disk or memory
pub struct MotionLoader;

impl MotionLoader {
    /// Load a motion file and shift its root heights by `z_offset`
    pub fn load<P: AsRef<Path>>(path: P, z_offset: f64) -> MotionResult<RawMotion> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| MotionError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let mut motion = match path.extension().and_then(|e| e.to_str()) {
            Some("npz") => Self::from_npz_bytes(&bytes)?,
            Some("json") => {
                let text = std::str::from_utf8(&bytes)
                    .map_err(|e| MotionError::InvalidFormat(format!("not UTF-8: {}", e)))?;
                Self::from_json_str(text)?
            }
            other => {
                return Err(MotionError::InvalidFormat(format!(
                    "unsupported motion extension {:?} (expected .npz or .json)",
                    other.unwrap_or("")
                )))
            }
        };

        warn_non_unit(&motion);
        info!(
            ?path,
            frames = motion.num_frames(),
            fps = motion.sample_rate.hz(),
            dof = motion.num_joints(),
            "Loaded motion"
        );

        if z_offset != 0.0 {
            motion.apply_z_offset(z_offset);
            let (lo, hi) = motion.z_range();
            info!(z_offset, z_min = lo, z_max = hi, "Applied z offset");
        }

        Ok(motion)
    }

    /// Parse a JSON motion object
    pub fn from_json_str(text: &str) -> MotionResult<RawMotion> {
        let raw: JsonMotion = serde_json::from_str(text)
            .map_err(|e| MotionError::InvalidFormat(format!("json: {}", e)))?;

        let sample_rate = raw
            .sample_rate
            .ok_or_else(|| MotionError::MissingField(SAMPLE_RATE.into()))?;
        let root_position = raw
            .root_position
            .ok_or_else(|| MotionError::MissingField(ROOT_POSITION.into()))?;
        let root_orientation = raw
            .root_orientation
            .ok_or_else(|| MotionError::MissingField(ROOT_ORIENTATION.into()))?;
        let joint_angles = raw
            .joint_angles
            .ok_or_else(|| MotionError::MissingField(JOINT_ANGLES.into()))?;

        let root_position = fixed_rows::<3>(ROOT_POSITION, root_position)?
            .into_iter()
            .map(Vec3::from)
            .collect();
        let root_orientation = fixed_rows::<4>(ROOT_ORIENTATION, root_orientation)?
            .into_iter()
            .map(Quat::from)
            .collect();

        RawMotion::new(
            SampleRate::new(sample_rate)?,
            root_position,
            root_orientation,
            joint_angles,
        )
    }

    /// Parse an in-memory NumPy archive
    pub fn from_npz_bytes(bytes: &[u8]) -> MotionResult<RawMotion> {
        let mut archive = NpzArchive::from_bytes(bytes).map_err(npz_error)?;
        debug!(entries = ?archive.names(), "Opened motion archive");

        let sample_rate = archive.array(SAMPLE_RATE).map_err(npz_error)?;
        let root_position = archive.array(ROOT_POSITION).map_err(npz_error)?;
        let root_orientation = archive.array(ROOT_ORIENTATION).map_err(npz_error)?;
        let joint_angles = archive.array(JOINT_ANGLES).map_err(npz_error)?;

        let hz = match (sample_rate.shape(), sample_rate.to_f64_vec().map_err(npz_error)?.as_slice()) {
            ([] | [1], [hz]) => *hz,
            (shape, _) => {
                return Err(MotionError::shape(SAMPLE_RATE, "scalar", format!("{:?}", shape)))
            }
        };

        let root_position: Vec<Vec3> = matrix_rows(ROOT_POSITION, &root_position, Some(3))?
            .into_iter()
            .map(|r| Vec3::new(r[0], r[1], r[2]))
            .collect();
        let root_orientation = matrix_rows(ROOT_ORIENTATION, &root_orientation, Some(4))?
            .into_iter()
            .map(|r| Quat::new(r[0], r[1], r[2], r[3]))
            .collect();

        // A (N, 0) array carries no data, so N is only trusted once it
        // matches the root trajectory.
        let frames = root_position.len();
        if let [rows, 0] = joint_angles.shape() {
            if *rows != frames {
                return Err(MotionError::FrameCountMismatch {
                    field: JOINT_ANGLES.into(),
                    expected: frames,
                    actual: *rows,
                });
            }
        }
        let joint_angles = matrix_rows(JOINT_ANGLES, &joint_angles, None)?;

        RawMotion::new(
            SampleRate::new(hz)?,
            root_position,
            root_orientation,
            joint_angles,
        )
    }
}

#[derive(Deserialize)]
struct JsonMotion {
    #[serde(alias = "fps")]
    sample_rate: Option<f64>,
    root_position: Option<Vec<Vec<f64>>>,
    root_orientation: Option<Vec<Vec<f64>>>,
    joint_angles: Option<Vec<Vec<f64>>>,
}

fn warn_non_unit(motion: &RawMotion) {
    let off: Vec<usize> = motion
        .root_orientation
        .iter()
        .enumerate()
        .filter(|(_, q)| (q.norm() - 1.0).abs() > UNIT_TOLERANCE)
        .map(|(i, _)| i)
        .collect();
    if let Some(first) = off.first() {
        warn!(count = off.len(), first, "Root orientations are not unit quaternions");
    }
}

fn npz_error(err: NpzError) -> MotionError {
    match err {
        NpzError::MissingEntry(name) => MotionError::MissingField(name),
        other => MotionError::InvalidFormat(other.to_string()),
    }
}

/// Check every row has exactly `W` values
fn fixed_rows<const W: usize>(field: &str, rows: Vec<Vec<f64>>) -> MotionResult<Vec<[f64; W]>> {
    rows.into_iter()
        .enumerate()
        .map(|(frame, row)| {
            let len = row.len();
            <[f64; W]>::try_from(row).map_err(|_| {
                MotionError::shape(
                    field,
                    format!("(N, {})", W),
                    format!("{} values at frame {}", len, frame),
                )
            })
        })
        .collect()
}

/// Split a 2-d array into rows, optionally requiring a column count
fn matrix_rows(field: &str, array: &NpyArray, cols: Option<usize>) -> MotionResult<Vec<Vec<f64>>> {
    let expected = match cols {
        Some(c) => format!("(N, {})", c),
        None => "(N, J)".to_string(),
    };
    let (rows, width) = match array.shape() {
        [rows, width] if cols.map_or(true, |c| c == *width) => (*rows, *width),
        shape => return Err(MotionError::shape(field, expected, format!("{:?}", shape))),
    };

    let values = array.to_f64_vec().map_err(npz_error)?;
    if width == 0 {
        return Ok(vec![Vec::new(); rows]);
    }
    Ok(values.chunks_exact(width).map(<[f64]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinebake_npz::{DType, NpyHeader, NpzWriter};
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const JSON: &str = r#"{
        "sample_rate": 30.0,
        "root_position": [[0.0, 0.0, 0.0], [0.0, 0.0, 0.5], [0.0, 0.0, 1.0]],
        "root_orientation": [[0, 0, 0, 1], [0, 0, 0, 1], [0, 0, 0, 1]],
        "joint_angles": [[0.1, 0.2], [0.2, 0.3], [0.3, 0.4]]
    }"#;

    fn npz(entries: &[(&str, NpyArray)]) -> Vec<u8> {
        let mut writer = NpzWriter::new(Cursor::new(Vec::new()));
        for (name, array) in entries {
            writer.add(name, array).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn full_npz() -> Vec<(&'static str, NpyArray)> {
        vec![
            (SAMPLE_RATE, NpyArray::from_f64(vec![], vec![50.0]).unwrap()),
            (
                ROOT_POSITION,
                NpyArray::from_f32(vec![2, 3], vec![0.0, 0.0, 0.8, 0.1, 0.0, 0.8]).unwrap(),
            ),
            (
                ROOT_ORIENTATION,
                NpyArray::from_f64(vec![2, 4], vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
                    .unwrap(),
            ),
            (
                JOINT_ANGLES,
                NpyArray::from_f64(vec![2, 3], vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5]).unwrap(),
            ),
        ]
    }

    #[test]
    fn test_json_motion() {
        let motion = MotionLoader::from_json_str(JSON).unwrap();
        assert_eq!(motion.num_frames(), 3);
        assert_eq!(motion.num_joints(), 2);
        assert_eq!(motion.sample_rate.hz(), 30.0);
        assert_eq!(motion.root_orientation[1], Quat::identity());
    }

    #[test]
    fn test_json_missing_joint_angles() {
        let text = r#"{"sample_rate": 30.0, "root_position": [], "root_orientation": []}"#;
        let err = MotionLoader::from_json_str(text).unwrap_err();
        assert!(matches!(err, MotionError::MissingField(ref f) if f == JOINT_ANGLES));
        assert!(err.is_format());
    }

    #[test]
    fn test_json_bad_row_width() {
        let text = JSON.replace("[0.0, 0.0, 0.5]", "[0.0, 0.5]");
        assert!(matches!(
            MotionLoader::from_json_str(&text),
            Err(MotionError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_npz_motion() {
        let motion = MotionLoader::from_npz_bytes(&npz(&full_npz())).unwrap();
        assert_eq!(motion.num_frames(), 2);
        assert_eq!(motion.num_joints(), 3);
        assert_eq!(motion.sample_rate.hz(), 50.0);
        assert!((motion.root_position[1].x - 0.1).abs() < 1e-6);
        assert_eq!(motion.joint_angles[1], vec![0.3, 0.4, 0.5]);
    }

    #[test]
    fn test_npz_single_element_sample_rate() {
        let mut entries = full_npz();
        entries[0].1 = NpyArray::from_f32(vec![1], vec![60.0]).unwrap();
        let motion = MotionLoader::from_npz_bytes(&npz(&entries)).unwrap();
        assert_eq!(motion.sample_rate.hz(), 60.0);
    }

    #[test]
    fn test_npz_wrong_orientation_width() {
        let mut entries = full_npz();
        entries[2].1 = NpyArray::from_f64(vec![2, 3], vec![0.0; 6]).unwrap();
        let err = MotionLoader::from_npz_bytes(&npz(&entries)).unwrap_err();
        assert!(matches!(err, MotionError::ShapeMismatch { ref field, .. } if field == ROOT_ORIENTATION));
    }

    #[test]
    fn test_npz_missing_entry() {
        let entries: Vec<_> = full_npz()
            .into_iter()
            .filter(|(name, _)| *name != ROOT_POSITION)
            .collect();
        let err = MotionLoader::from_npz_bytes(&npz(&entries)).unwrap_err();
        assert!(matches!(err, MotionError::MissingField(ref f) if f == ROOT_POSITION));
    }

    #[test]
    fn test_npz_frame_count_mismatch() {
        let mut entries = full_npz();
        entries[3].1 = NpyArray::from_f64(vec![3, 1], vec![0.0; 3]).unwrap();
        assert!(matches!(
            MotionLoader::from_npz_bytes(&npz(&entries)),
            Err(MotionError::FrameCountMismatch { .. })
        ));
    }

    /// Valid motion with `name` replaced by a bare header and no data
    fn with_hostile_entry(name: &str, header: NpyHeader) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (entry, array) in full_npz() {
            zip.start_file(format!("{}.npy", entry), SimpleFileOptions::default())
                .unwrap();
            if entry == name {
                zip.write_all(&header.to_bytes()).unwrap();
            } else {
                array.write_npy(&mut zip).unwrap();
            }
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_npz_hostile_headers_are_format_errors() {
        let cases = [
            (ROOT_POSITION, NpyHeader::new(DType::F64, vec![1 << 62, 8])),
            (JOINT_ANGLES, NpyHeader::new(DType::F64, vec![1 << 62, 8])),
            (JOINT_ANGLES, NpyHeader::new(DType::F64, vec![1 << 62, 0])),
            (JOINT_ANGLES, NpyHeader::new(DType::F32, vec![1 << 40, 3])),
            (JOINT_ANGLES, NpyHeader::new(DType::Unicode(0), vec![1 << 62])),
            (SAMPLE_RATE, NpyHeader::new(DType::Unicode(0), vec![1 << 62])),
        ];
        for (name, header) in cases {
            let shape = header.shape.clone();
            let err = MotionLoader::from_npz_bytes(&with_hostile_entry(name, header)).unwrap_err();
            assert!(err.is_format(), "{} {:?}: {}", name, shape, err);
        }
    }

    #[test]
    fn test_npz_zero_joints() {
        let mut entries = full_npz();
        entries[3].1 = NpyArray::from_f64(vec![2, 0], vec![]).unwrap();
        let motion = MotionLoader::from_npz_bytes(&npz(&entries)).unwrap();
        assert_eq!(motion.num_frames(), 2);
        assert_eq!(motion.num_joints(), 0);

        entries[3].1 = NpyArray::from_f64(vec![5, 0], vec![]).unwrap();
        assert!(matches!(
            MotionLoader::from_npz_bytes(&npz(&entries)),
            Err(MotionError::FrameCountMismatch { actual: 5, .. })
        ));
    }

    #[test]
    fn test_load_applies_z_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walk.json");
        std::fs::write(&path, JSON).unwrap();

        let motion = MotionLoader::load(&path, -0.15).unwrap();
        let z: Vec<f64> = motion.root_position.iter().map(|p| p.z).collect();
        for (actual, expected) in z.iter().zip([-0.15, 0.35, 0.85]) {
            assert!((actual - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("walk.pkl");
        std::fs::write(&path, b"\x80\x04").unwrap();
        assert!(matches!(
            MotionLoader::load(&path, 0.0),
            Err(MotionError::InvalidFormat(_))
        ));
        assert!(matches!(
            MotionLoader::load(dir.path().join("missing.npz"), 0.0),
            Err(MotionError::Read { .. })
        ));
    }
}
