//! NPY array - numeric payloads via `ndarray-npy`, unicode names by hand
//!
//! `ndarray-npy` has no fixed-width unicode element, so `<U{n}` arrays are
//! encoded here: one UTF-32LE item per string, NUL padded to the width of
//! the longest.

use std::io::Write;

use bytes::BufMut;
use ndarray::{Array1, ArrayD, IxDyn, ShapeBuilder};
use ndarray_npy::{ReadNpyExt, WriteNpyExt};

use crate::{DType, NpyHeader, NpzError, NpzResult, UNICODE_CHAR_SIZE};

/// An n-dimensional array in NPY form
#[derive(Clone, Debug, PartialEq)]
pub enum NpyArray {
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    Unicode(ArrayD<String>),
}

impl NpyArray {
    pub fn from_f32(shape: Vec<usize>, values: Vec<f32>) -> NpzResult<Self> {
        Ok(NpyArray::F32(ArrayD::from_shape_vec(IxDyn(&shape), values)?))
    }

    pub fn from_f64(shape: Vec<usize>, values: Vec<f64>) -> NpzResult<Self> {
        Ok(NpyArray::F64(ArrayD::from_shape_vec(IxDyn(&shape), values)?))
    }

    /// 0-d `<f4` array
    pub fn scalar_f32(value: f32) -> Self {
        NpyArray::F32(ndarray::arr0(value).into_dyn())
    }

    /// 1-d unicode array
    pub fn strings<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        NpyArray::Unicode(Array1::from_vec(values).into_dyn())
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            NpyArray::F32(a) => a.shape(),
            NpyArray::F64(a) => a.shape(),
            NpyArray::I32(a) => a.shape(),
            NpyArray::I64(a) => a.shape(),
            NpyArray::Unicode(a) => a.shape(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            NpyArray::F32(a) => a.len(),
            NpyArray::F64(a) => a.len(),
            NpyArray::I32(a) => a.len(),
            NpyArray::I64(a) => a.len(),
            NpyArray::Unicode(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type; unicode width is the longest string (at least 1)
    pub fn dtype(&self) -> DType {
        match self {
            NpyArray::F32(_) => DType::F32,
            NpyArray::F64(_) => DType::F64,
            NpyArray::I32(_) => DType::I32,
            NpyArray::I64(_) => DType::I64,
            NpyArray::Unicode(values) => DType::Unicode(
                values
                    .iter()
                    .map(|s| s.chars().count())
                    .max()
                    .unwrap_or(0)
                    .max(1),
            ),
        }
    }

    /// Widen numeric data to `f64`, in row-major order
    pub fn to_f64_vec(&self) -> NpzResult<Vec<f64>> {
        match self {
            NpyArray::F32(a) => Ok(a.iter().map(|&x| x as f64).collect()),
            NpyArray::F64(a) => Ok(a.iter().copied().collect()),
            NpyArray::I32(a) => Ok(a.iter().map(|&x| x as f64).collect()),
            NpyArray::I64(a) => Ok(a.iter().map(|&x| x as f64).collect()),
            NpyArray::Unicode(_) => Err(NpzError::UnsupportedDtype(self.dtype().descr())),
        }
    }

    /// Strings of a row-major unicode array
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            NpyArray::Unicode(a) => a.as_slice(),
            _ => None,
        }
    }

    /// Write as a `.npy` stream
    pub fn write_npy<W: Write>(&self, mut writer: W) -> NpzResult<()> {
        match self {
            NpyArray::F32(a) => a.write_npy(writer)?,
            NpyArray::F64(a) => a.write_npy(writer)?,
            NpyArray::I32(a) => a.write_npy(writer)?,
            NpyArray::I64(a) => a.write_npy(writer)?,
            NpyArray::Unicode(a) => writer.write_all(&encode_unicode(a, self.dtype())?)?,
        }
        Ok(())
    }

    /// Serialize to `.npy` bytes
    pub fn encode(&self) -> NpzResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_npy(&mut buf)?;
        Ok(buf)
    }

    /// Parse `.npy` bytes
    ///
    /// The header is checked against `buf` before any element storage is
    /// allocated, so a shape larger than the data present is rejected.
    pub fn decode(buf: &[u8]) -> NpzResult<Self> {
        let (header, offset) = NpyHeader::parse(buf)?;
        let end = header.data_end(offset, buf.len())?;

        Ok(match header.dtype {
            DType::F32 => NpyArray::F32(ArrayD::read_npy(buf)?),
            DType::F64 => NpyArray::F64(ArrayD::read_npy(buf)?),
            DType::I32 => NpyArray::I32(ArrayD::read_npy(buf)?),
            DType::I64 => NpyArray::I64(ArrayD::read_npy(buf)?),
            DType::Unicode(width) => {
                let values = decode_unicode(&buf[offset..end], width)?;
                let shape = IxDyn(&header.shape);
                NpyArray::Unicode(if header.fortran_order {
                    ArrayD::from_shape_vec(shape.f(), values)?
                } else {
                    ArrayD::from_shape_vec(shape, values)?
                })
            }
        })
    }
}

fn encode_unicode(values: &ArrayD<String>, dtype: DType) -> NpzResult<Vec<u8>> {
    let header = NpyHeader::new(dtype, values.shape().to_vec());
    let width = match dtype {
        DType::Unicode(width) => width,
        other => return Err(NpzError::UnsupportedDtype(other.descr())),
    };

    let mut buf = header.to_bytes();
    buf.reserve(header.data_len()?);
    for s in values.iter() {
        let mut count = 0;
        for c in s.chars() {
            buf.put_u32_le(c as u32);
            count += 1;
        }
        buf.put_bytes(0, (width - count) * UNICODE_CHAR_SIZE);
    }
    Ok(buf.to_vec())
}

fn decode_unicode(raw: &[u8], width: usize) -> NpzResult<Vec<String>> {
    if width == 0 {
        return Ok(Vec::new());
    }
    raw.chunks_exact(width * UNICODE_CHAR_SIZE)
        .map(decode_item)
        .collect()
}

/// One fixed-width UTF-32 item, trailing NULs stripped
fn decode_item(item: &[u8]) -> NpzResult<String> {
    let mut s = String::with_capacity(item.len() / UNICODE_CHAR_SIZE);
    for c in item.chunks_exact(UNICODE_CHAR_SIZE) {
        let code = u32::from_le_bytes([c[0], c[1], c[2], c[3]]);
        if code == 0 {
            break;
        }
        let ch = char::from_u32(code)
            .ok_or_else(|| NpzError::InvalidUnicode(format!("code point {:#x}", code)))?;
        s.push(ch);
    }
    Ok(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HEADER_ALIGN;
    use proptest::prelude::*;

    #[test]
    fn test_f32_matrix() {
        let array = NpyArray::from_f32(vec![2, 3], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let bytes = array.encode().unwrap();

        let decoded = NpyArray::decode(&bytes).unwrap();
        assert_eq!(decoded.dtype(), DType::F32);
        assert_eq!(decoded.shape(), &[2, 3]);
        assert_eq!(decoded, array);
    }

    #[test]
    fn test_scalar() {
        let bytes = NpyArray::scalar_f32(30.0).encode().unwrap();
        let decoded = NpyArray::decode(&bytes).unwrap();
        assert!(decoded.shape().is_empty());
        assert_eq!(decoded.to_f64_vec().unwrap(), vec![30.0]);
    }

    #[test]
    fn test_unicode_names() {
        let names = NpyArray::strings(["pelvis", "left_hip_pitch_link", "torso_link"]);
        assert_eq!(names.dtype(), DType::Unicode(19));

        let bytes = names.encode().unwrap();
        let (header, offset) = NpyHeader::parse(&bytes).unwrap();
        assert_eq!(header.dtype, DType::Unicode(19));
        assert_eq!(offset % HEADER_ALIGN, 0);

        let decoded = NpyArray::decode(&bytes).unwrap();
        assert_eq!(
            decoded.as_strings().unwrap(),
            &["pelvis", "left_hip_pitch_link", "torso_link"]
        );
    }

    #[test]
    fn test_empty_unicode_array() {
        let names = NpyArray::strings(Vec::<String>::new());
        assert_eq!(names.dtype(), DType::Unicode(1));
        let decoded = NpyArray::decode(&names.encode().unwrap()).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_shape_mismatch() {
        let result = NpyArray::from_f64(vec![2, 2], vec![1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(NpzError::Shape(_))));
    }

    #[test]
    fn test_truncated_data() {
        let bytes = NpyArray::from_f64(vec![4], vec![1.0; 4]).unwrap().encode().unwrap();
        let result = NpyArray::decode(&bytes[..bytes.len() - 1]);
        assert!(matches!(result, Err(NpzError::BufferTooShort { .. })));
    }

    #[test]
    fn test_integers_widen() {
        let array = NpyArray::I64(ndarray::arr1(&[-1i64, 0, 30]).into_dyn());
        let decoded = NpyArray::decode(&array.encode().unwrap()).unwrap();
        assert_eq!(decoded.to_f64_vec().unwrap(), vec![-1.0, 0.0, 30.0]);
        assert!(NpyArray::strings(["a"]).to_f64_vec().is_err());
    }

    #[test]
    fn test_fortran_order_widens_row_major() {
        let array = ArrayD::from_shape_vec(IxDyn(&[2, 3]).f(), vec![1.0, 4.0, 2.0, 5.0, 3.0, 6.0])
            .unwrap();
        let bytes = NpyArray::F64(array).encode().unwrap();
        let decoded = NpyArray::decode(&bytes).unwrap();
        assert_eq!(
            decoded.to_f64_vec().unwrap(),
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]
        );
    }

    #[test]
    fn test_oversized_shape_without_data() {
        for (dtype, shape) in [
            (DType::F64, vec![1usize << 62, 8]),
            (DType::F32, vec![1 << 40, 3]),
            (DType::Unicode(0), vec![1 << 62]),
            (DType::Unicode(8), vec![1 << 50]),
        ] {
            let bytes = NpyHeader::new(dtype, shape.clone()).to_bytes();
            assert!(NpyArray::decode(&bytes).is_err(), "{} {:?}", dtype, shape);
        }
    }

    proptest! {
        #[test]
        fn prop_data_section_is_aligned(rows in 0usize..50, cols in 0usize..8) {
            let array = NpyArray::from_f64(vec![rows, cols], vec![0.5; rows * cols]).unwrap();
            let bytes = array.encode().unwrap();
            let (_, offset) = NpyHeader::parse(&bytes).unwrap();
            prop_assert_eq!(offset % HEADER_ALIGN, 0);
            prop_assert_eq!(bytes.len(), offset + rows * cols * 8);
        }
    }
}
