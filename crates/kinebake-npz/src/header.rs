//! NPY header
//!
//! Layout:
//! - Bytes 0-5: Magic (`\x93NUMPY`)
//! - Byte 6: Major version
//! - Byte 7: Minor version
//! - Bytes 8-9 (v1) or 8-11 (v2, v3): Header length (LE)
//! - Header: Python dict literal, space padded, newline terminated
//!
//! The prefix plus header is padded to a multiple of 64 bytes so the array
//! data that follows is aligned.
//!
//! Numeric payloads are handed to `ndarray-npy` once the header has been
//! checked against the bytes actually present. Shapes come from untrusted
//! files, so every size computed from them is checked.

use bytes::{BufMut, BytesMut};

use crate::{DType, NpzError, NpzResult};

/// NPY magic string
pub const MAGIC: &[u8; 6] = b"\x93NUMPY";

/// Alignment of the data section
pub const HEADER_ALIGN: usize = 64;

/// Prefix size for version 1.0 (magic + version + u16 length)
pub const V1_PREFIX_SIZE: usize = 10;

/// Prefix size for versions 2.0 and 3.0 (magic + version + u32 length)
pub const V2_PREFIX_SIZE: usize = 12;

/// Parsed NPY header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NpyHeader {
    pub dtype: DType,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl NpyHeader {
    /// Create a C-ordered header
    pub fn new(dtype: DType, shape: Vec<usize>) -> Self {
        NpyHeader {
            dtype,
            fortran_order: false,
            shape,
        }
    }

    /// Number of elements described by the shape
    pub fn num_elements(&self) -> NpzResult<usize> {
        self.shape
            .iter()
            .try_fold(1usize, |n, &dim| n.checked_mul(dim))
            .ok_or_else(|| self.overflow())
    }

    /// Size of the data section in bytes
    pub fn data_len(&self) -> NpzResult<usize> {
        let elements = self.num_elements()?;
        self.dtype
            .item_size()
            .and_then(|size| elements.checked_mul(size))
            .ok_or_else(|| self.overflow())
    }

    /// End of the data section, checked against a buffer of `available` bytes
    pub fn data_end(&self, offset: usize, available: usize) -> NpzResult<usize> {
        let end = offset
            .checked_add(self.data_len()?)
            .ok_or_else(|| self.overflow())?;
        if end > available {
            return Err(NpzError::BufferTooShort {
                expected: end,
                actual: available,
            });
        }
        Ok(end)
    }

    fn overflow(&self) -> NpzError {
        NpzError::InvalidHeader(format!("shape {:?} of {} overflows", self.shape, self.dtype))
    }

    /// Parse header from bytes, returning it with the data offset
    pub fn parse(buf: &[u8]) -> NpzResult<(Self, usize)> {
        if buf.len() < V1_PREFIX_SIZE {
            return Err(NpzError::BufferTooShort {
                expected: V1_PREFIX_SIZE,
                actual: buf.len(),
            });
        }

        // Bytes 0-5: Magic
        if &buf[0..6] != MAGIC {
            return Err(NpzError::BadMagic);
        }

        // Bytes 6-7: Version
        let (major, minor) = (buf[6], buf[7]);

        // Header length
        let (prefix, header_len) = match major {
            1 => (
                V1_PREFIX_SIZE,
                u16::from_le_bytes([buf[8], buf[9]]) as usize,
            ),
            2 | 3 => {
                if buf.len() < V2_PREFIX_SIZE {
                    return Err(NpzError::BufferTooShort {
                        expected: V2_PREFIX_SIZE,
                        actual: buf.len(),
                    });
                }
                (
                    V2_PREFIX_SIZE,
                    u32::from_le_bytes([buf[8], buf[9], buf[10], buf[11]]) as usize,
                )
            }
            _ => return Err(NpzError::UnsupportedVersion(major, minor)),
        };

        let data_offset = prefix
            .checked_add(header_len)
            .ok_or_else(|| NpzError::InvalidHeader("header length overflows".into()))?;
        if buf.len() < data_offset {
            return Err(NpzError::BufferTooShort {
                expected: data_offset,
                actual: buf.len(),
            });
        }

        let dict = std::str::from_utf8(&buf[prefix..data_offset])
            .map_err(|_| NpzError::InvalidHeader("header is not valid text".into()))?;

        let descr = dict_value(dict, "descr")?;
        let dtype = DType::parse(descr)?;

        let fortran_order = match dict_value(dict, "fortran_order")? {
            "False" => false,
            "True" => true,
            other => {
                return Err(NpzError::InvalidHeader(format!(
                    "fortran_order must be True or False, got {}",
                    other
                )))
            }
        };

        let shape = parse_shape(dict_value(dict, "shape")?)?;

        let header = NpyHeader {
            dtype,
            fortran_order,
            shape,
        };
        header.data_len()?;
        if header.dtype == DType::Unicode(0) && header.num_elements()? > 0 {
            return Err(NpzError::InvalidHeader(format!(
                "zero-width unicode array of shape {:?}",
                header.shape
            )));
        }

        Ok((header, data_offset))
    }

    /// Serialize header (prefix included) to a new buffer
    pub fn to_bytes(&self) -> BytesMut {
        let dict = format!(
            "{{'descr': '{}', 'fortran_order': {}, 'shape': {}, }}",
            self.dtype.descr(),
            if self.fortran_order { "True" } else { "False" },
            format_shape(&self.shape),
        );

        // Version 1.0 unless the header outgrows a u16 length
        let mut prefix = V1_PREFIX_SIZE;
        let mut header_len = padded_len(prefix, dict.len());
        if header_len > u16::MAX as usize {
            prefix = V2_PREFIX_SIZE;
            header_len = padded_len(prefix, dict.len());
        }

        let mut buf = BytesMut::with_capacity(prefix + header_len);
        buf.put_slice(MAGIC);
        if prefix == V1_PREFIX_SIZE {
            buf.put_u8(1);
            buf.put_u8(0);
            buf.put_u16_le(header_len as u16);
        } else {
            buf.put_u8(2);
            buf.put_u8(0);
            buf.put_u32_le(header_len as u32);
        }
        buf.put_slice(dict.as_bytes());
        buf.put_bytes(b' ', header_len - dict.len() - 1);
        buf.put_u8(b'\n');
        buf
    }
}

/// Header length (dict + padding + newline) that aligns the data section
fn padded_len(prefix: usize, dict_len: usize) -> usize {
    let unpadded = prefix + dict_len + 1;
    let padding = (HEADER_ALIGN - unpadded % HEADER_ALIGN) % HEADER_ALIGN;
    dict_len + padding + 1
}

fn format_shape(shape: &[usize]) -> String {
    match shape {
        [] => "()".to_string(),
        [n] => format!("({},)", n),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}

fn parse_shape(value: &str) -> NpzResult<Vec<usize>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.trim_end_matches('L')
                .parse::<usize>()
                .map_err(|_| NpzError::InvalidHeader(format!("bad shape dimension {:?}", s)))
        })
        .collect()
}

/// Raw value text for `key` in a Python dict literal
///
/// Quoted strings come back without quotes, tuples without parentheses.
fn dict_value<'a>(dict: &'a str, key: &str) -> NpzResult<&'a str> {
    let missing = || NpzError::InvalidHeader(format!("missing key {:?}", key));

    let single = format!("'{}'", key);
    let double = format!("\"{}\"", key);
    let (start, key_len) = dict
        .find(&single)
        .map(|i| (i, single.len()))
        .or_else(|| dict.find(&double).map(|i| (i, double.len())))
        .ok_or_else(missing)?;

    let rest = dict[start + key_len..].trim_start();
    let rest = rest.strip_prefix(':').ok_or_else(missing)?.trim_start();

    let unterminated = || NpzError::InvalidHeader(format!("unterminated value for {:?}", key));
    match rest.chars().next() {
        Some(quote @ ('\'' | '"')) => {
            let body = &rest[1..];
            let end = body.find(quote).ok_or_else(unterminated)?;
            Ok(&body[..end])
        }
        Some('(') => {
            let end = rest.find(')').ok_or_else(unterminated)?;
            Ok(&rest[1..end])
        }
        Some(_) => {
            let end = rest.find(|c: char| c == ',' || c == '}').ok_or_else(unterminated)?;
            Ok(rest[..end].trim())
        }
        None => Err(unterminated()),
    }
}
