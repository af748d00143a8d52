//! Array element types and their NumPy descriptors
//!
//! Numeric types are read in either byte order and always written
//! little-endian. Unicode strings must be little-endian. Descriptor strings
//! follow NumPy's `array_interface` notation.

use crate::{NpzError, NpzResult};

/// Bytes per code point in a NumPy unicode array
pub const UNICODE_CHAR_SIZE: usize = 4;

/// Element type of an NPY array
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DType {
    /// `<f4`
    F32,
    /// `<f8`
    F64,
    /// `<i4`
    I32,
    /// `<i8`
    I64,
    /// `<U{n}`: fixed width of `n` code points
    Unicode(usize),
}

impl DType {
    /// Parse a NumPy descriptor such as `<f8` or `<U12`
    pub fn parse(descr: &str) -> NpzResult<Self> {
        let unsupported = || NpzError::UnsupportedDtype(descr.to_string());

        let mut chars = descr.chars();
        let order = chars.next();
        if !matches!(order, Some('<' | '=' | '>')) {
            return Err(unsupported());
        }
        let rest = chars.as_str();

        match rest {
            "f4" => Ok(DType::F32),
            "f8" => Ok(DType::F64),
            "i4" => Ok(DType::I32),
            "i8" => Ok(DType::I64),
            _ if order == Some('>') => Err(unsupported()),
            _ => {
                let width = rest
                    .strip_prefix('U')
                    .and_then(|n| n.parse::<usize>().ok())
                    .ok_or_else(unsupported)?;
                Ok(DType::Unicode(width))
            }
        }
    }

    /// NumPy descriptor string
    pub fn descr(self) -> String {
        match self {
            DType::F32 => "<f4".to_string(),
            DType::F64 => "<f8".to_string(),
            DType::I32 => "<i4".to_string(),
            DType::I64 => "<i8".to_string(),
            DType::Unicode(width) => format!("<U{}", width),
        }
    }

    /// Bytes per element, `None` if a unicode width overflows
    #[inline]
    pub fn item_size(self) -> Option<usize> {
        match self {
            DType::F32 | DType::I32 => Some(4),
            DType::F64 | DType::I64 => Some(8),
            DType::Unicode(width) => width.checked_mul(UNICODE_CHAR_SIZE),
        }
    }

    #[inline]
    pub fn is_numeric(self) -> bool {
        !matches!(self, DType::Unicode(_))
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.descr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descr_roundtrip() {
        for dtype in [
            DType::F32,
            DType::F64,
            DType::I32,
            DType::I64,
            DType::Unicode(17),
        ] {
            assert_eq!(DType::parse(&dtype.descr()).unwrap(), dtype);
        }
    }

    #[test]
    fn test_native_order_accepted() {
        assert_eq!(DType::parse("=f8").unwrap(), DType::F64);
    }

    #[test]
    fn test_big_endian_numbers_only() {
        assert_eq!(DType::parse(">f8").unwrap(), DType::F64);
        assert_eq!(DType::parse(">i4").unwrap(), DType::I32);
        assert!(DType::parse(">U4").is_err());
    }

    #[test]
    fn test_rejects_unknown() {
        assert!(DType::parse("<c16").is_err());
        assert!(DType::parse("|b1").is_err());
        assert!(DType::parse("<U").is_err());
    }

    #[test]
    fn test_item_size() {
        assert_eq!(DType::F32.item_size(), Some(4));
        assert_eq!(DType::I64.item_size(), Some(8));
        assert_eq!(DType::Unicode(5).item_size(), Some(20));
        assert_eq!(DType::Unicode(usize::MAX).item_size(), None);
    }
}
