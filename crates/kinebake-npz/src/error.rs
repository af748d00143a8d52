//! Error types for NPY arrays and NPZ archives

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NpzError {
    #[error("Buffer too short: expected {expected}, got {actual}")]
    BufferTooShort { expected: usize, actual: usize },

    #[error("Not an NPY buffer (bad magic)")]
    BadMagic,

    #[error("Unsupported NPY version {0}.{1}")]
    UnsupportedVersion(u8, u8),

    #[error("Invalid NPY header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported dtype: {0}")]
    UnsupportedDtype(String),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("NPY read error: {0}")]
    ReadNpy(#[from] ndarray_npy::ReadNpyError),

    #[error("NPY write error: {0}")]
    WriteNpy(#[from] ndarray_npy::WriteNpyError),

    #[error("Invalid unicode data: {0}")]
    InvalidUnicode(String),

    #[error("Missing archive entry: {0}")]
    MissingEntry(String),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type NpzResult<T> = Result<T, NpzError>;
