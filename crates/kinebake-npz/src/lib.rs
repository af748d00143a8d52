//! kinebake NPZ - NumPy array archives
//!
//! The subset of the NumPy file formats kinebake reads and writes:
//! - `f4`/`f8`/`i4`/`i8` arrays, encoded and decoded by `ndarray-npy`
//! - Fixed-width unicode arrays for body and joint names
//! - NPZ archives (zip of `.npy` entries), stored or deflated
//!
//! NPY headers are parsed here first so that sizes declared by a file are
//! checked before any payload is decoded.

pub mod archive;
pub mod array;
pub mod dtype;
pub mod error;
pub mod header;

pub use archive::*;
pub use array::*;
pub use dtype::*;
pub use error::*;
pub use header::*;
