//! kinebake Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every kinebake stage:
//! - Pose primitives (Vec3, Quat in xyzw order)
//! - Sample rate and frame timing
//! - Motion records (raw input, replayed series, annotated output)
//! - The evaluator capability used for forward kinematics
//! - The error taxonomy

pub mod error;
pub mod evaluator;
pub mod motion;
pub mod pose;
pub mod time;

pub use error::*;
pub use evaluator::*;
pub use motion::*;
pub use pose::*;
pub use time::*;
