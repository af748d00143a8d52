//! Motion baking pipeline
//!
//! Turns a raw root-pose and joint-angle trajectory into a
//! velocity-annotated NPZ artifact:
//!
//! 1. [`MotionLoader`] reads and validates the input, applying a z offset
//! 2. [`FrameReplayer`] drives an [`Evaluator`](kinebake_core::Evaluator)
//!    through every frame and captures body poses
//! 3. [`VelocityEstimator`] derives joint and body velocities
//! 4. [`MotionWriter`] writes the result under `{root}/{name}:{version}/`
//!
//! [`Baker`] runs all four steps.

pub mod baker;
pub mod config;
pub mod loader;
pub mod replay;
pub mod velocity;
pub mod writer;

pub use baker::*;
pub use config::*;
pub use loader::*;
pub use replay::*;
pub use velocity::*;
pub use writer::*;
