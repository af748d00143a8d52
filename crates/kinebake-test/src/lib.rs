//! kinebake test harness
//!
//! This crate provides:
//! - A scripted evaluator with fault injection
//! - Seeded synthetic motions and chain models
//! - Motion file fixtures in both input formats
//! - End-to-end bake tests over written artifacts

pub mod evaluator;
pub mod fixtures;
pub mod integration;

pub use evaluator::*;
pub use fixtures::*;
pub use integration::*;
