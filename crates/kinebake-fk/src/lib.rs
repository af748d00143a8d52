//! kinebake FK - Kinematic tree evaluator
//!
//! A concrete [`kinebake_core::Evaluator`] for bodies connected by hinge and
//! slide joints. It places the root at the commanded pose and walks the tree
//! to produce every body's world pose. No dynamics, contacts or velocities:
//! placement only.

pub mod model;
pub mod tree;

pub use model::*;
pub use tree::*;
