//! Core data structures and traits for coalign
//!
//! This crate provides the value types shared by the alignment engine and its
//! collaborators: points and correspondences, point clouds, similarity
//! transforms with their persisted form, the per-slot `AlignmentState`, and
//! the collaborator traits.

pub mod point;
pub mod point_cloud;
pub mod traits;
pub mod transform;
pub mod alignment_state;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use traits::*;
pub use transform::*;
pub use alignment_state::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3, Matrix3, Matrix4, UnitQuaternion};
