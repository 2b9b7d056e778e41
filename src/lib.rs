//! # coalign
//!
//! Similarity alignment for independently produced digitizations of the same
//! physical object (Gaussian splats, textured meshes, structured point clouds).
//!
//! This is the umbrella crate that provides convenient access to all coalign functionality.
//! You can use this crate to get everything in one place, or use individual crates for
//! more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Points, correspondences, similarity transforms and the per-slot `AlignmentState`
//! - **Algorithms**: Horn landmark alignment, ICP refinement and the alignment session
//!
//! ## Quick Start
//!
//! ```rust
//! use coalign::prelude::*;
//!
//! let source = vec![
//!     Point3d::new(1.0, 0.0, 0.0),
//!     Point3d::new(0.0, 1.0, 0.0),
//!     Point3d::new(0.0, 0.0, 1.0),
//! ];
//! let destination: Vec<Point3d> = source.iter().map(|p| Point3d::from(p.coords * 2.0)).collect();
//!
//! let transform = compute_rigid_transform_from_points(&source, &destination).unwrap();
//! assert!((transform.scale() - 2.0).abs() < 1e-6);
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables algorithms (core data structures are always included)
//! - `algorithms`: Alignment algorithms
//! - `all`: Enables all features

// Re-export core functionality
pub use coalign_core::*;

// Re-export sub-crates
#[cfg(feature = "algorithms")]
pub use coalign_algorithms as algorithms;

/// Convenient imports for common use cases
pub mod prelude {
    pub use coalign_core::*;

    #[cfg(feature = "algorithms")]
    pub use coalign_algorithms::*;
}
