//! # Coalign Algorithms
//!
//! Point-set alignment algorithms for bringing independently captured 3D assets
//! into one world frame.
//!
//! Landmark alignment fits a similarity transform (rotation, uniform scale,
//! translation) to picked point pairs with Horn's quaternion method. ICP
//! refinement repeats that fit against nearest-neighbor correspondences until
//! the mean residual stops improving.

pub mod centroid;
pub mod covariance;
pub mod rotation;
pub mod scale;
pub mod similarity;
pub mod landmark;
pub mod nearest_neighbor;
pub mod registration;
pub mod session;

// Re-export commonly used items
pub use centroid::*;
pub use covariance::*;
pub use rotation::*;
pub use scale::*;
pub use similarity::*;
pub use landmark::*;
pub use nearest_neighbor::*;
pub use registration::*;
pub use session::*;
