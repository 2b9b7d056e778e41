//! Core traits for coalign
//!
//! The alignment engine talks to its collaborators only through these
//! capabilities; it never touches scene-graph objects directly.

use crate::{alignment_state::AssetSlot, point::*, transform::Transform};

/// Trait for nearest neighbor search functionality
pub trait NearestNeighborSearch {
    /// Find the nearest point, returning its index and distance
    fn find_nearest(&self, query: &Point3d) -> Option<(usize, f64)>;
}

/// Applies alignment results to the asset roots of a scene graph
pub trait SceneGraphMutator {
    /// Apply `transform` to the root node of `slot`; `None` restores the untouched pose
    fn apply_transform(&mut self, slot: AssetSlot, transform: Option<&Transform>);
}

/// Supplies landmark pairs picked in a shared world frame
pub trait CorrespondenceProvider {
    fn correspondences(&self) -> Vec<Correspondence>;
}

impl CorrespondenceProvider for [Correspondence] {
    fn correspondences(&self) -> Vec<Correspondence> {
        self.to_vec()
    }
}

impl CorrespondenceProvider for Vec<Correspondence> {
    fn correspondences(&self) -> Vec<Correspondence> {
        self.clone()
    }
}
