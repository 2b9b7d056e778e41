//! Alignment session: runs the engine and records results per asset slot
//!
//! The session owns the `AlignmentState` and is driven from the host's main
//! interaction loop, so writes to a slot are serialized by ownership alone.
//! Collaborators are reached only through `CorrespondenceProvider` and
//! `SceneGraphMutator`.

use crate::landmark::{align_correspondences, LandmarkParams};
use crate::registration::{icp_align, IcpParams, IcpResult, IcpTermination};
use coalign_core::{
    AlignmentState, AssetSlot, CorrespondenceProvider, Point3d, PointCloud, Result,
    SceneGraphMutator, SimilarityTransform, Transform,
};

#[derive(Debug, Clone, Default)]
pub struct AlignmentSession {
    state: AlignmentState,
    landmark_params: LandmarkParams,
    icp_params: IcpParams,
}

impl AlignmentSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a state read back from a project manifest
    pub fn from_state(state: AlignmentState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn with_landmark_params(mut self, params: LandmarkParams) -> Self {
        self.landmark_params = params;
        self
    }

    pub fn with_icp_params(mut self, params: IcpParams) -> Self {
        self.icp_params = params;
        self
    }

    pub fn state(&self) -> &AlignmentState {
        &self.state
    }

    pub fn into_state(self) -> AlignmentState {
        self.state
    }

    /// Transform currently applied to `slot`, as a matrix
    pub fn current_transform(&self, slot: AssetSlot) -> Option<SimilarityTransform> {
        self.state.get_transform(slot).map(SimilarityTransform::from_transform)
    }

    /// Fit the provider's landmark pairs and apply the result to `slot`
    pub fn align_landmarks<P, M>(
        &mut self,
        slot: AssetSlot,
        provider: &P,
        scene: &mut M,
    ) -> Result<SimilarityTransform>
    where
        P: CorrespondenceProvider + ?Sized,
        M: SceneGraphMutator + ?Sized,
    {
        let pairs = provider.correspondences();
        let transform = align_correspondences(&pairs, &self.landmark_params)?;

        tracing::info!(%slot, pairs = pairs.len(), scale = transform.scale(), "landmark alignment applied");
        self.commit(slot, &transform, scene);
        Ok(transform)
    }

    /// Refine `slot` with ICP, starting from its current transform if it has one.
    ///
    /// `source` is the slot's cloud in its own frame, `target` the reference
    /// cloud. A refinement that stopped on collapsed or missing
    /// correspondences leaves the slot untouched; otherwise the best-effort
    /// transform is applied even when it did not converge.
    pub fn refine_icp<M>(
        &mut self,
        slot: AssetSlot,
        source: &PointCloud<Point3d>,
        target: &PointCloud<Point3d>,
        scene: &mut M,
    ) -> Result<IcpResult>
    where
        M: SceneGraphMutator + ?Sized,
    {
        let mut params = self.icp_params;
        if let Some(current) = self.current_transform(slot) {
            params.initial_transform = current;
        }

        let result = icp_align(source, target, &params)?;
        match result.termination {
            IcpTermination::Converged | IcpTermination::MaxIterations => {
                tracing::info!(
                    %slot,
                    iterations = result.iterations,
                    converged = result.converged,
                    mean_distance = result.mean_distance,
                    "icp refinement applied"
                );
                self.commit(slot, &result.transform, scene);
            }
            IcpTermination::CorrespondenceCollapse | IcpTermination::NoCorrespondences => {
                tracing::warn!(%slot, termination = ?result.termination, "icp refinement discarded");
            }
        }

        Ok(result)
    }

    /// Apply a transform edited directly by the user
    pub fn set_transform<M>(&mut self, slot: AssetSlot, transform: Transform, scene: &mut M)
    where
        M: SceneGraphMutator + ?Sized,
    {
        self.state.set_transform(slot, transform);
        scene.apply_transform(slot, self.state.get_transform(slot));
    }

    /// Drop the alignment of `slot` and restore its untouched pose
    pub fn reset_slot<M>(&mut self, slot: AssetSlot, scene: &mut M) -> Option<Transform>
    where
        M: SceneGraphMutator + ?Sized,
    {
        let previous = self.state.clear_transform(slot);
        scene.apply_transform(slot, None);
        previous
    }

    fn commit<M>(&mut self, slot: AssetSlot, transform: &SimilarityTransform, scene: &mut M)
    where
        M: SceneGraphMutator + ?Sized,
    {
        self.state.set_transform(slot, transform.to_transform());
        scene.apply_transform(slot, self.state.get_transform(slot));
    }
}
