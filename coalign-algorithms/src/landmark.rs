//! Landmark-based similarity alignment.
//!
//! Landmarks are corresponding point pairs picked in a shared world frame.
//! This module chains centroid reduction, cross-covariance, Horn's rotation,
//! uniform scale estimation and similarity composition into one fit.

use crate::centroid::compute_centroid;
use crate::covariance::cross_covariance;
use crate::rotation::{rotation_from_cross_covariance, RotationSolverParams};
use crate::scale::compute_uniform_scale;
use crate::similarity::compose_similarity;
use coalign_core::{
    split_correspondences, Correspondence, Error, Point3d, Result, SimilarityTransform,
};
use serde::{Deserialize, Serialize};

/// Fewer pairs than this leave the rotation under-determined
pub const MIN_WELL_POSED_CORRESPONDENCES: usize = 3;

/// Parameters for landmark-based alignment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandmarkParams {
    /// Whether to estimate a uniform scale (default: true). When false the scale is fixed at 1.
    pub estimate_scale: bool,
    /// Reject inputs with fewer pairs than this. `None` accepts any non-empty set
    /// and returns a best-effort transform (default: `None`).
    pub min_correspondences: Option<usize>,
    /// Settings for the rotation solver
    pub rotation: RotationSolverParams,
}

impl Default for LandmarkParams {
    fn default() -> Self {
        Self {
            estimate_scale: true,
            min_correspondences: None,
            rotation: RotationSolverParams::default(),
        }
    }
}

impl LandmarkParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables scale estimation.
    pub fn with_scale(mut self, estimate_scale: bool) -> Self {
        self.estimate_scale = estimate_scale;
        self
    }

    /// Opt into strict validation of the correspondence count.
    pub fn with_min_correspondences(mut self, min: usize) -> Self {
        self.min_correspondences = Some(min);
        self
    }

    pub fn with_rotation_params(mut self, rotation: RotationSolverParams) -> Self {
        self.rotation = rotation;
        self
    }
}

/// Similarity transform mapping `source_points[i]` onto `dest_points[i]`.
///
/// Uses the default, lenient parameters: one or two pairs, collinear or
/// coincident points all yield a valid transform instead of an error. Only a
/// length mismatch or an empty input is rejected.
///
/// # Example
/// ```rust
/// use coalign_algorithms::compute_rigid_transform_from_points;
/// use coalign_core::Point3d;
///
/// let source = vec![
///     Point3d::new(1.0, 0.0, 0.0),
///     Point3d::new(0.0, 1.0, 0.0),
///     Point3d::new(0.0, 0.0, 1.0),
/// ];
/// let destination = vec![
///     Point3d::new(0.0, 1.0, 0.0),
///     Point3d::new(-1.0, 0.0, 0.0),
///     Point3d::new(0.0, 0.0, 1.0),
/// ];
///
/// let transform = compute_rigid_transform_from_points(&source, &destination).unwrap();
/// let mapped = transform.transform_point(&source[0]);
/// assert!((mapped - destination[0]).norm() < 1e-3);
/// ```
pub fn compute_rigid_transform_from_points(
    source_points: &[Point3d],
    dest_points: &[Point3d],
) -> Result<SimilarityTransform> {
    compute_similarity_transform(source_points, dest_points, &LandmarkParams::default())
}

/// [`compute_rigid_transform_from_points`] with explicit parameters
pub fn compute_similarity_transform(
    source_points: &[Point3d],
    dest_points: &[Point3d],
    params: &LandmarkParams,
) -> Result<SimilarityTransform> {
    if source_points.len() != dest_points.len() {
        return Err(Error::MismatchedCorrespondences {
            source_len: source_points.len(),
            destination_len: dest_points.len(),
        });
    }
    if source_points.is_empty() {
        return Err(Error::EmptyPointSet);
    }

    let count = source_points.len();
    if let Some(required) = params.min_correspondences {
        if count < required {
            return Err(Error::InsufficientCorrespondences {
                required,
                provided: count,
            });
        }
    }
    if count < MIN_WELL_POSED_CORRESPONDENCES {
        tracing::debug!(count, "rotation under-determined, returning best-effort alignment");
    }

    let source_centroid = compute_centroid(source_points)?;
    let dest_centroid = compute_centroid(dest_points)?;

    let h = cross_covariance(source_points, dest_points, &source_centroid, &dest_centroid)?;
    let rotation = rotation_from_cross_covariance(&h, &params.rotation).to_homogeneous();

    let scale = if params.estimate_scale {
        compute_uniform_scale(source_points, dest_points, &source_centroid, &dest_centroid)?
    } else {
        1.0
    };

    let transform = compose_similarity(&rotation, scale, &source_centroid, &dest_centroid);
    tracing::debug!(count, scale, "landmark alignment computed");

    Ok(transform)
}

/// Align a set of landmark pairs
pub fn align_correspondences(
    pairs: &[Correspondence],
    params: &LandmarkParams,
) -> Result<SimilarityTransform> {
    let (source, destination) = split_correspondences(pairs);
    compute_similarity_transform(&source, &destination, params)
}

/// Residual of `transform` over index-corresponding points, as `(rms, max)`.
///
/// # Example
/// ```rust
/// use coalign_algorithms::alignment_error;
/// use coalign_core::{Point3d, SimilarityTransform, Vector3d};
///
/// let source = [Point3d::new(0.0, 0.0, 0.0), Point3d::new(1.0, 0.0, 0.0)];
/// let target = [Point3d::new(5.0, 0.0, 0.0), Point3d::new(6.0, 0.0, 0.0)];
/// let transform = SimilarityTransform::translation(Vector3d::new(5.0, 0.0, 0.0));
///
/// let (rms, max) = alignment_error(&source, &target, &transform).unwrap();
/// assert!(rms < 1e-10 && max < 1e-10);
/// ```
pub fn alignment_error(
    source_points: &[Point3d],
    dest_points: &[Point3d],
    transform: &SimilarityTransform,
) -> Result<(f64, f64)> {
    if source_points.len() != dest_points.len() {
        return Err(Error::MismatchedCorrespondences {
            source_len: source_points.len(),
            destination_len: dest_points.len(),
        });
    }
    if source_points.is_empty() {
        return Ok((0.0, 0.0));
    }

    let mut sum_sq = 0.0;
    let mut max_sq: f64 = 0.0;
    for (s, d) in source_points.iter().zip(dest_points.iter()) {
        let dist_sq = (transform.transform_point(s) - d).norm_squared();
        sum_sq += dist_sq;
        max_sq = max_sq.max(dist_sq);
    }

    Ok(((sum_sq / source_points.len() as f64).sqrt(), max_sq.sqrt()))
}
