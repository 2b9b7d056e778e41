//! Iterative Closest Point refinement for dense clouds
//!
//! Each round matches every (transformed) source point to its nearest target
//! point, fits a similarity transform to those pairs with the landmark solver
//! and folds it into the running transform. The loop stops once the mean
//! correspondence distance settles, the iteration cap is hit, or the
//! correspondences degenerate.

use crate::landmark::{compute_similarity_transform, LandmarkParams};
use crate::nearest_neighbor::SearchStrategy;
use crate::rotation::RotationSolverParams;
use crate::scale::SPREAD_FLOOR;
use coalign_core::{
    Error, NearestNeighborSearch, Point3d, PointCloud, Result, SimilarityTransform,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Parameters for ICP refinement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcpParams {
    /// Maximum number of iterations (default: 50).
    pub max_iterations: usize,
    /// Convergence threshold on the change of mean correspondence distance (default: 1e-6).
    pub convergence_threshold: f64,
    /// Pairs farther apart than this are dropped. `None` keeps all (default: `None`).
    pub max_correspondence_distance: Option<f64>,
    /// Whether each round estimates a uniform scale (default: true).
    pub estimate_scale: bool,
    /// Initial transform guess (default: identity).
    pub initial_transform: SimilarityTransform,
    /// Spatial index used for correspondence search (default: KD-tree).
    pub search: SearchStrategy,
    /// Rotation solver settings forwarded to each fit.
    pub rotation: RotationSolverParams,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            convergence_threshold: 1e-6,
            max_correspondence_distance: None,
            estimate_scale: true,
            initial_transform: SimilarityTransform::identity(),
            search: SearchStrategy::KdTree,
            rotation: RotationSolverParams::default(),
        }
    }
}

impl IcpParams {
    /// Creates new ICP parameters with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    pub fn with_max_correspondence_distance(mut self, distance: f64) -> Self {
        self.max_correspondence_distance = Some(distance);
        self
    }

    pub fn with_scale(mut self, estimate_scale: bool) -> Self {
        self.estimate_scale = estimate_scale;
        self
    }

    /// Seed the refinement, typically with a landmark alignment.
    pub fn with_initial_transform(mut self, transform: SimilarityTransform) -> Self {
        self.initial_transform = transform;
        self
    }

    pub fn with_search(mut self, search: SearchStrategy) -> Self {
        self.search = search;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(Error::InvalidParameter("Max iterations must be positive".to_string()));
        }
        if !(self.convergence_threshold > 0.0) {
            return Err(Error::InvalidParameter("Convergence threshold must be positive".to_string()));
        }
        if let Some(distance) = self.max_correspondence_distance {
            if !(distance > 0.0) {
                return Err(Error::InvalidParameter(
                    "Max correspondence distance must be positive".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn landmark_params(&self) -> LandmarkParams {
        LandmarkParams::new()
            .with_scale(self.estimate_scale)
            .with_rotation_params(self.rotation)
    }
}

/// Why the refinement loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcpTermination {
    /// Mean correspondence distance changed by less than the threshold
    Converged,
    /// Iteration cap reached first
    MaxIterations,
    /// Every source point matched the same target point
    CorrespondenceCollapse,
    /// The distance gate rejected every pair
    NoCorrespondences,
}

/// Result of ICP refinement
#[derive(Debug, Clone)]
pub struct IcpResult {
    /// Running transform mapping the source cloud onto the target cloud
    pub transform: SimilarityTransform,
    /// Mean nearest-neighbor distance under `transform`
    pub mean_distance: f64,
    /// RMS nearest-neighbor distance under `transform`
    pub rms_error: f64,
    /// Number of rounds performed
    pub iterations: usize,
    /// Whether the convergence threshold was met
    pub converged: bool,
    /// Number of valid correspondences under `transform`
    pub correspondence_count: usize,
    pub termination: IcpTermination,
    /// `(source index, target index)` pairs under `transform`
    pub correspondences: Vec<(usize, usize)>,
}

#[derive(Debug, Clone, Copy)]
struct Match {
    source_idx: usize,
    target_idx: usize,
    distance: f64,
}

#[derive(Debug, Clone, Default)]
struct MatchStats {
    mean: f64,
    rms: f64,
    pairs: Vec<(usize, usize)>,
}

impl MatchStats {
    fn from_matches(matches: &[Match]) -> Self {
        if matches.is_empty() {
            return Self::default();
        }
        let n = matches.len() as f64;
        let sum: f64 = matches.iter().map(|m| m.distance).sum();
        let sum_sq: f64 = matches.iter().map(|m| m.distance * m.distance).sum();
        Self {
            mean: sum / n,
            rms: (sum_sq / n).sqrt(),
            pairs: matches.iter().map(|m| (m.source_idx, m.target_idx)).collect(),
        }
    }
}

/// Match every transformed source point to its nearest target point
fn find_correspondences(
    transformed_source: &[Point3d],
    index: &(dyn NearestNeighborSearch + Sync),
    max_distance: Option<f64>,
) -> Vec<Match> {
    transformed_source
        .par_iter()
        .enumerate()
        .filter_map(|(source_idx, point)| {
            let (target_idx, distance) = index.find_nearest(point)?;

            // Filter out correspondences that are too far
            if let Some(max_dist) = max_distance {
                if distance > max_dist {
                    return None;
                }
            }

            Some(Match {
                source_idx,
                target_idx,
                distance,
            })
        })
        .collect()
}

fn is_collapsed(matches: &[Match]) -> bool {
    if matches.len() < 2 {
        return false;
    }
    let distinct: HashSet<usize> = matches.iter().map(|m| m.target_idx).collect();
    distinct.len() < 2
}

/// Refine the alignment of `source` onto `target` with ICP.
///
/// Non-convergence is not an error: the last transform is returned with
/// `converged == false` and the reason in `termination`.
///
/// # Example
/// ```rust
/// use coalign_algorithms::{icp_align, IcpParams};
/// use coalign_core::{Point3d, PointCloud};
///
/// let source: PointCloud<Point3d> = vec![
///     Point3d::new(0.0, 0.0, 0.0),
///     Point3d::new(1.0, 0.0, 0.0),
///     Point3d::new(0.0, 1.0, 0.0),
///     Point3d::new(0.0, 0.0, 1.0),
///     Point3d::new(1.0, 1.0, 1.0),
/// ]
/// .into_iter()
/// .collect();
/// let target: PointCloud<Point3d> = source.iter().map(|p| Point3d::new(p.x + 0.1, p.y, p.z)).collect();
///
/// let result = icp_align(&source, &target, &IcpParams::default()).unwrap();
/// assert!(result.converged);
/// ```
pub fn icp_align(
    source: &PointCloud<Point3d>,
    target: &PointCloud<Point3d>,
    params: &IcpParams,
) -> Result<IcpResult> {
    icp_align_points(&source.points, &target.points, params)
}

/// [`icp_align`] over raw point slices
#[tracing::instrument(skip_all, fields(source = source.len(), target = target.len()))]
pub fn icp_align_points(
    source: &[Point3d],
    target: &[Point3d],
    params: &IcpParams,
) -> Result<IcpResult> {
    if source.is_empty() || target.is_empty() {
        return Err(Error::EmptyPointSet);
    }
    params.validate()?;

    let index = params.search.build(target);
    let landmark_params = params.landmark_params();

    let mut current_transform = params.initial_transform;
    let mut previous_mean = f64::INFINITY;
    let mut iterations = 0;
    let mut termination = IcpTermination::MaxIterations;

    for iteration in 0..params.max_iterations {
        iterations = iteration + 1;

        // Transform source points with current transformation
        let transformed: Vec<Point3d> = source
            .iter()
            .map(|point| current_transform.transform_point(point))
            .collect();

        let matches = find_correspondences(&transformed, index.as_ref(), params.max_correspondence_distance);
        if matches.is_empty() {
            tracing::warn!(iteration, "no correspondences within the distance gate");
            termination = IcpTermination::NoCorrespondences;
            break;
        }
        if is_collapsed(&matches) {
            tracing::warn!(iteration, "correspondences collapsed onto one target point");
            termination = IcpTermination::CorrespondenceCollapse;
            break;
        }

        let (matched_source, matched_target): (Vec<Point3d>, Vec<Point3d>) = matches
            .iter()
            .map(|m| (transformed[m.source_idx], target[m.target_idx]))
            .unzip();

        let delta = compute_similarity_transform(&matched_source, &matched_target, &landmark_params)?;
        if delta.scale() < SPREAD_FLOOR {
            tracing::warn!(iteration, "round estimated a vanishing scale");
            termination = IcpTermination::CorrespondenceCollapse;
            break;
        }

        // Update transformation
        current_transform = delta * current_transform;

        let mean = MatchStats::from_matches(&matches).mean;
        let change = (previous_mean - mean).abs();
        tracing::debug!(iteration, mean, change, pairs = matches.len(), "icp round");

        if change < params.convergence_threshold {
            termination = IcpTermination::Converged;
            break;
        }
        previous_mean = mean;
    }

    // Residual under the final transform
    let transformed: Vec<Point3d> = source
        .iter()
        .map(|point| current_transform.transform_point(point))
        .collect();
    let final_matches = find_correspondences(&transformed, index.as_ref(), params.max_correspondence_distance);
    let stats = MatchStats::from_matches(&final_matches);

    let converged = termination == IcpTermination::Converged;
    tracing::debug!(iterations, converged, mean = stats.mean, ?termination, "icp finished");

    Ok(IcpResult {
        transform: current_transform,
        mean_distance: stats.mean,
        rms_error: stats.rms,
        iterations,
        converged,
        correspondence_count: final_matches.len(),
        termination,
        correspondences: stats.pairs,
    })
}
