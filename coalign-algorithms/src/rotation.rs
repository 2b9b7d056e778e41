//! Optimal rotation between two centered point sets (Horn's quaternion method)
//!
//! The cross-covariance `H` is folded into Horn's symmetric, traceless 4×4 key
//! matrix `N`. The eigenvector of `N` with the largest eigenvalue is the unit
//! quaternion `(w, x, y, z)` that best rotates the source onto the destination
//! in the least-squares sense.
//!
//! By default the eigenvector comes from nalgebra's symmetric eigensolver.
//! Power iteration is available as an alternative; because `N` is traceless
//! its most negative eigenvalue can outweigh the largest positive one, so the
//! iteration runs on `N + c·I` with `c = ‖N‖_F`. Its accuracy depends on the
//! gap between the two largest eigenvalues, which is small for elongated sets.

use crate::covariance::cross_covariance;
use coalign_core::{Matrix3, Matrix4, Point3d, Result, UnitQuaternion};
use nalgebra::{Quaternion, Vector4};
use serde::{Deserialize, Serialize};

/// How the dominant eigenvector of the key matrix is found
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EigenSolver {
    /// Exact symmetric eigendecomposition
    #[default]
    SymmetricEigen,
    /// Fixed-budget power iteration on the shifted key matrix
    PowerIteration,
}

/// Settings for the rotation solver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationSolverParams {
    /// Eigenvector method (default: symmetric eigendecomposition)
    pub solver: EigenSolver,
    /// Power-iteration budget (default: 50)
    pub max_iterations: usize,
    /// A key matrix or iterate with a smaller norm carries no rotation (default: 1e-10)
    pub norm_floor: f64,
}

impl Default for RotationSolverParams {
    fn default() -> Self {
        Self {
            solver: EigenSolver::SymmetricEigen,
            max_iterations: 50,
            norm_floor: 1e-10,
        }
    }
}

impl RotationSolverParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_solver(mut self, solver: EigenSolver) -> Self {
        self.solver = solver;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_norm_floor(mut self, norm_floor: f64) -> Self {
        self.norm_floor = norm_floor;
        self
    }
}

/// Horn's key matrix for the cross-covariance `h` (`h[(i, j)] = Σ s_i d_j`)
pub fn horn_key_matrix(h: &Matrix3<f64>) -> Matrix4<f64> {
    let (sxx, sxy, sxz) = (h[(0, 0)], h[(0, 1)], h[(0, 2)]);
    let (syx, syy, syz) = (h[(1, 0)], h[(1, 1)], h[(1, 2)]);
    let (szx, szy, szz) = (h[(2, 0)], h[(2, 1)], h[(2, 2)]);

    Matrix4::new(
        sxx + syy + szz, syz - szy,        szx - sxz,        sxy - syx,
        syz - szy,       sxx - syy - szz,  sxy + syx,        szx + sxz,
        szx - sxz,       sxy + syx,        -sxx + syy - szz, syz + szy,
        sxy - syx,       szx + sxz,        syz + szy,        -sxx - syy + szz,
    )
}

/// Dominant eigenvector of the symmetric key matrix `n`, as `(w, x, y, z)`.
///
/// A key matrix below the norm floor (no rotational information, e.g. a
/// single point) yields the identity quaternion.
pub fn dominant_eigenvector(n: &Matrix4<f64>, params: &RotationSolverParams) -> Vector4<f64> {
    if n.norm() < params.norm_floor {
        return Vector4::new(1.0, 0.0, 0.0, 0.0);
    }

    match params.solver {
        EigenSolver::SymmetricEigen => {
            let eigen = n.symmetric_eigen();
            let dominant = eigen.eigenvalues.imax();
            eigen.eigenvectors.column(dominant).into_owned()
        }
        EigenSolver::PowerIteration => power_iteration(n, params),
    }
}

/// Power iteration on `n + ‖n‖_F·I`, seeded with the column of the shifted
/// matrix that has the largest diagonal entry. When an iterate's norm falls
/// below the floor the current estimate is kept.
fn power_iteration(n: &Matrix4<f64>, params: &RotationSolverParams) -> Vector4<f64> {
    let shifted = n + Matrix4::identity() * n.norm();

    let mut estimate = Vector4::new(1.0, 0.0, 0.0, 0.0);
    let mut seed_column = 0;
    for i in 1..4 {
        if shifted[(i, i)] > shifted[(seed_column, seed_column)] {
            seed_column = i;
        }
    }
    let seed = shifted.column(seed_column).into_owned();
    let seed_norm = seed.norm();
    if seed_norm >= params.norm_floor {
        estimate = seed / seed_norm;
    }

    for iteration in 0..params.max_iterations {
        let next = shifted * estimate;
        let norm = next.norm();
        if norm < params.norm_floor {
            tracing::trace!(iteration, norm, "power iteration underflow, keeping previous estimate");
            break;
        }
        estimate = next / norm;
    }

    estimate
}

/// Convert a `(w, x, y, z)` quaternion into a homogeneous rotation matrix.
///
/// The quaternion is normalized first; a vanishing one maps to the identity.
pub fn quaternion_to_rotation_matrix(q: &Vector4<f64>) -> Matrix4<f64> {
    unit_quaternion(q).to_homogeneous()
}

/// Solve for the rotation quaternion directly from a cross-covariance matrix
pub fn rotation_from_cross_covariance(
    h: &Matrix3<f64>,
    params: &RotationSolverParams,
) -> UnitQuaternion<f64> {
    let n = horn_key_matrix(h);
    unit_quaternion(&dominant_eigenvector(&n, params))
}

/// Rotation that best maps the centered source onto the centered destination.
///
/// Always a proper rotation (orthonormal, determinant +1), including for
/// collinear, coincident or single-point input where the answer is not unique.
pub fn compute_optimal_rotation(
    source: &[Point3d],
    destination: &[Point3d],
    source_centroid: &Point3d,
    destination_centroid: &Point3d,
) -> Result<Matrix4<f64>> {
    compute_optimal_rotation_with(
        source,
        destination,
        source_centroid,
        destination_centroid,
        &RotationSolverParams::default(),
    )
}

/// [`compute_optimal_rotation`] with explicit solver settings
pub fn compute_optimal_rotation_with(
    source: &[Point3d],
    destination: &[Point3d],
    source_centroid: &Point3d,
    destination_centroid: &Point3d,
    params: &RotationSolverParams,
) -> Result<Matrix4<f64>> {
    let h = cross_covariance(source, destination, source_centroid, destination_centroid)?;
    Ok(rotation_from_cross_covariance(&h, params).to_homogeneous())
}

fn unit_quaternion(q: &Vector4<f64>) -> UnitQuaternion<f64> {
    if q.norm() < f64::EPSILON {
        return UnitQuaternion::identity();
    }
    UnitQuaternion::from_quaternion(Quaternion::new(q[0], q[1], q[2], q[3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centroid::compute_centroid;
    use approx::assert_relative_eq;
    use coalign_core::Vector3;
    use std::f64::consts::PI;

    fn rotation_for(source: &[Point3d], destination: &[Point3d]) -> Matrix4<f64> {
        let sc = compute_centroid(source).unwrap();
        let dc = compute_centroid(destination).unwrap();
        compute_optimal_rotation(source, destination, &sc, &dc).unwrap()
    }

    fn assert_proper_rotation(r: &Matrix4<f64>) {
        let block = r.fixed_view::<3, 3>(0, 0).into_owned();
        assert_relative_eq!(block * block.transpose(), Matrix3::identity(), epsilon = 1e-4);
        assert_relative_eq!(block.determinant(), 1.0, epsilon = 1e-4);
        assert_eq!(r[(3, 3)], 1.0);
        assert_eq!(r[(0, 3)], 0.0);
    }

    fn basis() -> Vec<Point3d> {
        vec![
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 1.0, 0.0),
            Point3d::new(0.0, 0.0, 1.0),
        ]
    }

    #[test]
    fn test_key_matrix_symmetric_and_traceless() {
        let h = Matrix3::new(1.0, 2.0, 3.0, -4.0, 5.0, 0.5, 7.0, -8.0, 9.0);
        let n = horn_key_matrix(&h);
        assert_relative_eq!(n, n.transpose(), epsilon = 1e-12);
        assert_relative_eq!(n.trace(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_identical_sets_give_identity() {
        let points = vec![
            Point3d::new(0.3, 1.0, -2.0),
            Point3d::new(4.0, 0.0, 1.0),
            Point3d::new(-1.0, 2.5, 0.0),
            Point3d::new(2.0, -3.0, 5.0),
        ];
        let r = rotation_for(&points, &points);
        assert_relative_eq!(r, Matrix4::identity(), epsilon = 1e-6);
    }

    #[test]
    fn test_recovers_90_degrees_about_z() {
        let destination = vec![
            Point3d::new(0.0, 1.0, 0.0),
            Point3d::new(-1.0, 0.0, 0.0),
            Point3d::new(0.0, 0.0, 1.0),
        ];
        let r = rotation_for(&basis(), &destination);

        let mapped = r.transform_vector(&Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(mapped, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-3);
        assert_proper_rotation(&r);
    }

    #[test]
    fn test_recovers_90_degrees_about_y() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), PI / 2.0);
        let destination: Vec<Point3d> = basis().iter().map(|p| rotation * p).collect();
        let r = rotation_for(&basis(), &destination);

        assert_relative_eq!(r, rotation.to_homogeneous(), epsilon = 1e-3);
        // (1,0,0) -> (0,0,-1) under +90 degrees about Y
        let mapped = r.transform_vector(&Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(mapped, Vector3::new(0.0, 0.0, -1.0), epsilon = 1e-3);
    }

    #[test]
    fn test_half_turn_is_proper() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI);
        let source = vec![
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 2.0, 0.0),
            Point3d::new(0.0, 0.0, 3.0),
            Point3d::new(1.0, 1.0, 1.0),
        ];
        let destination: Vec<Point3d> = source.iter().map(|p| rotation * p).collect();

        let r = rotation_for(&source, &destination);
        assert_proper_rotation(&r);
    }

    #[test]
    fn test_collinear_is_proper() {
        let source: Vec<Point3d> = (0..5).map(|i| Point3d::new(i as f64, i as f64, 0.0)).collect();
        let destination: Vec<Point3d> = (0..5).map(|i| Point3d::new(0.0, 0.0, 2.0 * i as f64)).collect();

        let r = rotation_for(&source, &destination);
        assert_proper_rotation(&r);
        let mapped = r.transform_vector(&Vector3::new(1.0, 1.0, 0.0).normalize());
        assert_relative_eq!(mapped, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-3);
    }

    #[test]
    fn test_single_point_gives_identity() {
        let r = rotation_for(&[Point3d::new(1.0, 2.0, 3.0)], &[Point3d::new(-5.0, 0.0, 9.0)]);
        assert_eq!(r, Matrix4::identity());
    }

    #[test]
    fn test_zero_matrix_gives_identity_quaternion() {
        for solver in [EigenSolver::SymmetricEigen, EigenSolver::PowerIteration] {
            let params = RotationSolverParams::new().with_solver(solver);
            let q = dominant_eigenvector(&Matrix4::zeros(), &params);
            assert_eq!(q, Vector4::new(1.0, 0.0, 0.0, 0.0));
        }
    }

    #[test]
    fn test_elongated_set_reaches_optimum() {
        // Long thin object: the two largest key-matrix eigenvalues nearly coincide
        let source = vec![
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(20.0, 0.0, 0.0),
            Point3d::new(20.0, 1.0, 0.0),
            Point3d::new(0.0, 1.0, 1.0),
            Point3d::new(10.0, 0.0, 1.0),
        ];
        let axis = nalgebra::Unit::new_normalize(Vector3::new(1.0, 0.2, 0.1));

        for angle in [0.3, 1.0, 2.0, 3.0] {
            let rotation = UnitQuaternion::from_axis_angle(&axis, angle);
            let destination: Vec<Point3d> = source.iter().map(|p| rotation * p).collect();

            let r = rotation_for(&source, &destination);
            assert_relative_eq!(r, rotation.to_homogeneous(), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_power_iteration_matches_on_well_separated_spectrum() {
        let source = vec![
            Point3d::new(1.0, 0.0, 0.0),
            Point3d::new(0.0, 2.0, 0.0),
            Point3d::new(0.0, 0.0, 3.0),
            Point3d::new(1.0, 1.0, 1.0),
        ];
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.8);
        let destination: Vec<Point3d> = source.iter().map(|p| rotation * p).collect();

        let sc = compute_centroid(&source).unwrap();
        let dc = compute_centroid(&destination).unwrap();
        let params = RotationSolverParams::new().with_solver(EigenSolver::PowerIteration);
        let r = compute_optimal_rotation_with(&source, &destination, &sc, &dc, &params).unwrap();
        assert_relative_eq!(r, rotation.to_homogeneous(), epsilon = 1e-4);
    }

    #[test]
    fn test_solver_params_from_json() {
        let params: RotationSolverParams = serde_json::from_str(r#"{"solver": "power_iteration"}"#).unwrap();
        assert_eq!(params.solver, EigenSolver::PowerIteration);
        assert_eq!(params.max_iterations, 50);
    }

    #[test]
    fn test_quaternion_to_rotation_matrix_normalizes() {
        let r = quaternion_to_rotation_matrix(&Vector4::new(2.0, 0.0, 0.0, 2.0));
        let expected = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI / 2.0).to_homogeneous();
        assert_relative_eq!(r, expected, epsilon = 1e-12);
        assert_eq!(quaternion_to_rotation_matrix(&Vector4::zeros()), Matrix4::identity());
    }
}
