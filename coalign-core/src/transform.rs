//! Similarity transforms and their persisted, decomposed form

use crate::point::{Point3d, Vector3d};
use nalgebra::{Matrix3, Matrix4, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Below this scale a transform is treated as collapsed and has no rotation to recover.
const SCALE_FLOOR: f64 = 1e-12;

/// A rotation, uniform scale and translation packed into one homogeneous matrix.
///
/// The matrix is always `T · S · R`: applied to a column vector it rotates
/// first, then scales, then translates. Values are created fresh for every
/// alignment request and never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityTransform {
    pub matrix: Matrix4<f64>,
}

impl SimilarityTransform {
    /// Create an identity transformation
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Create a translation transformation
    pub fn translation(translation: Vector3d) -> Self {
        Self {
            matrix: Matrix4::new_translation(&translation),
        }
    }

    /// Create a uniform scaling transformation
    pub fn uniform_scaling(scale: f64) -> Self {
        Self {
            matrix: Matrix4::new_scaling(scale),
        }
    }

    /// Create a rotation transformation from a quaternion
    pub fn rotation(rotation: UnitQuaternion<f64>) -> Self {
        Self {
            matrix: rotation.to_homogeneous(),
        }
    }

    /// Build `T · S · R` from a homogeneous rotation, a scale and a translation.
    ///
    /// Only the upper-left 3×3 block of `rotation` is read.
    pub fn from_parts(rotation: &Matrix4<f64>, scale: f64, translation: Vector3d) -> Self {
        let t = Matrix4::new_translation(&translation);
        let s = Matrix4::new_scaling(scale);
        let mut r = Matrix4::identity();
        r.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&rotation.fixed_view::<3, 3>(0, 0));

        Self { matrix: t * s * r }
    }

    /// Uniform scale factor, taken as the mean column norm of the linear block
    pub fn scale(&self) -> f64 {
        let block = self.linear();
        (block.column(0).norm() + block.column(1).norm() + block.column(2).norm()) / 3.0
    }

    /// Translation column of the matrix
    pub fn translation_vector(&self) -> Vector3d {
        Vector3::new(self.matrix[(0, 3)], self.matrix[(1, 3)], self.matrix[(2, 3)])
    }

    /// The 3×3 linear block (`scale · R`)
    pub fn linear(&self) -> Matrix3<f64> {
        self.matrix.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// Rotation block with the scale divided out, embedded as a 4×4 matrix.
    ///
    /// A collapsed (zero-scale) transform reports the identity rotation.
    pub fn rotation_matrix(&self) -> Matrix4<f64> {
        let scale = self.scale();
        let mut r = Matrix4::identity();
        if scale > SCALE_FLOOR {
            r.fixed_view_mut::<3, 3>(0, 0).copy_from(&(self.linear() / scale));
        }
        r
    }

    /// Apply the transformation to a point
    pub fn transform_point(&self, point: &Point3d) -> Point3d {
        let homogeneous = self.matrix * point.to_homogeneous();
        Point3d::from_homogeneous(homogeneous).unwrap_or(*point)
    }

    /// Apply the transformation to a vector (rotation and scale only)
    pub fn transform_vector(&self, vector: &Vector3d) -> Vector3d {
        self.linear() * vector
    }

    /// Compose this transformation with another; `other` is applied first
    pub fn compose(self, other: Self) -> Self {
        Self {
            matrix: self.matrix * other.matrix,
        }
    }

    /// Get the inverse transformation, `None` for a collapsed transform
    pub fn inverse(self) -> Option<Self> {
        self.matrix.try_inverse().map(|inv_matrix| Self {
            matrix: inv_matrix,
        })
    }

    /// Check if this is approximately the identity transformation
    pub fn is_identity(&self, epsilon: f64) -> bool {
        let identity = Matrix4::identity();
        (self.matrix - identity).norm() < epsilon
    }

    /// Decompose into the persisted position / Euler rotation / scale record
    pub fn to_transform(&self) -> Transform {
        let translation = self.translation_vector();
        let rotation = self.rotation_matrix().fixed_view::<3, 3>(0, 0).into_owned();

        Transform {
            position: [translation.x, translation.y, translation.z],
            rotation: euler_xyz_from_matrix(&rotation),
            scale: self.scale(),
        }
    }

    /// Rebuild the homogeneous matrix from a persisted record
    pub fn from_transform(transform: &Transform) -> Self {
        let [x, y, z] = transform.rotation;
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), x)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), y)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), z);

        Self::from_parts(
            &rotation.to_homogeneous(),
            transform.scale,
            Vector3::from(transform.position),
        )
    }
}

impl Default for SimilarityTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl std::ops::Mul for SimilarityTransform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(rhs)
    }
}

impl From<Matrix4<f64>> for SimilarityTransform {
    fn from(matrix: Matrix4<f64>) -> Self {
        Self { matrix }
    }
}

impl From<&Transform> for SimilarityTransform {
    fn from(transform: &Transform) -> Self {
        Self::from_transform(transform)
    }
}

/// Serializable view of a [`SimilarityTransform`], one per asset slot.
///
/// `rotation` holds Euler angles in radians, intrinsic `XYZ` order
/// (`R = Rx · Ry · Rz`), the convention the scene-graph consumer applies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f64; 3],
    pub rotation: [f64; 3],
    pub scale: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0; 3],
            scale: 1.0,
        }
    }
}

impl From<&SimilarityTransform> for Transform {
    fn from(transform: &SimilarityTransform) -> Self {
        transform.to_transform()
    }
}

fn euler_xyz_from_matrix(m: &Matrix3<f64>) -> [f64; 3] {
    let m13 = m[(0, 2)].clamp(-1.0, 1.0);
    let y = m13.asin();

    if m13.abs() < 0.999_999_9 {
        let x = (-m[(1, 2)]).atan2(m[(2, 2)]);
        let z = (-m[(0, 1)]).atan2(m[(0, 0)]);
        [x, y, z]
    } else {
        // Gimbal lock: fold the whole roll into X
        let x = m[(2, 1)].atan2(m[(1, 1)]);
        [x, y, 0.0]
    }
}
