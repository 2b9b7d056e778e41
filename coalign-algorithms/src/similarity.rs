//! Composition of rotation, scale and translation into one similarity transform

use coalign_core::{Matrix4, Point3d, SimilarityTransform};

/// Compose `M = T · S · R` with `t = destination_centroid − scale · R · source_centroid`.
///
/// The translation lands the rotated, scaled source centroid exactly on the
/// destination centroid. The order is fixed: rotate, then scale, then translate.
pub fn compose_similarity(
    rotation: &Matrix4<f64>,
    scale: f64,
    source_centroid: &Point3d,
    destination_centroid: &Point3d,
) -> SimilarityTransform {
    let rotated_centroid = rotation.transform_point(source_centroid);
    let translation = destination_centroid.coords - rotated_centroid.coords * scale;

    SimilarityTransform::from_parts(rotation, scale, translation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use coalign_core::{UnitQuaternion, Vector3};
    use std::f64::consts::PI;

    #[test]
    fn test_centroid_maps_onto_centroid() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI / 3.0).to_homogeneous();
        let source_centroid = Point3d::new(1.0, 2.0, 3.0);
        let destination_centroid = Point3d::new(-4.0, 0.5, 10.0);

        let transform = compose_similarity(&rotation, 2.5, &source_centroid, &destination_centroid);
        assert_relative_eq!(transform.transform_point(&source_centroid), destination_centroid, epsilon = 1e-10);
    }

    #[test]
    fn test_order_is_rotate_scale_translate() {
        let rotation = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI / 2.0).to_homogeneous();
        let transform = compose_similarity(&rotation, 2.0, &Point3d::origin(), &Point3d::new(0.0, 0.0, 1.0));

        let expected = Matrix4::new_translation(&Vector3::new(0.0, 0.0, 1.0))
            * Matrix4::new_scaling(2.0)
            * rotation;
        assert_relative_eq!(transform.matrix, expected, epsilon = 1e-12);

        // (1,0,0) -> rotate (0,1,0) -> scale (0,2,0) -> translate (0,2,1)
        let mapped = transform.transform_point(&Point3d::new(1.0, 0.0, 0.0));
        assert_relative_eq!(mapped, Point3d::new(0.0, 2.0, 1.0), epsilon = 1e-12);
    }
}
