//! Uniform scale estimation

use crate::centroid::center;
use coalign_core::{Error, Point3d, Result};

/// Source spreads below this are treated as coincident points
pub const SPREAD_FLOOR: f64 = 1e-10;

/// Sum of squared distances from `centroid`
pub fn spread(points: &[Point3d], centroid: &Point3d) -> f64 {
    center(points, centroid).iter().map(|v| v.norm_squared()).sum()
}

/// `sqrt(Σ‖dest_centered‖² / Σ‖source_centered‖²)`, or 1 when the source has no spread
pub fn compute_uniform_scale(
    source: &[Point3d],
    destination: &[Point3d],
    source_centroid: &Point3d,
    destination_centroid: &Point3d,
) -> Result<f64> {
    if source.len() != destination.len() {
        return Err(Error::MismatchedCorrespondences {
            source_len: source.len(),
            destination_len: destination.len(),
        });
    }

    let source_spread = spread(source, source_centroid);
    if source_spread < SPREAD_FLOOR {
        tracing::debug!(source_spread, "source points coincide, defaulting scale to 1");
        return Ok(1.0);
    }

    Ok((spread(destination, destination_centroid) / source_spread).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::centroid::compute_centroid;
    use approx::assert_relative_eq;

    fn scale_for(source: &[Point3d], destination: &[Point3d]) -> f64 {
        compute_uniform_scale(
            source,
            destination,
            &compute_centroid(source).unwrap(),
            &compute_centroid(destination).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_doubled_spread() {
        let source = [Point3d::new(1.0, 0.0, 0.0), Point3d::new(0.0, 1.0, 0.0), Point3d::new(0.0, 0.0, 1.0)];
        let destination: Vec<Point3d> = source
            .iter()
            .map(|p| Point3d::new(2.0 * p.x + 5.0, 2.0 * p.y + 5.0, 2.0 * p.z + 5.0))
            .collect();
        assert_relative_eq!(scale_for(&source, &destination), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_source_defaults_to_one() {
        let source = [Point3d::new(2.0, 2.0, 2.0); 4];
        let destination = [
            Point3d::new(0.0, 0.0, 0.0),
            Point3d::new(9.0, 0.0, 0.0),
            Point3d::new(0.0, 9.0, 0.0),
            Point3d::new(0.0, 0.0, 9.0),
        ];
        let scale = scale_for(&source, &destination);
        assert!(scale.is_finite());
        assert_eq!(scale, 1.0);
    }

    #[test]
    fn test_collapsed_destination_gives_zero() {
        let source = [Point3d::new(0.0, 0.0, 0.0), Point3d::new(1.0, 0.0, 0.0)];
        let destination = [Point3d::new(3.0, 3.0, 3.0); 2];
        assert_eq!(scale_for(&source, &destination), 0.0);
    }
}
