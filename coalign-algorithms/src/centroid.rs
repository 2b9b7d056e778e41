//! Centroid reduction

use coalign_core::{Error, Point3d, Result, Vector3d};

/// Component-wise mean of a non-empty point set
///
/// A single point is returned unchanged; an empty set is rejected.
pub fn compute_centroid(points: &[Point3d]) -> Result<Point3d> {
    if points.is_empty() {
        return Err(Error::EmptyPointSet);
    }

    let sum = points.iter().fold(Vector3d::zeros(), |acc, p| acc + p.coords);
    Ok(Point3d::from(sum / points.len() as f64))
}

/// Offsets of every point from `centroid`
pub(crate) fn center(points: &[Point3d], centroid: &Point3d) -> Vec<Vector3d> {
    points.iter().map(|p| p - centroid).collect()
}
