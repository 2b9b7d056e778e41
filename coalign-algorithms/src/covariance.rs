//! Cross-covariance between two index-corresponding point sets

use crate::centroid::center;
use coalign_core::{Error, Matrix3, Point3d, Result};

/// Build `H[i][j] = Σ source_centered[i] · destination_centered[j]`
///
/// Both sets are centered on their own centroid before accumulation.
pub fn cross_covariance(
    source: &[Point3d],
    destination: &[Point3d],
    source_centroid: &Point3d,
    destination_centroid: &Point3d,
) -> Result<Matrix3<f64>> {
    if source.len() != destination.len() {
        return Err(Error::MismatchedCorrespondences {
            source_len: source.len(),
            destination_len: destination.len(),
        });
    }

    let source_centered = center(source, source_centroid);
    let destination_centered = center(destination, destination_centroid);

    let mut h = Matrix3::zeros();
    for (s, d) in source_centered.iter().zip(destination_centered.iter()) {
        h += s * d.transpose();
    }

    Ok(h)
}
