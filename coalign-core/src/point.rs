//! Point types and landmark correspondences

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with double precision coordinates
pub type Point3d = Point3<f64>;

/// A 3D vector with double precision components
pub type Vector3d = Vector3<f64>;

/// An index-linked pair of points believed to mark the same physical location
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub source: Point3d,
    pub destination: Point3d,
}

impl Correspondence {
    pub fn new(source: Point3d, destination: Point3d) -> Self {
        Self { source, destination }
    }
}

/// Split a correspondence set into parallel source and destination lists
pub fn split_correspondences(pairs: &[Correspondence]) -> (Vec<Point3d>, Vec<Point3d>) {
    pairs.iter().map(|c| (c.source, c.destination)).unzip()
}

/// Zip parallel point lists into correspondences, truncating to the shorter list
pub fn zip_correspondences(source: &[Point3d], destination: &[Point3d]) -> Vec<Correspondence> {
    source
        .iter()
        .zip(destination.iter())
        .map(|(s, d)| Correspondence::new(*s, *d))
        .collect()
}
