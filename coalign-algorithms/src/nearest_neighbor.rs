//! Nearest neighbor search implementations

use coalign_core::{NearestNeighborSearch, Point3d};
use kiddo::SquaredEuclidean;
use nalgebra::Rotation3;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Leaf bucket size of `kiddo::KdTree<f64, 3>`. A full bucket whose items
/// all share the split coordinate cannot be split.
const BUCKET_SIZE: usize = 32;

/// Which spatial search backs correspondence estimation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// KD-tree, O(log M) per query
    #[default]
    KdTree,
    /// Linear scan, O(M) per query; exact for any point layout
    BruteForce,
}

impl SearchStrategy {
    /// Build the chosen index over `points`
    pub fn build(self, points: &[Point3d]) -> Box<dyn NearestNeighborSearch + Sync> {
        match self {
            SearchStrategy::KdTree => match KdTree::new(points) {
                Some(tree) => Box::new(tree),
                None => {
                    tracing::warn!(points = points.len(), "too many shared coordinates for a KD-tree, using brute force");
                    Box::new(BruteForceSearch::new(points))
                }
            },
            SearchStrategy::BruteForce => Box::new(BruteForceSearch::new(points)),
        }
    }
}

/// KD-Tree implementation for nearest neighbor search.
///
/// Points are stored in a fixed oblique frame so that axis-aligned grids and
/// planar scans do not pile up equal coordinates, and exact duplicates are
/// folded onto their first occurrence.
pub struct KdTree {
    tree: kiddo::KdTree<f64, 3>,
    frame: Rotation3<f64>,
    positions: Vec<Point3d>,
    indices: Vec<usize>,
}

impl KdTree {
    /// Index `points`, or `None` when too many of them still share one
    /// coordinate value for the tree to split its buckets.
    pub fn new(points: &[Point3d]) -> Option<Self> {
        let frame = index_frame();

        let mut seen = HashSet::with_capacity(points.len());
        let mut positions = Vec::with_capacity(points.len());
        let mut indices = Vec::with_capacity(points.len());
        for (idx, point) in points.iter().enumerate() {
            if seen.insert(position_key(point)) {
                positions.push(*point);
                indices.push(idx);
            }
        }

        let local: Vec<[f64; 3]> = positions
            .iter()
            .map(|p| {
                let q = frame * p;
                [q.x, q.y, q.z]
            })
            .collect();
        if max_axis_multiplicity(&local) >= BUCKET_SIZE {
            return None;
        }

        let mut tree: kiddo::KdTree<f64, 3> = kiddo::KdTree::with_capacity(local.len().max(1));
        for (item, coords) in local.iter().enumerate() {
            tree.add(coords, item as u64);
        }

        Some(Self {
            tree,
            frame,
            positions,
            indices,
        })
    }
}

impl NearestNeighborSearch for KdTree {
    fn find_nearest(&self, query: &Point3d) -> Option<(usize, f64)> {
        if self.positions.is_empty() {
            return None;
        }
        let q = self.frame * query;
        let nearest = self.tree.nearest_one::<SquaredEuclidean>(&[q.x, q.y, q.z]);
        let item = nearest.item as usize;

        // Report the distance in the caller's frame
        let position = self.positions.get(item)?;
        Some((*self.indices.get(item)?, (position - query).norm()))
    }
}

fn index_frame() -> Rotation3<f64> {
    Rotation3::from_euler_angles(0.4636476, 0.7297277, 0.2526803)
}

fn position_key(point: &Point3d) -> [u64; 3] {
    // Adding zero folds -0.0 onto 0.0
    [point.x, point.y, point.z].map(|v| (v + 0.0).to_bits())
}

/// Largest number of points sharing one coordinate value on any axis
fn max_axis_multiplicity(coords: &[[f64; 3]]) -> usize {
    (0..3)
        .map(|axis| {
            let mut counts: HashMap<u64, usize> = HashMap::with_capacity(coords.len());
            coords
                .iter()
                .map(|c| {
                    let count = counts.entry((c[axis] + 0.0).to_bits()).or_insert(0);
                    *count += 1;
                    *count
                })
                .max()
                .unwrap_or(0)
        })
        .max()
        .unwrap_or(0)
}

/// Simple brute force nearest neighbor search for small datasets
pub struct BruteForceSearch {
    points: Vec<Point3d>,
}

impl BruteForceSearch {
    pub fn new(points: &[Point3d]) -> Self {
        Self {
            points: points.to_vec(),
        }
    }
}

impl NearestNeighborSearch for BruteForceSearch {
    fn find_nearest(&self, query: &Point3d) -> Option<(usize, f64)> {
        // First minimum wins ties
        self.points
            .iter()
            .enumerate()
            .map(|(idx, point)| (idx, (point - query).norm()))
            .fold(None, |best: Option<(usize, f64)>, candidate| match best {
                Some(b) if b.1 <= candidate.1 => Some(b),
                _ => Some(candidate),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::prelude::*;

    fn random_points(count: usize, seed: u64) -> Vec<Point3d> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|_| {
                Point3d::new(
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                    rng.gen_range(-10.0..10.0),
                )
            })
            .collect()
    }

    fn assert_matches_brute_force(points: &[Point3d], queries: &[Point3d]) {
        let kdtree = KdTree::new(points).unwrap();
        let brute = BruteForceSearch::new(points);

        for query in queries {
            let (ki, kd) = kdtree.find_nearest(query).unwrap();
            let (bi, bd) = brute.find_nearest(query).unwrap();
            assert_eq!(ki, bi);
            assert_relative_eq!(kd, bd, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_kdtree_matches_brute_force() {
        assert_matches_brute_force(&random_points(500, 7), &random_points(50, 11));
    }

    #[test]
    fn test_kdtree_on_integer_grid() {
        let mut grid = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                for k in 0..10 {
                    grid.push(Point3d::new(i as f64, j as f64, k as f64));
                }
            }
        }
        let queries: Vec<Point3d> = random_points(50, 3)
            .into_iter()
            .map(|p| Point3d::new(4.5 + 0.45 * p.x, 4.5 + 0.45 * p.y, 4.5 + 0.45 * p.z))
            .collect();

        assert_matches_brute_force(&grid, &queries);
    }

    #[test]
    fn test_kdtree_on_planar_cloud() {
        let planar: Vec<Point3d> = random_points(500, 5)
            .into_iter()
            .map(|p| Point3d::new(p.x, p.y, 0.0))
            .collect();

        assert_matches_brute_force(&planar, &random_points(50, 13));
    }

    #[test]
    fn test_duplicates_resolve_to_first_index() {
        let mut points = vec![Point3d::new(1.0, 0.0, 0.0)];
        points.extend(std::iter::repeat(Point3d::origin()).take(40));

        let kdtree = KdTree::new(&points).unwrap();
        let (idx, distance) = kdtree.find_nearest(&Point3d::new(0.0, 0.1, 0.0)).unwrap();
        assert_eq!(idx, 1);
        assert_relative_eq!(distance, 0.1, epsilon = 1e-12);
        assert_eq!(kdtree.find_nearest(&Point3d::new(-0.0, 0.0, 0.0)), Some((1, 0.0)));
    }

    #[test]
    fn test_axis_multiplicity() {
        let mut coords = vec![[1.0, 2.0, 3.0]; 5];
        coords.push([1.0, -2.0, 3.5]);
        coords.push([-0.0, 0.0, 0.0]);
        coords.push([0.0, 0.0, 0.0]);
        assert_eq!(max_axis_multiplicity(&coords), 6);
        assert_eq!(max_axis_multiplicity(&[]), 0);
    }

    #[test]
    fn test_strategy_build_handles_degenerate_layouts() {
        let line: Vec<Point3d> = (0..100).map(|i| Point3d::new(i as f64, 0.0, 0.0)).collect();
        for search in [SearchStrategy::KdTree.build(&line), SearchStrategy::BruteForce.build(&line)] {
            let (idx, distance) = search.find_nearest(&Point3d::new(41.8, 0.0, 0.0)).unwrap();
            assert_eq!(idx, 42);
            assert_relative_eq!(distance, 0.2, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_empty_index() {
        let kdtree = KdTree::new(&[]).unwrap();
        assert!(kdtree.find_nearest(&Point3d::origin()).is_none());
        assert!(BruteForceSearch::new(&[]).find_nearest(&Point3d::origin()).is_none());
    }
}
