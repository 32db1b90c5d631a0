use rstar::{PointDistance, RTree, RTreeObject, AABB};

use crate::geometry::Vec3;

/// An entry in the R-tree spatial index, referencing a source by its index.
#[derive(Debug, Clone)]
pub struct SpatialEntry {
    /// Index into the indexed position slice.
    pub source_index: usize,
    pub position: Vec3,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f32; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position.to_array())
    }
}

impl PointDistance for SpatialEntry {
    fn distance_2(&self, point: &[f32; 3]) -> f32 {
        self.position.distance_squared_to(&Vec3::from_array(*point))
    }
}

/// Spatial index over source positions for radius queries.
pub struct SourceIndex {
    tree: RTree<SpatialEntry>,
}

impl SourceIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build the index from a list of positions.
    pub fn build(positions: &[Vec3]) -> Self {
        let entries = positions
            .iter()
            .enumerate()
            .map(|(source_index, &position)| SpatialEntry {
                source_index,
                position,
            })
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Whether at least one source lies at most `radius` away from `point`.
    pub fn any_within(&self, point: &Vec3, radius: f32) -> bool {
        self.tree
            .locate_within_distance(point.to_array(), radius * radius)
            .next()
            .is_some()
    }

    /// Number of entries in the index.
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl Default for SourceIndex {
    fn default() -> Self {
        Self::new()
    }
}
