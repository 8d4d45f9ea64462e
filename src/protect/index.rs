//! Weighted point index consumed by the protector.
//!
//! [`WeightedIndex`] is the seam to a weighted Delaunay-type triangulation:
//! insertion with hidden-point detection, removal, nearest power vertex, and
//! enumeration of finite vertices and edges. Every vertex carries a
//! [`BallContext`] payload.
//!
//! [`PowerIndex`] is the reference implementation shipped with the crate. It
//! is not a regular triangulation: its "edges" are all pairs of balls whose
//! bounding boxes overlap, which includes every pair of intersecting balls,
//! and a point is hidden only when its center coincides with a resident ball.

use std::cell::OnceCell;
use std::collections::HashMap;

use super::ball::{BallContext, BallId, WeightedPoint};
use crate::geom::bvh::Bvh;
use crate::geom::{BBox, Point3, Tolerance};

/// Outcome of [`WeightedIndex::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// A new vertex was created.
    Inserted(BallId),
    /// The point is dominated; the dominating vertex is returned.
    Hidden(BallId),
}

impl Insertion {
    #[must_use]
    pub const fn ball(self) -> BallId {
        match self {
            Self::Inserted(ball) | Self::Hidden(ball) => ball,
        }
    }

    #[must_use]
    pub const fn is_hidden(self) -> bool {
        matches!(self, Self::Hidden(_))
    }
}

/// Capabilities of a weighted Delaunay-type index.
pub trait WeightedIndex {
    /// Inserts a ball with a default context.
    fn insert(&mut self, point: WeightedPoint) -> Insertion;

    /// Removes a ball. Returns false if it was not present.
    fn remove(&mut self, ball: BallId) -> bool;

    /// Vertex minimizing the power distance to `p`, if any.
    fn nearest_power_vertex(&self, p: Point3) -> Option<BallId>;

    fn point(&self, ball: BallId) -> Option<WeightedPoint>;

    fn context(&self, ball: BallId) -> Option<&BallContext>;

    fn context_mut(&mut self, ball: BallId) -> Option<&mut BallContext>;

    fn number_of_vertices(&self) -> usize;

    /// Live vertices in ascending id order.
    fn finite_vertices(&self) -> Vec<BallId>;

    /// Vertex pairs `(a, b)` with `a < b`, sorted.
    fn finite_edges(&self) -> Vec<(BallId, BallId)>;

    fn contains(&self, ball: BallId) -> bool {
        self.point(ball).is_some()
    }
}

#[derive(Debug, Clone)]
struct Vertex {
    point: WeightedPoint,
    context: BallContext,
}

#[derive(Debug, Clone)]
struct Snapshot {
    ids: Vec<BallId>,
    bvh: Option<Bvh>,
    max_weight: f64,
}

/// Reference [`WeightedIndex`] backed by an arena, a coincidence hash and a
/// lazily rebuilt BVH over ball bounding boxes.
#[derive(Debug, Clone)]
pub struct PowerIndex {
    vertices: Vec<Option<Vertex>>,
    live: usize,
    coincident: CoincidenceHash,
    snapshot: OnceCell<Snapshot>,
}

impl PowerIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::with_tolerance(Tolerance::DEFAULT)
    }

    /// Centers closer than `tol` are treated as coincident.
    #[must_use]
    pub fn with_tolerance(tol: Tolerance) -> Self {
        Self {
            vertices: Vec::new(),
            live: 0,
            coincident: CoincidenceHash::new(tol.eps),
            snapshot: OnceCell::new(),
        }
    }

    /// Live balls with their contexts, in ascending id order.
    pub fn balls(&self) -> impl Iterator<Item = (BallId, WeightedPoint, &BallContext)> + '_ {
        self.vertices.iter().enumerate().filter_map(|(i, v)| {
            v.as_ref()
                .map(|v| (BallId(i as u32), v.point, &v.context))
        })
    }

    fn vertex(&self, ball: BallId) -> Option<&Vertex> {
        self.vertices.get(ball.index()).and_then(Option::as_ref)
    }

    fn snapshot(&self) -> &Snapshot {
        self.snapshot.get_or_init(|| {
            let mut ids = Vec::with_capacity(self.live);
            let mut bboxes = Vec::with_capacity(self.live);
            let mut max_weight = 0.0_f64;
            for (id, point, _) in self.balls() {
                ids.push(id);
                bboxes.push(BBox::around_sphere(point.center, point.radius()));
                max_weight = max_weight.max(point.weight);
            }
            let bvh = Bvh::build(&bboxes);
            Snapshot {
                ids,
                bvh,
                max_weight,
            }
        })
    }

    fn invalidate(&mut self) {
        self.snapshot.take();
    }
}

impl Default for PowerIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl WeightedIndex for PowerIndex {
    fn insert(&mut self, point: WeightedPoint) -> Insertion {
        if let Some(existing) = self.coincident.find(point.center) {
            return Insertion::Hidden(existing);
        }

        let id = BallId(self.vertices.len() as u32);
        self.vertices.push(Some(Vertex {
            point,
            context: BallContext::default(),
        }));
        self.coincident.insert(id, point.center);
        self.live += 1;
        self.invalidate();
        Insertion::Inserted(id)
    }

    fn remove(&mut self, ball: BallId) -> bool {
        let Some(slot) = self.vertices.get_mut(ball.index()) else {
            return false;
        };
        let Some(vertex) = slot.take() else {
            return false;
        };
        self.coincident.remove(ball, vertex.point.center);
        self.live -= 1;
        self.invalidate();
        true
    }

    fn nearest_power_vertex(&self, p: Point3) -> Option<BallId> {
        let snapshot = self.snapshot();
        let bvh = snapshot.bvh.as_ref()?;
        // Shift by the largest weight so the value never undercuts the box distance.
        let (prim, _) = bvh.nearest(p, |prim| {
            let point = self.vertex(snapshot.ids[prim])?.point;
            Some(point.power_distance(p) + snapshot.max_weight)
        })?;
        Some(snapshot.ids[prim])
    }

    fn point(&self, ball: BallId) -> Option<WeightedPoint> {
        self.vertex(ball).map(|v| v.point)
    }

    fn context(&self, ball: BallId) -> Option<&BallContext> {
        self.vertex(ball).map(|v| &v.context)
    }

    fn context_mut(&mut self, ball: BallId) -> Option<&mut BallContext> {
        self.vertices
            .get_mut(ball.index())
            .and_then(Option::as_mut)
            .map(|v| &mut v.context)
    }

    fn number_of_vertices(&self) -> usize {
        self.live
    }

    fn finite_vertices(&self) -> Vec<BallId> {
        self.balls().map(|(id, _, _)| id).collect()
    }

    fn finite_edges(&self) -> Vec<(BallId, BallId)> {
        let snapshot = self.snapshot();
        let Some(bvh) = snapshot.bvh.as_ref() else {
            return Vec::new();
        };

        // Snapshot ids ascend with primitive position, so pairs stay ordered.
        let mut edges: Vec<(BallId, BallId)> = bvh
            .overlapping_pairs()
            .into_iter()
            .map(|(i, j)| (snapshot.ids[i], snapshot.ids[j]))
            .collect();
        edges.sort_unstable();
        edges
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Coincidence hash
// ─────────────────────────────────────────────────────────────────────────────

/// Grid hash answering "is there a ball centered within `tolerance` of p".
///
/// Cells are twice the tolerance wide, so a match is always in the 3x3x3
/// neighborhood of the query cell.
#[derive(Debug, Clone)]
struct CoincidenceHash {
    cells: HashMap<(i64, i64, i64), Vec<(BallId, Point3)>>,
    cell_size: f64,
    tolerance: f64,
}

impl CoincidenceHash {
    fn new(tolerance: f64) -> Self {
        let tolerance = tolerance.max(Tolerance::ZERO_LENGTH.eps);
        Self {
            cells: HashMap::new(),
            cell_size: tolerance * 2.0,
            tolerance,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn cell_coords(&self, p: Point3) -> (i64, i64, i64) {
        let discretize = |v: f64| (v / self.cell_size).floor() as i64;
        (discretize(p.x), discretize(p.y), discretize(p.z))
    }

    fn find(&self, point: Point3) -> Option<BallId> {
        let (cx, cy, cz) = self.cell_coords(point);
        let mut best: Option<(BallId, f64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(entries) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &(id, center) in entries {
                        let d = center.distance_to(point);
                        if d <= self.tolerance && best.is_none_or(|(_, bd)| d < bd) {
                            best = Some((id, d));
                        }
                    }
                }
            }
        }
        best.map(|(id, _)| id)
    }

    fn insert(&mut self, id: BallId, center: Point3) {
        self.cells
            .entry(self.cell_coords(center))
            .or_default()
            .push((id, center));
    }

    fn remove(&mut self, id: BallId, center: Point3) {
        let key = self.cell_coords(center);
        if let Some(entries) = self.cells.get_mut(&key) {
            entries.retain(|&(other, _)| other != id);
            if entries.is_empty() {
                self.cells.remove(&key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(x: f64, y: f64, z: f64, weight: f64) -> WeightedPoint {
        WeightedPoint::new(Point3::new(x, y, z), weight)
    }

    #[test]
    fn test_insert_coincident_center_is_hidden() {
        let mut index = PowerIndex::new();
        let a = index.insert(ball(0.0, 0.0, 0.0, 1.0));
        let b = index.insert(ball(0.0, 0.0, 0.0, 4.0));

        assert!(!a.is_hidden());
        assert_eq!(b, Insertion::Hidden(a.ball()));
        assert_eq!(index.number_of_vertices(), 1);
    }

    #[test]
    fn test_removed_ids_are_not_reused() {
        let mut index = PowerIndex::new();
        let a = index.insert(ball(0.0, 0.0, 0.0, 1.0)).ball();
        assert!(index.remove(a));
        assert!(!index.remove(a));

        let b = index.insert(ball(0.0, 0.0, 0.0, 0.25)).ball();
        assert_ne!(a, b);
        assert!(!index.contains(a));
        assert!(index.contains(b));
    }

    #[test]
    fn test_finite_edges_cover_intersecting_pairs() {
        let mut index = PowerIndex::new();
        let a = index.insert(ball(0.0, 0.0, 0.0, 1.0)).ball();
        let b = index.insert(ball(1.5, 0.0, 0.0, 1.0)).ball();
        let c = index.insert(ball(10.0, 0.0, 0.0, 1.0)).ball();

        let edges = index.finite_edges();
        assert!(edges.contains(&(a, b)));
        assert!(!edges.iter().any(|&(x, y)| x == c || y == c));
    }

    #[test]
    fn test_nearest_power_vertex_prefers_heavier_ball() {
        let mut index = PowerIndex::new();
        let small = index.insert(ball(0.0, 0.0, 0.0, 0.01)).ball();
        let big = index.insert(ball(2.0, 0.0, 0.0, 9.0)).ball();

        // Closer to `small` in Euclidean terms, but deeper inside `big`.
        let query = Point3::new(0.5, 0.0, 0.0);
        assert_eq!(index.nearest_power_vertex(query), Some(big));
        assert_eq!(index.nearest_power_vertex(Point3::new(-3.0, 0.0, 0.0)), Some(small));
    }

    #[test]
    fn test_context_is_default_on_insert() {
        let mut index = PowerIndex::new();
        let a = index.insert(ball(1.0, 2.0, 3.0, 1.0)).ball();
        assert_eq!(index.context(a), Some(&BallContext::default()));

        if let Some(ctx) = index.context_mut(a) {
            ctx.is_corner = true;
        }
        assert!(index.context(a).is_some_and(|ctx| ctx.is_corner));
    }
}
