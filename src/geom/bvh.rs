//! Static bounding volume hierarchy over axis-aligned boxes.
//!
//! Built once from a slice of boxes and queried by position in that slice.
//! The weighted index rebuilds one per snapshot and uses it for overlap pairs
//! and power-nearest lookups.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use super::{BBox, Point3};

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf { bbox: BBox, first: u32, len: u32 },
    Split { bbox: BBox, left: u32, right: u32 },
}

impl Node {
    const fn bbox(&self) -> BBox {
        match *self {
            Node::Leaf { bbox, .. } | Node::Split { bbox, .. } => bbox,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Bvh {
    nodes: Vec<Node>,
    /// Primitive positions, permuted so every leaf owns a contiguous run.
    order: Vec<u32>,
    boxes: Vec<BBox>,
}

impl Bvh {
    const LEAF_SIZE: usize = 4;

    /// `None` when there is nothing to index.
    #[must_use]
    pub(crate) fn build(boxes: &[BBox]) -> Option<Self> {
        Self::build_with_leaf_size(boxes, Self::LEAF_SIZE)
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn build_with_leaf_size(boxes: &[BBox], leaf_size: usize) -> Option<Self> {
        if boxes.is_empty() {
            return None;
        }
        let mut bvh = Self {
            nodes: Vec::with_capacity(boxes.len() * 2),
            order: (0..boxes.len() as u32).collect(),
            boxes: boxes.to_vec(),
        };
        bvh.split(0, boxes.len(), leaf_size.max(1));
        Some(bvh)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn split(&mut self, first: usize, end: usize, leaf_size: usize) -> u32 {
        let bbox = self.order[first + 1..end]
            .iter()
            .fold(self.boxes[self.order[first] as usize], |acc, &i| {
                acc.union(self.boxes[i as usize])
            });
        let slot = self.nodes.len();
        self.nodes.push(Node::Leaf {
            bbox,
            first: first as u32,
            len: (end - first) as u32,
        });
        if end - first <= leaf_size {
            return slot as u32;
        }

        // Median split along the longest side of the node box.
        let extent = bbox.max - bbox.min;
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };
        let mid = first + (end - first) / 2;
        let boxes = &self.boxes;
        self.order[first..end].select_nth_unstable_by(mid - first, |&a, &b| {
            let ca = boxes[a as usize].center().to_array()[axis];
            let cb = boxes[b as usize].center().to_array()[axis];
            ca.total_cmp(&cb)
        });

        let left = self.split(first, mid, leaf_size);
        let right = self.split(mid, end, leaf_size);
        self.nodes[slot] = Node::Split { bbox, left, right };
        slot as u32
    }

    fn leaf_items(&self, first: u32, len: u32) -> &[u32] {
        &self.order[first as usize..(first + len) as usize]
    }

    /// Every pair `(i, j)`, `i < j`, of primitives whose boxes overlap.
    /// Unordered; callers sort when they need a stable order.
    pub(crate) fn overlapping_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        let mut stack = vec![(0u32, 0u32)];
        while let Some((a, b)) = stack.pop() {
            let (na, nb) = (self.nodes[a as usize], self.nodes[b as usize]);
            if a != b && !na.bbox().intersects(nb.bbox()) {
                continue;
            }
            match (na, nb) {
                (Node::Split { left, right, .. }, _) if a == b => {
                    stack.extend([(left, left), (right, right), (left, right)]);
                }
                (Node::Leaf { first, len, .. }, _) if a == b => {
                    let items = self.leaf_items(first, len);
                    for (k, &i) in items.iter().enumerate() {
                        for &j in &items[k + 1..] {
                            self.push_if_overlapping(&mut pairs, i, j);
                        }
                    }
                }
                (Node::Leaf { first: fa, len: la, .. }, Node::Leaf { first: fb, len: lb, .. }) => {
                    for &i in self.leaf_items(fa, la) {
                        for &j in self.leaf_items(fb, lb) {
                            self.push_if_overlapping(&mut pairs, i, j);
                        }
                    }
                }
                (Node::Split { left, right, .. }, Node::Leaf { .. }) => {
                    stack.extend([(left, b), (right, b)]);
                }
                (_, Node::Split { left, right, .. }) => {
                    stack.extend([(a, left), (a, right)]);
                }
            }
        }
        pairs
    }

    fn push_if_overlapping(&self, pairs: &mut Vec<(usize, usize)>, i: u32, j: u32) {
        let (i, j) = (i.min(j) as usize, i.max(j) as usize);
        if self.boxes[i].intersects(self.boxes[j]) {
            pairs.push((i, j));
        }
    }

    /// Best-first search for the primitive with the smallest `cost`.
    ///
    /// `cost` must never undercut the squared distance from `point` to the
    /// primitive's box. Equal costs resolve to the lowest primitive index.
    pub(crate) fn nearest<F>(&self, point: Point3, mut cost: F) -> Option<(usize, f64)>
    where
        F: FnMut(usize) -> Option<f64>,
    {
        let mut best: Option<(usize, f64)> = None;
        let mut heap = BinaryHeap::new();
        heap.push(Reverse(Visit {
            bound: self.nodes[0].bbox().distance_squared_to_point(point),
            node: 0,
        }));

        while let Some(Reverse(Visit { bound, node })) = heap.pop() {
            if best.is_some_and(|(_, c)| bound > c) {
                break;
            }
            match self.nodes[node as usize] {
                Node::Leaf { first, len, .. } => {
                    for &prim in self.leaf_items(first, len) {
                        let prim = prim as usize;
                        let Some(c) = cost(prim).filter(|c| c.is_finite()) else {
                            continue;
                        };
                        let better = match best {
                            None => true,
                            Some((bp, bc)) => c < bc || (c == bc && prim < bp),
                        };
                        if better {
                            best = Some((prim, c));
                        }
                    }
                }
                Node::Split { left, right, .. } => {
                    for child in [left, right] {
                        heap.push(Reverse(Visit {
                            bound: self.nodes[child as usize].bbox().distance_squared_to_point(point),
                            node: child,
                        }));
                    }
                }
            }
        }
        best
    }
}

#[derive(Debug, Clone, Copy)]
struct Visit {
    bound: f64,
    node: u32,
}

impl PartialEq for Visit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Visit {}

impl PartialOrd for Visit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Visit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bound
            .total_cmp(&other.bound)
            .then_with(|| self.node.cmp(&other.node))
    }
}
