use std::collections::HashMap;

use super::Point3;

/// Index of a mesh vertex.
pub type VertexId = usize;
/// Index of a half-edge in a [`HalfedgeMesh`].
pub type HalfedgeId = usize;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeomMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
}

impl GeomMesh {
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Returns true if any vertex position contains NaN or Inf values.
    #[must_use]
    pub fn has_invalid_vertices(&self) -> bool {
        self.positions
            .iter()
            .any(|p| !p[0].is_finite() || !p[1].is_finite() || !p[2].is_finite())
    }

    /// Returns true if all vertex indices are within bounds.
    #[must_use]
    pub fn has_valid_indices(&self) -> bool {
        let n = self.positions.len() as u32;
        self.indices.iter().all(|&i| i < n)
    }

    #[must_use]
    pub fn has_triangle_indices(&self) -> bool {
        self.indices.len() % 3 == 0
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.has_triangle_indices() {
            return Err("mesh indices are not a triangle list (len % 3 != 0)".to_string());
        }
        if self.has_invalid_vertices() {
            return Err("mesh has invalid vertex coordinates (NaN/Inf)".to_string());
        }
        if !self.has_valid_indices() {
            return Err("mesh has out-of-bounds vertex indices".to_string());
        }
        Ok(())
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Boundary traversal
// ─────────────────────────────────────────────────────────────────────────────

/// Traversal capabilities the polyline extractor needs from a surface mesh.
///
/// A border half-edge is one without an incident face; a border edge is an
/// edge with a border half-edge on either side.
pub trait BoundaryMesh {
    /// Prepares the border partition. Must be called before [`Self::border_edges`].
    fn normalize_border(&mut self);

    /// One canonical half-edge per border edge, in ascending id order.
    fn border_edges(&self) -> Vec<HalfedgeId>;

    fn is_border(&self, h: HalfedgeId) -> bool;

    fn opposite(&self, h: HalfedgeId) -> HalfedgeId;

    /// Vertex the half-edge points to.
    fn target(&self, h: HalfedgeId) -> VertexId;

    fn point(&self, v: VertexId) -> Point3;

    /// Half-edges pointing to `v`; one per incident edge.
    fn halfedges_around(&self, v: VertexId) -> &[HalfedgeId];

    fn source(&self, h: HalfedgeId) -> VertexId {
        self.target(self.opposite(h))
    }

    fn is_border_edge(&self, h: HalfedgeId) -> bool {
        self.is_border(h) || self.is_border(self.opposite(h))
    }

    /// Stable representative of the undirected edge of `h`.
    fn canonical(&self, h: HalfedgeId) -> HalfedgeId {
        h.min(self.opposite(h))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halfedge {
    /// Target vertex.
    pub vertex: VertexId,
    pub twin: HalfedgeId,
    /// `None` on the border.
    pub face: Option<usize>,
}

/// Half-edge connectivity of a triangle mesh with boundary.
///
/// Every interior half-edge gets a twin; edges used by a single triangle get a
/// face-less border twin.
#[derive(Debug, Clone)]
pub struct HalfedgeMesh {
    points: Vec<Point3>,
    halfedges: Vec<Halfedge>,
    incoming: Vec<Vec<HalfedgeId>>,
    border: Option<Vec<HalfedgeId>>,
}

impl HalfedgeMesh {
    /// Builds connectivity from an indexed triangle list.
    ///
    /// # Errors
    /// Returns an error for invalid meshes, triangles with repeated vertices,
    /// inconsistently oriented neighbors and edges shared by more than two
    /// triangles.
    pub fn from_mesh(mesh: &GeomMesh) -> Result<Self, String> {
        mesh.validate()?;

        let points: Vec<Point3> = mesh.positions.iter().copied().map(Point3::from).collect();
        let mut halfedges: Vec<Halfedge> = Vec::with_capacity(mesh.indices.len() * 2);
        let mut directed: HashMap<(VertexId, VertexId), HalfedgeId> = HashMap::new();
        let mut sources: Vec<VertexId> = Vec::with_capacity(mesh.indices.len());

        for (face, tri) in mesh.triangles().enumerate() {
            let [a, b, c] = tri.map(|i| i as VertexId);
            if a == b || b == c || c == a {
                return Err(format!("triangle {face} has repeated vertices"));
            }
            for (u, v) in [(a, b), (b, c), (c, a)] {
                if directed.contains_key(&(u, v)) {
                    return Err(format!(
                        "edge ({u}, {v}) is used twice in the same direction (non-manifold or flipped face)"
                    ));
                }
                directed.insert((u, v), halfedges.len());
                sources.push(u);
                halfedges.push(Halfedge {
                    vertex: v,
                    twin: usize::MAX,
                    face: Some(face),
                });
            }
        }

        let interior_count = halfedges.len();
        for h in 0..interior_count {
            if halfedges[h].twin != usize::MAX {
                continue;
            }
            let (u, v) = (sources[h], halfedges[h].vertex);
            if let Some(&twin) = directed.get(&(v, u)) {
                halfedges[h].twin = twin;
                halfedges[twin].twin = h;
            } else {
                let border = halfedges.len();
                halfedges.push(Halfedge {
                    vertex: u,
                    twin: h,
                    face: None,
                });
                halfedges[h].twin = border;
            }
        }

        let mut incoming = vec![Vec::new(); points.len()];
        for (h, he) in halfedges.iter().enumerate() {
            incoming[he.vertex].push(h);
        }

        Ok(Self {
            points,
            halfedges,
            incoming,
            border: None,
        })
    }

    #[must_use]
    pub fn halfedge_count(&self) -> usize {
        self.halfedges.len()
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn halfedge(&self, h: HalfedgeId) -> Halfedge {
        self.halfedges[h]
    }

    fn collect_border_edges(&self) -> Vec<HalfedgeId> {
        (0..self.halfedges.len())
            .filter(|&h| self.canonical(h) == h && self.is_border_edge(h))
            .collect()
    }
}

impl BoundaryMesh for HalfedgeMesh {
    fn normalize_border(&mut self) {
        self.border = Some(self.collect_border_edges());
    }

    fn border_edges(&self) -> Vec<HalfedgeId> {
        match &self.border {
            Some(border) => border.clone(),
            None => self.collect_border_edges(),
        }
    }

    fn is_border(&self, h: HalfedgeId) -> bool {
        self.halfedges[h].face.is_none()
    }

    fn opposite(&self, h: HalfedgeId) -> HalfedgeId {
        self.halfedges[h].twin
    }

    fn target(&self, h: HalfedgeId) -> VertexId {
        self.halfedges[h].vertex
    }

    fn point(&self, v: VertexId) -> Point3 {
        self.points[v]
    }

    fn halfedges_around(&self, v: VertexId) -> &[HalfedgeId] {
        &self.incoming[v]
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Test and scenario meshes
// ─────────────────────────────────────────────────────────────────────────────

/// Flat `nx` x `ny` grid of square cells in the XY plane, two triangles per cell.
#[must_use]
pub fn planar_grid(nx: usize, ny: usize, cell: f64) -> GeomMesh {
    let nx = nx.max(1);
    let ny = ny.max(1);
    let stride = nx + 1;
    let mut positions = Vec::with_capacity(stride * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            positions.push([i as f64 * cell, j as f64 * cell, 0.0]);
        }
    }

    let mut indices = Vec::with_capacity(nx * ny * 6);
    for j in 0..ny {
        for i in 0..nx {
            let i0 = (j * stride + i) as u32;
            let i1 = i0 + 1;
            let i2 = i0 + stride as u32;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i1, i3]);
            indices.extend_from_slice(&[i0, i3, i2]);
        }
    }

    GeomMesh::new(positions, indices)
}

/// Triangle fan over a regular polygon: a disk whose border is a single loop.
#[must_use]
pub fn polygon_fan(center: Point3, radius: f64, segments: usize) -> GeomMesh {
    let segments = segments.max(3);
    let mut positions = vec![center.to_array()];
    for k in 0..segments {
        let angle = std::f64::consts::TAU * k as f64 / segments as f64;
        positions.push([
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
            center.z,
        ]);
    }

    let mut indices = Vec::with_capacity(segments * 3);
    for k in 0..segments {
        let a = 1 + k as u32;
        let b = 1 + ((k + 1) % segments) as u32;
        indices.extend_from_slice(&[0, a, b]);
    }

    GeomMesh::new(positions, indices)
}

/// Axis-aligned cube of edge `size` with the top (+Z) face removed.
#[must_use]
pub fn open_box(size: f64) -> GeomMesh {
    let s = size;
    let positions = vec![
        [0.0, 0.0, 0.0],
        [s, 0.0, 0.0],
        [s, s, 0.0],
        [0.0, s, 0.0],
        [0.0, 0.0, s],
        [s, 0.0, s],
        [s, s, s],
        [0.0, s, s],
    ];
    #[rustfmt::skip]
    let indices = vec![
        // bottom
        0, 2, 1, 0, 3, 2,
        // front (y = 0)
        0, 1, 5, 0, 5, 4,
        // right (x = s)
        1, 2, 6, 1, 6, 5,
        // back (y = s)
        2, 3, 7, 2, 7, 6,
        // left (x = 0)
        3, 0, 4, 3, 4, 7,
    ];
    GeomMesh::new(positions, indices)
}
