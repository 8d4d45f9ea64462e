mod core;
pub(crate) mod bvh;
mod mesh;

pub use core::{BBox, Point3, Tolerance, Vec3};
pub use mesh::{
    BoundaryMesh, GeomMesh, Halfedge, HalfedgeId, HalfedgeMesh, VertexId,
    open_box, planar_grid, polygon_fan,
};
