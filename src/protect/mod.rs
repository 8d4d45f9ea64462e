//! Protecting balls along the border curves of a surface mesh.
//!
//! The pipeline runs in four steps:
//!
//! 1. [`extract_polylines`] splits the mesh border into open polylines
//!    between corners and closed cycles.
//! 2. [`Protector::cover`] places equally spaced weighted balls along every
//!    polyline and registers the corner balls in a [`CornerRegistry`].
//! 3. [`Protector::separate_balls`] shrinks balls until no two balls of
//!    polylines that do not share a corner intersect.
//! 4. The registry is checked against the index and a [`ProtectReport`] is
//!    returned.
//!
//! # Example
//!
//! ```ignore
//! use curve_protect::geom::{HalfedgeMesh, planar_grid};
//! use curve_protect::protect::{PowerIndex, protect_boundary_curves};
//!
//! let mut mesh = HalfedgeMesh::from_mesh(&planar_grid(4, 4, 1.0))?;
//! let mut index = PowerIndex::new();
//! let report = protect_boundary_curves(&mut index, &mut mesh, 0.5)?;
//! println!("{}", report.diagnostics.summary());
//! ```

mod ball;
mod cover;
mod diagnostics;
mod error;
mod index;
mod metrics;
mod options;
mod polyline;
mod protector;
mod registry;
mod resolve;

#[cfg(test)]
mod tests;

use log::info;

use crate::geom::{BoundaryMesh, GeomMesh, HalfedgeMesh, Tolerance};

pub use ball::{BallContext, BallId, PolylineId, PolylinePosition, WeightedPoint};
pub use cover::{CoverSpan, ball_weight, subdivision};
pub use diagnostics::{HiddenBall, ProtectDiagnostics};
pub use error::{ProtectError, ProtectResult};
pub use index::{Insertion, PowerIndex, WeightedIndex};
pub use metrics::{ProtectMetrics, ProtectTimingReport, TimingBucket};
pub use options::{ExtractOptions, ProtectOptions};
pub use polyline::{ExtractionStats, Polyline, PolylineSet, extract_polylines};
pub use protector::{ChainHead, Protector};
pub use registry::{ChainEnd, CornerLink, CornerRegistry};

/// Everything a protection run leaves behind besides the balls in the index.
#[derive(Debug, Clone)]
pub struct ProtectReport {
    pub polylines: Vec<Polyline>,
    pub registry: CornerRegistry,
    /// Ball ids of every polyline in chain order, indexed by polyline id.
    pub chains: Vec<Vec<BallId>>,
    pub diagnostics: ProtectDiagnostics,
}

impl ProtectReport {
    #[must_use]
    pub fn corner_count(&self) -> usize {
        self.registry.corner_count()
    }
}

/// Protects the border curves of `mesh` with balls of target size
/// `target_ball_size`, inserting them into `index`.
///
/// # Errors
/// See [`protect_boundary_curves_with_options`].
pub fn protect_boundary_curves<I, M>(
    index: &mut I,
    mesh: &mut M,
    target_ball_size: f64,
) -> ProtectResult<ProtectReport>
where
    I: WeightedIndex + ?Sized,
    M: BoundaryMesh + ?Sized,
{
    protect_boundary_curves_with_options(index, mesh, &ProtectOptions::new(target_ball_size))
}

/// Like [`protect_boundary_curves`], with every knob exposed.
///
/// # Errors
/// - `InvalidBallSize` for a non-positive size or unusable shrink factors.
/// - `NonConvergence` when separation exceeds `max_restarts`.
/// - `InconsistentRegistry` when the corner registry does not match the index.
pub fn protect_boundary_curves_with_options<I, M>(
    index: &mut I,
    mesh: &mut M,
    options: &ProtectOptions,
) -> ProtectResult<ProtectReport>
where
    I: WeightedIndex + ?Sized,
    M: BoundaryMesh + ?Sized,
{
    options.validate()?;

    let mut metrics = ProtectMetrics::default();
    metrics.begin();

    let set = metrics.time(TimingBucket::Extraction, || {
        extract_polylines(mesh, &options.extract)
    });
    let stats = set.stats;
    if set.is_empty() {
        info!("mesh has no border curves");
    }
    info!("border curves: {}", set.len());
    info!("corners: {}", stats.corner_vertices);
    info!("border vertices: {}", stats.border_vertices);
    info!("cycles: {}", stats.cycles);
    info!("polylines: {}", stats.polylines);

    let mut protector = Protector::new(index, set.polylines, *options);
    {
        let diagnostics = protector.diagnostics_mut();
        diagnostics.corner_vertices = stats.corner_vertices;
        diagnostics.border_vertices = stats.border_vertices;
        diagnostics.polylines = stats.polylines;
        diagnostics.cycles = stats.cycles;
        if stats.dangling_vertices > 0 {
            diagnostics.add_warning(format!(
                "{} border vertices have a single border edge",
                stats.dangling_vertices
            ));
        }
    }

    let placed = metrics.time(TimingBucket::Cover, || protector.cover_all());
    info!("protecting balls placed: {placed}");

    metrics.time(TimingBucket::Resolve, || protector.separate_balls())?;
    metrics.time(TimingBucket::Verification, || protector.verify())?;

    let chains: Vec<Vec<BallId>> = (0..protector.polylines().len())
        .map(|id| protector.chain(id))
        .collect();
    let protecting_balls = protector.index().number_of_vertices();
    let corner_balls = protector.registry().corner_count();

    let (polylines, registry, mut diagnostics) = protector.finish();
    diagnostics.protecting_balls = protecting_balls;
    diagnostics.corner_balls = corner_balls;
    diagnostics.timing = metrics.end();

    info!("protecting balls: {protecting_balls}");
    info!("corner balls: {corner_balls}");
    info!("hidden balls: {}", diagnostics.hidden_balls.len());

    Ok(ProtectReport {
        polylines,
        registry,
        chains,
        diagnostics,
    })
}

/// Builds half-edge connectivity for `mesh` and protects its border.
///
/// # Errors
/// `InvalidMesh` if the triangle list cannot be turned into a manifold
/// half-edge mesh; otherwise as [`protect_boundary_curves_with_options`].
pub fn protect_mesh<I>(
    index: &mut I,
    mesh: &GeomMesh,
    options: &ProtectOptions,
) -> ProtectResult<ProtectReport>
where
    I: WeightedIndex + ?Sized,
{
    let mut halfedges = HalfedgeMesh::from_mesh(mesh).map_err(ProtectError::InvalidMesh)?;
    protect_boundary_curves_with_options(index, &mut halfedges, options)
}

/// Reference index whose coincidence tolerance follows `options`.
#[must_use]
pub fn power_index_for(options: &ProtectOptions) -> PowerIndex {
    PowerIndex::with_tolerance(Tolerance::new(options.tolerance))
}
