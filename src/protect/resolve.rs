//! Ball separation: shrink balls of non-adjacent polylines until none overlap.

use std::collections::{BTreeSet, HashMap};

use log::debug;

use super::ball::{BallContext, BallId, PolylineId, WeightedPoint};
use super::cover::CoverSpan;
use super::error::{ProtectError, ProtectResult};
use super::index::WeightedIndex;
use super::protector::Protector;

/// Plain-data view of one ball, enough to decide a conflict without touching
/// the index or the registry.
#[derive(Debug, Clone)]
struct Probe {
    point: WeightedPoint,
    polyline: PolylineId,
    is_corner: bool,
    /// Own polyline plus, for a corner, every polyline registered there.
    polylines: BTreeSet<PolylineId>,
}

impl Probe {
    fn conflicts_with(&self, other: &Self) -> bool {
        if !self.point.intersects(other.point) {
            return false;
        }
        if !self.is_corner && !other.is_corner {
            return self.polyline != other.polyline;
        }
        self.polylines.is_disjoint(&other.polylines)
    }
}

#[cfg(feature = "parallel")]
fn first_conflict(
    edges: &[(BallId, BallId)],
    probes: &HashMap<BallId, Probe>,
) -> Option<(BallId, BallId)> {
    use rayon::prelude::*;
    edges
        .par_iter()
        .find_first(|&&(a, b)| edge_conflicts(probes, a, b))
        .copied()
}

#[cfg(not(feature = "parallel"))]
fn first_conflict(
    edges: &[(BallId, BallId)],
    probes: &HashMap<BallId, Probe>,
) -> Option<(BallId, BallId)> {
    edges
        .iter()
        .find(|&&(a, b)| edge_conflicts(probes, a, b))
        .copied()
}

fn edge_conflicts(probes: &HashMap<BallId, Probe>, a: BallId, b: BallId) -> bool {
    match (probes.get(&a), probes.get(&b)) {
        (Some(pa), Some(pb)) => pa.conflicts_with(pb),
        _ => false,
    }
}

impl<I: WeightedIndex + ?Sized> Protector<'_, I> {
    /// Shrinks balls until no two balls of non-adjacent polylines intersect.
    ///
    /// Each pass scans the finite edges of the index in order and refines the
    /// heavier ball of the first conflicting pair (the second one on ties),
    /// then starts over. Returns the number of restarts.
    ///
    /// # Errors
    /// `NonConvergence` once `max_restarts` passes have mutated the index
    /// and a conflict remains; `InconsistentRegistry` if a refinement leaves
    /// a stale reference behind.
    pub fn separate_balls(&mut self) -> ProtectResult<usize> {
        let mut restarts = 0;
        while let Some((a, b)) = self.find_conflict() {
            if restarts >= self.options.max_restarts {
                self.diagnostics.restarts = restarts;
                return Err(ProtectError::NonConvergence { restarts, a, b });
            }
            self.diagnostics.conflicts += 1;

            let (Some(pa), Some(pb)) = (self.index.point(a), self.index.point(b)) else {
                return Err(ProtectError::InconsistentRegistry {
                    ball: a,
                    reason: "conflicting edge references a missing ball".to_string(),
                });
            };
            let heavier = if pa.weight > pb.weight { a } else { b };
            debug!(
                "conflict {a} (r={:.6}) / {b} (r={:.6}); refining {heavier}",
                pa.radius(),
                pb.radius()
            );

            self.refine_ball(heavier)?;
            restarts += 1;
        }
        self.diagnostics.restarts = restarts;
        Ok(restarts)
    }

    /// True if `a` and `b` overlap while belonging to polylines that do not
    /// meet at a common corner.
    #[must_use]
    pub fn non_adjacent_but_intersect(&self, a: BallId, b: BallId) -> bool {
        match (self.probe(a), self.probe(b)) {
            (Some(pa), Some(pb)) => pa.conflicts_with(&pb),
            _ => false,
        }
    }

    /// First conflicting finite edge, in edge order.
    #[must_use]
    pub fn find_conflict(&self) -> Option<(BallId, BallId)> {
        let edges = self.index.finite_edges();
        if edges.is_empty() {
            return None;
        }
        let probes: HashMap<BallId, Probe> = self
            .index
            .finite_vertices()
            .into_iter()
            .filter_map(|ball| self.probe(ball).map(|probe| (ball, probe)))
            .collect();
        first_conflict(&edges, &probes)
    }

    fn probe(&self, ball: BallId) -> Option<Probe> {
        let point = self.index.point(ball)?;
        let context = self.index.context(ball)?;
        Some(Probe {
            point,
            polyline: context.polyline,
            is_corner: context.is_corner,
            polylines: self.registry.polylines_at(ball, context.polyline),
        })
    }

    /// Replaces `ball` by a smaller ball at the same center.
    ///
    /// A corner is divided by the corner shrink factor and every non-corner
    /// ball next to it along its polylines is refined as well; an interior
    /// ball is divided by the interior shrink factor. Returns the new id.
    ///
    /// # Errors
    /// `InconsistentRegistry` if `ball` is not in the index, or (in debug
    /// builds) if the registry no longer matches the index afterwards.
    pub fn refine_ball(&mut self, ball: BallId) -> ProtectResult<BallId> {
        let Some(context) = self.index.context(ball).copied() else {
            return Err(ProtectError::InconsistentRegistry {
                ball,
                reason: "refined ball is not in the index".to_string(),
            });
        };
        if !context.is_corner {
            return self.refine_interior(ball);
        }

        let refined = self.replace_ball(ball, self.options.corner_shrink_factor)?;
        self.diagnostics.corner_refinements += 1;

        // A polyline passing through keeps its neighbors in the context.
        let neighbors: Vec<BallId> = self
            .registry
            .links(refined)
            .iter()
            .filter_map(|link| link.neighbor)
            .chain([context.pred, context.succ].into_iter().flatten())
            .collect();
        for neighbor in neighbors {
            // Already refined through another link when it is gone.
            if neighbor != refined && self.index.context(neighbor).is_some_and(|c| !c.is_corner) {
                self.refine_interior(neighbor)?;
            }
        }

        if cfg!(debug_assertions) {
            self.registry.verify(&*self.index)?;
        }
        Ok(refined)
    }

    fn refine_interior(&mut self, ball: BallId) -> ProtectResult<BallId> {
        let refined = self.replace_ball(ball, self.options.interior_shrink_factor)?;
        self.diagnostics.interior_refinements += 1;
        if self.options.recover_gaps {
            self.recover_gaps_around(refined)?;
        }
        Ok(refined)
    }

    /// Removes `old`, inserts it again with its weight divided by `factor`,
    /// and moves every reference to `old` over to the new ball.
    fn replace_ball(&mut self, old: BallId, factor: f64) -> ProtectResult<BallId> {
        let (Some(point), Some(context)) = (self.index.point(old), self.index.context(old).copied())
        else {
            return Err(ProtectError::InconsistentRegistry {
                ball: old,
                reason: "refined ball is not in the index".to_string(),
            });
        };
        let neighbors: Vec<BallId> = self
            .registry
            .links(old)
            .iter()
            .filter_map(|link| link.neighbor)
            .collect();

        self.index.remove(old);
        let shrunk = WeightedPoint::new(point.center, point.weight / factor);
        let insertion = self.index.insert(shrunk);
        let new = insertion.ball();
        if insertion.is_hidden() {
            self.record_hidden(point.center, new);
            if context.is_corner {
                self.promote_to_corner(new);
            }
        } else {
            self.set_context(new, context);
        }
        debug!(
            "refined {old} -> {new}: weight {:.6} -> {:.6}",
            point.weight, shrunk.weight
        );

        self.relink(old, new, &context, &neighbors);
        self.registry.reassign(old, new);
        self.registry.ensure_released(old)?;
        Ok(new)
    }

    /// Redirects chain links, registry neighbors and chain heads from `old`
    /// to `new`.
    fn relink(&mut self, old: BallId, new: BallId, context: &BallContext, neighbors: &[BallId]) {
        let mut candidates: Vec<BallId> = [context.pred, context.succ, Some(new)]
            .into_iter()
            .flatten()
            .chain(neighbors.iter().copied())
            .filter(|&ball| ball != old)
            .collect();
        candidates.sort_unstable();
        candidates.dedup();

        for ball in candidates {
            self.update_context(ball, |c| {
                c.retarget(old, new);
            });
        }
        self.registry.retarget_neighbors(old, new);
        for chain in &mut self.chains {
            if chain.head == Some(old) {
                chain.head = Some(new);
            }
        }
    }

    /// Re-covers the stretches between `ball` and its chain neighbors when
    /// their spheres no longer touch.
    fn recover_gaps_around(&mut self, ball: BallId) -> ProtectResult<()> {
        let (Some(point), Some(context)) = (self.index.point(ball), self.index.context(ball).copied())
        else {
            return Ok(());
        };
        let radius = point.radius();

        if let Some(pred) = context.pred.filter(|&p| p != ball)
            && let Some(pred_point) = self.index.point(pred)
            && !pred_point.intersects(point)
        {
            let span = CoverSpan::new(context.polyline, pred, ball)
                .alpha(radius)
                .radius_hints(pred_point.radius(), radius);
            self.cover_span(span)?;
        }

        if let Some(succ) = context.succ.filter(|&s| s != ball)
            && let Some(succ_point) = self.index.point(succ)
            && !succ_point.intersects(point)
        {
            let span = CoverSpan::new(context.polyline, ball, succ)
                .alpha(radius)
                .radius_hints(radius, succ_point.radius());
            self.cover_span(span)?;
        }
        Ok(())
    }
}
