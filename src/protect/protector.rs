//! Owner of the protection state for one run.
//!
//! A [`Protector`] borrows the weighted index and owns the polylines, the
//! corner registry and the per-polyline chain heads. Placement lives in
//! `cover.rs`, separation in `resolve.rs`.

use log::{debug, warn};

use super::ball::{BallContext, BallId, PolylineId, WeightedPoint};
use super::diagnostics::{HiddenBall, ProtectDiagnostics};
use super::error::{ProtectError, ProtectResult};
use super::index::{Insertion, WeightedIndex};
use super::options::ProtectOptions;
use super::polyline::Polyline;
use super::registry::{ChainEnd, CornerLink, CornerRegistry};
use crate::geom::Point3;

/// First ball of a polyline chain: the start corner of an open polyline or
/// the seed ball of a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainHead {
    pub head: Option<BallId>,
    /// Balls inserted for this polyline, including gap balls.
    pub placed: usize,
}

pub struct Protector<'a, I: WeightedIndex + ?Sized> {
    pub(super) index: &'a mut I,
    pub(super) polylines: Vec<Polyline>,
    pub(super) registry: CornerRegistry,
    pub(super) options: ProtectOptions,
    pub(super) chains: Vec<ChainHead>,
    pub(super) diagnostics: ProtectDiagnostics,
}

impl<'a, I: WeightedIndex + ?Sized> Protector<'a, I> {
    #[must_use]
    pub fn new(index: &'a mut I, polylines: Vec<Polyline>, options: ProtectOptions) -> Self {
        let chains = vec![ChainHead::default(); polylines.len()];
        Self {
            index,
            polylines,
            registry: CornerRegistry::new(),
            options,
            chains,
            diagnostics: ProtectDiagnostics::new(),
        }
    }

    #[must_use]
    pub fn index(&self) -> &I {
        &*self.index
    }

    #[must_use]
    pub fn polylines(&self) -> &[Polyline] {
        &self.polylines
    }

    #[must_use]
    pub fn registry(&self) -> &CornerRegistry {
        &self.registry
    }

    #[must_use]
    pub fn diagnostics(&self) -> &ProtectDiagnostics {
        &self.diagnostics
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut ProtectDiagnostics {
        &mut self.diagnostics
    }

    #[must_use]
    pub fn options(&self) -> &ProtectOptions {
        &self.options
    }

    #[must_use]
    pub fn chain_head(&self, id: PolylineId) -> Option<ChainHead> {
        self.chains.get(id).copied()
    }

    /// Covers every polyline in id order. Returns the number of inserted balls.
    pub fn cover_all(&mut self) -> usize {
        (0..self.polylines.len()).map(|id| self.cover(id)).sum()
    }

    /// Balls of polyline `id` in chain order.
    ///
    /// An open polyline yields its start corner, the interior balls and its
    /// end corner; corners it merely passes through appear in between. A
    /// cycle yields every ring ball once, starting at the seed.
    #[must_use]
    pub fn chain(&self, id: PolylineId) -> Vec<BallId> {
        let Some(head) = self.chains.get(id).and_then(|c| c.head) else {
            return Vec::new();
        };
        let guard = self.index.number_of_vertices() + 1;
        let is_cycle = self.polylines.get(id).is_some_and(Polyline::is_cycle);

        let mut chain = vec![head];
        let mut next = if is_cycle {
            self.index.context(head).and_then(|c| c.succ)
        } else {
            self.registry
                .link(head, id, ChainEnd::Start)
                .and_then(|l| l.neighbor)
        };

        while let Some(ball) = next {
            if chain.len() > guard || (is_cycle && ball == head) {
                break;
            }
            chain.push(ball);
            let Some(context) = self.index.context(ball) else {
                break;
            };
            if !is_cycle && context.is_corner {
                // Walk on only through a corner this polyline passes, once.
                let passes = self.registry.link(ball, id, ChainEnd::Through).is_some();
                if !passes || chain[..chain.len() - 1].contains(&ball) {
                    break;
                }
            }
            next = context.succ;
        }
        chain
    }

    /// Checks the registry against the index and that every chain head is live.
    ///
    /// # Errors
    /// `InconsistentRegistry` on the first stale reference.
    pub fn verify(&self) -> ProtectResult<()> {
        self.registry.verify(&*self.index)?;
        for (id, chain) in self.chains.iter().enumerate() {
            if let Some(head) = chain.head
                && !self.index.contains(head)
            {
                return Err(ProtectError::InconsistentRegistry {
                    ball: head,
                    reason: format!("head of polyline {id} is not in the index"),
                });
            }
        }
        Ok(())
    }

    /// Consumes the protector, keeping what the report needs.
    pub(crate) fn finish(self) -> (Vec<Polyline>, CornerRegistry, ProtectDiagnostics) {
        (self.polylines, self.registry, self.diagnostics)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Shared helpers
    // ─────────────────────────────────────────────────────────────────────────

    pub(super) fn set_context(&mut self, ball: BallId, context: BallContext) {
        if let Some(slot) = self.index.context_mut(ball) {
            *slot = context;
        }
    }

    pub(super) fn update_context(&mut self, ball: BallId, f: impl FnOnce(&mut BallContext)) {
        if let Some(slot) = self.index.context_mut(ball) {
            f(slot);
        }
    }

    pub(super) fn is_corner(&self, ball: BallId) -> bool {
        self.index.context(ball).is_some_and(|c| c.is_corner)
    }

    /// Records a placement at `center` that the index refused. The dominating
    /// ball is looked up as the nearest power vertex; `hidden_by` is the
    /// fallback when the index has none.
    pub(super) fn record_hidden(&mut self, center: Point3, hidden_by: BallId) {
        let by = self.index.nearest_power_vertex(center).unwrap_or(hidden_by);
        let message = ProtectError::InsertionHidden { center, by }.to_string();
        warn!("{message}");
        let by_center = self.index.point(by).map_or(center, |p| p.center);
        self.diagnostics.hidden_balls.push(HiddenBall {
            center: center.to_array(),
            by,
            by_center: by_center.to_array(),
        });
    }

    /// Marks an interior ball as a corner. The polyline owning it keeps its
    /// `pred`/`succ` and is registered as passing through.
    pub(super) fn promote_to_corner(&mut self, ball: BallId) {
        let Some(context) = self.index.context(ball).copied() else {
            return;
        };
        if context.is_corner {
            return;
        }
        self.update_context(ball, |c| c.is_corner = true);
        self.registry.register(
            ball,
            CornerLink {
                polyline: context.polyline,
                end: ChainEnd::Through,
                position: context.position,
                neighbor: None,
            },
        );
        debug!("ball {ball} of polyline {} became a corner", context.polyline);
    }

    /// Inserts a non-corner ball. Hidden placements are recorded and skipped.
    pub(super) fn place_ball(&mut self, center: Point3, weight: f64) -> Option<BallId> {
        match self.index.insert(WeightedPoint::new(center, weight)) {
            Insertion::Inserted(ball) => Some(ball),
            Insertion::Hidden(by) => {
                self.record_hidden(center, by);
                None
            }
        }
    }

    /// Makes `next` follow `ball` along polyline `id`.
    pub(super) fn link_after(&mut self, ball: BallId, id: PolylineId, next: BallId) {
        if self.is_corner(ball) && self.registry.set_neighbor(ball, id, ChainEnd::Start, Some(next)) {
            return;
        }
        self.update_context(ball, |c| c.succ = Some(next));
    }

    /// Makes `prev` precede `ball` along polyline `id`.
    pub(super) fn link_before(&mut self, ball: BallId, id: PolylineId, prev: BallId) {
        if self.is_corner(ball) && self.registry.set_neighbor(ball, id, ChainEnd::End, Some(prev)) {
            return;
        }
        self.update_context(ball, |c| c.pred = Some(prev));
    }
}
