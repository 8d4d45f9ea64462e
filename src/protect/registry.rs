//! Corner/adjacency registry.
//!
//! Maps each corner ball to one [`CornerLink`] per polyline that ends there,
//! plus a pass-through link for a polyline whose interior ball became a
//! corner. Keys are ball identities, so two balls at the same coordinates are
//! distinct entries.

use std::collections::{BTreeMap, BTreeSet};

use super::ball::{BallId, PolylineId, PolylinePosition};
use super::error::{ProtectError, ProtectResult};
use super::index::WeightedIndex;

/// Which end of an open polyline a corner link describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChainEnd {
    Start,
    End,
    /// The polyline runs through the corner. Its chain neighbors stay in the
    /// ball's `pred`/`succ` and the link carries no neighbor.
    Through,
}

/// One polyline incident to a corner ball.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerLink {
    pub polyline: PolylineId,
    pub end: ChainEnd,
    pub position: PolylinePosition,
    /// Ball next to the corner along this polyline: the first or last interior
    /// ball, or the opposite corner when the polyline has no interior balls.
    /// Always `None` for [`ChainEnd::Through`].
    pub neighbor: Option<BallId>,
}

#[derive(Debug, Clone, Default)]
pub struct CornerRegistry {
    entries: BTreeMap<BallId, Vec<CornerLink>>,
}

impl CornerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, corner: BallId, link: CornerLink) {
        self.entries.entry(corner).or_default().push(link);
    }

    #[must_use]
    pub fn links(&self, ball: BallId) -> &[CornerLink] {
        self.entries.get(&ball).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, ball: BallId) -> bool {
        self.entries.contains_key(&ball)
    }

    #[must_use]
    pub fn corner_count(&self) -> usize {
        self.entries.len()
    }

    pub fn corners(&self) -> impl Iterator<Item = BallId> + '_ {
        self.entries.keys().copied()
    }

    /// Polyline ids meeting at `ball`: `own` plus every registered polyline.
    #[must_use]
    pub fn polylines_at(&self, ball: BallId, own: PolylineId) -> BTreeSet<PolylineId> {
        let mut ids: BTreeSet<PolylineId> = self.links(ball).iter().map(|l| l.polyline).collect();
        ids.insert(own);
        ids
    }

    /// Corner holding the `end` of `polyline`, with its link.
    #[must_use]
    pub fn find(&self, polyline: PolylineId, end: ChainEnd) -> Option<(BallId, CornerLink)> {
        self.entries.iter().find_map(|(&ball, links)| {
            links
                .iter()
                .find(|l| l.polyline == polyline && l.end == end)
                .map(|&l| (ball, l))
        })
    }

    /// Link of `polyline` at `end` registered under `ball`.
    #[must_use]
    pub fn link(&self, ball: BallId, polyline: PolylineId, end: ChainEnd) -> Option<&CornerLink> {
        self.links(ball)
            .iter()
            .find(|l| l.polyline == polyline && l.end == end)
    }

    /// Replaces the neighbor of one link. Returns false if no such link exists.
    pub fn set_neighbor(
        &mut self,
        ball: BallId,
        polyline: PolylineId,
        end: ChainEnd,
        neighbor: Option<BallId>,
    ) -> bool {
        let Some(link) = self
            .entries
            .get_mut(&ball)
            .and_then(|links| links.iter_mut().find(|l| l.polyline == polyline && l.end == end))
        else {
            return false;
        };
        link.neighbor = neighbor;
        true
    }

    /// Removes and returns every link keyed by `ball`.
    pub fn take(&mut self, ball: BallId) -> Vec<CornerLink> {
        self.entries.remove(&ball).unwrap_or_default()
    }

    /// Moves every link keyed by `old` to `new`.
    ///
    /// The links are detached first and re-registered afterwards, so no map
    /// range is borrowed while the map changes.
    pub fn reassign(&mut self, old: BallId, new: BallId) {
        let moved = self.take(old);
        for link in moved {
            self.register(new, link);
        }
    }

    /// Redirects every link whose neighbor is `old` to `new`. Returns the
    /// number of links changed.
    pub fn retarget_neighbors(&mut self, old: BallId, new: BallId) -> usize {
        let targets: Vec<(BallId, usize)> = self
            .entries
            .iter()
            .flat_map(|(&ball, links)| {
                links
                    .iter()
                    .enumerate()
                    .filter(|(_, l)| l.neighbor == Some(old))
                    .map(move |(i, _)| (ball, i))
            })
            .collect();

        for &(ball, i) in &targets {
            if let Some(link) = self.entries.get_mut(&ball).and_then(|links| links.get_mut(i)) {
                link.neighbor = Some(new);
            }
        }
        targets.len()
    }

    /// Fails if `ball` still owns links or is still some link's neighbor.
    ///
    /// # Errors
    /// `InconsistentRegistry` describing the stale reference.
    pub fn ensure_released(&self, ball: BallId) -> ProtectResult<()> {
        if self.contains(ball) {
            return Err(ProtectError::InconsistentRegistry {
                ball,
                reason: "removed ball still owns corner links".to_string(),
            });
        }
        if self
            .entries
            .values()
            .flatten()
            .any(|l| l.neighbor == Some(ball))
        {
            return Err(ProtectError::InconsistentRegistry {
                ball,
                reason: "removed ball is still a corner neighbor".to_string(),
            });
        }
        Ok(())
    }

    /// Checks every key is a live corner ball, every neighbor is live, and a
    /// pass-through polyline owns the ball it runs through.
    ///
    /// # Errors
    /// `InconsistentRegistry` for the first violation found.
    pub fn verify<I: WeightedIndex + ?Sized>(&self, index: &I) -> ProtectResult<()> {
        for (&ball, links) in &self.entries {
            let Some(context) = index.context(ball) else {
                return Err(ProtectError::InconsistentRegistry {
                    ball,
                    reason: "corner ball is not in the index".to_string(),
                });
            };
            if !context.is_corner {
                return Err(ProtectError::InconsistentRegistry {
                    ball,
                    reason: "registered ball is not marked as a corner".to_string(),
                });
            }
            for link in links {
                if link.end == ChainEnd::Through && context.polyline != link.polyline {
                    return Err(ProtectError::InconsistentRegistry {
                        ball,
                        reason: format!(
                            "polyline {} passes through a ball of polyline {}",
                            link.polyline, context.polyline
                        ),
                    });
                }
                if let Some(neighbor) = link.neighbor
                    && !index.contains(neighbor)
                {
                    return Err(ProtectError::InconsistentRegistry {
                        ball,
                        reason: format!(
                            "neighbor {neighbor} on polyline {} is not in the index",
                            link.polyline
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
