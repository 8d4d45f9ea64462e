//! Equal-arclength ball placement along polylines.

use log::{debug, warn};

use super::ball::{BallContext, BallId, PolylineId, PolylinePosition, WeightedPoint};
use super::error::{ProtectError, ProtectResult};
use super::index::{Insertion, WeightedIndex};
use super::protector::Protector;
use super::registry::{ChainEnd, CornerLink};
use crate::geom::Point3;

/// Number of subdivisions and their length for a span of `length` covered
/// with target spacing `alpha`.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn subdivision(length: f64, alpha: f64) -> (usize, f64) {
    let n = (length / alpha + 0.5).ceil().max(1.0) as usize;
    (n, length / n as f64)
}

/// Squared radius of a ball covering one subdivision of `local_size`.
#[must_use]
pub fn ball_weight(local_size: f64) -> f64 {
    let radius = local_size / 1.5;
    radius * radius
}

/// A stretch of polyline between two existing balls, re-covered in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverSpan {
    pub polyline: PolylineId,
    /// Ball at the start of the span.
    pub from: BallId,
    /// Ball at the end of the span.
    pub to: BallId,
    /// Spacing override; the target ball size when `None`.
    pub alpha: Option<f64>,
    /// Radius of `from`, subtracted from the length used to count subdivisions.
    pub radius_begin: f64,
    /// Radius of `to`, subtracted from the length used to count subdivisions.
    pub radius_end: f64,
}

impl CoverSpan {
    #[must_use]
    pub const fn new(polyline: PolylineId, from: BallId, to: BallId) -> Self {
        Self {
            polyline,
            from,
            to,
            alpha: None,
            radius_begin: 0.0,
            radius_end: 0.0,
        }
    }

    #[must_use]
    pub const fn alpha(mut self, alpha: f64) -> Self {
        self.alpha = Some(alpha);
        self
    }

    #[must_use]
    pub const fn radius_hints(mut self, begin: f64, end: f64) -> Self {
        self.radius_begin = begin;
        self.radius_end = end;
        self
    }
}

impl<I: WeightedIndex + ?Sized> Protector<'_, I> {
    /// Places balls along polyline `id` and links them into a chain.
    ///
    /// Open polylines get a corner ball at each end, registered in the corner
    /// registry; an endpoint that lands on an existing ball reuses it, which is
    /// how polylines share corners. An interior ball reused this way becomes a
    /// corner its own polyline passes through. Cycles get a ring of non-corner
    /// balls.
    /// Returns the number of balls inserted.
    pub fn cover(&mut self, id: PolylineId) -> usize {
        let Some(polyline) = self.polylines.get(id) else {
            warn!("cover requested for unknown polyline {id}");
            return 0;
        };
        let tol = self.options.tolerance;
        let length = polyline.length();
        if length <= tol {
            let message = ProtectError::DegenerateInput { polyline: id }.to_string();
            warn!("{message}");
            self.diagnostics.degenerate_polylines += 1;
            self.diagnostics.add_warning(message);
            return 0;
        }

        let degenerate_segments = polyline.degenerate_segments(tol);
        let (n, local) = subdivision(length, self.options.target_ball_size);
        let weight = ball_weight(local);
        let is_cycle = polyline.is_cycle();

        let last = if is_cycle { n - 1 } else { n };
        let samples: Vec<(Point3, PolylinePosition)> = (0..=last)
            .filter_map(|k| {
                let t = if k == n { length } else { k as f64 * local };
                polyline.locate(t)
            })
            .collect();

        self.diagnostics.degenerate_segments += degenerate_segments;
        debug!(
            "polyline {id}: length {length:.6}, {n} subdivisions of {local:.6}{}",
            if is_cycle { " (cycle)" } else { "" }
        );

        let placed = if is_cycle {
            self.cover_cycle(id, &samples, weight)
        } else {
            self.cover_open(id, &samples, weight)
        };
        if let Some(chain) = self.chains.get_mut(id) {
            chain.placed += placed;
        }
        placed
    }

    fn cover_open(
        &mut self,
        id: PolylineId,
        samples: &[(Point3, PolylinePosition)],
        weight: f64,
    ) -> usize {
        let [first, .., last] = *samples else {
            return 0;
        };
        let (start, start_inserted) = self.place_corner(id, first, weight);
        let mut placed = usize::from(start_inserted);

        let mut prev = start;
        let mut first_interior = None;
        let mut last_interior = None;
        for &(center, position) in &samples[1..samples.len() - 1] {
            let Some(ball) = self.place_ball(center, weight) else {
                continue;
            };
            self.set_context(
                ball,
                BallContext {
                    polyline: id,
                    pred: Some(prev),
                    succ: None,
                    position,
                    is_corner: false,
                },
            );
            if last_interior.is_some() {
                self.update_context(prev, |c| c.succ = Some(ball));
            }
            first_interior.get_or_insert(ball);
            last_interior = Some(ball);
            prev = ball;
            placed += 1;
        }

        let (end, end_inserted) = self.place_corner(id, last, weight);
        placed += usize::from(end_inserted);
        if let Some(tail) = last_interior {
            self.update_context(tail, |c| c.succ = Some(end));
        }

        self.registry.register(
            start,
            CornerLink {
                polyline: id,
                end: ChainEnd::Start,
                position: first.1,
                neighbor: first_interior.or(Some(end)),
            },
        );
        self.registry.register(
            end,
            CornerLink {
                polyline: id,
                end: ChainEnd::End,
                position: last.1,
                neighbor: last_interior.or(Some(start)),
            },
        );
        if let Some(chain) = self.chains.get_mut(id) {
            chain.head = Some(start);
        }
        placed
    }

    fn cover_cycle(
        &mut self,
        id: PolylineId,
        samples: &[(Point3, PolylinePosition)],
        weight: f64,
    ) -> usize {
        let mut seed = None;
        let mut prev: Option<BallId> = None;
        let mut placed = 0;
        for &(center, position) in samples {
            let Some(ball) = self.place_ball(center, weight) else {
                continue;
            };
            self.set_context(
                ball,
                BallContext {
                    polyline: id,
                    pred: prev,
                    succ: None,
                    position,
                    is_corner: false,
                },
            );
            if let Some(prev) = prev {
                self.update_context(prev, |c| c.succ = Some(ball));
            }
            seed.get_or_insert(ball);
            prev = Some(ball);
            placed += 1;
        }

        if let (Some(seed), Some(last)) = (seed, prev) {
            self.update_context(seed, |c| c.pred = Some(last));
            self.update_context(last, |c| c.succ = Some(seed));
        }
        if let Some(chain) = self.chains.get_mut(id) {
            chain.head = seed;
        }
        placed
    }

    /// Inserts or reuses the corner ball at one end of polyline `id`.
    fn place_corner(
        &mut self,
        id: PolylineId,
        (center, position): (Point3, PolylinePosition),
        weight: f64,
    ) -> (BallId, bool) {
        match self.index.insert(WeightedPoint::new(center, weight)) {
            Insertion::Inserted(ball) => {
                self.set_context(
                    ball,
                    BallContext {
                        polyline: id,
                        position,
                        is_corner: true,
                        ..BallContext::default()
                    },
                );
                (ball, true)
            }
            Insertion::Hidden(by) => {
                if self.is_corner(by) {
                    debug!("polyline {id} shares corner {by}");
                    self.diagnostics.shared_corners += 1;
                } else {
                    self.record_hidden(center, by);
                    self.promote_to_corner(by);
                }
                (by, false)
            }
        }
    }

    /// Places balls strictly between `span.from` and `span.to` and splices
    /// them into the chain. Returns the number of balls inserted.
    ///
    /// # Errors
    /// `InvalidBallSize` for a non-positive spacing; `InconsistentRegistry`
    /// if either end ball is gone or does not lie on the polyline.
    pub fn cover_span(&mut self, span: CoverSpan) -> ProtectResult<usize> {
        let alpha = span.alpha.unwrap_or(self.options.target_ball_size);
        if !alpha.is_finite() || alpha <= 0.0 {
            return Err(ProtectError::InvalidBallSize(alpha));
        }
        let begin = self.span_arclength(span.from, span.polyline, ChainEnd::Start)?;
        let mut end = self.span_arclength(span.to, span.polyline, ChainEnd::End)?;

        let Some(polyline) = self.polylines.get(span.polyline) else {
            return Err(ProtectError::InconsistentRegistry {
                ball: span.from,
                reason: format!("unknown polyline {}", span.polyline),
            });
        };
        if polyline.is_cycle() && end <= begin {
            end += polyline.length();
        }
        let full = end - begin;
        if full <= self.options.tolerance {
            return Ok(0);
        }

        let effective = (full - span.radius_begin - span.radius_end).max(0.0);
        let (n, _) = subdivision(effective, alpha);
        let local = full / n as f64;
        let weight = ball_weight(local);
        let samples: Vec<(Point3, PolylinePosition)> = (1..n)
            .filter_map(|k| polyline.locate(begin + k as f64 * local))
            .collect();

        let mut prev = span.from;
        let mut placed = 0;
        for (center, position) in samples {
            let Some(ball) = self.place_ball(center, weight) else {
                continue;
            };
            self.set_context(
                ball,
                BallContext {
                    polyline: span.polyline,
                    pred: Some(prev),
                    succ: None,
                    position,
                    is_corner: false,
                },
            );
            self.link_after(prev, span.polyline, ball);
            prev = ball;
            placed += 1;
        }

        if placed > 0 {
            self.update_context(prev, |c| c.succ = Some(span.to));
            self.link_before(span.to, span.polyline, prev);
            debug!(
                "re-covered polyline {} between {} and {} with {placed} balls",
                span.polyline, span.from, span.to
            );
        }
        if let Some(chain) = self.chains.get_mut(span.polyline) {
            chain.placed += placed;
        }
        self.diagnostics.gap_balls += placed;
        Ok(placed)
    }

    /// Arclength of `ball` along `polyline`; corners are looked up through
    /// their link for `end`.
    fn span_arclength(&self, ball: BallId, polyline: PolylineId, end: ChainEnd) -> ProtectResult<f64> {
        let Some(context) = self.index.context(ball) else {
            return Err(ProtectError::InconsistentRegistry {
                ball,
                reason: "span end is not in the index".to_string(),
            });
        };
        if context.is_corner
            && let Some(link) = self.registry.link(ball, polyline, end)
        {
            return Ok(link.position.arclength);
        }
        if context.polyline != polyline {
            return Err(ProtectError::InconsistentRegistry {
                ball,
                reason: format!("span end does not lie on polyline {polyline}"),
            });
        }
        Ok(context.position.arclength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdivision_counts() {
        let (n, local) = subdivision(10.0, 1.0);
        assert_eq!(n, 11);
        assert!((local - 10.0 / 11.0).abs() < 1e-12);

        // Short spans still get one subdivision.
        assert_eq!(subdivision(0.1, 1.0).0, 1);
        assert_eq!(subdivision(0.0, 1.0).0, 1);
        assert_eq!(subdivision(16.0, 2.0).0, 9);
    }

    #[test]
    fn test_ball_weight() {
        assert!((ball_weight(1.5) - 1.0).abs() < 1e-12);
        assert!((ball_weight(3.0) - 4.0).abs() < 1e-12);
    }
}
