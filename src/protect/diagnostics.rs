//! Counters and warnings collected while protecting curves.
//!
//! Diagnostics are informational: nothing in the protection result depends
//! on them, and their exact values are not a stable contract.

use std::fmt;

use serde::Serialize;

use super::ball::BallId;
use super::metrics::ProtectTimingReport;

/// A placement that landed inside an existing ball.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HiddenBall {
    /// Requested center.
    pub center: [f64; 3],
    /// Ball that dominates the requested center.
    pub by: BallId,
    pub by_center: [f64; 3],
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct ProtectDiagnostics {
    /// Mesh vertices classified as corners.
    pub corner_vertices: usize,
    /// Mesh vertices incident to at least one border edge.
    pub border_vertices: usize,
    /// Open polylines (between corners).
    pub polylines: usize,
    /// Closed border loops without corners.
    pub cycles: usize,

    /// Polylines skipped because their arclength is zero.
    pub degenerate_polylines: usize,
    /// Zero-length segments skipped inside covered polylines.
    pub degenerate_segments: usize,

    /// Balls in the index after separation.
    pub protecting_balls: usize,
    /// Balls marked as corners after separation.
    pub corner_balls: usize,
    /// Polyline endpoints that resolved to an existing corner ball.
    pub shared_corners: usize,
    pub hidden_balls: Vec<HiddenBall>,

    /// Non-adjacent intersecting pairs found by the separation loop.
    pub conflicts: usize,
    pub corner_refinements: usize,
    pub interior_refinements: usize,
    /// Scans restarted after a mutation.
    pub restarts: usize,
    /// Balls added while re-covering gaps next to shrunk balls.
    pub gap_balls: usize,

    #[serde(skip)]
    pub timing: Option<ProtectTimingReport>,

    pub warnings: Vec<String>,
}

impl ProtectDiagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn refinements(&self) -> usize {
        self.corner_refinements + self.interior_refinements
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// One-line summary for logging.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = vec![format!(
            "balls:{} corners:{} polylines:{} cycles:{}",
            self.protecting_balls, self.corner_balls, self.polylines, self.cycles
        )];
        if self.conflicts > 0 {
            parts.push(format!("conflicts:{}", self.conflicts));
        }
        if !self.hidden_balls.is_empty() {
            parts.push(format!("hidden:{}", self.hidden_balls.len()));
        }
        if self.degenerate_polylines > 0 {
            parts.push(format!("degenerate:{}", self.degenerate_polylines));
        }
        if self.gap_balls > 0 {
            parts.push(format!("gap-balls:{}", self.gap_balls));
        }
        parts.join(" ")
    }
}

impl fmt::Display for ProtectDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Protection Diagnostics:")?;
        writeln!(
            f,
            "  Border: {} vertices, {} corners, {} polylines, {} cycles",
            self.border_vertices, self.corner_vertices, self.polylines, self.cycles
        )?;
        writeln!(
            f,
            "  Balls: {} protecting, {} corner, {} hidden",
            self.protecting_balls,
            self.corner_balls,
            self.hidden_balls.len()
        )?;
        if self.degenerate_polylines > 0 || self.degenerate_segments > 0 {
            writeln!(
                f,
                "  Degenerate: {} polylines, {} segments",
                self.degenerate_polylines, self.degenerate_segments
            )?;
        }
        writeln!(
            f,
            "  Separation: {} conflicts, {} corner / {} interior refinements, {} restarts",
            self.conflicts, self.corner_refinements, self.interior_refinements, self.restarts
        )?;
        if self.gap_balls > 0 {
            writeln!(f, "  Gap balls: {}", self.gap_balls)?;
        }
        if !self.warnings.is_empty() {
            writeln!(f, "  Warnings:")?;
            for warning in &self.warnings {
                writeln!(f, "    - {warning}")?;
            }
        }
        if let Some(timing) = &self.timing {
            writeln!(f, "  Timing: {} ms total", timing.total_ms())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_only_nonzero_extras() {
        let diag = ProtectDiagnostics {
            protecting_balls: 12,
            corner_balls: 2,
            polylines: 1,
            ..Default::default()
        };
        let summary = diag.summary();
        assert!(summary.contains("balls:12"));
        assert!(!summary.contains("conflicts"));
    }

    #[test]
    fn test_display_and_json() {
        let mut diag = ProtectDiagnostics {
            conflicts: 3,
            interior_refinements: 2,
            corner_refinements: 1,
            ..Default::default()
        };
        diag.add_warning("polyline 4 has zero length");

        let text = diag.to_string();
        assert!(text.contains("3 conflicts"));
        assert!(text.contains("polyline 4 has zero length"));
        assert_eq!(diag.refinements(), 3);

        let json = serde_json::to_value(&diag).expect("serialize diagnostics");
        assert_eq!(json["conflicts"], 3);
        assert!(json.get("timing").is_none());
    }
}
