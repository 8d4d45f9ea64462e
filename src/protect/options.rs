use serde::{Deserialize, Serialize};

use super::error::{ProtectError, ProtectResult};

/// Options for polyline extraction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// Promote two-edge border vertices whose angle is below 120° to corners.
    pub detect_sharp_corners: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            detect_sharp_corners: true,
        }
    }
}

/// Options for [`protect_boundary_curves_with_options`](super::protect_boundary_curves_with_options).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectOptions {
    /// Target spacing between consecutive balls along a curve.
    pub target_ball_size: f64,
    /// Maximum number of conflict-scan restarts before giving up.
    pub max_restarts: usize,
    /// Weight divisor applied to a corner ball when it is refined.
    pub corner_shrink_factor: f64,
    /// Weight divisor applied to an interior ball when it is refined.
    pub interior_shrink_factor: f64,
    /// Re-cover gaps left next to a shrunk interior ball with smaller balls.
    pub recover_gaps: bool,
    /// Coincidence and zero-length tolerance.
    pub tolerance: f64,
    pub extract: ExtractOptions,
}

impl ProtectOptions {
    pub const DEFAULT_MAX_RESTARTS: usize = 10_000;

    #[must_use]
    pub fn new(target_ball_size: f64) -> Self {
        Self {
            target_ball_size,
            max_restarts: Self::DEFAULT_MAX_RESTARTS,
            corner_shrink_factor: 4.0,
            interior_shrink_factor: 16.0,
            recover_gaps: false,
            tolerance: 1e-9,
            extract: ExtractOptions::default(),
        }
    }

    #[must_use]
    pub const fn max_restarts(mut self, restarts: usize) -> Self {
        self.max_restarts = restarts;
        self
    }

    #[must_use]
    pub const fn corner_shrink_factor(mut self, factor: f64) -> Self {
        self.corner_shrink_factor = factor;
        self
    }

    #[must_use]
    pub const fn interior_shrink_factor(mut self, factor: f64) -> Self {
        self.interior_shrink_factor = factor;
        self
    }

    #[must_use]
    pub const fn recover_gaps(mut self, recover: bool) -> Self {
        self.recover_gaps = recover;
        self
    }

    #[must_use]
    pub const fn tolerance(mut self, eps: f64) -> Self {
        self.tolerance = eps;
        self
    }

    #[must_use]
    pub const fn detect_sharp_corners(mut self, detect: bool) -> Self {
        self.extract.detect_sharp_corners = detect;
        self
    }

    /// Checks that sizes and factors are usable.
    ///
    /// # Errors
    /// `InvalidBallSize` for a non-positive or non-finite target size; shrink
    /// factors must be finite and greater than one.
    pub fn validate(&self) -> ProtectResult<()> {
        if !self.target_ball_size.is_finite() || self.target_ball_size <= 0.0 {
            return Err(ProtectError::InvalidBallSize(self.target_ball_size));
        }
        for factor in [self.corner_shrink_factor, self.interior_shrink_factor] {
            if !factor.is_finite() || factor <= 1.0 {
                return Err(ProtectError::InvalidBallSize(factor));
            }
        }
        Ok(())
    }
}

impl Default for ProtectOptions {
    fn default() -> Self {
        Self::new(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_refinement_factors() {
        let options = ProtectOptions::default();
        assert_eq!(options.corner_shrink_factor, 4.0);
        assert_eq!(options.interior_shrink_factor, 16.0);
        assert!(!options.recover_gaps);
        assert!(options.extract.detect_sharp_corners);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_sizes() {
        assert_eq!(
            ProtectOptions::new(0.0).validate(),
            Err(ProtectError::InvalidBallSize(0.0))
        );
        assert!(ProtectOptions::new(f64::NAN).validate().is_err());
        assert!(ProtectOptions::new(1.0).corner_shrink_factor(1.0).validate().is_err());
    }

    #[test]
    fn test_options_json_round_trip() {
        let options = ProtectOptions::new(0.5).max_restarts(12).recover_gaps(true);
        let json = serde_json::to_string(&options).ok();
        assert!(json.is_some());

        let parsed: Result<ProtectOptions, _> = serde_json::from_str(&json.unwrap_or_default());
        assert_eq!(parsed.ok(), Some(options));
    }

    #[test]
    fn test_options_json_missing_fields_use_defaults() {
        let parsed: ProtectOptions =
            serde_json::from_str(r#"{ "target_ball_size": 2.0 }"#).expect("parse options");
        assert_eq!(parsed, ProtectOptions::new(2.0));
    }
}
