//! Opt-in timing hooks for curve protection.
//!
//! Active only with the `protect_metrics` feature on non-wasm targets. When
//! disabled every call compiles to a plain closure call and
//! [`ProtectMetrics::end`] returns `None`.

/// Phases of a protection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Border normalization and polyline tracing.
    Extraction,
    /// Ball placement along polylines.
    Cover,
    /// Conflict detection and ball refinement.
    Resolve,
    /// Registry consistency checks.
    Verification,
}

/// Cumulative nanoseconds per phase.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProtectTimingReport {
    pub extraction_ns: u64,
    pub cover_ns: u64,
    pub resolve_ns: u64,
    pub verification_ns: u64,
}

impl ProtectTimingReport {
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        self.extraction_ns
            .saturating_add(self.cover_ns)
            .saturating_add(self.resolve_ns)
            .saturating_add(self.verification_ns)
    }

    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }
}

#[derive(Debug, Default)]
pub struct ProtectMetrics {
    #[cfg(all(feature = "protect_metrics", not(target_arch = "wasm32")))]
    report: ProtectTimingReport,
}

impl ProtectMetrics {
    /// Resets all counters.
    pub fn begin(&mut self) {
        #[cfg(all(feature = "protect_metrics", not(target_arch = "wasm32")))]
        {
            self.report = ProtectTimingReport::default();
        }
    }

    #[must_use]
    pub fn end(&self) -> Option<ProtectTimingReport> {
        #[cfg(all(feature = "protect_metrics", not(target_arch = "wasm32")))]
        {
            Some(self.report.clone())
        }
        #[cfg(not(all(feature = "protect_metrics", not(target_arch = "wasm32"))))]
        {
            None
        }
    }

    /// Runs `f` and adds its elapsed time to `bucket`.
    pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
        #[cfg(all(feature = "protect_metrics", not(target_arch = "wasm32")))]
        {
            let start = std::time::Instant::now();
            let result = f();
            let nanos = start.elapsed().as_nanos().min(u128::from(u64::MAX)) as u64;
            self.add_to_bucket(bucket, nanos);
            result
        }

        #[cfg(not(all(feature = "protect_metrics", not(target_arch = "wasm32"))))]
        {
            let _ = bucket;
            f()
        }
    }

    #[cfg(all(feature = "protect_metrics", not(target_arch = "wasm32")))]
    fn add_to_bucket(&mut self, bucket: TimingBucket, nanos: u64) {
        let slot = match bucket {
            TimingBucket::Extraction => &mut self.report.extraction_ns,
            TimingBucket::Cover => &mut self.report.cover_ns,
            TimingBucket::Resolve => &mut self.report.resolve_ns,
            TimingBucket::Verification => &mut self.report.verification_ns,
        };
        *slot = slot.saturating_add(nanos);
    }
}
