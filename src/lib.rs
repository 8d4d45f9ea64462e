#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod geom;
pub mod protect;

pub use geom::{BoundaryMesh, GeomMesh, HalfedgeMesh, Point3};
pub use protect::{
    PowerIndex, ProtectError, ProtectOptions, ProtectReport, WeightedIndex,
    protect_boundary_curves, protect_boundary_curves_with_options, protect_mesh,
};

cfg_if::cfg_if! {
    if #[cfg(feature = "debug_logs")] {
        /// Installs `env_logger` at `Debug` level; `RUST_LOG` still overrides it.
        ///
        /// Calling it again after a logger is installed has no effect.
        pub fn init_logger() {
            let _ = env_logger::Builder::new()
                .filter_level(log::LevelFilter::Debug)
                .parse_default_env()
                .try_init();
        }
    } else {
        pub fn init_logger() {
            // no-op fallback when debug logs are disabled
        }
    }
}
