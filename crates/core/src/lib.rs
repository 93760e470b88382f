//! constpatch-core
//!
//! Core library for preparing a third-party C library for a memory-constrained
//! target: static lookup tables are rewritten to `const` so they can live in
//! flash, and the built archive is checked to make sure they really did.
//!
//! All substantive logic lives here so it is testable without a cross
//! toolchain; the external compiler, `make` and `readelf` sit behind the
//! `BuildBackend` and `SectionInspector` traits.

pub mod backup;
pub mod build;
pub mod config;
pub mod inspect;
pub mod layout;
pub mod matcher;
pub mod patch;
pub mod pipeline;
pub mod report;
pub mod selection;
pub mod toolchain;
pub mod verify;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
