//! Compile-time embedded templates.
//!
//! Paths are relative to this source file
//! (`crates/stepwise-core/src/templates/embedded.rs`). Do NOT move
//! `templates/demo.md` without updating the `include_str!` path here.

/// Demo document: three code blocks updating `a` between references.
///
/// Rendered with blocks stripped, `a` reads `???` three times, then `9`,
/// `9`, `10`, `32.0` and `32.0`.
pub const DEMO_TEMPLATE: &str = include_str!("../../../../templates/demo.md");
