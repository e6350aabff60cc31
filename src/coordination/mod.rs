//! Cross-artifact coordination
//!
//! Keeps downstream artifacts honest when an upstream one changes.

pub mod invalidate;

pub use invalidate::Invalidator;
