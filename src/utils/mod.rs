// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v1.1
// Author: Lukas Bower
// Date Modified: 2026-10-15

//! Utility helpers shared by the snapshot pipeline and path resolution.

/// Lexical path cleaning and re-rooting.
pub mod paths;
