//! Recursion ceilings shared by the resolver crates.
//!
//! Resolution walks class hierarchies and override chains that come from user
//! input, so every walk is bounded even though cycles are also detected
//! explicitly.

// =============================================================================
// Recursion Depth Limits
// =============================================================================

/// Maximum depth when walking supertypes during a subtype check.
pub const MAX_SUPERTYPE_DEPTH: u32 = 100;

/// Maximum depth of the overridden-member chain followed while inferring the
/// visibility of a fake override.
pub const MAX_OVERRIDE_CHAIN_DEPTH: u32 = 64;

// =============================================================================
// Operation Counts
// =============================================================================

/// Total supertype visits a single subtype check may perform.
pub const MAX_SUPERTYPE_VISITS: u32 = 10_000;
