//! Cycle detection and depth limiting for hierarchy walks.
//!
//! # Design
//!
//! Class hierarchies and override chains come from user input, so a walk over
//! them may revisit a node (inheritance cycle) or nest arbitrarily deep.
//! [`RecursionGuard`] combines a visiting set with depth and iteration limits
//! taken from a named [`RecursionProfile`].
//!
//! In debug builds, dropping a guard with active entries panics, catching a
//! forgotten [`leave`](RecursionGuard::leave).

use kore_common::limits;
use rustc_hash::FxHashSet;
use std::hash::Hash;

/// Named recursion limit presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionProfile {
    /// Walking supertypes during a subtype check.
    SupertypeWalk,
    /// Following overridden members while inferring visibility.
    OverrideChain,
}

impl RecursionProfile {
    pub const fn max_depth(self) -> u32 {
        match self {
            Self::SupertypeWalk => limits::MAX_SUPERTYPE_DEPTH,
            Self::OverrideChain => limits::MAX_OVERRIDE_CHAIN_DEPTH,
        }
    }

    pub const fn max_iterations(self) -> u32 {
        match self {
            Self::SupertypeWalk | Self::OverrideChain => limits::MAX_SUPERTYPE_VISITS,
        }
    }
}

/// Result of attempting to enter a recursive computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecursionResult {
    Entered,
    /// The key is already being visited.
    Cycle,
    DepthExceeded,
    IterationExceeded,
}

impl RecursionResult {
    #[inline]
    pub fn is_entered(self) -> bool {
        matches!(self, Self::Entered)
    }

    #[inline]
    pub fn is_cycle(self) -> bool {
        matches!(self, Self::Cycle)
    }

    #[inline]
    pub fn is_exceeded(self) -> bool {
        matches!(self, Self::DepthExceeded | Self::IterationExceeded)
    }
}

pub struct RecursionGuard<K: Hash + Eq + Clone> {
    visiting: FxHashSet<K>,
    depth: u32,
    iterations: u32,
    max_depth: u32,
    max_iterations: u32,
    exceeded: bool,
}

impl<K: Hash + Eq + Clone> RecursionGuard<K> {
    pub fn new(max_depth: u32, max_iterations: u32) -> Self {
        Self {
            visiting: FxHashSet::default(),
            depth: 0,
            iterations: 0,
            max_depth,
            max_iterations,
            exceeded: false,
        }
    }

    pub fn with_profile(profile: RecursionProfile) -> Self {
        Self::new(profile.max_depth(), profile.max_iterations())
    }

    /// Try to enter `key`. On [`RecursionResult::Entered`] the caller must
    /// call [`leave`](Self::leave) with the same key.
    pub fn enter(&mut self, key: K) -> RecursionResult {
        self.iterations = self.iterations.saturating_add(1);
        if self.iterations > self.max_iterations {
            self.exceeded = true;
            return RecursionResult::IterationExceeded;
        }
        if self.depth >= self.max_depth {
            self.exceeded = true;
            return RecursionResult::DepthExceeded;
        }
        if !self.visiting.insert(key) {
            return RecursionResult::Cycle;
        }
        self.depth += 1;
        RecursionResult::Entered
    }

    pub fn leave(&mut self, key: &K) {
        let was_present = self.visiting.remove(key);
        debug_assert!(was_present, "RecursionGuard::leave() without matching enter()");
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` inside a guarded scope for `key`.
    pub fn scope<T>(&mut self, key: K, f: impl FnOnce(&mut Self) -> T) -> Result<T, RecursionResult> {
        match self.enter(key.clone()) {
            RecursionResult::Entered => {
                let result = f(self);
                self.leave(&key);
                Ok(result)
            }
            denied => Err(denied),
        }
    }

    #[inline]
    pub fn is_visiting(&self, key: &K) -> bool {
        self.visiting.contains(key)
    }

    #[inline]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Whether any limit was hit since creation.
    #[inline]
    pub fn is_exceeded(&self) -> bool {
        self.exceeded
    }
}

#[cfg(debug_assertions)]
impl<K: Hash + Eq + Clone> Drop for RecursionGuard<K> {
    fn drop(&mut self) {
        if !std::thread::panicking() && !self.visiting.is_empty() {
            panic!(
                "RecursionGuard dropped with {} active entries still in the visiting set",
                self.visiting.len()
            );
        }
    }
}

#[cfg(test)]
#[path = "../tests/recursion_tests.rs"]
mod tests;
