//! Structured tracing for lazy computations.
//!
//! Events use target `kore::storage` and are intended to be consumed with:
//! `KORE_LOG=kore::storage=trace KORE_LOG_FORMAT=json`.
//!
//! Every cold computation gets a process-unique id that pairs its `begin` and
//! `end` events. Cache hits are not traced.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{Level, trace};

pub const TARGET: &str = "kore::storage";

static NEXT_COMPUTATION_ID: AtomicU64 = AtomicU64::new(1);

/// What kind of cell a computation belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CellKind {
    Lazy,
    Memo,
}

impl CellKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Lazy => "lazy",
            Self::Memo => "memo",
        }
    }
}

#[inline]
pub fn enabled() -> bool {
    tracing::enabled!(target: TARGET, Level::TRACE)
}

#[inline]
pub(crate) fn next_computation_id() -> u64 {
    NEXT_COMPUTATION_ID.fetch_add(1, Ordering::Relaxed)
}

#[inline]
pub(crate) fn compute_begin(computation_id: u64, kind: CellKind, manager_id: u64, key: Option<&dyn Debug>) {
    if !enabled() {
        return;
    }
    let key = key.map(|key| format!("{key:?}"));
    trace!(
        target: TARGET,
        event = "compute",
        phase = "begin",
        computation_id,
        kind = kind.as_str(),
        manager_id,
        key = key.as_deref().unwrap_or("")
    );
}

#[inline]
pub(crate) fn compute_end(computation_id: u64, kind: CellKind, outcome: &'static str) {
    trace!(
        target: TARGET,
        event = "compute",
        phase = "end",
        computation_id,
        kind = kind.as_str(),
        outcome
    );
}

#[inline]
pub(crate) fn recursion(kind: CellKind, manager_id: u64, first_time: bool, handled: bool) {
    trace!(
        target: TARGET,
        event = "recursion",
        kind = kind.as_str(),
        manager_id,
        first_time,
        handled
    );
}

#[inline]
pub(crate) fn reset_after_panic(kind: CellKind, manager_id: u64) {
    trace!(target: TARGET, event = "reset", kind = kind.as_str(), manager_id);
}
