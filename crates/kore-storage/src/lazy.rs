//! Single-slot memoized computations.
//!
//! # Design
//!
//! A [`LazyValue`] is a cloneable handle to one cell. The cell's state lives
//! behind a small `parking_lot::Mutex` that is never held while user code
//! runs; the computation itself runs under the owning manager's re-entrant
//! lock. Two consequences follow:
//!
//! - While a computation is running, every other thread that misses the fast
//!   path blocks on the manager lock, so a cell found in `Computing` while
//!   holding that lock was re-entered by the computing thread itself.
//! - Reads of a finished cell only touch the state mutex.
//!
//! ```text
//! NotComputed -> Computing -> [PostComputing] -> Computed
//!                    |  ^                \
//!                    v  |                 -> Failed
//!             RecursionDetected
//! ```

use crate::error::{StorageError, StorageResult};
use crate::manager::ManagerCore;
use crate::storage_trace::{self, CellKind};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

pub(crate) type Thunk<T> = Box<dyn Fn() -> StorageResult<T> + Send + Sync>;
pub(crate) type PostCompute<T> = Box<dyn Fn(&T) -> StorageResult<()> + Send + Sync>;

/// What a cell does when its own computation asks for it again.
pub enum RecursionPolicy<T> {
    /// Fail with [`StorageError::RecursionDetected`].
    Fail,
    /// Hand the re-entrant caller a fixed fallback.
    Value(T),
    /// Compute a fallback; the flag is `true` only for the first re-entrant
    /// call the cell observes.
    Compute(Box<dyn Fn(bool) -> StorageResult<T> + Send + Sync>),
}

impl<T> fmt::Debug for RecursionPolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail => f.write_str("Fail"),
            Self::Value(_) => f.write_str("Value"),
            Self::Compute(_) => f.write_str("Compute"),
        }
    }
}

enum CellState<T> {
    NotComputed,
    Computing,
    RecursionDetected,
    /// The value exists but the post-compute hook has not finished; only the
    /// computing thread can observe this state.
    PostComputing(T),
    Computed(T),
    Failed(StorageError),
}

impl<T> CellState<T> {
    fn name(&self) -> &'static str {
        match self {
            Self::NotComputed => "NotComputed",
            Self::Computing => "Computing",
            Self::RecursionDetected => "RecursionDetected",
            Self::PostComputing(_) => "PostComputing",
            Self::Computed(_) => "Computed",
            Self::Failed(_) => "Failed",
        }
    }
}

struct LazyCell<T> {
    manager: Arc<ManagerCore>,
    computable: Thunk<T>,
    on_recursion: RecursionPolicy<T>,
    post_compute: Option<PostCompute<T>>,
    state: Mutex<CellState<T>>,
}

/// A memoized computation producing `T` exactly once.
pub struct LazyValue<T> {
    cell: Arc<LazyCell<T>>,
}

/// A lazy value whose result may legitimately be absent. Absence is cached
/// like any other result.
pub type NullableLazyValue<T> = LazyValue<Option<T>>;

impl<T> Clone for LazyValue<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> LazyValue<T> {
    pub(crate) fn new(
        manager: Arc<ManagerCore>,
        computable: Thunk<T>,
        on_recursion: RecursionPolicy<T>,
        post_compute: Option<PostCompute<T>>,
    ) -> Self {
        Self {
            cell: Arc::new(LazyCell {
                manager,
                computable,
                on_recursion,
                post_compute,
                state: Mutex::new(CellState::NotComputed),
            }),
        }
    }

    /// Return the memoized value, computing it on first use.
    pub fn get(&self) -> StorageResult<T> {
        if let Some(published) = self.cell.published() {
            return published;
        }
        let cell = &*self.cell;
        cell.manager.with_lock(|| cell.get_locked())
    }

    /// Whether a final result (value or failure) is available.
    pub fn is_computed(&self) -> bool {
        matches!(*self.cell.state.lock(), CellState::Computed(_) | CellState::Failed(_))
    }

    /// Whether a computation for this cell is on the stack right now.
    pub fn is_computing(&self) -> bool {
        matches!(
            *self.cell.state.lock(),
            CellState::Computing | CellState::RecursionDetected | CellState::PostComputing(_)
        )
    }
}

impl<T: Clone + Send + Sync + 'static> LazyCell<T> {
    /// Lock-free (with respect to the manager) read of a finished cell.
    fn published(&self) -> Option<StorageResult<T>> {
        match &*self.state.lock() {
            CellState::Computed(value) => Some(Ok(value.clone())),
            CellState::Failed(error) => Some(Err(error.clone())),
            _ => None,
        }
    }

    fn get_locked(&self) -> StorageResult<T> {
        {
            let mut state = self.state.lock();
            match &*state {
                CellState::Computed(value) | CellState::PostComputing(value) => return Ok(value.clone()),
                CellState::Failed(error) => return Err(error.clone()),
                CellState::Computing => {
                    *state = CellState::RecursionDetected;
                    drop(state);
                    return self.recursion_detected(true);
                }
                CellState::RecursionDetected => {
                    drop(state);
                    return self.recursion_detected(false);
                }
                CellState::NotComputed => *state = CellState::Computing,
            }
        }

        let computation_id = storage_trace::next_computation_id();
        storage_trace::compute_begin(computation_id, CellKind::Lazy, self.manager.id, None);
        let reset = ResetOnUnwind { cell: self };

        let outcome = (self.computable)().and_then(|value| {
            if let Some(post_compute) = &self.post_compute {
                *self.state.lock() = CellState::PostComputing(value.clone());
                post_compute(&value)?;
            }
            Ok(value)
        });
        std::mem::forget(reset);

        let mut state = self.state.lock();
        match outcome {
            Ok(value) => {
                *state = CellState::Computed(value.clone());
                storage_trace::compute_end(computation_id, CellKind::Lazy, "value");
                Ok(value)
            }
            Err(error) => {
                *state = CellState::Failed(error.clone());
                storage_trace::compute_end(computation_id, CellKind::Lazy, "failed");
                Err(error)
            }
        }
    }

    fn recursion_detected(&self, first_time: bool) -> StorageResult<T> {
        let handled = !matches!(self.on_recursion, RecursionPolicy::Fail);
        storage_trace::recursion(CellKind::Lazy, self.manager.id, first_time, handled);
        match &self.on_recursion {
            RecursionPolicy::Fail => Err(self.manager.recursion_error("in a lazy value", None)),
            RecursionPolicy::Value(value) => Ok(value.clone()),
            RecursionPolicy::Compute(handler) => handler(first_time),
        }
    }
}

/// Puts the cell back to `NotComputed` if the computation unwinds, so a later
/// `get` retries instead of reporting recursion forever.
struct ResetOnUnwind<'a, T> {
    cell: &'a LazyCell<T>,
}

impl<T> Drop for ResetOnUnwind<'_, T> {
    fn drop(&mut self) {
        *self.cell.state.lock() = CellState::NotComputed;
        storage_trace::reset_after_panic(CellKind::Lazy, self.cell.manager.id);
    }
}

impl<T> fmt::Debug for LazyValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyValue")
            .field("state", &self.cell.state.lock().name())
            .field("on_recursion", &self.cell.on_recursion)
            .finish()
    }
}

#[cfg(test)]
#[path = "../tests/lazy_tests.rs"]
mod tests;
