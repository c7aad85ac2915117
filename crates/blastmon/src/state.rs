//! Shared application state and global allocator.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::State;

use blastmon_core::Orchestrator;

pub(crate) struct AppInner {
    pub(crate) orchestrator: Orchestrator,
    /// Set once the orchestrator has been closed at shutdown.
    pub(crate) closed: bool,
}

pub(crate) type SharedState = Arc<Mutex<AppInner>>;

pub(crate) type AppState = State<SharedState>;

pub(crate) fn new_state(orchestrator: Orchestrator) -> SharedState {
    Arc::new(Mutex::new(AppInner {
        orchestrator,
        closed: false,
    }))
}

/// Locks the state, ignoring poisoning.
pub(crate) fn lock(state: &SharedState) -> MutexGuard<'_, AppInner> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Closes the orchestrator exactly once.
pub(crate) fn close(state: &SharedState) {
    let mut inner = lock(state);
    if !inner.closed {
        inner.orchestrator.close();
        inner.closed = true;
    }
}
