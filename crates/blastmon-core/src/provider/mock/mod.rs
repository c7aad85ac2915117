//! In-memory fakes for tests and demo mode.
//!
//! `MockFs` backs `FsCounterProvider` with an in-memory counter tree.
//! `MockProvider` implements `CounterProvider` directly and tracks handle
//! usage so tests can assert that every opened handle is released.

mod filesystem;
mod provider;
mod scenarios;

pub use filesystem::MockFs;
pub use provider::MockProvider;
