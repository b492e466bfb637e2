//! Storage abstractions for the external document store.
//!
//! The production store is a remote document database; the domain layer
//! only ever talks to it through these traits. `MemoryStore` is the
//! in-process implementation used for local runs and tests.

pub mod memory;
pub mod traits;

pub use memory::MemoryStore;
pub use traits::{AttendanceStorage, StudentStorage};
