//! Infrastructure layer wiring concrete adapters (storage, clock).

pub mod clock;
pub mod storage;

pub use clock::{FixedClock, SystemClock};
pub use storage::{InMemoryContactStore, SledContactStore};
