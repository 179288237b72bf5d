//! Storage adapters for the contact book.
//!
//! `SledContactStore` persists to an embedded database; `InMemoryContactStore`
//! keeps everything in process memory.

pub mod memory_store;
pub mod sled_store;

pub use memory_store::InMemoryContactStore;
pub use sled_store::SledContactStore;
