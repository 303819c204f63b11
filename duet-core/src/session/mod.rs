//! Durable session state
//!
//! The authenticated user and their fixed recipient are kept in a small
//! key-value store so a restart can skip the login step.

pub mod storage;
pub mod store;

pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{SessionStore, RECIPIENT_KEY, USER_KEY};
