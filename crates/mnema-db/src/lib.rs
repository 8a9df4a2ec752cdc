//! # mnema-db
//!
//! SQLite catalog layer for mnema.
//!
//! The catalog stores item and event metadata — never media bytes, which
//! stay encrypted on disk, and never raw vectors, which live in the vector
//! index. Sensitive text columns (transcripts, summaries) hold ciphertext;
//! decryption happens in callers after a consent check.

pub mod events;
pub mod items;
pub mod pool;

pub use events::EventStore;
pub use items::{hash_content, ItemStore};
pub use pool::{Database, PoolConfig};
