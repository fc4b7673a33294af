//! Cache of assembled constructor records.
//!
//! This module provides the `KvStore` abstraction over the key-value store
//! (Redis in production, `MemoryStore` in tests) and the `CacheManager`
//! that stores records in generations on top of it.

pub mod manager;
pub mod redis_store;
pub mod store;

pub use manager::{CacheManager, CachedData};
pub use redis_store::RedisStore;
pub use store::{CacheError, KvStore, MemoryStore};
