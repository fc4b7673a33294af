//! Data models for constructor statistics.
//!
//! - `ConstructorInfo`: base info as listed by the champions endpoint
//! - `ConstructorRecord`: the denormalized record stored in the cache

pub mod constructor;

pub use constructor::{ConstructorInfo, ConstructorRecord, Season};
