//! TTL cache with pattern invalidation.
//!
//! This module provides:
//! - `CacheStore`: in-memory key/value store with per-entry TTL, lazy expiry
//!   on read, regex-based invalidation, and a background expiry sweep
//! - `keys`: the cache key grammar and per-resource TTL table shared by the
//!   fetch coordinator and external `invalidate` callers

pub mod keys;
mod store;

pub use store::{CacheConfig, CacheStore};
