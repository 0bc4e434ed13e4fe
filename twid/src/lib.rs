//! # twid - Identity Hashing for Term Wrappers
//!
//! Produces short, identifier-safe ids for arbitrary serializable content.
//!
//! ## Key Features
//! - Content-addressed ids: equal canonical content yields equal ids
//! - Unique ids: every call yields a fresh id, even for equal content
//! - One shared canonical serializer for every call site
//! - Volatile/UI-only keys stripped before hashing
//! - Never fails: falls back to a counter-based id

pub mod canonical;
pub mod config;
pub mod error;
pub mod generator;
pub mod hasher;

// Re-export main types for easy use
pub use canonical::{canonical_json, canonicalize, strip_volatile};
pub use config::HasherConfig;
pub use error::{TwidError, TwidResult};
pub use generator::{AtomicIdGenerator, IdGenerator};
pub use hasher::{IdMode, IdentityHasher};
