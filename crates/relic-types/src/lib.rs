//! Foundation types for the relic artifact archive.
//!
//! This crate provides the value types shared by every other relic crate.
//!
//! # Key Types
//!
//! - [`Digest`] — Content-addressed identifier (160-bit hash, 40 hex chars)
//! - [`Metadata`] — Flat string key=value attributes attached to a digest
//! - [`Condition`] — A single key=value pair used to filter digests

pub mod condition;
pub mod digest;
pub mod error;
pub mod metadata;

pub use condition::Condition;
pub use digest::Digest;
pub use error::TypeError;
pub use metadata::Metadata;
