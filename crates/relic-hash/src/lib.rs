//! Content hashing for the relic artifact archive.
//!
//! Every stored object is identified by the SHA-1 digest of its byte
//! content, rendered as 40 hex characters. Hashing is domain-separated: a
//! short tag is fed to the hasher before the content, so digests computed
//! for one purpose can never collide with digests computed for another.
//!
//! The same hasher runs at add time and at verify time; verification
//! recomputes the digest of on-disk content and compares it to the key the
//! object is stored under.

pub mod hasher;

pub use hasher::ContentHasher;
