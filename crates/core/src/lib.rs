//! Domain types and pure logic for prompt version management.
//!
//! Nothing in this crate performs I/O: numbering, diffing, and summary
//! recomputation are plain functions so they can be exercised without a
//! database.

pub mod error;
pub mod pagination;
pub mod summary;
pub mod types;
pub mod version_diff;
pub mod versioning;
