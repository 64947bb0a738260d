//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take
//! a Postgres executor as the first argument. Passing `&PgPool` runs the
//! query on its own connection; passing `&mut *tx` runs it inside the
//! caller's transaction.

pub mod prompt_repo;
pub mod prompt_version_repo;

pub use prompt_repo::PromptRepo;
pub use prompt_version_repo::PromptVersionRepo;
