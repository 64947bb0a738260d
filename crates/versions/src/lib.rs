//! Prompt version lifecycle.
//!
//! [`VersionManager`] is the only writer of `prompt_versions`. It checks
//! prompt ownership, allocates version numbers under a row lock, keeps the
//! prompt's denormalized summary in sync, and reports failures as
//! [`CoreError`](yprompt_core::error::CoreError) values with no transport
//! semantics attached.

pub mod manager;
pub mod types;

pub use manager::{VersionManager, VersionManagerConfig};
pub use types::{
    CreatedVersion, HistoryQuery, NewVersion, RollbackOutcome, SavePrompt, SavedPrompt,
    VersionComparison, VersionPage,
};
