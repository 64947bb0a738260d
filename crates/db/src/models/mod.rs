//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize`-free create/update inputs used by the repositories

pub mod prompt;
pub mod prompt_version;
