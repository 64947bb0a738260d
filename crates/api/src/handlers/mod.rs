pub mod prompts;
pub mod versions;
