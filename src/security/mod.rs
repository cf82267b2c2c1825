//! Security utilities for writing untrusted container content to disk.
//!
//! - Path validation to keep staged entries under the staging root
//! - Entry name sanitization

pub mod path_validator;

pub use path_validator::{
    is_unstageable_name, join_within, sanitize_entry_name, staging_relative_path,
};
