//! Helpers for documenting a pass.
//!
//! - **Hashing**: SHA-256 of staged files for chain of custody
//! - **Summary**: JSON summary of a finished pass
//!
//! ```no_run
//! use leapp_ingest::utils::hash::calculate_sha256;
//! use std::path::Path;
//!
//! # fn example() -> anyhow::Result<()> {
//! let staged = Path::new("/case/ModuleOutput/iLeapp/fs_1/private/var/mobile/Library/SMS/sms.db");
//!
//! match calculate_sha256(staged, 1024)? {
//!     Some(hash) => println!("SHA-256: {}", hash),
//!     None => println!("File exceeds size limit"),
//! }
//! # Ok(())
//! # }
//! ```

/// Cryptographic hash calculation utilities
pub mod hash;

/// Pass summary generation
pub mod summary;
