//! Small cross-cutting utilities.
//!
//! - [`fs`] - directory creation, atomic writes and content digests

pub mod fs;

pub use fs::{atomic_write, ensure_dir, sha256_hex};
