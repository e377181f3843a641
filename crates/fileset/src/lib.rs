//! File categorization and ordering for deployment.
//!
//! Files are grouped by parent directory, assigned a [`Category`] relative to
//! the directory's inferred root name, and put in a total order that makes
//! sequential uploads land in the conventional "jar, pom, signatures,
//! metadata, extras" order on the server.

mod category;
mod file_set;
mod scanner;

pub use category::{Category, is_maven_metadata};
pub use file_set::FileSet;
pub use scanner::{PathFilter, relative_path, scan_directory};

/// Errors produced while scanning or filtering files.
#[derive(Debug, thiserror::Error)]
pub enum FileSetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("path {path} is outside {root}")]
    OutsideRoot { path: String, root: String },
}
