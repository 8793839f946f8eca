//! tursoswap: convert a Supabase-backed HTML app to Turso
//!
//! This library exposes the rewriter and its file handling for the binary
//! and the integration tests. The main binary is at src/main.rs.

pub mod cli;
pub mod config;
pub mod diff_formatter;
pub mod error_helpers;
pub mod file_processor;
pub mod logger;
pub mod rewriter;
pub mod templates;

// Re-export commonly used types for convenience
pub use file_processor::{FileProcessor, ProcessedFile};
pub use rewriter::{
    ClientSettings, LineRewriter, Rewrite, RewriteError, RewriteReport, Rule, RuleHit, SettingsError,
};
