//! Structured-type descriptor model
//!
//! Pure data structures describing one resolved record-of, set-of, union or
//! record type: its element/field list, per-format applicability flags and
//! format-specific annotations. No file I/O or generation logic lives here.

pub mod attributes;
pub mod file;
pub mod rules;
pub mod types;

// Re-export commonly used types at the crate root
pub use attributes::*;
pub use file::*;
pub use rules::*;
pub use types::*;
