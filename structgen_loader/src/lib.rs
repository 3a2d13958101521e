//! Descriptor File Loading and Import Resolution
//!
//! Loads descriptor files from disk, follows their path imports and merges
//! the resulting type descriptors for resolution and generation.

pub mod flatten;
pub mod resolver;

pub use flatten::{flatten, flatten_to_yaml, normalize_type_refs};
pub use resolver::{parse_descriptor_file, ImportResolver};

// Re-export structgen_types for convenience
pub use structgen_types;
