//! Structured-type code generation
//!
//! Resolves record-of, set-of, union and record descriptors, plans their five
//! wire codecs and emits Rust façades over `structgen_runtime` into an
//! explicit [`codegen::context::GenerationContext`].

pub mod codegen;
pub mod schema;
