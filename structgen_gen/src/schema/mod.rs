pub mod errors;
pub mod resolved;

pub use errors::ResolutionError;
pub use resolved::{ElementType, FieldPath, Format, ResolvedElement, ResolvedType, ResolvedTypeKind, TypeResolver};
