pub mod builder;
pub mod plan;
pub mod writer;
