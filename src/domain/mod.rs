//! Domain types - plain values independent of how git is driven

pub mod branch;
pub mod tag;

pub use branch::BranchExistence;
pub use tag::TagSpec;
