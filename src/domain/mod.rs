//! Domain layer types and invariants.

pub mod blocks;
pub mod comments;
pub mod error;
pub mod graph;
pub mod ids;
pub mod posts;
pub mod profile;
pub mod toc;
