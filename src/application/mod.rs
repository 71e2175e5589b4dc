//! Application services layer.

pub mod blocks;
pub mod comments;
pub mod error;
pub mod export;
pub mod pagination;
pub mod posts;
pub mod render;
pub mod repos;
pub mod sitemap;
pub mod views;
