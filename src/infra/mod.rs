//! Infrastructure adapters and runtime bootstrap.

pub mod assets;
pub mod cache;
pub mod error;
pub mod http;
pub mod kv;
pub mod notion;
pub mod telemetry;
