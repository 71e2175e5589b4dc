//! HTML views and template bindings.

pub mod views;
