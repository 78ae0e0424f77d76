//! Component 3 – outputs.
pub mod bin;
pub mod json;
