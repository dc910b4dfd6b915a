// src/commands/mod.rs
pub mod common;
pub mod scan;
pub mod transform;
