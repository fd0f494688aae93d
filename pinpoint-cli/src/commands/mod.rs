//! CLI command implementations.

pub mod common;
pub mod config;
pub mod decode;
pub mod demo;
pub mod template;
