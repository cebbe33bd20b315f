//! Stride Core - Foundational types for the Stride scheduler
//!
//! This crate provides the types every other Stride crate depends on:
//! - `LoopOptions` - Tunables for a fixed-step loop, loadable from TOML
//! - Error types and Result alias

mod error;
mod options;

pub use error::{Result, StrideError};
pub use options::{LoopOptions, DEFAULT_DELAY_CLAMP_MS};
