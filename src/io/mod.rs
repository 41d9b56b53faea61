//! File input and output around the engine.

pub mod export;
pub mod profile;
pub mod snapshot;
