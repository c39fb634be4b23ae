// maschera/src/lib.rs
//! # Maschera service
//!
//! Process-level plumbing around `maschera-core`: logger initialisation and
//! the wiring that turns validated `Settings` into a running pipeline.

pub mod app;
pub mod logger;

pub use app::build_lifecycle;
