//! # Core Module
//!
//! Shared-ownership primitives used across the crate.
//!
//! - `MtResource`: thread-safe reference-counted value with read-write locking,
//!   used for the world and for every resident chunk.

pub mod mt_resource;

pub use mt_resource::MtResource;
