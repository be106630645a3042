//! # Voxel World
//!
//! The in-memory side of the world: blocks, chunks, the chunk map, ray queries and
//! the streaming pipeline that moves chunks between disk, memory and the GPU.
//!
//! ## Architecture
//!
//! * **Block**: a type id plus a health byte, and the six face directions
//! * **Chunk**: a 32x32x32 block grid with per-column height maps and a residency state
//! * **World**: chunks keyed by chunk coordinate; neighbours are looked up by coordinate
//! * **Raycast**: DDA traversal across chunk boundaries
//! * **Tasks / Streaming**: per-chunk load, mesh and save work on the worker pool
//!
//! ## Thread Safety
//!
//! Chunks are shared as [`MtResource`](crate::core::MtResource) handles. Worker
//! tasks only take read locks while meshing; results that change chunk state are
//! applied on the thread driving the batch.

pub mod block;
pub mod chunk;
pub mod raycast;
pub mod streaming;
pub mod tasks;
pub mod world;
