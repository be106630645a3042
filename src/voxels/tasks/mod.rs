//! # Voxel Task System
//!
//! Per-chunk tasks run by the [`TaskManager`](crate::task_management::TaskManager)
//! on behalf of the [`ChunkStreamer`](crate::voxels::streaming::ChunkStreamer).
//! Each task does its heavy lifting (disk I/O, decompression, meshing) on a worker
//! and applies the outcome to the world on the driving thread.

pub mod chunk_load_task;
pub mod chunk_mesh_task;
pub mod chunk_save_task;
