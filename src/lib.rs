#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World Core
//!
//! Storage, meshing and streaming for a dense voxel world that is too large to keep
//! resident in memory.
//!
//! ## Key Modules
//!
//! * `voxels` - blocks, chunks, the chunk map, ray queries and the streaming pipeline
//! * `meshing` - greedy meshing of chunks into bit-packed vertex words
//! * `storage` - region files with a seek table, compressed chunk records and
//!   in-place compaction, plus a bounded pool of open region files
//! * `task_management` - the worker pool chunk batches run on
//! * `core` - shared resource handles
//! * `config` / `error` - engine settings and error types
//!
//! ## Data Flow
//!
//! 1. The streamer asks the region pool for the region file covering a chunk
//! 2. The region file decompresses and decodes the chunk's records into a block grid
//! 3. The mesher turns the grid and its resident neighbours into vertex words
//! 4. The words are handed to a [`MeshUploader`](voxels::streaming::MeshUploader)
//! 5. Edited chunks are encoded and written back, compacting the region as needed
//!
//! ## Usage
//!
//! ```no_run
//! use cgmath::Point3;
//! use voxel_world_core::config::EngineConfig;
//! use voxel_world_core::core::MtResource;
//! use voxel_world_core::voxels::streaming::{ChunkStreamer, RecordingUploader};
//! use voxel_world_core::voxels::world::World;
//!
//! voxel_world_core::init_logger();
//!
//! let config = EngineConfig::default();
//! let mut streamer = ChunkStreamer::new(&config, MtResource::new(World::new()));
//! let mut uploader = RecordingUploader::default();
//!
//! let positions = [Point3::new(0, 0, 0), Point3::new(1, 0, 0)];
//! streamer.load_chunks(&positions, &mut uploader);
//! streamer.mesh_chunks(&positions, &mut uploader);
//! ```

use log::info;

pub mod config;
pub mod core;
pub mod error;
pub mod meshing;
pub mod storage;
pub mod task_management;
pub mod voxels;

/// Installs an `env_logger` logger writing to stdout, filtered by `RUST_LOG`.
///
/// Calling it again after a logger is installed has no effect.
pub fn init_logger() {
    let mut log_builder = env_logger::Builder::new();
    let installed = log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .try_init()
        .is_ok();

    if installed {
        info!("Logger initialized");
    }
}
