//! # Engine Configuration
//!
//! Runtime settings for the storage pool, the worker pool and the streaming
//! pipeline. Every field has a default, so a configuration file only needs to
//! name the values it changes:
//!
//! ```json
//! { "world_path": "saves/overworld", "max_open_files": 8 }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of region files kept open at once.
pub const DEFAULT_MAX_OPEN_FILES: usize = 32;

/// Default zstd level used for chunk payload frames.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Inclusive chunk-coordinate box that the raycaster treats as the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldBounds {
    pub min: [i32; 3],
    pub max: [i32; 3],
}

impl WorldBounds {
    /// Returns `true` if the chunk coordinate lies inside the box.
    pub fn contains(&self, chunk: [i32; 3]) -> bool {
        (0..3).all(|axis| chunk[axis] >= self.min[axis] && chunk[axis] <= self.max[axis])
    }
}

/// Settings shared by the region manager, the task manager and the streamer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the `r.{x}.{z}.vxr` region files.
    pub world_path: PathBuf,
    /// Capacity of the open region handle pool.
    pub max_open_files: usize,
    /// Number of worker threads used for chunk batches.
    pub worker_count: usize,
    /// zstd level for payload frames.
    pub compression_level: i32,
    /// Keep block data resident after a chunk has been uploaded.
    pub retain_cpu_data_after_mesh: bool,
    /// Optional hard limits for ray marching.
    pub world_bounds: Option<WorldBounds>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let worker_count = std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(4);

        Self {
            world_path: PathBuf::from("world"),
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            worker_count,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            retain_cpu_data_after_mesh: false,
            world_bounds: None,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
