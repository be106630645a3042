#![allow(dead_code)]

use std::path::PathBuf;

use voxel_world_core::voxels::chunk::{BlockGrid, CHUNK_DIMENSION};

/// Fresh, empty directory under the system temp dir.
pub fn temp_world(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("voxel-world-{}-{}", name, fastrand::u64(..)));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Compares two grids cell by cell, ignoring health.
pub fn same_types(a: &BlockGrid, b: &BlockGrid) -> bool {
    for z in 0..CHUNK_DIMENSION {
        for x in 0..CHUNK_DIMENSION {
            for y in 0..CHUNK_DIMENSION {
                if a.get(x, y, z).block_type != b.get(x, y, z).block_type {
                    return false;
                }
            }
        }
    }
    a.block_count() == b.block_count()
        && a.min_heights() == b.min_heights()
        && a.max_heights() == b.max_heights()
}
