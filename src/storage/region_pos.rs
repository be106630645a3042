//! Mapping from chunk coordinates to region files.
//!
//! A region covers a 32x32 footprint of chunks in the X/Z plane for a single
//! vertical chunk layer. Inside a region, chunks are addressed by the seek table
//! index `local_z * 32 + local_x`.
//!
//! Region files are named `r.{x}.{z}.vxr` after their horizontal coordinates.
//! Layer 0 lives directly in the world directory; every other layer gets its own
//! `layer.{y}` subdirectory:
//!
//! ```text
//! world/r.0.-1.vxr          chunks (0..32, 0, -32..0)
//! world/layer.-2/r.0.-1.vxr chunks (0..32, -2, -32..0)
//! ```

use std::path::{Path, PathBuf};

use cgmath::Point3;

/// Chunks per region along X and along Z.
pub const REGION_DIMENSION: i32 = 32;
/// Seek table entries per region.
pub const REGION_CHUNK_COUNT: usize = (REGION_DIMENSION * REGION_DIMENSION) as usize;
/// Extension of region files.
pub const REGION_EXTENSION: &str = "vxr";
/// Prefix of the subdirectories holding vertical layers other than 0.
pub const LAYER_DIRECTORY_PREFIX: &str = "layer";

/// Coordinates of a region file.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RegionPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl RegionPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        RegionPos { x, y, z }
    }

    /// Region containing the chunk at `chunk`.
    pub fn of_chunk(chunk: Point3<i32>) -> Self {
        RegionPos {
            x: chunk.x.div_euclid(REGION_DIMENSION),
            y: chunk.y,
            z: chunk.z.div_euclid(REGION_DIMENSION),
        }
    }

    /// Seek table index of `chunk` inside its region.
    pub fn local_index(chunk: Point3<i32>) -> usize {
        let local_x = chunk.x.rem_euclid(REGION_DIMENSION) as usize;
        let local_z = chunk.z.rem_euclid(REGION_DIMENSION) as usize;
        local_z * REGION_DIMENSION as usize + local_x
    }

    /// File name of this region, `r.{x}.{z}.vxr`.
    pub fn file_name(&self) -> String {
        format!("r.{}.{}.{}", self.x, self.z, REGION_EXTENSION)
    }

    /// Full path of this region below `world_path`.
    pub fn path_in<P: AsRef<Path>>(&self, world_path: P) -> PathBuf {
        let world_path = world_path.as_ref();
        if self.y == 0 {
            world_path.join(self.file_name())
        } else {
            world_path
                .join(format!("{}.{}", LAYER_DIRECTORY_PREFIX, self.y))
                .join(self.file_name())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_chunks_round_down() {
        let region = RegionPos::of_chunk(Point3::new(-1, -3, 31));
        assert_eq!(region, RegionPos::new(-1, -3, 0));
        assert_eq!(RegionPos::local_index(Point3::new(-1, -3, 31)), 31 * 32 + 31);
    }

    #[test]
    fn ground_layer_sits_in_the_world_directory() {
        let region = RegionPos::of_chunk(Point3::new(64, 0, -33));
        assert_eq!(region.file_name(), "r.2.-2.vxr");
        assert_eq!(region.path_in("saves"), Path::new("saves").join("r.2.-2.vxr"));
    }

    #[test]
    fn other_layers_get_a_subdirectory() {
        let region = RegionPos::of_chunk(Point3::new(64, -3, -33));
        assert_eq!(region.file_name(), "r.2.-2.vxr");
        assert_eq!(
            region.path_in("saves"),
            Path::new("saves").join("layer.-3").join("r.2.-2.vxr")
        );
        assert_ne!(
            region.path_in("saves"),
            RegionPos::new(2, 3, -2).path_in("saves")
        );
    }

    #[test]
    fn local_indices_cover_the_table() {
        assert_eq!(RegionPos::local_index(Point3::new(0, 0, 0)), 0);
        assert_eq!(
            RegionPos::local_index(Point3::new(31, 0, 31)),
            REGION_CHUNK_COUNT - 1
        );
    }
}
