//! # Voxel Raycaster
//!
//! Grid traversal after Amanatides and Woo. The ray visits every cell it passes
//! through in order, stepping one cell per iteration along whichever axis reaches
//! its next boundary first.
//!
//! The cursor is kept as a chunk position plus a chunk-relative cell. The chunk
//! (and its read lock) is only looked up again when a step leaves the current
//! chunk, so the inner loop is plain integer arithmetic on the locked grid.

use cgmath::{InnerSpace, Point3, Vector3};

use crate::config::WorldBounds;
use crate::voxels::block::Block;
use crate::voxels::chunk::CHUNK_DIMENSION;
use crate::voxels::world::World;

/// A coordinate axis.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn from_index(index: usize) -> Self {
        match index {
            0 => Axis::X,
            1 => Axis::Y,
            _ => Axis::Z,
        }
    }
}

/// Outcome of a ray march.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    pub hit: bool,
    /// Axis of the last boundary crossed before the hit. `None` when the ray
    /// started inside a solid block, or missed.
    pub axis: Option<Axis>,
    /// World block coordinate of the block that was hit.
    pub block_position: Option<Point3<i32>>,
    pub block: Option<Block>,
    /// Distance along the ray at which the hit cell was entered.
    pub distance: f32,
}

impl RayHit {
    pub const MISS: RayHit = RayHit {
        hit: false,
        axis: None,
        block_position: None,
        block: None,
        distance: 0.0,
    };
}

/// Marches rays through the resident chunks of a world.
pub struct VoxelRaycaster<'a> {
    world: &'a World,
    bounds: Option<WorldBounds>,
}

impl<'a> VoxelRaycaster<'a> {
    pub fn new(world: &'a World) -> Self {
        VoxelRaycaster {
            world,
            bounds: None,
        }
    }

    /// Limits marching to chunks inside `bounds`.
    pub fn with_bounds(mut self, bounds: Option<WorldBounds>) -> Self {
        self.bounds = bounds;
        self
    }

    /// Marches from `origin` (world block units) along `direction` for at most
    /// `max_distance`. Leaving the loaded world ends the march with a miss.
    pub fn march(&self, origin: Point3<f32>, direction: Vector3<f32>, max_distance: f32) -> RayHit {
        let length2 = direction.magnitude2();
        if max_distance <= 0.0 || length2 == 0.0 || !length2.is_finite() {
            return RayHit::MISS;
        }
        let direction = direction.normalize();
        let size = CHUNK_DIMENSION as i32;

        let origin = [origin.x, origin.y, origin.z];
        let dir = [direction.x, direction.y, direction.z];

        let mut chunk = [0i32; 3];
        let mut local = [0i32; 3];
        let mut step = [0i32; 3];
        let mut t_max = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];

        for axis in 0..3 {
            let cell = origin[axis].floor() as i32;
            chunk[axis] = cell.div_euclid(size);
            local[axis] = cell.rem_euclid(size);

            if dir[axis] > 0.0 {
                step[axis] = 1;
                t_delta[axis] = 1.0 / dir[axis];
                t_max[axis] = (cell as f32 + 1.0 - origin[axis]) * t_delta[axis];
            } else if dir[axis] < 0.0 {
                step[axis] = -1;
                t_delta[axis] = -1.0 / dir[axis];
                t_max[axis] = (origin[axis] - cell as f32) * t_delta[axis];
            }
        }

        let mut last_axis: Option<usize> = None;
        let mut distance = 0.0f32;

        loop {
            if let Some(bounds) = &self.bounds {
                if !bounds.contains(chunk) {
                    return RayHit::MISS;
                }
            }
            let Some(resource) = self
                .world
                .get_chunk_at(Point3::new(chunk[0], chunk[1], chunk[2]))
            else {
                return RayHit::MISS;
            };
            let guard = resource.get();
            let Some(grid) = guard.grid() else {
                return RayHit::MISS;
            };

            loop {
                let block = grid.get(local[0] as usize, local[1] as usize, local[2] as usize);
                if !block.is_empty() {
                    return RayHit {
                        hit: true,
                        axis: last_axis.map(Axis::from_index),
                        block_position: Some(Point3::new(
                            chunk[0] * size + local[0],
                            chunk[1] * size + local[1],
                            chunk[2] * size + local[2],
                        )),
                        block: Some(block),
                        distance,
                    };
                }

                let axis = if t_max[0] < t_max[1] {
                    if t_max[0] < t_max[2] { 0 } else { 2 }
                } else if t_max[1] < t_max[2] {
                    1
                } else {
                    2
                };

                if t_max[axis] > max_distance {
                    return RayHit::MISS;
                }

                distance = t_max[axis];
                t_max[axis] += t_delta[axis];
                local[axis] += step[axis];
                last_axis = Some(axis);

                if local[axis] == size {
                    local[axis] = 0;
                    chunk[axis] += 1;
                    break;
                }
                if local[axis] < 0 {
                    local[axis] = size - 1;
                    chunk[axis] -= 1;
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxels::chunk::Chunk;

    fn world_with(blocks: &[Point3<i32>]) -> World {
        let mut world = World::new();
        world.insert_chunk(Chunk::empty(Point3::new(0, 0, 0)));
        world.insert_chunk(Chunk::empty(Point3::new(1, 0, 0)));
        for &block in blocks {
            world.set_block_at(block, Block::new(1));
        }
        world
    }

    #[test]
    fn hits_block_along_x() {
        let world = world_with(&[Point3::new(2, 0, 0)]);
        let hit = VoxelRaycaster::new(&world).march(
            Point3::new(0.5, 0.5, 0.5),
            Vector3::new(1.0, 0.0, 0.0),
            3.0,
        );
        assert!(hit.hit);
        assert_eq!(hit.axis, Some(Axis::X));
        assert_eq!(hit.block_position, Some(Point3::new(2, 0, 0)));
        assert!((hit.distance - 1.5).abs() < 1e-5);
    }

    #[test]
    fn empty_path_misses() {
        let world = world_with(&[]);
        let hit = VoxelRaycaster::new(&world).march(
            Point3::new(0.5, 0.5, 0.5),
            Vector3::new(1.0, 0.0, 0.0),
            3.0,
        );
        assert!(!hit.hit);
    }

    #[test]
    fn crosses_chunk_boundaries() {
        let world = world_with(&[Point3::new(40, 0, 0)]);
        let hit = VoxelRaycaster::new(&world).march(
            Point3::new(30.5, 0.5, 0.5),
            Vector3::new(1.0, 0.0, 0.0),
            20.0,
        );
        assert!(hit.hit);
        assert_eq!(hit.block_position, Some(Point3::new(40, 0, 0)));
    }

    #[test]
    fn leaving_loaded_chunks_misses() {
        let world = world_with(&[]);
        let hit = VoxelRaycaster::new(&world).march(
            Point3::new(0.5, 0.5, 0.5),
            Vector3::new(-1.0, 0.0, 0.0),
            100.0,
        );
        assert!(!hit.hit);
    }

    #[test]
    fn bounds_cut_the_world() {
        let world = world_with(&[Point3::new(40, 0, 0)]);
        let bounds = WorldBounds {
            min: [0, 0, 0],
            max: [0, 0, 0],
        };
        let hit = VoxelRaycaster::new(&world).with_bounds(Some(bounds)).march(
            Point3::new(30.5, 0.5, 0.5),
            Vector3::new(1.0, 0.0, 0.0),
            20.0,
        );
        assert!(!hit.hit);
    }

    #[test]
    fn degenerate_rays_miss() {
        let world = world_with(&[Point3::new(0, 0, 0)]);
        let raycaster = VoxelRaycaster::new(&world);
        assert!(!raycaster.march(Point3::new(0.5, 0.5, 0.5), Vector3::new(0.0, 0.0, 0.0), 3.0).hit);
        assert!(!raycaster.march(Point3::new(0.5, 0.5, 0.5), Vector3::new(1.0, 0.0, 0.0), 0.0).hit);
    }

    #[test]
    fn starting_inside_a_block_has_no_axis() {
        let world = world_with(&[Point3::new(0, 0, 0)]);
        let hit = VoxelRaycaster::new(&world).march(
            Point3::new(0.5, 0.5, 0.5),
            Vector3::new(0.0, 1.0, 0.0),
            3.0,
        );
        assert!(hit.hit);
        assert_eq!(hit.axis, None);
    }
}
