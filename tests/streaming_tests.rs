//! Save, unload, load and mesh batches driven through the worker pool.

mod common;

use cgmath::{Point3, Vector3};
use voxel_world_core::config::EngineConfig;
use voxel_world_core::core::MtResource;
use voxel_world_core::voxels::block::Block;
use voxel_world_core::voxels::chunk::{BlockGrid, Chunk, ChunkState};
use voxel_world_core::voxels::raycast::{Axis, VoxelRaycaster};
use voxel_world_core::voxels::streaming::{ChunkStreamer, RecordingUploader};
use voxel_world_core::voxels::world::World;

use common::{same_types, temp_world};

fn config(name: &str) -> EngineConfig {
    EngineConfig {
        world_path: temp_world(name),
        max_open_files: 2,
        worker_count: 3,
        ..EngineConfig::default()
    }
}

fn grid_of(world: &MtResource<World>, position: Point3<i32>) -> BlockGrid {
    let chunk = world.get().get_chunk_at(position).unwrap();
    let guard = chunk.get();
    guard.grid().unwrap().clone()
}

#[test]
fn chunks_survive_a_full_round_trip() {
    voxel_world_core::init_logger();
    let config = config("round-trip");
    let world = MtResource::new(World::new());
    let positions = [
        Point3::new(0, 0, 0),
        Point3::new(1, 0, 0),
        Point3::new(40, -2, 7),
    ];
    {
        let mut world = world.get_mut();
        world.insert_chunk(Chunk::solid(positions[0], 1));
        world.insert_chunk(Chunk::checkerboard(positions[1], 2));
        world.insert_chunk(Chunk::random(positions[2], 99));
    }
    let originals: Vec<BlockGrid> = positions.iter().map(|&p| grid_of(&world, p)).collect();

    let mut streamer = ChunkStreamer::new(&config, world.clone());
    let mut uploader = RecordingUploader::default();

    let saved = streamer.save_chunks(&positions, &mut uploader);
    assert!(saved.is_success());
    assert_eq!(saved.completed.len(), 3);
    assert!(positions
        .iter()
        .all(|&p| !world.get().get_chunk_at(p).unwrap().get().dirty));

    let unloaded = streamer.unload_chunks(&positions, &mut uploader);
    assert!(unloaded.is_success());
    assert!(world.get().is_empty());
    assert_eq!(uploader.unloaded.len(), 3);

    let missing = Point3::new(5, 5, 5);
    let mut requested = positions.to_vec();
    requested.push(missing);
    let loaded = streamer.load_chunks(&requested, &mut uploader);
    assert!(loaded.is_success());
    assert_eq!(loaded.completed.len(), 3);
    assert_eq!(loaded.skipped, vec![missing]);
    assert_eq!(world.get().len(), 3);

    for (position, original) in positions.iter().zip(&originals) {
        let chunk = world.get().get_chunk_at(*position).unwrap();
        assert_eq!(chunk.get().state, ChunkState::OnCpu);
        assert!(!chunk.get().dirty);
        assert!(same_types(original, &grid_of(&world, *position)));
    }
}

#[test]
fn meshing_uploads_and_releases_clean_chunks() {
    let config = config("mesh");
    let world = MtResource::new(World::new());
    let clean = Point3::new(0, 0, 0);
    let edited = Point3::new(1, 0, 0);
    {
        let mut world = world.get_mut();
        world.insert_chunk(Chunk::loaded(clean, BlockGrid::filled(Block::new(1))));
        world.insert_chunk(Chunk::loaded(edited, BlockGrid::filled(Block::new(1))));
    }
    assert!(world
        .get()
        .set_block_at(Point3::new(40, 3, 3), Block::new(2)));

    let mut streamer = ChunkStreamer::new(&config, world.clone());
    let mut uploader = RecordingUploader::default();
    let report = streamer.mesh_chunks(&[clean, edited, Point3::new(9, 9, 9)], &mut uploader);

    assert!(report.is_success());
    assert_eq!(report.completed.len(), 2);
    assert_eq!(uploader.uploads, 2);

    // The seam between two chunks of the same type is culled.
    let clean_mesh = &uploader.meshes[&clean];
    assert_eq!(clean_mesh.vertex_count, 5 * 6);
    assert_eq!(clean_mesh.bytes.len(), 5 * 6 * 4);

    let clean_chunk = world.get().get_chunk_at(clean).unwrap();
    assert_eq!(clean_chunk.get().state, ChunkState::OnGpu);
    assert!(clean_chunk.get().grid.is_none());
    assert_eq!(clean_chunk.get().last_vertex_count, 30);

    let edited_chunk = world.get().get_chunk_at(edited).unwrap();
    assert_eq!(edited_chunk.get().state, ChunkState::OnCpu);
    assert!(edited_chunk.get().dirty);

    // Unloading saves the edit before dropping the chunk.
    let report = streamer.unload_chunks(&[clean, edited], &mut uploader);
    assert!(report.is_success());
    assert!(uploader.meshes.is_empty());

    streamer.load_chunks(&[edited], &mut uploader);
    assert_eq!(
        world.get().block_at(Point3::new(40, 3, 3)),
        Some(Block::new(2))
    );
}

#[test]
fn retained_chunks_stay_queryable() {
    let config = EngineConfig {
        retain_cpu_data_after_mesh: true,
        ..config("retain")
    };
    let world = MtResource::new(World::new());
    {
        let mut world = world.get_mut();
        world.insert_chunk(Chunk::empty(Point3::new(0, 0, 0)));
        world.insert_chunk(Chunk::empty(Point3::new(1, 0, 0)));
        world.set_block_at(Point3::new(2, 0, 0), Block::new(3));
    }
    let mut streamer = ChunkStreamer::new(&config, world.clone());
    let mut uploader = RecordingUploader::default();
    streamer.save_chunks(&[Point3::new(0, 0, 0), Point3::new(1, 0, 0)], &mut uploader);
    streamer.mesh_chunks(&[Point3::new(0, 0, 0), Point3::new(1, 0, 0)], &mut uploader);
    streamer.flush().unwrap();

    // The empty chunk has nothing to upload but still counts as meshed.
    assert_eq!(uploader.meshes[&Point3::new(1, 0, 0)].vertex_count, 0);

    let world = world.get();
    let hit = VoxelRaycaster::new(&world).with_bounds(config.world_bounds).march(
        Point3::new(0.5, 0.5, 0.5),
        Vector3::new(1.0, 0.0, 0.0),
        3.0,
    );
    assert!(hit.hit);
    assert_eq!(hit.axis, Some(Axis::X));
    assert_eq!(hit.block, Some(Block::new(3)));
    assert!((hit.distance - 1.5).abs() < 1e-5);
}

#[test]
fn non_resident_neighbours_expose_the_seam() {
    let config = config("seam");
    let world = MtResource::new(World::new());
    let left = Point3::new(0, 0, 0);
    let right = Point3::new(1, 0, 0);
    {
        let mut world = world.get_mut();
        world.insert_chunk(Chunk::loaded(left, BlockGrid::filled(Block::new(1))));
        world.insert_chunk(Chunk::loaded(right, BlockGrid::filled(Block::new(1))));
    }
    let mut streamer = ChunkStreamer::new(&config, world.clone());
    let mut uploader = RecordingUploader::default();

    // Both resident: the shared face is culled, then `left` moves to the GPU.
    streamer.mesh_chunks(&[left], &mut uploader);
    assert_eq!(uploader.meshes[&left].vertex_count, 5 * 6);
    let left_chunk = world.get().get_chunk_at(left).unwrap();
    assert_eq!(left_chunk.get().state, ChunkState::OnGpu);

    // An `OnGpu` neighbour reads as air.
    streamer.mesh_chunks(&[right], &mut uploader);
    assert_eq!(uploader.meshes[&right].vertex_count, 6 * 6);

    // So does an `OnDisk` one.
    let right_chunk = world.get().get_chunk_at(right).unwrap();
    right_chunk.get_mut().release_to_disk();
    assert_eq!(right_chunk.get().state, ChunkState::OnDisk);
    world
        .get_mut()
        .insert_chunk(Chunk::loaded(left, BlockGrid::filled(Block::new(1))));
    let report = streamer.mesh_chunks(&[left], &mut uploader);
    assert_eq!(report.completed, vec![left]);
    assert_eq!(uploader.meshes[&left].vertex_count, 6 * 6);
}
