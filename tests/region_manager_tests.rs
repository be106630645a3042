//! Region handle pool: eviction order, waiting on a full pool, chunk helpers.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use cgmath::Point3;
use voxel_world_core::storage::{RegionFileManager, RegionPos, IDLE_LOCK_COUNT};
use voxel_world_core::voxels::block::Block;
use voxel_world_core::voxels::chunk::BlockGrid;

use common::{same_types, temp_world};

#[test]
fn full_pool_evicts_the_least_recently_used_idle_region() {
    let world = temp_world("lru");
    let manager = RegionFileManager::new(2, 3);
    let a = RegionPos::new(0, 0, 0);
    let b = RegionPos::new(1, 0, 0);
    let c = RegionPos::new(2, 0, 0);

    manager.acquire(a, &world, false).unwrap().release().unwrap();
    manager.acquire(b, &world, false).unwrap().release().unwrap();
    // Touch `a` again so `b` becomes the oldest.
    manager.acquire(a, &world, false).unwrap().release().unwrap();

    manager.acquire(c, &world, false).unwrap().release().unwrap();

    assert_eq!(manager.open_regions(), 2);
    assert!(manager.is_open(a, &world));
    assert!(!manager.is_open(b, &world));
    assert!(manager.is_open(c, &world));
}

#[test]
fn busy_regions_are_never_evicted() {
    let world = temp_world("busy");
    let manager = RegionFileManager::new(2, 3);
    let a = RegionPos::new(0, 0, 0);
    let b = RegionPos::new(0, 0, 1);
    let c = RegionPos::new(0, 0, 2);

    let held = manager.acquire(a, &world, false).unwrap();
    manager.acquire(b, &world, false).unwrap().release().unwrap();

    // `a` is the least recently used but still leased, so `b` goes.
    manager.acquire(c, &world, false).unwrap().release().unwrap();
    assert!(manager.is_open(a, &world));
    assert!(!manager.is_open(b, &world));
    assert_eq!(manager.lock_count(a, &world), Some(IDLE_LOCK_COUNT + 1));

    held.release().unwrap();
    assert_eq!(manager.lock_count(a, &world), Some(IDLE_LOCK_COUNT));
}

#[test]
fn acquire_waits_while_every_region_is_leased() {
    let world = temp_world("wait");
    let manager = RegionFileManager::new(1, 3);
    let a = RegionPos::new(0, 0, 0);
    let b = RegionPos::new(5, 0, 5);
    let acquired = AtomicBool::new(false);

    let held = manager.acquire(a, &world, false).unwrap();

    std::thread::scope(|scope| {
        let waiter = scope.spawn(|| {
            let lease = manager.acquire(b, &world, false).unwrap();
            acquired.store(true, Ordering::SeqCst);
            lease.release().unwrap();
        });

        std::thread::sleep(Duration::from_millis(100));
        assert!(!acquired.load(Ordering::SeqCst));

        held.release().unwrap();
        waiter.join().unwrap();
    });

    assert!(acquired.load(Ordering::SeqCst));
    assert!(!manager.is_open(a, &world));
    assert!(manager.is_open(b, &world));
}

#[test]
fn chunk_helpers_round_trip_through_the_pool() {
    let world = temp_world("helpers");
    let manager = RegionFileManager::new(2, 3);
    let chunk = Point3::new(-1, 4, 33);
    let grid = BlockGrid::checkerboard(Block::new(6));

    assert!(manager.load_chunk(&world, chunk).unwrap().is_none());
    manager.save_chunk(&world, chunk, &grid).unwrap();
    let loaded = manager.load_chunk(&world, chunk).unwrap().unwrap();
    assert!(same_types(&grid, &loaded));

    let region = RegionPos::of_chunk(chunk);
    assert_eq!(region, RegionPos::new(-1, 4, 1));
    assert_eq!(region.path_in(&world), world.join("layer.4").join("r.-1.1.vxr"));
    assert!(region.path_in(&world).exists());

    manager.delete_chunk(&world, chunk).unwrap();
    assert!(manager.load_chunk(&world, chunk).unwrap().is_none());
}

#[test]
fn concurrent_saves_over_a_small_pool() {
    let world = temp_world("concurrent");
    let manager = RegionFileManager::new(2, 3);
    let chunks: Vec<Point3<i32>> = (0..4)
        .flat_map(|region| (0..4).map(move |i| Point3::new(region * 32 + i, 0, 0)))
        .collect();

    std::thread::scope(|scope| {
        for (i, &chunk) in chunks.iter().enumerate() {
            let manager = &manager;
            let world = &world;
            scope.spawn(move || {
                let grid = BlockGrid::filled(Block::new(i as u16 + 1));
                manager.save_chunk(world, chunk, &grid).unwrap();
            });
        }
    });

    assert!(manager.open_regions() <= 2);
    manager.close_all().unwrap();

    for (i, &chunk) in chunks.iter().enumerate() {
        let loaded = manager.load_chunk(&world, chunk).unwrap().unwrap();
        assert_eq!(loaded.get(0, 0, 0), Block::new(i as u16 + 1));
        assert_eq!(loaded.block_count(), 32 * 32 * 32);
    }
}
