//! # Region File Manager
//!
//! A bounded pool of open region files shared by every thread that loads or saves
//! chunks.
//!
//! ## Locking
//!
//! Two independent levels of synchronisation are involved:
//!
//! * The pool map sits behind an `RwLock`. Lookups of already open regions take the
//!   shared side; opening, evicting and removing regions take the exclusive side.
//! * Each [`RegionHandle`] carries a lock count and a `Mutex` around its
//!   [`RegionFile`]. The count starts at [`IDLE_LOCK_COUNT`], the pool's own
//!   reference, and goes up by one per outstanding [`RegionLease`]. The mutex
//!   serialises access to the file cursor and seek table.
//!
//! Lock counts are only ever raised while the pool lock is held, so a handle seen
//! idle under the exclusive pool lock cannot be picked up by anyone else before it
//! is evicted.
//!
//! ## Eviction
//!
//! When the pool is full, the least recently acquired idle handle is closed. Busy
//! handles are never evicted; if all of them are busy the caller blocks until a
//! lease is released.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};

use cgmath::Point3;
use log::{debug, info, warn};
use lru::LruCache;
use web_time::Instant;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::voxels::chunk::BlockGrid;

use super::region_file::RegionFile;
use super::region_pos::RegionPos;

/// Lock count of a handle that nobody but the pool references.
pub const IDLE_LOCK_COUNT: usize = 1;

/// An open region file as tracked by the pool.
pub struct RegionHandle {
    region: RegionPos,
    path: PathBuf,
    lock_count: AtomicUsize,
    last_access: Mutex<Instant>,
    desynchronized: AtomicBool,
    file: Mutex<RegionFile>,
}

impl RegionHandle {
    fn new(region: RegionPos, path: PathBuf, file: RegionFile) -> Self {
        RegionHandle {
            region,
            path,
            lock_count: AtomicUsize::new(IDLE_LOCK_COUNT),
            last_access: Mutex::new(Instant::now()),
            desynchronized: AtomicBool::new(false),
            file: Mutex::new(file),
        }
    }

    pub fn region(&self) -> RegionPos {
        self.region
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_count(&self) -> usize {
        self.lock_count.load(Ordering::SeqCst)
    }

    pub fn is_idle(&self) -> bool {
        self.lock_count() == IDLE_LOCK_COUNT
    }

    /// Time of the last acquire or release.
    ///
    /// # Panics
    /// Panics if the timestamp mutex is poisoned.
    pub fn last_access(&self) -> Instant {
        *self.last_access.lock().unwrap()
    }

    fn touch(&self) {
        *self.last_access.lock().unwrap() = Instant::now();
    }
}

/// Pool of open region files.
pub struct RegionFileManager {
    handles: RwLock<HashMap<PathBuf, Arc<RegionHandle>>>,
    recency: Mutex<LruCache<PathBuf, ()>>,
    releases: Mutex<u64>,
    released: Condvar,
    max_open_files: usize,
    compression_level: i32,
}

impl RegionFileManager {
    /// Creates an empty pool holding at most `max_open_files` regions.
    pub fn new(max_open_files: usize, compression_level: i32) -> Self {
        let max_open_files = max_open_files.max(1);
        info!("region file pool created with capacity {}", max_open_files);
        RegionFileManager {
            handles: RwLock::new(HashMap::new()),
            recency: Mutex::new(LruCache::unbounded()),
            releases: Mutex::new(0),
            released: Condvar::new(),
            max_open_files,
            compression_level,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_open_files, config.compression_level)
    }

    pub fn max_open_files(&self) -> usize {
        self.max_open_files
    }

    /// Number of regions currently open.
    ///
    /// # Panics
    /// Panics if the pool lock is poisoned.
    pub fn open_regions(&self) -> usize {
        self.handles.read().unwrap().len()
    }

    /// Returns `true` if the region is open in the pool.
    pub fn is_open(&self, region: RegionPos, world_path: &Path) -> bool {
        self.handles
            .read()
            .unwrap()
            .contains_key(&region.path_in(world_path))
    }

    /// Current lock count of an open region.
    pub fn lock_count(&self, region: RegionPos, world_path: &Path) -> Option<usize> {
        self.handles
            .read()
            .unwrap()
            .get(&region.path_in(world_path))
            .map(|handle| handle.lock_count())
    }

    /// Acquires a lease on `region`, opening (or creating) its file if needed.
    ///
    /// A lease taken `for_write` flushes the seek table when it is released. The
    /// call blocks while the pool is full and every open handle is leased.
    ///
    /// # Panics
    /// Panics if one of the pool locks is poisoned.
    pub fn acquire(
        &self,
        region: RegionPos,
        world_path: &Path,
        for_write: bool,
    ) -> Result<RegionLease<'_>> {
        let path = region.path_in(world_path);

        loop {
            {
                let handles = self.handles.read().unwrap();
                if let Some(handle) = handles.get(&path) {
                    if !handle.desynchronized.load(Ordering::SeqCst) {
                        return Ok(self.lease(handle, for_write));
                    }
                }
            }

            let generation = *self.releases.lock().unwrap();
            let mut handles = self.handles.write().unwrap();

            if let Some(handle) = handles.get(&path).cloned() {
                if !handle.desynchronized.load(Ordering::SeqCst) {
                    return Ok(self.lease(&handle, for_write));
                }
                if handle.is_idle() {
                    debug!("dropping desynchronised region {:?}", path);
                    handles.remove(&path);
                    self.recency.lock().unwrap().pop(&path);
                } else {
                    drop(handles);
                    self.wait_for_release(generation);
                    continue;
                }
            }

            if handles.len() >= self.max_open_files && !self.evict_one(&mut handles) {
                drop(handles);
                self.wait_for_release(generation);
                continue;
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = RegionFile::open(&path, self.compression_level)?;
            let handle = Arc::new(RegionHandle::new(region, path.clone(), file));
            handles.insert(path.clone(), Arc::clone(&handle));
            return Ok(self.lease(&handle, for_write));
        }
    }

    /// Bumps the lock count of `handle`. Must be called with the pool lock held.
    fn lease(&self, handle: &Arc<RegionHandle>, for_write: bool) -> RegionLease<'_> {
        handle.lock_count.fetch_add(1, Ordering::SeqCst);
        handle.touch();
        let mut recency = self.recency.lock().unwrap();
        if recency.contains(&handle.path) {
            recency.promote(&handle.path);
        } else {
            recency.push(handle.path.clone(), ());
        }

        RegionLease {
            manager: self,
            handle: Arc::clone(handle),
            dirty: for_write,
            released: false,
        }
    }

    /// Closes the least recently used idle handle. Returns `false` if every handle
    /// is busy.
    fn evict_one(&self, handles: &mut HashMap<PathBuf, Arc<RegionHandle>>) -> bool {
        let mut recency = self.recency.lock().unwrap();
        let victim = recency
            .iter()
            .rev()
            .map(|(path, _)| path)
            .find(|path| handles.get(*path).is_some_and(|handle| handle.is_idle()))
            .cloned();

        match victim {
            Some(path) => {
                recency.pop(&path);
                if let Some(handle) = handles.remove(&path) {
                    if let Err(e) = handle.file.lock().unwrap().flush() {
                        warn!("flushing evicted region {:?} failed: {}", path, e);
                    }
                }
                debug!("evicted region file {:?}", path);
                true
            }
            None => false,
        }
    }

    fn wait_for_release(&self, generation: u64) {
        let releases = self.releases.lock().unwrap();
        let _releases = self
            .released
            .wait_while(releases, |current| *current == generation)
            .unwrap();
    }

    fn notify_release(&self) {
        *self.releases.lock().unwrap() += 1;
        self.released.notify_all();
    }

    fn release_handle(&self, handle: &Arc<RegionHandle>, dirty: bool) -> Result<()> {
        let result = {
            let mut file = handle.file.lock().unwrap();
            let result = if dirty && !file.is_desynchronized() {
                file.flush()
            } else {
                Ok(())
            };
            if file.is_desynchronized() {
                handle.desynchronized.store(true, Ordering::SeqCst);
            }
            result
        };

        handle.touch();
        let previous = handle.lock_count.fetch_sub(1, Ordering::SeqCst);
        if previous <= IDLE_LOCK_COUNT {
            panic!(
                "region {:?} released below its idle lock count ({})",
                handle.path, previous
            );
        }

        if handle.desynchronized.load(Ordering::SeqCst) {
            self.remove_if_idle(handle);
        }
        self.notify_release();
        result
    }

    fn remove_if_idle(&self, handle: &Arc<RegionHandle>) {
        let mut handles = self.handles.write().unwrap();
        let current = handles
            .get(&handle.path)
            .is_some_and(|open| Arc::ptr_eq(open, handle) && open.is_idle());
        if current {
            handles.remove(&handle.path);
            self.recency.lock().unwrap().pop(&handle.path);
            debug!("removed desynchronised region {:?}", handle.path);
        }
    }

    /// Reads one chunk, `None` if it was never saved.
    pub fn load_chunk(&self, world_path: &Path, chunk: Point3<i32>) -> Result<Option<BlockGrid>> {
        let lease = self.acquire(RegionPos::of_chunk(chunk), world_path, false)?;
        let result = lease.file().read_chunk(RegionPos::local_index(chunk));
        lease.release()?;
        result
    }

    /// Writes one chunk and flushes its region's seek table.
    pub fn save_chunk(
        &self,
        world_path: &Path,
        chunk: Point3<i32>,
        grid: &BlockGrid,
    ) -> Result<()> {
        let lease = self.acquire(RegionPos::of_chunk(chunk), world_path, true)?;
        let result = lease
            .file()
            .write_chunk(RegionPos::local_index(chunk), grid);
        let released = lease.release();
        result.and(released)
    }

    /// Removes one chunk from its region.
    pub fn delete_chunk(&self, world_path: &Path, chunk: Point3<i32>) -> Result<()> {
        let lease = self.acquire(RegionPos::of_chunk(chunk), world_path, true)?;
        let result = lease.file().delete_chunk(RegionPos::local_index(chunk));
        let released = lease.release();
        result.and(released)
    }

    /// Flushes every open, synchronised region. Returns the first error.
    pub fn flush_all(&self) -> Result<()> {
        let handles: Vec<_> = self.handles.read().unwrap().values().cloned().collect();
        let mut first_error = None;
        for handle in handles {
            let mut file = handle.file.lock().unwrap();
            if file.is_desynchronized() {
                continue;
            }
            if let Err(e) = file.flush() {
                warn!("flushing region {:?} failed: {}", handle.path, e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Flushes and closes every idle region. Leased regions stay open.
    pub fn close_all(&self) -> Result<()> {
        let mut handles = self.handles.write().unwrap();
        let mut recency = self.recency.lock().unwrap();
        let mut first_error = None;

        let idle: Vec<PathBuf> = handles
            .iter()
            .filter(|(_, handle)| handle.is_idle())
            .map(|(path, _)| path.clone())
            .collect();

        for path in idle {
            if let Some(handle) = handles.remove(&path) {
                recency.pop(&path);
                let mut file = handle.file.lock().unwrap();
                if !file.is_desynchronized() {
                    if let Err(e) = file.flush() {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        if !handles.is_empty() {
            warn!("{} region files still leased at close", handles.len());
        }
        debug!("closed idle region files");
        first_error.map_or(Ok(()), Err)
    }
}

/// Shared access to one open region, returned by [`RegionFileManager::acquire`].
///
/// Dropping a lease releases it; [`RegionLease::release`] does the same but reports
/// the result of the final flush.
pub struct RegionLease<'a> {
    manager: &'a RegionFileManager,
    handle: Arc<RegionHandle>,
    dirty: bool,
    released: bool,
}

impl RegionLease<'_> {
    /// Exclusive access to the region file for the duration of the guard.
    ///
    /// # Panics
    /// Panics if the file mutex is poisoned.
    pub fn file(&self) -> MutexGuard<'_, RegionFile> {
        self.handle.file.lock().unwrap()
    }

    pub fn region(&self) -> RegionPos {
        self.handle.region
    }

    /// Releases the lease, flushing first if it was taken for writing.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.manager.release_handle(&self.handle, self.dirty)
    }
}

impl Drop for RegionLease<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.released = true;
            if let Err(e) = self.manager.release_handle(&self.handle, self.dirty) {
                warn!("releasing region {:?} failed: {}", self.handle.path, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_world(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("region-manager-{}-{}", name, fastrand::u64(..)))
    }

    #[test]
    fn lease_raises_and_release_restores_lock_count() {
        let world = temp_world("count");
        let manager = RegionFileManager::new(4, 3);
        let region = RegionPos::new(0, 0, 0);

        let first = manager.acquire(region, &world, false).unwrap();
        let second = manager.acquire(region, &world, false).unwrap();
        assert_eq!(manager.lock_count(region, &world), Some(IDLE_LOCK_COUNT + 2));

        first.release().unwrap();
        drop(second);
        assert_eq!(manager.lock_count(region, &world), Some(IDLE_LOCK_COUNT));
        assert_eq!(manager.open_regions(), 1);
    }

    #[test]
    fn acquiring_creates_the_world_directory() {
        let world = temp_world("create");
        let manager = RegionFileManager::new(2, 3);
        let region = RegionPos::new(3, -1, 2);
        manager.acquire(region, &world, false).unwrap().release().unwrap();
        assert!(region.path_in(&world).exists());
    }

    #[test]
    fn close_all_keeps_leased_regions() {
        let world = temp_world("close");
        let manager = RegionFileManager::new(4, 3);
        let held = manager.acquire(RegionPos::new(0, 0, 0), &world, false).unwrap();
        manager.acquire(RegionPos::new(1, 0, 0), &world, false).unwrap().release().unwrap();

        manager.close_all().unwrap();
        assert_eq!(manager.open_regions(), 1);
        drop(held);
        manager.close_all().unwrap();
        assert_eq!(manager.open_regions(), 0);
    }
}
