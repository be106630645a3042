use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A thread-safe, reference-counted container with read-write locking.
///
/// `MtResource` is how chunks and the world are shared between the calling thread
/// and the worker pool. Meshing tasks take read guards on a chunk and on its six
/// neighbours at the same time, while state transitions (`OnCpu` to `OnGpu`,
/// dropping block data) take the write guard. Because a transition has to wait for
/// every outstanding read guard, a neighbour can never free its block grid while a
/// mesher is still reading it.
///
/// # Examples
/// ```
/// use voxel_world_core::core::MtResource;
///
/// let counter = MtResource::new(0);
/// let shared = counter.clone();
///
/// std::thread::spawn(move || *shared.get_mut() += 1)
///     .join()
///     .unwrap();
///
/// assert_eq!(*counter.get(), 1);
/// ```
pub struct MtResource<T: Send + Sync> {
    resource: Arc<RwLock<T>>,
}

impl<T: Send + Sync> MtResource<T> {
    /// Wraps `resource` in a new shared container.
    pub fn new(resource: T) -> Self {
        Self {
            resource: Arc::new(RwLock::new(resource)),
        }
    }

    /// Returns a read guard over the contained value.
    ///
    /// # Panics
    /// Panics if a writer panicked while holding the lock. Chunk data touched by a
    /// panicking writer is not trusted for meshing or saving.
    pub fn get(&self) -> RwLockReadGuard<'_, T> {
        self.resource.read().unwrap()
    }

    /// Returns a write guard over the contained value.
    ///
    /// # Panics
    /// Panics if the lock is poisoned, see [`MtResource::get`].
    pub fn get_mut(&self) -> RwLockWriteGuard<'_, T> {
        self.resource.write().unwrap()
    }

    /// Returns `true` when both containers point at the same value.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.resource, &other.resource)
    }

    /// Number of live handles to the contained value.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.resource)
    }
}

impl<T: Send + Sync> Clone for MtResource<T> {
    fn clone(&self) -> Self {
        Self {
            resource: self.resource.clone(),
        }
    }
}

impl<T: Send + Sync + Default> Default for MtResource<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_value() {
        let a = MtResource::new(vec![1, 2, 3]);
        let b = a.clone();
        b.get_mut().push(4);

        assert!(a.ptr_eq(&b));
        assert_eq!(a.get().len(), 4);
        assert_eq!(a.handle_count(), 2);
    }

    #[test]
    fn many_readers_at_once() {
        let value = MtResource::new(7u32);
        let first = value.get();
        let second = value.get();
        assert_eq!(*first + *second, 14);
    }
}
