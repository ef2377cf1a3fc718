/// Lazily constructed, shared service instance
///
/// Readers take the read lock; on a miss the writer re-checks under the
/// write lock before constructing, so the constructor runs at most once per
/// successful initialisation.
///
/// # Example
///
/// ```
/// use storefront_shared::services::lazy::LazyService;
///
/// let cell: LazyService<String> = LazyService::new();
/// let first = cell.get_or_init(|| "built".to_string());
/// let second = cell.get_or_init(|| unreachable!());
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// ```

use std::sync::{Arc, PoisonError, RwLock};

pub struct LazyService<T> {
    slot: RwLock<Option<Arc<T>>>,
}

impl<T> Default for LazyService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LazyService<T> {
    pub const fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }

    /// Current instance, if one was built
    pub fn get(&self) -> Option<Arc<T>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the instance, building it with `init` on first use
    pub fn get_or_init(&self, init: impl FnOnce() -> T) -> Arc<T> {
        if let Some(service) = self.get() {
            return service;
        }

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref service) = *slot {
            return Arc::clone(service);
        }

        let service = Arc::new(init());
        *slot = Some(Arc::clone(&service));
        service
    }

    /// Like [`get_or_init`](Self::get_or_init) but the constructor may fail;
    /// on failure nothing is stored and the next call tries again
    pub fn try_init<E>(&self, init: impl FnOnce() -> Result<T, E>) -> Result<Arc<T>, E> {
        if let Some(service) = self.get() {
            return Ok(service);
        }

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref service) = *slot {
            return Ok(Arc::clone(service));
        }

        let service = Arc::new(init()?);
        *slot = Some(Arc::clone(&service));
        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_constructs_once_across_threads() {
        let cell = Arc::new(LazyService::<usize>::new());
        let built = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = Arc::clone(&cell);
                let built = Arc::clone(&built);
                thread::spawn(move || {
                    cell.get_or_init(|| {
                        built.fetch_add(1, Ordering::SeqCst);
                        42
                    })
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(*handle.join().unwrap(), 42);
        }
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_try_init_failure_is_not_cached() {
        let cell = LazyService::<u32>::new();
        let result: Result<_, &str> = cell.try_init(|| Err("missing dependency"));
        assert!(result.is_err());
        assert!(cell.get().is_none());

        let result: Result<_, &str> = cell.try_init(|| Ok(7));
        assert_eq!(*result.unwrap(), 7);
        assert_eq!(*cell.get_or_init(|| 0), 7);
    }
}
