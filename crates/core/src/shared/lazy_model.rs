use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A process-wide model that is loaded on first use and then shared.
///
/// The slot lock is held for the whole initialisation, so concurrent first
/// callers wait for the one load in progress instead of loading twice.
pub struct LazyModel<T> {
    name: &'static str,
    slot: Mutex<Option<Arc<T>>>,
}

impl<T> LazyModel<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slot: Mutex::new(None),
        }
    }

    /// Return the loaded model, running `init` if nothing is loaded yet.
    ///
    /// A failed `init` leaves the slot empty so the next call tries again.
    pub fn ensure_initialized<E>(
        &self,
        init: impl FnOnce() -> Result<T, E>,
    ) -> Result<Arc<T>, E> {
        let mut slot = self.lock();
        if let Some(model) = slot.as_ref() {
            return Ok(Arc::clone(model));
        }

        log::info!("Loading {} model", self.name);
        let model = Arc::new(init()?);
        *slot = Some(Arc::clone(&model));
        log::info!("{} model ready", self.name);
        Ok(model)
    }

    /// Drop the loaded model; the next `ensure_initialized` loads a fresh one.
    /// Callers still holding the old `Arc` keep it alive until they finish.
    pub fn reset(&self) {
        if self.lock().take().is_some() {
            log::info!("Discarded {} model", self.name);
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Arc<T>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
