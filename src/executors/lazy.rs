//! Lazily instantiated, exclusively accessed resource slot
//!
//! Executors that own a live resource (a browser session, a process table)
//! keep it here. The slot stays empty until the first call that needs it, is
//! reused afterwards, and is emptied again by `take()` during cleanup.

use std::future::Future;
use tokio::sync::{ MappedMutexGuard, Mutex, MutexGuard };

use crate::errors::Error;

pub struct LazyResource<T> {
    slot: Mutex<Option<T>>,
}

impl<T> LazyResource<T> {
    pub fn new() -> Self {
        Self { slot: Mutex::new(None) }
    }

    /// Lock the slot, initializing it first if it is empty.
    ///
    /// The guard serializes access to the resource. A failed initialization
    /// leaves the slot empty so a later call can try again.
    pub async fn acquire<F, Fut>(&self, init: F) -> Result<MappedMutexGuard<'_, T>, Error>
        where F: FnOnce() -> Fut, Fut: Future<Output = Result<T, Error>>
    {
        let mut slot = self.slot.lock().await;
        if slot.is_none() {
            *slot = Some(init().await?);
        }
        MutexGuard::try_map(slot, Option::as_mut).map_err(|_|
            Error::Other("resource slot was emptied during acquisition".to_string())
        )
    }

    /// Lock the slot only if it already holds a resource
    pub async fn existing(&self) -> Option<MappedMutexGuard<'_, T>> {
        let slot = self.slot.lock().await;
        MutexGuard::try_map(slot, Option::as_mut).ok()
    }

    /// Remove the resource, leaving the slot empty
    pub async fn take(&self) -> Option<T> {
        self.slot.lock().await.take()
    }

    pub async fn is_initialized(&self) -> bool {
        self.slot.lock().await.is_some()
    }
}

impl<T> Default for LazyResource<T> {
    fn default() -> Self {
        Self::new()
    }
}
