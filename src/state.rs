use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::RwLock;

use crate::config::{Config, StorageBackend};
use crate::persistence::{DebouncedSaver, ProgressKeys, ProgressStore};
use crate::progress::UserProgress;
use crate::storage::{FileSlotStore, MemorySlotStore, SlotStore, StorageError};

/// Shared handle to the one in-memory snapshot this process owns. Every
/// mutation goes through [`AppState::update`], which schedules a debounced
/// save of the result.
#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    progress: Arc<RwLock<UserProgress>>,
    store: Arc<ProgressStore>,
    saver: Arc<DebouncedSaver>,
}

impl AppState {
    /// Must be called inside a tokio runtime; spawns the saver task.
    pub fn new(store: Arc<ProgressStore>, save_debounce: Duration) -> Self {
        let progress = store.load_or_seed(Utc::now());
        let saver = DebouncedSaver::spawn(Arc::clone(&store), save_debounce);
        Self {
            started_at: Instant::now(),
            progress: Arc::new(RwLock::new(progress)),
            store,
            saver: Arc::new(saver),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, StorageError> {
        let slots: Arc<dyn SlotStore> = match config.storage {
            StorageBackend::File => Arc::new(FileSlotStore::open(&config.data_dir)?),
            StorageBackend::Memory => Arc::new(MemorySlotStore::new()),
        };
        let store = ProgressStore::new(slots, ProgressKeys::for_user(&config.user));
        Ok(Self::new(Arc::new(store), config.save_debounce))
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub async fn snapshot(&self) -> UserProgress {
        self.progress.read().await.clone()
    }

    pub async fn read<R>(&self, f: impl FnOnce(&UserProgress) -> R) -> R {
        let guard = self.progress.read().await;
        f(&*guard)
    }

    /// Applies `f` under the write lock. The snapshot is only scheduled for
    /// saving when `f` returns `Ok`.
    pub async fn update<T, E>(
        &self,
        f: impl FnOnce(&mut UserProgress) -> Result<T, E>,
    ) -> Result<T, E> {
        let mut guard = self.progress.write().await;
        let result = f(&mut *guard)?;
        self.saver.schedule(guard.clone());
        Ok(result)
    }

    pub async fn mutate<T>(&self, f: impl FnOnce(&mut UserProgress) -> T) -> T {
        let mut guard = self.progress.write().await;
        let result = f(&mut *guard);
        self.saver.schedule(guard.clone());
        result
    }

    /// Erases stored progress and starts over from defaults in memory.
    pub async fn reset(&self) -> UserProgress {
        let mut guard = self.progress.write().await;
        self.saver.discard().await;
        self.store.reset();
        *guard = UserProgress::new(Utc::now());
        guard.clone()
    }

    /// Writes any pending snapshot and stops the saver.
    pub async fn shutdown(&self) {
        self.saver.close().await;
    }

    pub async fn flush(&self) {
        self.saver.flush().await;
    }
}
