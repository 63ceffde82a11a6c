//! Snapshot persistence with a one-generation backup and debounced writes.
//!
//! Every save copies the previous primary slot into the backup slot before
//! overwriting the primary, so the backup lags by one save. An unreadable
//! primary is never copied over the backup.
//! Load falls back from primary to backup to "absent". None of the public
//! operations return errors: failures are logged and degrade to a no-op
//! (save, reset) or to absence (load).

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::progress::UserProgress;
use crate::storage::{SlotStore, StorageError};

pub const SNAPSHOT_VERSION: &str = "1.0";
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("slot {0} is empty")]
    Missing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressKeys {
    pub primary: String,
    pub backup: String,
}

impl ProgressKeys {
    pub fn for_user(user: &str) -> Self {
        Self {
            primary: format!("progress.{user}"),
            backup: format!("progress.{user}.backup"),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredSnapshotRef<'a> {
    #[serde(flatten)]
    progress: &'a UserProgress,
    last_saved: DateTime<Utc>,
    version: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSnapshot {
    #[serde(flatten)]
    progress: UserProgress,
    #[serde(default)]
    last_saved: Option<DateTime<Utc>>,
    #[serde(default)]
    version: Option<String>,
}

pub struct ProgressStore {
    store: Arc<dyn SlotStore>,
    keys: ProgressKeys,
}

impl ProgressStore {
    pub fn new(store: Arc<dyn SlotStore>, keys: ProgressKeys) -> Self {
        Self { store, keys }
    }

    pub fn save(&self, progress: &UserProgress, now: DateTime<Utc>) -> bool {
        match self.try_save(progress, now) {
            Ok(()) => {
                debug!(key = %self.keys.primary, xp = progress.user_xp, "progress snapshot saved");
                true
            }
            Err(err) => {
                warn!(key = %self.keys.primary, error = %err, "failed to save progress snapshot");
                false
            }
        }
    }

    /// Primary, then backup, then `None`. Loaded snapshots are normalized:
    /// the level triple is recomputed and completion is capped at 100.
    pub fn load(&self) -> Option<UserProgress> {
        for key in [&self.keys.primary, &self.keys.backup] {
            match self.try_load_slot(key) {
                Ok(progress) => {
                    if *key == self.keys.backup {
                        info!(key = %key, "progress restored from backup slot");
                    }
                    return Some(progress);
                }
                Err(PersistenceError::Missing(_)) => {
                    debug!(key = %key, "progress slot empty");
                }
                Err(err) => {
                    warn!(key = %key, error = %err, "progress slot unreadable");
                }
            }
        }
        None
    }

    /// Loads the snapshot, or seeds defaults and saves them when nothing
    /// usable is stored.
    pub fn load_or_seed(&self, now: DateTime<Utc>) -> UserProgress {
        if let Some(progress) = self.load() {
            return progress;
        }
        info!(key = %self.keys.primary, "no stored progress, seeding defaults");
        let progress = UserProgress::new(now);
        self.save(&progress, now);
        progress
    }

    /// Erases both slots. No other operation deletes stored progress.
    pub fn reset(&self) -> bool {
        let mut ok = true;
        for key in [&self.keys.primary, &self.keys.backup] {
            if let Err(err) = self.store.remove(key) {
                warn!(key = %key, error = %err, "failed to erase progress slot");
                ok = false;
            }
        }
        info!(key = %self.keys.primary, "progress slots reset");
        ok
    }

    fn try_save(&self, progress: &UserProgress, now: DateTime<Utc>) -> Result<(), PersistenceError> {
        let payload = serde_json::to_string(&StoredSnapshotRef {
            progress,
            last_saved: now,
            version: SNAPSHOT_VERSION,
        })?;

        match self.store.read(&self.keys.primary) {
            Ok(Some(previous)) if serde_json::from_str::<StoredSnapshot>(&previous).is_ok() => {
                if let Err(err) = self.store.write(&self.keys.backup, &previous) {
                    warn!(key = %self.keys.backup, error = %err, "backup copy failed");
                }
            }
            Ok(Some(_)) => {
                warn!(key = %self.keys.primary, "primary slot unreadable, keeping existing backup");
            }
            Ok(None) => {}
            Err(err) => warn!(key = %self.keys.primary, error = %err, "backup copy skipped"),
        }

        self.store.write(&self.keys.primary, &payload)?;
        Ok(())
    }

    fn try_load_slot(&self, key: &str) -> Result<UserProgress, PersistenceError> {
        let raw = self
            .store
            .read(key)?
            .ok_or_else(|| PersistenceError::Missing(key.to_string()))?;
        let stored: StoredSnapshot = serde_json::from_str(&raw)?;

        match stored.version.as_deref() {
            Some(SNAPSHOT_VERSION) => {}
            other => warn!(key = %key, version = ?other, "unexpected snapshot version, loading anyway"),
        }
        debug!(key = %key, last_saved = ?stored.last_saved, "progress snapshot loaded");

        let mut progress = stored.progress;
        progress.normalize();
        Ok(progress)
    }
}

enum SaveCommand {
    Schedule(Box<UserProgress>),
    Flush(oneshot::Sender<()>),
    Discard(oneshot::Sender<()>),
    Close(oneshot::Sender<()>),
}

/// Coalesces bursts of snapshot updates into one write. Each `schedule`
/// restarts the delay; only the latest snapshot is written when it expires.
pub struct DebouncedSaver {
    tx: mpsc::UnboundedSender<SaveCommand>,
    handle: JoinHandle<()>,
}

impl DebouncedSaver {
    pub fn spawn(store: Arc<ProgressStore>, delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_saver(store, delay, rx));
        Self { tx, handle }
    }

    pub fn schedule(&self, progress: UserProgress) {
        if self.tx.send(SaveCommand::Schedule(Box::new(progress))).is_err() {
            warn!("progress saver stopped, snapshot dropped");
        }
    }

    /// Writes any pending snapshot now.
    pub async fn flush(&self) {
        self.request(SaveCommand::Flush).await;
    }

    /// Drops any pending snapshot without writing it.
    pub async fn discard(&self) {
        self.request(SaveCommand::Discard).await;
    }

    /// Writes any pending snapshot and stops the background task.
    pub async fn close(&self) {
        self.request(SaveCommand::Close).await;
    }

    async fn request(&self, command: fn(oneshot::Sender<()>) -> SaveCommand) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.tx.send(command(ack_tx)).is_ok() {
            let _ = ack_rx.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

async fn run_saver(
    store: Arc<ProgressStore>,
    delay: Duration,
    mut rx: mpsc::UnboundedReceiver<SaveCommand>,
) {
    let mut pending: Option<Box<UserProgress>> = None;
    let timer = tokio::time::sleep(delay);
    tokio::pin!(timer);

    loop {
        tokio::select! {
            cmd = rx.recv() => match cmd {
                Some(SaveCommand::Schedule(progress)) => {
                    pending = Some(progress);
                    timer.as_mut().reset(Instant::now() + delay);
                }
                Some(SaveCommand::Flush(ack)) => {
                    write_pending(&store, &mut pending);
                    let _ = ack.send(());
                }
                Some(SaveCommand::Discard(ack)) => {
                    pending = None;
                    let _ = ack.send(());
                }
                Some(SaveCommand::Close(ack)) => {
                    write_pending(&store, &mut pending);
                    let _ = ack.send(());
                    break;
                }
                None => {
                    write_pending(&store, &mut pending);
                    break;
                }
            },
            _ = &mut timer, if pending.is_some() => {
                write_pending(&store, &mut pending);
            }
        }
    }

    debug!("progress saver stopped");
}

fn write_pending(store: &ProgressStore, pending: &mut Option<Box<UserProgress>>) {
    if let Some(progress) = pending.take() {
        store.save(&progress, Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemorySlotStore, StorageResult};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
    }

    fn setup() -> (Arc<MemorySlotStore>, ProgressStore) {
        let slots = Arc::new(MemorySlotStore::new());
        let store = ProgressStore::new(slots.clone(), ProgressKeys::for_user("tester"));
        (slots, store)
    }

    fn progress_with_xp(xp: u32) -> UserProgress {
        let mut progress = UserProgress::new(now());
        progress.add_xp(xp, now());
        progress
    }

    #[test]
    fn test_keys() {
        let keys = ProgressKeys::for_user("u1");
        assert_eq!(keys.primary, "progress.u1");
        assert_eq!(keys.backup, "progress.u1.backup");
    }

    #[test]
    fn test_save_then_load() {
        let (_, store) = setup();
        let progress = progress_with_xp(1750);
        assert!(store.save(&progress, now()));
        assert_eq!(store.load(), Some(progress));
    }

    #[test]
    fn test_stored_shape() {
        let (slots, store) = setup();
        store.save(&progress_with_xp(10), now());
        let raw = slots.read("progress.tester").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["version"], "1.0");
        assert_eq!(value["userXP"], 10);
        assert!(value["lastSaved"].is_string());
        assert!(value["levelProgress"].is_object());
    }

    #[test]
    fn test_backup_lags_one_save() {
        let (slots, store) = setup();
        store.save(&progress_with_xp(100), now());
        assert!(!slots.contains("progress.tester.backup"));

        store.save(&progress_with_xp(200), now());
        store.save(&progress_with_xp(300), now());

        let backup = slots.read("progress.tester.backup").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&backup).unwrap();
        assert_eq!(value["userXP"], 200);
    }

    #[test]
    fn test_corrupt_primary_falls_back_to_backup() {
        let (slots, store) = setup();
        store.save(&progress_with_xp(100), now());
        store.save(&progress_with_xp(200), now());
        slots.write("progress.tester", "{not json").unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.user_xp, 100);
    }

    #[test]
    fn test_both_slots_bad_is_absent() {
        let (slots, store) = setup();
        slots.write("progress.tester", "garbage").unwrap();
        slots.write("progress.tester.backup", "[]").unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_level_progress_recomputed_on_load() {
        let (slots, store) = setup();
        let raw = serde_json::json!({
            "userXP": 1750,
            "streakCount": 2,
            "currentProgress": 40,
            "totalQuizzesCompleted": 3,
            "completedStages": [1, 2],
            "lastActiveDate": "2024-06-01T10:00:00Z",
            "levelProgress": { "currentLevel": 1, "xpForNextLevel": 1000, "xpInCurrentLevel": 5 },
            "lastSaved": "2024-06-01T10:00:00Z",
            "version": "1.0"
        });
        slots.write("progress.tester", &raw.to_string()).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.level_progress.current_level, 3);
        assert_eq!(loaded.level_progress.xp_in_current_level, 250);
        assert!(loaded.achievements.is_empty());
        assert!(loaded.word_progress.is_empty());
    }

    #[test]
    fn test_completion_capped_on_load() {
        let (slots, store) = setup();
        let mut value = serde_json::to_value(progress_with_xp(10)).unwrap();
        value["currentProgress"] = serde_json::json!(250);
        value["version"] = serde_json::json!("1.0");
        slots.write("progress.tester", &value.to_string()).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.current_progress, 100);
        assert_eq!(loaded.user_xp, 10);
    }

    #[test]
    fn test_unreadable_primary_keeps_backup() {
        let (slots, store) = setup();
        store.save(&progress_with_xp(100), now());
        store.save(&progress_with_xp(200), now());
        slots.write("progress.tester", "{garbage").unwrap();

        let recovered = store.load().unwrap();
        assert_eq!(recovered.user_xp, 100);
        assert!(store.save(&progress_with_xp(300), now()));

        let backup = slots.read("progress.tester.backup").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&backup).unwrap();
        assert_eq!(value["userXP"], 100);
        assert_eq!(store.load().map(|p| p.user_xp), Some(300));
    }

    /// Rejects writes to backup slots.
    struct NoBackupStore(MemorySlotStore);

    impl SlotStore for NoBackupStore {
        fn read(&self, key: &str) -> StorageResult<Option<String>> {
            self.0.read(key)
        }

        fn write(&self, key: &str, value: &str) -> StorageResult<()> {
            if key.ends_with(".backup") {
                return Err(StorageError::InvalidKey(key.to_string()));
            }
            self.0.write(key, value)
        }

        fn remove(&self, key: &str) -> StorageResult<()> {
            self.0.remove(key)
        }
    }

    #[test]
    fn test_backup_write_failure_still_saves_primary() {
        let store = ProgressStore::new(
            Arc::new(NoBackupStore(MemorySlotStore::new())),
            ProgressKeys::for_user("tester"),
        );
        assert!(store.save(&progress_with_xp(100), now()));
        assert!(store.save(&progress_with_xp(200), now()));
        assert_eq!(store.load().map(|p| p.user_xp), Some(200));
    }

    #[test]
    fn test_other_version_still_loads() {
        let (slots, store) = setup();
        let mut value = serde_json::to_value(progress_with_xp(42)).unwrap();
        value["version"] = serde_json::json!("0.9");
        slots.write("progress.tester", &value.to_string()).unwrap();
        assert_eq!(store.load().map(|p| p.user_xp), Some(42));
    }

    #[test]
    fn test_load_or_seed() {
        let (slots, store) = setup();
        let seeded = store.load_or_seed(now());
        assert_eq!(seeded, UserProgress::new(now()));
        assert_eq!(slots.write_count("progress.tester"), 1);

        let loaded = store.load_or_seed(now());
        assert_eq!(loaded, seeded);
        assert_eq!(slots.write_count("progress.tester"), 1);
    }

    #[test]
    fn test_reset_erases_both_slots() {
        let (slots, store) = setup();
        store.save(&progress_with_xp(1), now());
        store.save(&progress_with_xp(2), now());
        assert!(store.reset());
        assert!(!slots.contains("progress.tester"));
        assert!(!slots.contains("progress.tester.backup"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_word_progress_round_trip() {
        let (_, store) = setup();
        let mut progress = progress_with_xp(0);
        progress.record_word_answer(481, true, now()).unwrap();
        progress.toggle_bookmark(12).unwrap();
        store.save(&progress, now());

        let loaded = store.load().unwrap();
        assert_eq!(loaded.word_progress, progress.word_progress);
        assert_eq!(loaded.word(481).unwrap().correct_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_burst() {
        let (slots, store) = setup();
        let saver = DebouncedSaver::spawn(Arc::new(store), DEFAULT_SAVE_DEBOUNCE);

        for xp in [10, 20, 30] {
            saver.schedule(progress_with_xp(xp));
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(slots.write_count("progress.tester"), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(slots.write_count("progress.tester"), 1);

        let raw = slots.read("progress.tester").unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["userXP"], 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_restarts_on_new_change() {
        let (slots, store) = setup();
        let saver = DebouncedSaver::spawn(Arc::new(store), DEFAULT_SAVE_DEBOUNCE);

        saver.schedule(progress_with_xp(1));
        tokio::time::sleep(Duration::from_millis(800)).await;
        saver.schedule(progress_with_xp(2));
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert_eq!(slots.write_count("progress.tester"), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(slots.write_count("progress.tester"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_and_close_write_pending() {
        let (slots, store) = setup();
        let saver = DebouncedSaver::spawn(Arc::new(store), Duration::from_secs(60));

        saver.schedule(progress_with_xp(5));
        saver.flush().await;
        assert_eq!(slots.write_count("progress.tester"), 1);

        saver.flush().await;
        assert_eq!(slots.write_count("progress.tester"), 1);

        saver.schedule(progress_with_xp(6));
        saver.close().await;
        assert_eq!(slots.write_count("progress.tester"), 2);

        tokio::task::yield_now().await;
        assert!(saver.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_discard_drops_pending() {
        let (slots, store) = setup();
        let saver = DebouncedSaver::spawn(Arc::new(store), DEFAULT_SAVE_DEBOUNCE);

        saver.schedule(progress_with_xp(9));
        saver.discard().await;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(slots.write_count("progress.tester"), 0);
    }
}
