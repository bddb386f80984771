//! Upload list: owns every in-flight upload item and folds their reports
//! into one "all complete" signal.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::api::{JobApi, UploadFile};
use crate::broadcast::{JobListInvalidator, NotificationBroadcaster};
use crate::config::PollConfig;
use crate::error::UploadError;
use crate::upload::item::{
    LocalId, Transition, UploadItem, UploadItemController, UploadReport,
};

/// Published after every change to the upload list.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadSnapshot {
    pub items: Vec<UploadItem>,
    pub all_complete: bool,
}

/// True when there is at least one item and every item is terminal.
pub fn aggregate_complete(items: &[UploadItem]) -> bool {
    !items.is_empty() && items.iter().all(UploadItem::is_terminal)
}

struct Entry {
    item: UploadItem,
    controller: UploadItemController,
}

#[derive(Default)]
struct CoordinatorState {
    /// Insertion order.
    entries: Vec<Entry>,
    was_complete: bool,
}

impl CoordinatorState {
    fn position(&self, local_id: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.item.local_id.as_str() == local_id)
    }

    fn snapshot(&self) -> UploadSnapshot {
        let items: Vec<UploadItem> = self.entries.iter().map(|e| e.item.clone()).collect();
        let all_complete = aggregate_complete(&items);
        UploadSnapshot {
            items,
            all_complete,
        }
    }
}

/// Side effects decided under the lock, performed after releasing it.
#[derive(Default)]
struct Effects {
    invalidate: bool,
    create_failed: Option<String>,
    poll_warning: Option<(String, u32)>,
}

#[derive(Clone)]
struct Shared {
    state: Arc<RwLock<CoordinatorState>>,
    snapshot: Arc<watch::Sender<UploadSnapshot>>,
    notifications: NotificationBroadcaster,
    invalidator: JobListInvalidator,
    warn_threshold: u32,
}

impl Shared {
    fn read(&self) -> RwLockReadGuard<'_, CoordinatorState> {
        match self.state.read() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Upload list lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, CoordinatorState> {
        match self.state.write() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Upload list lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Recomputes completion, publishes, and reports a false-to-true edge.
    fn commit(&self, state: &mut CoordinatorState) -> bool {
        let snapshot = state.snapshot();
        let became_complete = snapshot.all_complete && !state.was_complete;
        state.was_complete = snapshot.all_complete;
        self.snapshot.send_replace(snapshot);
        became_complete
    }

    fn handle_report(&self, report: UploadReport) {
        let mut effects = Effects::default();
        {
            let mut state = self.write();
            let Some(index) = state.position(report.local_id.as_str()) else {
                debug!("Dropping report for removed upload {}", report.local_id);
                return;
            };

            let item = &mut state.entries[index].item;
            match item.apply(report.event) {
                Transition::Created | Transition::JobGone => effects.invalidate = true,
                Transition::CreateFailed => effects.create_failed = Some(item.file_name.clone()),
                Transition::PollFailed(failures) if failures == self.warn_threshold => {
                    effects.poll_warning = Some((item.file_name.clone(), failures));
                }
                Transition::PollFailed(_) | Transition::None => {}
            }

            if self.commit(&mut state) {
                info!("All uploads complete");
                effects.invalidate = true;
            }
        }

        if let Some(name) = effects.create_failed {
            self.notifications.error(
                "Upload Failed",
                Some(format!("Could not process {}.", name)),
                None,
            );
        }
        if let Some((name, failures)) = effects.poll_warning {
            self.notifications.warning(
                "Connection Problem",
                Some(format!(
                    "Status checks for {} failed {} times in a row. Still trying.",
                    name, failures
                )),
                None,
            );
        }
        if effects.invalidate {
            self.invalidator.invalidate();
        }
    }
}

/// Owns the upload items. Dropping it cancels every item's task.
///
/// Must be created inside a tokio runtime.
pub struct UploadCoordinator {
    shared: Shared,
    api: Arc<dyn JobApi>,
    interval: Duration,
    reports: mpsc::UnboundedSender<UploadReport>,
    reconciler: Option<JoinHandle<()>>,
}

impl UploadCoordinator {
    pub fn new(
        api: Arc<dyn JobApi>,
        poll: &PollConfig,
        notifications: NotificationBroadcaster,
        invalidator: JobListInvalidator,
    ) -> Self {
        let (reports, mut rx) = mpsc::unbounded_channel::<UploadReport>();
        let (snapshot, _) = watch::channel(UploadSnapshot::default());

        let shared = Shared {
            state: Arc::new(RwLock::new(CoordinatorState::default())),
            snapshot: Arc::new(snapshot),
            notifications,
            invalidator,
            warn_threshold: poll.failure_warn_threshold,
        };

        let reconcile = shared.clone();
        let reconciler = tokio::spawn(async move {
            while let Some(report) = rx.recv().await {
                reconcile.handle_report(report);
            }
        });

        Self {
            shared,
            api,
            interval: poll.upload_interval(),
            reports,
            reconciler: Some(reconciler),
        }
    }

    /// Starts one upload per supported file, all concurrently. Unsupported
    /// files get no item; each one is reported as an error notification.
    pub fn add_files(&self, files: Vec<UploadFile>) -> Vec<LocalId> {
        if files.is_empty() {
            return Vec::new();
        }

        let mut rejected = Vec::new();
        let mut ids = Vec::with_capacity(files.len());
        {
            let mut state = self.shared.write();
            for file in files {
                if let Err(e) = file.check_supported() {
                    warn!("Not uploading {}: {}", file.name, e);
                    rejected.push(file.name);
                    continue;
                }

                let local_id = LocalId::generate(&file.name);
                let item = UploadItem::queued(local_id.clone(), &file);
                let mut controller = UploadItemController::new(
                    local_id.clone(),
                    file,
                    Arc::clone(&self.api),
                    self.interval,
                    self.reports.clone(),
                );
                controller.activate();

                info!("Queued upload {} ({})", item.file_name, item.display_size());
                state.entries.push(Entry { item, controller });
                ids.push(local_id);
            }

            if !ids.is_empty() && self.shared.commit(&mut state) {
                drop(state);
                self.shared.invalidator.invalidate();
            }
        }

        for name in rejected {
            self.shared.notifications.error(
                "Unsupported File",
                Some(format!("{} is not a supported file type.", name)),
                None,
            );
        }
        ids
    }

    /// Dismisses a terminal item. In-flight items cannot be removed.
    pub fn remove_item(&self, local_id: &str) -> Result<(), UploadError> {
        let removed = {
            let mut state = self.shared.write();
            let index = state
                .position(local_id)
                .ok_or_else(|| UploadError::NotFound(local_id.to_string()))?;

            let item = &state.entries[index].item;
            if !item.is_terminal() {
                return Err(UploadError::NotRemovable {
                    local_id: local_id.to_string(),
                    phase: item.phase,
                });
            }

            let mut entry = state.entries.remove(index);
            entry.controller.cancel();
            if self.shared.commit(&mut state) {
                self.shared.invalidator.invalidate();
            }
            entry
        };

        debug!("Removed upload {}", removed.item.local_id);
        Ok(())
    }

    pub fn items(&self) -> Vec<UploadItem> {
        self.shared
            .read()
            .entries
            .iter()
            .map(|e| e.item.clone())
            .collect()
    }

    pub fn item(&self, local_id: &str) -> Option<UploadItem> {
        let state = self.shared.read();
        state.position(local_id).map(|i| state.entries[i].item.clone())
    }

    pub fn all_complete(&self) -> bool {
        self.shared.snapshot.borrow().all_complete
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Cancels every item's task and stops processing reports. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.reconciler.take() {
            handle.abort();
            let mut state = self.shared.write();
            for entry in state.entries.iter_mut() {
                entry.controller.cancel();
            }
            debug!("Upload coordinator shut down with {} items", state.entries.len());
        }
    }
}

impl Drop for UploadCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
