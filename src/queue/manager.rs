use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::broadcast;

use crate::client::BackendClient;
use crate::config::UploaderConfig;
use crate::errors::{UploadError, UploadResult};
use crate::validation::FileValidator;

use super::alerts::{Alert, AlertCenter, AlertKind};
use super::record::{FileCandidate, FileId, QueuedFile, UploadStatus};

/// Capacity of the event channel handed to subscribers. Progress events for
/// a large batch can burst, so the buffer is generous.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notification stream for an embedding view.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    Progress {
        id: FileId,
        progress: u8,
    },
    Completed {
        id: FileId,
        name: String,
    },
    Failed {
        id: FileId,
        name: String,
        message: String,
    },
}

/// One queue entry: the observable record plus the payload it owns.
struct Slot {
    meta: QueuedFile,
    payload: Bytes,
}

struct QueueState {
    slots: Vec<Slot>,
    /// Count of in-flight uploads. Busy iff > 0; a plain boolean would flip
    /// false while a sibling upload is still running.
    in_flight: usize,
}

impl QueueState {
    fn slot_mut(&mut self, id: FileId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|slot| slot.meta.id == id)
    }
}

/// The upload queue: holds user-selected files, validates candidates on
/// entry, drives concurrent multipart uploads with per-record progress, and
/// keeps a transient auto-dismissing alert for the embedding view.
///
/// Must live inside a tokio runtime; uploads run as spawned tasks.
pub struct UploadQueue {
    config: UploaderConfig,
    client: Arc<BackendClient>,
    state: Arc<Mutex<QueueState>>,
    alerts: Arc<AlertCenter>,
    events: broadcast::Sender<QueueEvent>,
}

impl UploadQueue {
    pub fn new(config: UploaderConfig) -> UploadResult<Self> {
        config.validate()?;
        let client = Arc::new(BackendClient::new(&config)?);
        let alerts = Arc::new(AlertCenter::new(config.alert_dismiss()));
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config,
            client,
            state: Arc::new(Mutex::new(QueueState {
                slots: Vec::new(),
                in_flight: 0,
            })),
            alerts,
            events,
        })
    }

    /// Filters `candidates` and appends the accepted ones, in input order, as
    /// pending records. Rejected candidates are dropped; if any were
    /// rejected, a single aggregate error alert is raised. No de-duplication
    /// against already-queued files.
    ///
    /// Returns the ids of the accepted records.
    pub fn add_files(&self, candidates: Vec<FileCandidate>) -> Vec<FileId> {
        let total = candidates.len();
        let mut accepted = Vec::new();

        for candidate in candidates {
            if let Err(e) =
                FileValidator::validate_candidate(&candidate.name, candidate.size(), &self.config)
            {
                log::warn!("Rejected candidate {}: {}", candidate.name, e);
                continue;
            }

            let id = FileId::new();
            let meta = QueuedFile::new(id, candidate.name, candidate.data.len() as u64);
            match self.state.lock() {
                Ok(mut state) => {
                    state.slots.push(Slot {
                        meta,
                        payload: candidate.data,
                    });
                    accepted.push(id);
                }
                Err(e) => {
                    log::error!("Failed to acquire queue lock (non-critical): {}", e);
                }
            }
        }

        let rejected = total - accepted.len();
        if rejected > 0 {
            self.alerts.set(
                format!(
                    "{} of {} selected file(s) were rejected. Only .xml, .dat and .nrs files up to 200 MiB are accepted.",
                    rejected, total
                ),
                AlertKind::Error,
            );
        }

        log::info!(
            "Queued {} file(s), rejected {} of {} candidate(s)",
            accepted.len(),
            rejected,
            total
        );

        accepted
    }

    /// Starts uploading the record with `id`. A record that is already
    /// uploading is left alone, so rapid repeated calls submit exactly one
    /// request. A terminal record re-enters `Uploading` and re-submits.
    pub fn upload_file(&self, id: FileId) -> UploadResult<()> {
        let (name, payload) = {
            let mut state = self
                .state
                .lock()
                .map_err(|e| UploadError::upload_failed(&format!("queue lock poisoned: {}", e)))?;

            let slot = state
                .slot_mut(id)
                .ok_or(UploadError::UnknownRecord { id: id.0 })?;

            if slot.meta.is_uploading() {
                log::debug!("Record {} is already uploading, ignoring", id);
                return Ok(());
            }

            slot.meta.status = UploadStatus::Uploading;
            slot.meta.progress = 0;
            slot.meta.error = None;
            let name = slot.meta.name.clone();
            let payload = slot.payload.clone();
            state.in_flight += 1;
            (name, payload)
        };

        log::info!("Starting upload of {} ({})", name, id);

        let client = Arc::clone(&self.client);
        let state = Arc::clone(&self.state);
        let alerts = Arc::clone(&self.alerts);
        let events = self.events.clone();

        tokio::spawn(async move {
            let progress_state = Arc::clone(&state);
            let progress_events = events.clone();
            let result = client
                .upload(&name, payload, move |percent| {
                    // 100 is reserved for the terminal success event so that
                    // progress and status reach their final values together.
                    let percent = percent.min(99);
                    if record_progress(&progress_state, id, percent) {
                        progress_events
                            .send(QueueEvent::Progress {
                                id,
                                progress: percent,
                            })
                            .ok();
                    }
                })
                .await;

            finish_upload(id, result, &state, &alerts, &events);
        });

        Ok(())
    }

    /// Uploads every record that is currently pending. The pending set is
    /// snapshotted first; files added while the uploads run are not included.
    /// Uploads are independent and unbounded, completion order is not
    /// guaranteed.
    pub fn upload_all_files(&self) {
        let pending: Vec<FileId> = match self.state.lock() {
            Ok(state) => state
                .slots
                .iter()
                .filter(|slot| slot.meta.is_pending())
                .map(|slot| slot.meta.id)
                .collect(),
            Err(e) => {
                log::error!("Failed to acquire queue lock (non-critical): {}", e);
                return;
            }
        };

        log::info!("Uploading all pending files ({})", pending.len());

        for id in pending {
            if let Err(e) = self.upload_file(id) {
                log::warn!("Failed to start upload for {}: {}", id, e);
            }
        }
    }

    /// Removes the record unconditionally, regardless of status. An in-flight
    /// request is not cancelled; its late callbacks find no record and are
    /// dropped without touching the rest of the queue.
    pub fn remove_file(&self, id: FileId) -> UploadResult<()> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| UploadError::upload_failed(&format!("queue lock poisoned: {}", e)))?;

        let index = state
            .slots
            .iter()
            .position(|slot| slot.meta.id == id)
            .ok_or(UploadError::UnknownRecord { id: id.0 })?;

        let slot = state.slots.remove(index);
        log::info!("Removed {} ({}) from the queue", slot.meta.name, id);
        Ok(())
    }

    /// True iff any record is still `Pending`.
    pub fn has_pending_files(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.slots.iter().any(|slot| slot.meta.is_pending()),
            Err(e) => {
                log::error!("Failed to acquire queue lock (non-critical): {}", e);
                false
            }
        }
    }

    /// True iff at least one upload is in flight.
    pub fn is_busy(&self) -> bool {
        match self.state.lock() {
            Ok(state) => state.in_flight > 0,
            Err(e) => {
                log::error!("Failed to acquire queue lock (non-critical): {}", e);
                false
            }
        }
    }

    /// Snapshot of the queue in insertion order.
    pub fn files(&self) -> Vec<QueuedFile> {
        match self.state.lock() {
            Ok(state) => state.slots.iter().map(|slot| slot.meta.clone()).collect(),
            Err(e) => {
                log::error!("Failed to acquire queue lock (non-critical): {}", e);
                Vec::new()
            }
        }
    }

    pub fn file(&self, id: FileId) -> Option<QueuedFile> {
        self.state
            .lock()
            .ok()
            .and_then(|mut state| state.slot_mut(id).map(|slot| slot.meta.clone()))
    }

    /// The currently visible alert, if any.
    pub fn alert(&self) -> Option<Alert> {
        self.alerts.current()
    }

    /// Subscribes to progress and terminal events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    pub fn config(&self) -> &UploaderConfig {
        &self.config
    }
}

/// Writes streamed progress into the record. Returns whether anything was
/// updated; only then does a progress event go out, so subscribers never see
/// progress for a record that is removed or no longer uploading.
fn record_progress(state: &Arc<Mutex<QueueState>>, id: FileId, percent: u8) -> bool {
    match state.lock() {
        Ok(mut state) => match state.slot_mut(id) {
            Some(slot) if slot.meta.is_uploading() => {
                slot.meta.progress = percent;
                true
            }
            Some(_) => false,
            None => {
                log::debug!("Progress for removed record {}, dropping", id);
                false
            }
        },
        Err(e) => {
            log::error!("Failed to acquire queue lock (non-critical): {}", e);
            false
        }
    }
}

/// Applies one upload's terminal event: flips the record to its final state,
/// decrements the in-flight count and raises the matching alert. A record
/// removed while the request was in flight is skipped without error.
fn finish_upload(
    id: FileId,
    result: UploadResult<()>,
    state: &Arc<Mutex<QueueState>>,
    alerts: &Arc<AlertCenter>,
    events: &broadcast::Sender<QueueEvent>,
) {
    let mut finished_name = None;

    match state.lock() {
        Ok(mut state) => {
            state.in_flight = state.in_flight.saturating_sub(1);
            if let Some(slot) = state.slot_mut(id) {
                match &result {
                    Ok(()) => {
                        slot.meta.status = UploadStatus::Success;
                        slot.meta.progress = 100;
                        slot.meta.error = None;
                    }
                    Err(err) => {
                        slot.meta.status = UploadStatus::Error;
                        slot.meta.error = Some(err.transport_message());
                    }
                }
                finished_name = Some(slot.meta.name.clone());
            }
        }
        Err(e) => {
            log::error!("Failed to acquire queue lock (non-critical): {}", e);
        }
    }

    let Some(name) = finished_name else {
        log::debug!("Record {} was removed before its upload finished", id);
        return;
    };

    match result {
        Ok(()) => {
            log::info!("Uploaded {} ({})", name, id);
            alerts.set(
                format!("{} uploaded successfully", name),
                AlertKind::Success,
            );
            events.send(QueueEvent::Completed { id, name }).ok();
        }
        Err(err) => {
            let message = err.transport_message();
            log::warn!("Upload of {} ({}) failed: {}", name, id, message);
            alerts.set(
                format!("Failed to upload {}: {}", name, message),
                AlertKind::Error,
            );
            events
                .send(QueueEvent::Failed { id, name, message })
                .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue() -> UploadQueue {
        UploadQueue::new(UploaderConfig::new("http://localhost:1/upload")).unwrap()
    }

    fn candidate(name: &str, size: usize) -> FileCandidate {
        FileCandidate::new(name, vec![0u8; size])
    }

    #[tokio::test]
    async fn add_files_keeps_only_valid_candidates_in_order() {
        let queue = queue();
        let ids = queue.add_files(vec![
            candidate("a.xml", 10),
            candidate("b.exe", 10),
            candidate("c.dat", 10),
        ]);

        assert_eq!(ids.len(), 2);
        let files = queue.files();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].name, "a.xml");
        assert_eq!(files[1].name, "c.dat");
        assert!(files.iter().all(|f| f.status == UploadStatus::Pending));
        assert!(files.iter().all(|f| f.progress == 0));

        let alert = queue.alert().unwrap();
        assert_eq!(alert.kind, AlertKind::Error);
        assert!(alert.message.contains("1 of 3"));
    }

    #[tokio::test]
    async fn add_files_with_all_valid_raises_no_alert() {
        let queue = queue();
        queue.add_files(vec![candidate("a.xml", 10), candidate("b.nrs", 10)]);
        assert!(queue.alert().is_none());
        assert!(queue.has_pending_files());
    }

    #[tokio::test]
    async fn oversized_candidate_is_dropped_with_alert() {
        // Shrunken limit so the test does not allocate 200 MiB.
        let mut config = UploaderConfig::new("http://localhost:1/upload");
        config.max_file_size_bytes = 8;
        let queue = UploadQueue::new(config).unwrap();

        queue.add_files(vec![candidate("big.xml", 9)]);
        assert!(queue.files().is_empty());
        assert_eq!(queue.alert().unwrap().kind, AlertKind::Error);
    }

    #[tokio::test]
    async fn empty_payload_with_accepted_extension_is_queued() {
        let queue = queue();
        let ids = queue.add_files(vec![FileCandidate::new("empty.xml", bytes::Bytes::new())]);
        assert_eq!(ids.len(), 1);
        assert!(queue.alert().is_none());
    }

    #[tokio::test]
    async fn duplicate_names_are_not_deduplicated() {
        let queue = queue();
        let ids = queue.add_files(vec![candidate("a.xml", 10), candidate("a.xml", 10)]);
        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(queue.files().len(), 2);
    }

    #[tokio::test]
    async fn remove_file_drops_the_record() {
        let queue = queue();
        let ids = queue.add_files(vec![candidate("a.xml", 10), candidate("b.dat", 10)]);
        queue.remove_file(ids[0]).unwrap();

        let files = queue.files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "b.dat");
        assert!(matches!(
            queue.remove_file(ids[0]),
            Err(UploadError::UnknownRecord { .. })
        ));
    }

    #[tokio::test]
    async fn upload_of_unknown_record_is_an_error() {
        let queue = queue();
        assert!(matches!(
            queue.upload_file(FileId::new()),
            Err(UploadError::UnknownRecord { .. })
        ));
    }

    #[tokio::test]
    async fn progress_is_only_recorded_for_uploading_records() {
        let queue = queue();
        let ids = queue.add_files(vec![candidate("a.xml", 10)]);
        let id = ids[0];

        // Pending record: progress is neither written nor worth broadcasting.
        assert!(!record_progress(&queue.state, id, 42));
        assert_eq!(queue.file(id).unwrap().progress, 0);

        queue.state.lock().unwrap().slot_mut(id).unwrap().meta.status = UploadStatus::Uploading;
        assert!(record_progress(&queue.state, id, 42));
        assert_eq!(queue.file(id).unwrap().progress, 42);

        queue.remove_file(id).unwrap();
        assert!(!record_progress(&queue.state, id, 99));
    }

    #[tokio::test]
    async fn queue_starts_idle() {
        let queue = queue();
        assert!(!queue.is_busy());
        assert!(!queue.has_pending_files());
        assert!(queue.files().is_empty());
    }
}
