//! Requirement source intake: dropped files and finalized speech
//! transcripts are read concurrently, tracked per source and folded into
//! one combined requirements text.
//!
//! Every read runs as its own task and reports back by [`SourceId`]; a
//! callback for a source that is no longer in the ledger is dropped, so a
//! cancelled read can never resurrect its entry.

use crate::domain::error::{AppError, Result};
use crate::domain::source::{read_progress, ReadState, SourceId, SourceOrigin, UploadedSource};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

const SOURCE_SEPARATOR: &str = "\n\n";
const MAX_PREALLOC_BYTES: u64 = 8 * 1024 * 1024;

/// A file handed to the collector, not yet read.
pub struct IncomingFile {
    pub name: String,
    pub size: u64,
    reader: Box<dyn AsyncRead + Send + Unpin>,
}

impl IncomingFile {
    pub fn from_bytes(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            size: bytes.len() as u64,
            reader: Box::new(Cursor::new(bytes)),
        }
    }

    /// `size` is the declared byte count used for progress; 0 means unknown.
    pub fn from_reader<R>(name: &str, size: u64, reader: R) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self {
            name: name.to_string(),
            size,
            reader: Box::new(reader),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSnapshot {
    pub sources: Vec<UploadedSource>,
    pub combined_text: String,
    /// No source is still loading or stalled.
    pub ready: bool,
}

impl IngestionSnapshot {
    pub fn source(&self, id: &SourceId) -> Option<&UploadedSource> {
        self.sources.iter().find(|source| &source.id == id)
    }
}

#[derive(Default)]
struct SourceLedger {
    order: Vec<SourceId>,
    sources: HashMap<SourceId, UploadedSource>,
    tasks: HashMap<SourceId, AbortHandle>,
}

impl SourceLedger {
    fn snapshot(&self) -> IngestionSnapshot {
        let sources: Vec<UploadedSource> = self
            .order
            .iter()
            .filter_map(|id| self.sources.get(id).cloned())
            .collect();
        let combined_text = sources
            .iter()
            .filter(|source| source.is_complete())
            .map(|source| source.content.as_str())
            .collect::<Vec<_>>()
            .join(SOURCE_SEPARATOR);
        let ready = sources.iter().all(|source| source.is_complete());

        IngestionSnapshot {
            sources,
            combined_text,
            ready,
        }
    }

    fn remove(&mut self, id: &SourceId) -> Option<UploadedSource> {
        let removed = self.sources.remove(id)?;
        self.order.retain(|entry| entry != id);
        if let Some(task) = self.tasks.remove(id) {
            task.abort();
        }
        Some(removed)
    }

    fn abort_all(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}

struct CollectorShared {
    ledger: Mutex<SourceLedger>,
    snapshot_tx: watch::Sender<IngestionSnapshot>,
    chunk_size: usize,
}

impl CollectorShared {
    fn lock(&self) -> MutexGuard<'_, SourceLedger> {
        self.ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, ledger: &SourceLedger) {
        self.snapshot_tx.send_replace(ledger.snapshot());
    }

    /// Returns false once the source is gone so the reader can stop.
    fn report_progress(&self, id: SourceId, bytes_read: u64) -> bool {
        let mut ledger = self.lock();
        let Some(source) = ledger.sources.get_mut(&id) else {
            return false;
        };
        let progress = read_progress(bytes_read, source.size);
        if progress > source.progress {
            source.progress = progress;
            self.publish(&ledger);
        }
        true
    }

    fn complete(&self, id: SourceId, content: String) {
        let mut ledger = self.lock();
        ledger.tasks.remove(&id);
        let Some(source) = ledger.sources.get_mut(&id) else {
            debug!(source_id = %id, "Dropping completion for cancelled source");
            return;
        };
        source.content = content;
        source.progress = 100;
        source.state = ReadState::Completed;
        info!(source_id = %id, name = %source.name, chars = source.content.len(), "Source loaded");
        self.publish(&ledger);
    }

    fn stall(&self, id: SourceId, reason: String) {
        let mut ledger = self.lock();
        ledger.tasks.remove(&id);
        let Some(source) = ledger.sources.get_mut(&id) else {
            return;
        };
        warn!(source_id = %id, name = %source.name, reason = %reason, "Source read stalled");
        source.state = ReadState::Stalled;
        source.stall_reason = Some(reason);
        self.publish(&ledger);
    }
}

pub struct IngestionCollector {
    shared: Arc<CollectorShared>,
    speech_sequence: AtomicUsize,
    /// Last finalized transcript and the source it produced.
    last_transcript: Mutex<Option<(String, SourceId)>>,
}

impl IngestionCollector {
    pub fn new(chunk_size: usize) -> Self {
        let (snapshot_tx, _) = watch::channel(IngestionSnapshot {
            ready: true,
            ..IngestionSnapshot::default()
        });
        Self {
            shared: Arc::new(CollectorShared {
                ledger: Mutex::new(SourceLedger::default()),
                snapshot_tx,
                chunk_size: chunk_size.max(1),
            }),
            speech_sequence: AtomicUsize::new(0),
            last_transcript: Mutex::new(None),
        }
    }

    /// Registers a batch of sources and starts reading each one. Must be
    /// called from within a tokio runtime.
    pub fn add_sources(
        &self,
        files: Vec<IncomingFile>,
        origin: SourceOrigin,
    ) -> Result<Vec<SourceId>> {
        if files.is_empty() {
            return Err(AppError::ValidationError(
                "At least one file is required.".to_string(),
            ));
        }

        let mut ledger = self.shared.lock();
        let mut ids = Vec::with_capacity(files.len());
        for file in files {
            let source = UploadedSource::new(file.name, file.size, origin);
            let id = source.id;
            ledger.order.push(id);
            ledger.sources.insert(id, source);

            let task = tokio::spawn(read_source(
                self.shared.clone(),
                id,
                file.reader,
                file.size,
            ));
            ledger.tasks.insert(id, task.abort_handle());
            ids.push(id);
        }
        self.shared.publish(&ledger);
        info!(count = ids.len(), origin = ?origin, "Sources added");
        Ok(ids)
    }

    /// Feeds a speech-recognition update. Only a finalized transcript (the
    /// recognizer stopped listening) becomes a source.
    pub fn on_transcript(&self, transcript: &str, listening: bool) -> Result<Option<SourceId>> {
        let text = transcript.trim();
        if listening || text.is_empty() {
            return Ok(None);
        }

        let mut last = self
            .last_transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((previous, id)) = last.as_ref() {
            // A repeat only counts while its source is still listed.
            if previous == text && self.shared.lock().sources.contains_key(id) {
                return Ok(None);
            }
        }

        let sequence = self.speech_sequence.fetch_add(1, Ordering::SeqCst) + 1;
        let name = format!("speech-transcript-{}.txt", sequence);
        let file = IncomingFile::from_bytes(&name, text.as_bytes().to_vec());
        let id = self
            .add_sources(vec![file], SourceOrigin::Speech)?
            .into_iter()
            .next();
        *last = id.map(|id| (text.to_string(), id));
        Ok(id)
    }

    pub fn cancel_source(&self, id: &SourceId) -> Result<UploadedSource> {
        let mut ledger = self.shared.lock();
        let removed = ledger
            .remove(id)
            .ok_or_else(|| AppError::NotFound(format!("Source {}", id)))?;
        self.shared.publish(&ledger);
        info!(source_id = %id, name = %removed.name, progress = removed.progress, "Source cancelled");
        Ok(removed)
    }

    pub fn reset(&self) {
        let mut ledger = self.shared.lock();
        ledger.abort_all();
        ledger.order.clear();
        ledger.sources.clear();
        self.shared.publish(&ledger);
        drop(ledger);
        *self
            .last_transcript
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    pub fn snapshot(&self) -> IngestionSnapshot {
        self.shared.snapshot_tx.borrow().clone()
    }

    pub fn combined_text(&self) -> String {
        self.shared.snapshot_tx.borrow().combined_text.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.shared.snapshot_tx.borrow().ready
    }

    /// Receives a fresh snapshot after every change to the source list.
    pub fn subscribe(&self) -> watch::Receiver<IngestionSnapshot> {
        self.shared.snapshot_tx.subscribe()
    }
}

impl Drop for IngestionCollector {
    fn drop(&mut self) {
        self.shared.lock().abort_all();
    }
}

async fn read_source(
    shared: Arc<CollectorShared>,
    id: SourceId,
    mut reader: Box<dyn AsyncRead + Send + Unpin>,
    declared_size: u64,
) {
    let mut bytes = Vec::with_capacity(declared_size.min(MAX_PREALLOC_BYTES) as usize);
    let mut chunk = vec![0u8; shared.chunk_size];

    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(read) => {
                bytes.extend_from_slice(&chunk[..read]);
                if !shared.report_progress(id, bytes.len() as u64) {
                    debug!(source_id = %id, "Stopping read for cancelled source");
                    return;
                }
            }
            Err(e) => {
                shared.stall(id, format!("read failed: {}", e));
                return;
            }
        }
    }

    let text = decode_text(&bytes);
    if text.trim().is_empty() {
        shared.stall(id, "file is empty".to_string());
        return;
    }
    shared.complete(id, text);
}

/// UTF-8 decode with BOM removal; malformed sequences become U+FFFD.
fn decode_text(bytes: &[u8]) -> String {
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(bytes);
    if had_errors {
        warn!(bytes = bytes.len(), "Replaced malformed UTF-8 sequences");
    }
    text.into_owned()
}
