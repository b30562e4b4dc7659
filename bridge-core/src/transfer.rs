//! Batched transfer of rows from a source locator to a sink locator
//!
//! A job moves through `Idle -> Running -> {Completed, Failed, Cancelled}`.
//! Rows are pulled and written in fixed-size batches; progress fields are
//! updated together under one lock after each batch, and cancellation is
//! only honoured between batches.
//!
//! Batches already written when a job fails stay written: delivery is
//! at-least-once, not atomic. Retrying means starting a new job.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::TransferConfig;
use crate::error::{Error, Result};
use crate::locator::{Locator, LocatorKind};
use crate::schema::{Column, Schema};

/// Which way rows flow relative to the table store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// File into table
    Import,

    /// Table into file
    Export,
}

impl Direction {
    fn expected_kinds(self) -> (LocatorKind, LocatorKind) {
        match self {
            Direction::Import => (LocatorKind::File, LocatorKind::Table),
            Direction::Export => (LocatorKind::Table, LocatorKind::File),
        }
    }

    fn past_tense(self) -> &'static str {
        match self {
            Direction::Import => "imported",
            Direction::Export => "exported",
        }
    }

    fn preposition(self) -> &'static str {
        match self {
            Direction::Import => "to",
            Direction::Export => "from",
        }
    }

    fn capitalized(self) -> &'static str {
        match self {
            Direction::Import => "Import",
            Direction::Export => "Export",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Import => write!(f, "import"),
            Direction::Export => write!(f, "export"),
        }
    }
}

/// Lifecycle state of a transfer job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    /// Created, not started
    Idle,

    /// Moving batches
    Running,

    /// All rows written
    Completed,

    /// Aborted by a source or sink error
    Failed,

    /// Stopped at a batch boundary on request
    Cancelled,
}

impl TransferStatus {
    /// Whether no further transition is possible
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransferStatus::Completed | TransferStatus::Failed | TransferStatus::Cancelled
        )
    }
}

impl fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferStatus::Idle => write!(f, "idle"),
            TransferStatus::Running => write!(f, "running"),
            TransferStatus::Completed => write!(f, "completed"),
            TransferStatus::Failed => write!(f, "failed"),
            TransferStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A requested copy of rows from `source` to `sink`.
///
/// Jobs are consumed by the engine when started, so a finished job can
/// never be re-run; build a new one to retry.
pub struct TransferJob {
    id: Uuid,
    direction: Direction,
    source: Arc<dyn Locator>,
    sink: Arc<dyn Locator>,
    columns: Vec<Column>,
    status: TransferStatus,
    rows_total: Option<u64>,
    rows_processed: u64,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    errors: Vec<String>,
    log: Vec<String>,
}

impl TransferJob {
    /// Create an idle job moving the selected `columns`
    pub fn new(
        direction: Direction,
        source: Arc<dyn Locator>,
        sink: Arc<dyn Locator>,
        columns: Vec<Column>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            source,
            sink,
            columns,
            status: TransferStatus::Idle,
            rows_total: None,
            rows_processed: 0,
            started_at: None,
            ended_at: None,
            errors: Vec::new(),
            log: Vec::new(),
        }
    }

    /// Create an idle job moving every selected column of the source schema
    pub fn with_source_columns(
        direction: Direction,
        source: Arc<dyn Locator>,
        sink: Arc<dyn Locator>,
    ) -> Result<Self> {
        let columns = source.schema()?.selected();
        Ok(Self::new(direction, source, sink, columns))
    }

    /// Job identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Transfer direction
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Columns requested for transfer
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Current status
    pub fn status(&self) -> TransferStatus {
        self.status
    }

    /// Rows written so far, always a whole number of batches
    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    /// Total rows, when the source knows it
    pub fn rows_total(&self) -> Option<u64> {
        self.rows_total
    }

    /// Errors recorded so far
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Log lines recorded so far
    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// Immutable copy of the job state
    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            id: self.id,
            direction: self.direction,
            source: self.source.describe(),
            sink: self.sink.describe(),
            columns: self
                .columns
                .iter()
                .filter(|c| c.selected)
                .map(|c| c.name.clone())
                .collect(),
            status: self.status,
            rows_total: self.rows_total,
            rows_processed: self.rows_processed,
            started_at: self.started_at,
            ended_at: self.ended_at,
            errors: self.errors.clone(),
            log: self.log.clone(),
        }
    }
}

impl fmt::Debug for TransferJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferJob")
            .field("id", &self.id)
            .field("direction", &self.direction)
            .field("source", &self.source.describe())
            .field("sink", &self.sink.describe())
            .field("status", &self.status)
            .field("rows_processed", &self.rows_processed)
            .finish_non_exhaustive()
    }
}

/// Point-in-time view of a job, safe to hand to any reader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Job identifier
    pub id: Uuid,

    /// Transfer direction
    pub direction: Direction,

    /// Description of the source locator
    pub source: String,

    /// Description of the sink locator
    pub sink: String,

    /// Names of the transferred columns
    pub columns: Vec<String>,

    /// Status at the time of the snapshot
    pub status: TransferStatus,

    /// Total rows, when known
    pub rows_total: Option<u64>,

    /// Rows written
    pub rows_processed: u64,

    /// When the job started running
    pub started_at: Option<DateTime<Utc>>,

    /// When the job reached a terminal state
    pub ended_at: Option<DateTime<Utc>>,

    /// Every error recorded
    pub errors: Vec<String>,

    /// Every log line recorded
    pub log: Vec<String>,
}

/// Update delivered to the progress callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    /// Current status
    pub status: TransferStatus,

    /// Total rows, when known
    pub rows_total: Option<u64>,

    /// Rows written so far
    pub rows_processed: u64,

    /// Log lines appended since the previous update
    pub log: Vec<String>,

    /// Errors appended since the previous update
    pub errors: Vec<String>,
}

struct ActiveJob {
    job: Arc<Mutex<TransferJob>>,
    cancel: Arc<AtomicBool>,
}

type ActiveSlot = Arc<Mutex<Option<ActiveJob>>>;

/// Runs at most one transfer job at a time
pub struct TransferEngine {
    config: TransferConfig,
    active: ActiveSlot,
}

impl TransferEngine {
    /// Create an engine
    pub fn new(config: TransferConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            active: Arc::new(Mutex::new(None)),
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Run `job` on the calling thread until it reaches a terminal state
    pub fn run(
        &self,
        job: TransferJob,
        mut on_progress: impl FnMut(&TransferProgress),
    ) -> Result<JobSnapshot> {
        let run = self.begin(job)?;
        let job = Arc::clone(&run.job);
        run.execute(&mut on_progress);
        let snapshot = lock(&job).snapshot();
        Ok(snapshot)
    }

    /// Run `job` on a background worker thread
    pub fn start(
        &self,
        job: TransferJob,
        mut on_progress: impl FnMut(&TransferProgress) + Send + 'static,
    ) -> Result<TransferHandle> {
        let run = self.begin(job)?;
        let job = Arc::clone(&run.job);
        let cancel = Arc::clone(&run.cancel);

        let spawned = thread::Builder::new()
            .name(self.config.worker_name.clone())
            .spawn(move || run.execute(&mut on_progress));

        match spawned {
            Ok(thread) => Ok(TransferHandle {
                job,
                cancel,
                thread: Some(thread),
            }),
            Err(e) => {
                // the closure and its Run were dropped, releasing the slot
                let mut state = lock(&job);
                let direction = state.direction;
                state.status = TransferStatus::Failed;
                state.ended_at = Some(Utc::now());
                state.errors.push(format!("failed to spawn worker: {e}"));
                state.log.push(format!("{} failed: {e}", direction.capitalized()));
                error!(job_id = %state.id, "failed to spawn transfer worker: {}", e);
                Err(Error::Io(e))
            }
        }
    }

    /// Request cancellation of the running job, if any.
    ///
    /// Returns whether a job was running.
    pub fn cancel(&self) -> bool {
        match lock(&self.active).as_ref() {
            Some(active) => {
                active.cancel.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Whether a job is running
    pub fn is_running(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Snapshot of the running job, if any
    pub fn current(&self) -> Option<JobSnapshot> {
        let job = lock(&self.active).as_ref().map(|a| Arc::clone(&a.job))?;
        let snapshot = lock(&job).snapshot();
        Some(snapshot)
    }

    fn begin(&self, mut job: TransferJob) -> Result<Run> {
        let (source_kind, sink_kind) = job.direction.expected_kinds();
        if job.source.kind() != source_kind || job.sink.kind() != sink_kind {
            return Err(Error::InvalidArgument(format!(
                "{} needs a {} source and a {} sink, got {} and {}",
                job.direction,
                source_kind,
                sink_kind,
                job.source.kind(),
                job.sink.kind()
            )));
        }

        let mut active = lock(&self.active);
        if active.is_some() {
            warn!(job_id = %job.id, "rejected transfer start, another job is running");
            return Err(Error::AlreadyRunning);
        }

        job.status = TransferStatus::Running;
        job.started_at = Some(Utc::now());
        job.ended_at = None;
        job.rows_total = None;
        job.rows_processed = 0;
        job.errors.clear();
        job.log.clear();
        let target = match job.direction {
            Direction::Import => job.sink.describe(),
            Direction::Export => job.source.describe(),
        };
        job.log.push(format!(
            "Starting {} {} {target}...",
            job.direction,
            job.direction.preposition()
        ));
        info!(
            job_id = %job.id,
            direction = %job.direction,
            source = %job.source.describe(),
            sink = %job.sink.describe(),
            "transfer started"
        );

        let job = Arc::new(Mutex::new(job));
        let cancel = Arc::new(AtomicBool::new(false));
        *active = Some(ActiveJob {
            job: Arc::clone(&job),
            cancel: Arc::clone(&cancel),
        });

        Ok(Run {
            job,
            cancel,
            active: Arc::clone(&self.active),
            batch_size: self.config.batch_size,
        })
    }
}

/// Handle to a job running on a background worker
pub struct TransferHandle {
    job: Arc<Mutex<TransferJob>>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TransferHandle {
    /// Current state of the job
    pub fn snapshot(&self) -> JobSnapshot {
        lock(&self.job).snapshot()
    }

    /// Ask the job to stop after the batch in flight
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Whether the worker has finished
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Block until the job reaches a terminal state
    pub fn wait(mut self) -> Result<JobSnapshot> {
        if let Some(thread) = self.thread.take() {
            thread
                .join()
                .map_err(|_| Error::InvalidState("transfer worker panicked".into()))?;
        }
        Ok(self.snapshot())
    }
}

enum Outcome {
    Completed,
    Cancelled,
}

/// Position in the job's log and error lists already reported
#[derive(Default)]
struct ProgressCursor {
    log: usize,
    errors: usize,
}

impl ProgressCursor {
    fn progress(&mut self, job: &TransferJob) -> TransferProgress {
        let progress = TransferProgress {
            status: job.status,
            rows_total: job.rows_total,
            rows_processed: job.rows_processed,
            log: job.log[self.log..].to_vec(),
            errors: job.errors[self.errors..].to_vec(),
        };
        self.log = job.log.len();
        self.errors = job.errors.len();
        progress
    }
}

/// One execution of a job, owning its slot in the engine until dropped
struct Run {
    job: Arc<Mutex<TransferJob>>,
    cancel: Arc<AtomicBool>,
    active: ActiveSlot,
    batch_size: usize,
}

impl Run {
    fn execute(self, on_progress: &mut dyn FnMut(&TransferProgress)) {
        let started = Instant::now();
        let mut cursor = ProgressCursor::default();

        let outcome = self.transfer(&mut cursor, on_progress);

        let progress = {
            let mut job = lock(&self.job);
            let direction = job.direction;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            match outcome {
                Ok(Outcome::Completed) => {
                    job.status = TransferStatus::Completed;
                    let line = format!(
                        "{} completed successfully. {} records {} in {elapsed_ms} ms.",
                        direction.capitalized(),
                        job.rows_processed,
                        direction.past_tense()
                    );
                    job.log.push(line);
                    info!(job_id = %job.id, rows = job.rows_processed, elapsed_ms, "transfer completed");
                }
                Ok(Outcome::Cancelled) => {
                    job.status = TransferStatus::Cancelled;
                    let line = format!(
                        "{} cancelled after {} records.",
                        direction.capitalized(),
                        job.rows_processed
                    );
                    job.log.push(line);
                    info!(job_id = %job.id, rows = job.rows_processed, "transfer cancelled");
                }
                Err(e) => {
                    job.status = TransferStatus::Failed;
                    job.errors.push(e.to_string());
                    job.log.push(format!("{} failed: {e}", direction.capitalized()));
                    error!(job_id = %job.id, rows = job.rows_processed, "transfer failed: {}", e);
                }
            }
            job.ended_at = Some(Utc::now());
            cursor.progress(&job)
        };

        self.release();
        on_progress(&progress);
    }

    fn transfer(
        &self,
        cursor: &mut ProgressCursor,
        on_progress: &mut dyn FnMut(&TransferProgress),
    ) -> Result<Outcome> {
        let (direction, source, sink, columns) = {
            let job = lock(&self.job);
            (
                job.direction,
                Arc::clone(&job.source),
                Arc::clone(&job.sink),
                job.columns.clone(),
            )
        };

        let selected: Vec<Column> = columns.into_iter().filter(|c| c.selected).collect();
        if selected.is_empty() {
            return Err(Error::InvalidArgument("no columns selected".into()));
        }

        let mut rows = source.open_for_read().map_err(source_error)?;
        let source_schema = rows.schema();
        for column in &selected {
            if !source_schema.contains(&column.name) {
                return Err(Error::SourceError(format!(
                    "column {} not found in {}",
                    column.name,
                    source.describe()
                )));
            }
        }
        let target = Arc::new(Schema::new(selected)?);
        let mut writer = sink.open_for_write(Arc::clone(&target)).map_err(sink_error)?;

        lock(&self.job).rows_total = rows.row_count_hint();

        let mut batch = Vec::with_capacity(self.batch_size);
        loop {
            if self.cancel.load(Ordering::SeqCst) {
                return Ok(Outcome::Cancelled);
            }

            batch.clear();
            for row in rows.by_ref().take(self.batch_size) {
                let row = row.map_err(source_error)?;
                batch.push(row.project(&target).map_err(source_error)?);
            }
            if batch.is_empty() {
                break;
            }

            writer.write_batch(&batch).map_err(sink_error)?;

            let progress = {
                let mut job = lock(&self.job);
                let first = job.rows_processed + 1;
                job.rows_processed += batch.len() as u64;
                let processed = job.rows_processed;
                if job.rows_total.is_some_and(|total| processed > total) {
                    // the hint was stale; the real total is unknown
                    job.rows_total = None;
                }
                let line = format!(
                    "{} records {first} to {processed}",
                    capitalize(direction.past_tense())
                );
                job.log.push(line);
                debug!(job_id = %job.id, rows = processed, "batch written");
                cursor.progress(&job)
            };
            on_progress(&progress);
        }

        writer.finish().map_err(sink_error)?;
        Ok(Outcome::Completed)
    }

    fn release(&self) {
        let mut active = lock(&self.active);
        if active
            .as_ref()
            .is_some_and(|a| Arc::ptr_eq(&a.job, &self.job))
        {
            *active = None;
        }
    }
}

impl Drop for Run {
    fn drop(&mut self) {
        self.release();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn source_error(e: Error) -> Error {
    match e {
        Error::SourceError(_) => e,
        other => Error::SourceError(other.to_string()),
    }
}

fn sink_error(e: Error) -> Error {
    match e {
        Error::SinkError(_) => e,
        other => Error::SinkError(other.to_string()),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
