//! Run Snapshots
//!
//! In duration-bounded tests every completed run is appended to a snapshot
//! stream and flushed before the next run starts. If the process dies, the
//! snapshot holds every run that finished; at most the in-flight run is lost.
//!
//! ## Format
//!
//! One JSON object per run record, newline-terminated (JSON Lines when not
//! pretty-printed):
//!
//! ```text
//! {"took":12.4,"run":1}
//! {"took":11.9,"run":2}
//! ```

use runbench_core::RunRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Suffix appended to the output target to name its snapshot
pub const SNAPSHOT_SUFFIX: &str = ".snapshot";

/// Errors that can occur while persisting snapshots
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot file could not be created
    #[error("Failed to open snapshot {path}: {source}")]
    Open {
        /// Snapshot file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Write or flush failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Snapshot path for a given output target: the target plus [`SNAPSHOT_SUFFIX`]
pub fn snapshot_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_os_string();
    name.push(SNAPSHOT_SUFFIX);
    PathBuf::from(name)
}

/// Append-and-flush destination for run records
pub trait SnapshotSink {
    /// Write one record
    fn write(&mut self, record: &RunRecord, pretty: bool) -> Result<(), SnapshotError>;

    /// Push everything written so far to durable storage
    fn flush(&mut self) -> Result<(), SnapshotError>;

    /// Write one record and flush it. Returns only once the record is durable.
    fn persist(&mut self, record: &RunRecord, pretty: bool) -> Result<(), SnapshotError> {
        self.write(record, pretty)?;
        self.flush()
    }
}

/// Opens a sink for a snapshot path, once per test
pub trait SnapshotStore {
    /// Sink type produced by this store
    type Sink: SnapshotSink;

    /// Open (truncate or create) the sink at `path`
    fn open(&mut self, path: &Path) -> Result<Self::Sink, SnapshotError>;
}

/// Snapshot sink over any writer
#[derive(Debug)]
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wrap a writer
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl JsonLinesSink<BufWriter<File>> {
    /// Create (or truncate) the snapshot file at `path`, creating parent directories
    pub fn create(path: &Path) -> Result<Self, SnapshotError> {
        let open = || -> std::io::Result<File> {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            File::create(path)
        };
        let file = open().map_err(|source| SnapshotError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> SnapshotSink for JsonLinesSink<W> {
    fn write(&mut self, record: &RunRecord, pretty: bool) -> Result<(), SnapshotError> {
        if pretty {
            serde_json::to_writer_pretty(&mut self.writer, record)?;
        } else {
            serde_json::to_writer(&mut self.writer, record)?;
        }
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SnapshotError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Store that writes snapshots to files on disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSnapshots;

impl SnapshotStore for FileSnapshots {
    type Sink = JsonLinesSink<BufWriter<File>>;

    fn open(&mut self, path: &Path) -> Result<Self::Sink, SnapshotError> {
        JsonLinesSink::create(path)
    }
}

/// Event observed by a [`MemorySnapshots`] sink
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotEvent {
    /// Sink opened at a path
    Opened(PathBuf),
    /// Record written
    Written(RunRecord),
    /// Sink flushed
    Flushed,
}

/// In-memory store that records every sink operation.
///
/// Clones share the same event log, so a handle kept by the caller sees what
/// the orchestrator did after the orchestrator is gone.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshots {
    events: Arc<Mutex<Vec<SnapshotEvent>>>,
}

impl MemorySnapshots {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event so far, in order
    pub fn events(&self) -> Vec<SnapshotEvent> {
        lock(&self.events).clone()
    }

    /// Records written so far, in order
    pub fn records(&self) -> Vec<RunRecord> {
        lock(&self.events)
            .iter()
            .filter_map(|e| match e {
                SnapshotEvent::Written(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SnapshotStore for MemorySnapshots {
    type Sink = MemorySink;

    fn open(&mut self, path: &Path) -> Result<Self::Sink, SnapshotError> {
        lock(&self.events).push(SnapshotEvent::Opened(path.to_path_buf()));
        Ok(MemorySink {
            events: Arc::clone(&self.events),
        })
    }
}

/// Sink handed out by [`MemorySnapshots`]
#[derive(Debug)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<SnapshotEvent>>>,
}

impl SnapshotSink for MemorySink {
    fn write(&mut self, record: &RunRecord, _pretty: bool) -> Result<(), SnapshotError> {
        lock(&self.events).push(SnapshotEvent::Written(record.clone()));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SnapshotError> {
        lock(&self.events).push(SnapshotEvent::Flushed);
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
