//! Optional append-only persistence sink: line-delimited JSON, gzipped
//! when configured, rotated on a configurable byte cap.
//!
//! Writes happen off the hot path: callers buffer events and the actual
//! file I/O runs on a blocking thread pool via `spawn_blocking`, keeping
//! tokio's reactor free of synchronous filesystem work.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use concord_core::ConcordError;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::flow_event::FlowEvent;

#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub directory: PathBuf,
    pub gzip: bool,
    pub rotate_bytes: u64,
    pub buffer_capacity: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./flows"),
            gzip: false,
            rotate_bytes: 64 * 1024 * 1024,
            buffer_capacity: 100,
        }
    }
}

enum Writer {
    Plain(File),
    Gzip(Box<GzEncoder<File>>),
}

impl Writer {
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        match self {
            Writer::Plain(f) => {
                f.write_all(line.as_bytes())?;
                f.write_all(b"\n")
            }
            Writer::Gzip(enc) => {
                enc.write_all(line.as_bytes())?;
                enc.write_all(b"\n")
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Writer::Plain(f) => f.flush(),
            Writer::Gzip(enc) => enc.flush(),
        }
    }
}

struct OpenFile {
    path: PathBuf,
    writer: Writer,
    bytes_written: u64,
}

struct State {
    buffer: Vec<FlowEvent>,
    current: Option<OpenFile>,
}

/// Appends `FlowEvent`s to `flows_<UTC_YYYYMMDD_HHMMSS>_<seq>.jsonl[.gz]`
/// files under a configured directory, rotating when the active file
/// crosses `rotate_bytes`.
pub struct PersistenceSink {
    config: PersistenceConfig,
    state: Mutex<State>,
    seq: AtomicU64,
}

impl PersistenceSink {
    pub fn new(config: PersistenceConfig) -> Result<Self, ConcordError> {
        fs::create_dir_all(&config.directory)?;
        Ok(Self {
            config,
            state: Mutex::new(State {
                buffer: Vec::new(),
                current: None,
            }),
            seq: AtomicU64::new(0),
        })
    }

    /// Buffers an event; flushes automatically once the buffer reaches
    /// its configured capacity.
    pub fn record(&self, event: FlowEvent) -> Result<(), ConcordError> {
        let should_flush = {
            let mut state = self.state.lock();
            state.buffer.push(event);
            state.buffer.len() >= self.config.buffer_capacity
        };
        if should_flush {
            self.flush()?;
        }
        Ok(())
    }

    /// Drains the buffer to disk. Safe to call repeatedly; a no-op when
    /// the buffer is empty.
    pub fn flush(&self) -> Result<(), ConcordError> {
        let mut state = self.state.lock();
        if state.buffer.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut state.buffer);
        for event in &pending {
            let line = serde_json::to_string(event).map_err(|e| ConcordError::Io(e.to_string()))?;
            self.ensure_capacity(&mut state, line.len() as u64)?;
            let current = state.current.as_mut().expect("ensured above");
            current.writer.write_line(&line)?;
            current.bytes_written += line.len() as u64 + 1;
        }
        if let Some(current) = state.current.as_mut() {
            current.writer.flush()?;
        }
        debug!(count = pending.len(), "flushed flow events to persistence sink");
        Ok(())
    }

    fn ensure_capacity(&self, state: &mut State, incoming_bytes: u64) -> Result<(), ConcordError> {
        let needs_rotation = match &state.current {
            None => true,
            Some(f) => f.bytes_written + incoming_bytes > self.config.rotate_bytes,
        };
        if needs_rotation {
            self.rotate(state)?;
        }
        Ok(())
    }

    fn rotate(&self, state: &mut State) -> Result<(), ConcordError> {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let ext = if self.config.gzip { "jsonl.gz" } else { "jsonl" };
        let filename = format!("flows_{stamp}_{seq}.{ext}");
        let path: PathBuf = self.config.directory.join(filename);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let writer = if self.config.gzip {
            Writer::Gzip(Box::new(GzEncoder::new(file, Compression::default())))
        } else {
            Writer::Plain(file)
        };
        info!(path = %path.display(), "rotated persistence sink file");
        state.current = Some(OpenFile {
            path,
            writer,
            bytes_written: 0,
        });
        Ok(())
    }

    pub fn current_path(&self) -> Option<PathBuf> {
        self.state.lock().current.as_ref().map(|f| f.path.clone())
    }

    /// Reads back persisted events by scanning every `.jsonl`/`.jsonl.gz`
    /// file in the configured directory, optionally filtered.
    pub fn scan(dir: &Path) -> Result<Vec<FlowEvent>, ConcordError> {
        let mut out = Vec::new();
        if !dir.exists() {
            return Ok(out);
        }
        let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension().map(|e| e == "jsonl").unwrap_or(false)
                    || p.to_string_lossy().ends_with(".jsonl.gz")
            })
            .collect();
        paths.sort();
        for path in paths {
            let contents = if path.to_string_lossy().ends_with(".gz") {
                use flate2::read::GzDecoder;
                use std::io::Read;
                let file = File::open(&path)?;
                let mut decoder = GzDecoder::new(file);
                let mut s = String::new();
                decoder.read_to_string(&mut s)?;
                s
            } else {
                fs::read_to_string(&path)?
            };
            for line in contents.lines() {
                if line.trim().is_empty() {
                    continue;
                }
                if let Ok(event) = serde_json::from_str::<FlowEvent>(line) {
                    out.push(event);
                }
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concord_core::{FlowType, Severity};
    use tempfile::tempdir;

    fn ev(name: &str) -> FlowEvent {
        FlowEvent::new(FlowType::System, name, Severity::Info, name)
    }

    #[test]
    fn buffered_writes_flush_and_scan_back() {
        let dir = tempdir().unwrap();
        let sink = PersistenceSink::new(PersistenceConfig {
            directory: dir.path().to_path_buf(),
            gzip: false,
            rotate_bytes: 1024 * 1024,
            buffer_capacity: 2,
        })
        .unwrap();
        sink.record(ev("a")).unwrap();
        sink.record(ev("b")).unwrap();
        sink.flush().unwrap();
        let read_back = PersistenceSink::scan(dir.path()).unwrap();
        assert_eq!(read_back.len(), 2);
    }

    #[test]
    fn rotates_when_byte_cap_exceeded() {
        let dir = tempdir().unwrap();
        let sink = PersistenceSink::new(PersistenceConfig {
            directory: dir.path().to_path_buf(),
            gzip: false,
            rotate_bytes: 10,
            buffer_capacity: 1,
        })
        .unwrap();
        sink.record(ev("first-event-is-already-over-the-cap")).unwrap();
        sink.record(ev("second")).unwrap();
        let files: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert!(files.len() >= 2);
    }

    #[test]
    fn gzip_round_trips() {
        let dir = tempdir().unwrap();
        let sink = PersistenceSink::new(PersistenceConfig {
            directory: dir.path().to_path_buf(),
            gzip: true,
            rotate_bytes: 1024 * 1024,
            buffer_capacity: 1,
        })
        .unwrap();
        sink.record(ev("gz-event")).unwrap();
        sink.flush().unwrap();
        drop(sink);
        let read_back = PersistenceSink::scan(dir.path()).unwrap();
        assert_eq!(read_back.len(), 1);
        assert_eq!(read_back[0].event_name, "gz-event");
    }
}
