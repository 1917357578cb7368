use chrono::Local;
use log::{Level, LevelFilter, Log, Metadata, Record};
use parking_lot::Mutex;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

// ── Constants ───────────────────────────────────────────────────────────────

/// Buffered entries before an automatic flush.
const FLUSH_THRESHOLD: usize = 32;

/// Size in bytes at which the current log file is rotated aside.
const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

// ── Logger ──────────────────────────────────────────────────────────────────

struct LoggerInner {
    buffer: Vec<String>,
    log_path: PathBuf,
}

/// Buffered file logger for the session core.
///
/// Entries accumulate in memory and hit disk when the buffer fills; an
/// ERROR flushes immediately so the tail of the file is trustworthy after
/// a crash. When the file grows past `MAX_FILE_SIZE` it is renamed to
/// `<name>.old` (replacing any previous one) and a fresh file is started.
pub struct GobachiLogger {
    inner: Mutex<LoggerInner>,
    level: LevelFilter,
}

impl GobachiLogger {
    fn new(log_path: PathBuf, level: LevelFilter) -> Self {
        Self {
            inner: Mutex::new(LoggerInner {
                buffer: Vec::with_capacity(FLUSH_THRESHOLD),
                log_path,
            }),
            level,
        }
    }

    fn format_line(record: &Record) -> String {
        format!(
            "[{}] {:<5} {}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.module_path().unwrap_or("?"),
            record.args()
        )
    }

    /// Append `entries` to the log file, rotating first if it grew too big.
    /// Caller must NOT hold the inner lock.
    fn write_entries(log_path: &PathBuf, entries: &[String]) {
        if entries.is_empty() {
            return;
        }

        Self::rotate_if_needed(log_path, MAX_FILE_SIZE);

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(log_path) {
            for line in entries {
                let _ = writeln!(file, "{line}");
            }
        }
    }

    /// Move the current file aside once it exceeds `max_size`.
    fn rotate_if_needed(log_path: &PathBuf, max_size: u64) {
        let size = match fs::metadata(log_path) {
            Ok(meta) => meta.len(),
            Err(_) => return, // nothing to rotate yet
        };
        if size <= max_size {
            return;
        }

        let mut old_path = log_path.clone();
        old_path.set_extension("log.old");
        let _ = fs::rename(log_path, &old_path);
    }

    /// Swap out the buffer under the lock; write outside it.
    fn drain_and_write(&self) {
        let (path, entries) = {
            let mut inner = self.inner.lock();
            let drained: Vec<String> = inner.buffer.drain(..).collect();
            (inner.log_path.clone(), drained)
        };
        Self::write_entries(&path, &entries);
    }
}

impl Log for GobachiLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let line = Self::format_line(record);
        let flush_now = {
            let mut inner = self.inner.lock();
            inner.buffer.push(line);
            record.level() == Level::Error || inner.buffer.len() >= FLUSH_THRESHOLD
        };

        if flush_now {
            self.drain_and_write();
        }
    }

    fn flush(&self) {
        self.drain_and_write();
    }
}

// ── Public init ─────────────────────────────────────────────────────────────

/// Install the Gobachi logger as the global `log` backend.
///
/// Creates `log_dir` if missing and writes to `<log_dir>/gobachi.log`. The
/// level comes from the `GOBACHI_LOG` env var (default `info`).
pub fn init_logger(log_dir: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    fs::create_dir_all(&log_dir)?;

    let level = std::env::var("GOBACHI_LOG")
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);

    let logger = GobachiLogger::new(log_dir.join("gobachi.log"), level);
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(level);

    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────────────
