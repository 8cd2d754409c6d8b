use super::day_buckets::DayBuckets;
use super::line_parser::RequestParser;
use super::performance_data::RequestSample;
use crate::Result;
use crate::collectors::cache_lock::acquire_file_lock;
use chrono::Utc;
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "  loadlens";

/// File in the data directory holding the byte offset reached in the request log
pub const POSITION_FILE: &str = "last_position.txt";

/// Lock file held for the duration of a tick
pub const TAIL_LOCK_FILE: &str = "tail.lock";

const BACKWARD_CHUNK_BYTES: u64 = 64 * 1024;

/// What one tailer run did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TailOutcome {
    /// New complete lines were consumed
    Extended { from: u64, to: u64, samples: usize },

    /// Nothing new since the last run
    Unchanged,

    /// The request log does not exist
    SourceMissing,
}

/// Follows the request log across runs, persisting how far it got
#[derive(Debug, Clone)]
pub struct RequestLogTailer {
    log_path: PathBuf,
    position_path: PathBuf,
    lock_path: PathBuf,
    buckets: DayBuckets,
}

impl RequestLogTailer {
    #[must_use]
    pub fn new(log_path: impl AsRef<Path>, data_dir: impl AsRef<Path>, buckets: DayBuckets) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            log_path: log_path.as_ref().to_path_buf(),
            position_path: data_dir.join(POSITION_FILE),
            lock_path: data_dir.join(TAIL_LOCK_FILE),
            buckets,
        }
    }

    #[must_use]
    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    #[must_use]
    pub const fn buckets(&self) -> &DayBuckets {
        &self.buckets
    }

    /// The persisted offset; anything missing or unreadable counts as the start of the log
    #[must_use]
    pub fn position(&self) -> u64 {
        fs::read_to_string(&self.position_path)
            .ok()
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(0)
    }

    fn save_position(&self, position: u64) -> Result<()> {
        let dir = self.position_path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir).into_app_err_with(|| format!("unable to create directory '{}'", dir.display()))?;

        let mut temp = tempfile::NamedTempFile::new_in(dir).into_app_err("unable to create temporary position file")?;
        write!(temp, "{position}").into_app_err("unable to write tail position")?;
        let _ = temp
            .persist(&self.position_path)
            .into_app_err_with(|| format!("unable to save tail position to '{}'", self.position_path.display()))?;
        Ok(())
    }

    /// Consume the complete lines appended to the log since the last run
    ///
    /// Finished requests go to their day bucket and the offset is saved after each one, so an
    /// interrupted run resumes where it stopped. A trailing line without its newline is left for
    /// a later run. If the log shrank below the saved offset it was truncated or rotated, and
    /// reading restarts from the beginning.
    ///
    /// Ticks sharing a data directory, in this process or another, run one at a time; the offset
    /// is read only once the lock is held.
    pub fn tick(&self) -> Result<TailOutcome> {
        let _guard = acquire_file_lock(&self.lock_path)?;
        self.tick_locked()
    }

    fn tick_locked(&self) -> Result<TailOutcome> {
        let today = Utc::now().date_naive();
        let _ = self.buckets.prune(today);

        let file = match File::open(&self.log_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(target: LOG_TARGET, "Request log '{}' does not exist", self.log_path.display());
                return Ok(TailOutcome::SourceMissing);
            }
            Err(e) => return Err(e).into_app_err_with(|| format!("unable to open '{}'", self.log_path.display())),
        };

        let length = file
            .metadata()
            .into_app_err_with(|| format!("unable to inspect '{}'", self.log_path.display()))?
            .len();

        let mut from = self.position();
        if from > length {
            log::info!(target: LOG_TARGET,
                "Request log '{}' shrank below offset {from}, restarting from the beginning",
                self.log_path.display()
            );
            from = 0;
        }

        if from == length {
            if from != self.position() {
                self.save_position(from)?;
            }
            return Ok(TailOutcome::Unchanged);
        }

        let mut reader = BufReader::new(file);
        let _ = reader
            .seek(SeekFrom::Start(from))
            .into_app_err_with(|| format!("unable to seek in '{}'", self.log_path.display()))?;

        let mut parser = RequestParser::new();
        let mut position = from;
        let mut samples = 0;
        let mut buffer = Vec::new();

        loop {
            buffer.clear();
            let read = reader
                .read_until(b'\n', &mut buffer)
                .into_app_err_with(|| format!("unable to read '{}'", self.log_path.display()))?;
            if read == 0 || buffer.last() != Some(&b'\n') {
                break;
            }

            position += read as u64;
            let line = String::from_utf8_lossy(&buffer);
            if let Some(sample) = parser.feed(line.trim_end()) {
                if self.buckets.append(&sample, today)? {
                    samples += 1;
                }
                self.save_position(position)?;
            }
        }

        self.save_position(position)?;

        if parser.in_flight() > 0 {
            log::debug!(target: LOG_TARGET, "Dropping {} requests still in flight", parser.in_flight());
        }

        if position == from {
            return Ok(TailOutcome::Unchanged);
        }

        log::info!(target: LOG_TARGET, "Read bytes {from}..{position} of '{}', stored {samples} requests", self.log_path.display());
        Ok(TailOutcome::Extended { from, to: position, samples })
    }

    /// Requests found in the last `max_lines` lines of the log, without touching the offset
    #[must_use]
    pub fn bootstrap_samples(&self, max_lines: usize) -> Vec<RequestSample> {
        let lines = match read_last_lines(&self.log_path, max_lines) {
            Ok(lines) => lines,
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Could not bootstrap from '{}': {e}", self.log_path.display());
                return Vec::new();
            }
        };

        let mut parser = RequestParser::new();
        let samples: Vec<RequestSample> = lines.iter().filter_map(|line| parser.feed(line)).collect();
        log::info!(target: LOG_TARGET, "Bootstrapped {} requests from the last {} log lines", samples.len(), lines.len());
        samples
    }
}

/// The last `max_lines` lines of a file, read backwards in chunks
fn read_last_lines(path: &Path, max_lines: usize) -> io::Result<Vec<String>> {
    let mut file = File::open(path)?;
    let length = file.metadata()?.len();

    let mut start = length;
    let mut tail: Vec<u8> = Vec::new();
    while start > 0 && bytecount_newlines(&tail) <= max_lines {
        let chunk = BACKWARD_CHUNK_BYTES.min(start);
        start -= chunk;

        let mut buffer = vec![0; usize::try_from(chunk).unwrap_or(usize::MAX)];
        let _ = file.seek(SeekFrom::Start(start))?;
        file.read_exact(&mut buffer)?;
        buffer.extend_from_slice(&tail);
        tail = buffer;
    }

    let text = String::from_utf8_lossy(&tail);
    let mut lines: Vec<&str> = text.lines().collect();

    // The first line is partial unless the whole file was read
    if start > 0 && !lines.is_empty() {
        let _ = lines.remove(0);
    }

    let skip = lines.len().saturating_sub(max_lines);
    Ok(lines[skip..].iter().map(|line| (*line).to_string()).collect())
}

fn bytecount_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}
