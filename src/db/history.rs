//! Append-only log of comic numbers that have already been mailed
//!
//! One number per line, newline terminated. The log itself does not reject
//! duplicates; callers check `contains` before `append`.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::HistoryError;

#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, action: &'static str, source: std::io::Error) -> HistoryError {
        HistoryError::Io {
            action,
            path: self.path.clone(),
            source,
        }
    }

    /// Check whether `num` has already been recorded
    ///
    /// A missing log is created empty and reported as "not found".
    pub fn contains(&self, num: u64) -> Result<bool, HistoryError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                File::create(&self.path).map_err(|e| self.io_error("create", e))?;
                tracing::debug!("Created {}", self.path.display());
                return Ok(false);
            }
            Err(e) => return Err(self.io_error("open", e)),
        };

        let wanted = num.to_string();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| self.io_error("read", e))?;
            if line.trim() == wanted {
                tracing::info!("xkcd {} already in {}", num, self.path.display());
                return Ok(true);
            }
        }

        tracing::info!("xkcd {} not found in history", num);
        Ok(false)
    }

    /// Open the log for append without writing anything
    ///
    /// Fails early if the log cannot be written, so a comic is never mailed
    /// without being recorded.
    pub fn ensure_writable(&self) -> Result<(), HistoryError> {
        self.open_append()?;
        Ok(())
    }

    /// Record `num` as notified
    ///
    /// Terminates an unterminated last line first so the new number never
    /// runs into the previous one.
    pub fn append(&self, num: u64) -> Result<(), HistoryError> {
        let mut file = self.open_append()?;
        if !self.ends_with_newline()? {
            writeln!(file).map_err(|e| self.io_error("append to", e))?;
        }
        // Trailing newline for posix compliance
        writeln!(file, "{}", num).map_err(|e| self.io_error("append to", e))?;
        file.flush().map_err(|e| self.io_error("append to", e))?;

        tracing::debug!("Recorded xkcd {} in {}", num, self.path.display());
        Ok(())
    }

    /// True for an empty log or one whose last byte is `\n`
    fn ends_with_newline(&self) -> Result<bool, HistoryError> {
        let mut file = File::open(&self.path).map_err(|e| self.io_error("read", e))?;
        let len = file
            .metadata()
            .map_err(|e| self.io_error("read", e))?
            .len();
        if len == 0 {
            return Ok(true);
        }

        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1))
            .and_then(|_| file.read_exact(&mut last))
            .map_err(|e| self.io_error("read", e))?;
        Ok(last[0] == b'\n')
    }

    fn open_append(&self) -> Result<File, HistoryError> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error("open for append", e))
    }
}
