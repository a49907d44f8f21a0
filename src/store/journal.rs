//! Append-only JSON-lines journal
//!
//! One record per line. The store replays the whole file on open and appends
//! (and syncs) a record before applying any change in memory.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{StoreError, StoreResult};
use crate::types::{ChatId, MessageId, UserId};

/// A committed change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    UserCreated {
        id: UserId,
        name: String,
        password_hash: String,
    },
    ChatCreated {
        id: ChatId,
        title: String,
        owner: UserId,
    },
    MemberJoined {
        chat_id: ChatId,
        user_id: UserId,
    },
    MessagePosted {
        id: MessageId,
        chat_id: ChatId,
        user_id: UserId,
        text: String,
        timestamp: DateTime<Utc>,
    },
}

/// Journal file handle
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    file: File,
}

impl Journal {
    /// Open (creating if needed) the journal at `path` and read back every record
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<(Self, Vec<Record>)> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let records = if path.exists() {
            Self::read_records(&path)?
        } else {
            Vec::new()
        };

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok((Self { path, file }, records))
    }

    fn read_records(path: &Path) -> StoreResult<Vec<Record>> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record = serde_json::from_str(line).map_err(|e| StoreError::Corrupted {
                line: index + 1,
                reason: e.to_string(),
            })?;
            records.push(record);
        }

        Ok(records)
    }

    /// Append one record and sync it to disk
    pub fn append(&mut self, record: &Record) -> StoreResult<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.sync_data()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
