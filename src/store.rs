//! Wish list and heart counter, persisted as two JSON documents.
//!
//! Every mutation rewrites its document in full before returning. A failed
//! write is logged and counted; the in-memory value keeps the mutation, so
//! memory and disk can diverge until the next successful write.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::GuestbookError;
use crate::metrics::PERSIST_FAILURES;
use crate::models::{HeartCounter, Snapshot, Wish};

pub const GREETINGS_FILE: &str = "greetings.json";
pub const HEARTS_FILE: &str = "hearts.json";

pub struct GuestbookStore {
    wishes: Vec<Wish>, // insertion order, oldest first
    hearts: HeartCounter,
    greetings_path: PathBuf,
    hearts_path: PathBuf,
}

impl GuestbookStore {
    /// Open the store in `data_dir`, creating the directory and any missing
    /// document with its empty value.
    pub fn open(data_dir: &Path) -> Result<Self, GuestbookError> {
        std::fs::create_dir_all(data_dir).map_err(|source| GuestbookError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        let greetings_path = data_dir.join(GREETINGS_FILE);
        let hearts_path = data_dir.join(HEARTS_FILE);

        let wishes: Vec<Wish> = load_or_init(&greetings_path)?;
        let hearts: HeartCounter = load_or_init(&hearts_path)?;

        tracing::info!(
            wishes = wishes.len(),
            hearts = hearts.count,
            dir = %data_dir.display(),
            "state loaded"
        );

        Ok(Self {
            wishes,
            hearts,
            greetings_path,
            hearts_path,
        })
    }

    /// Append a validated wish, stamping id and time. Returns the stored record.
    pub fn append_wish(&mut self, display_name: String, text: String) -> Wish {
        let wish = Wish {
            id: Uuid::new_v4(),
            display_name,
            text,
            submitted_at: Utc::now(),
        };
        self.wishes.push(wish.clone());
        self.persist_wishes();
        wish
    }

    /// Add one heart and return the new count.
    pub fn increment_heart(&mut self) -> u64 {
        self.hearts.count += 1;
        self.persist_hearts();
        self.hearts.count
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            greetings: self.wishes.clone(),
            hearts: self.hearts.count,
        }
    }

    pub fn wish_count(&self) -> usize {
        self.wishes.len()
    }

    pub fn heart_count(&self) -> u64 {
        self.hearts.count
    }

    /// Rewrite both documents. Used on shutdown.
    pub fn flush(&self) -> Result<(), GuestbookError> {
        write_document(&self.greetings_path, &self.wishes)?;
        write_document(&self.hearts_path, &self.hearts)
    }

    fn persist_wishes(&self) {
        if let Err(err) = write_document(&self.greetings_path, &self.wishes) {
            PERSIST_FAILURES.inc();
            tracing::error!(error = %err, "wish list not persisted, keeping in-memory copy");
        }
    }

    fn persist_hearts(&self) {
        if let Err(err) = write_document(&self.hearts_path, &self.hearts) {
            PERSIST_FAILURES.inc();
            tracing::error!(error = %err, "heart count not persisted, keeping in-memory copy");
        }
    }
}

fn load_or_init<T>(path: &Path) -> Result<T, GuestbookError>
where
    T: Default + Serialize + DeserializeOwned,
{
    if !path.exists() {
        let value = T::default();
        write_document(path, &value)?;
        return Ok(value);
    }

    let raw = std::fs::read_to_string(path).map_err(|source| GuestbookError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| GuestbookError::Json {
        path: path.to_path_buf(),
        source,
    })
}

// Write to a sibling temp file, then rename over the target
fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), GuestbookError> {
    let json = serde_json::to_vec_pretty(value).map_err(|source| GuestbookError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = path.with_extension("json.tmp");
    let persist_err = |source: std::io::Error| GuestbookError::Persist {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp, json).map_err(persist_err)?;
    std::fs::rename(&tmp, path).map_err(persist_err)
}
