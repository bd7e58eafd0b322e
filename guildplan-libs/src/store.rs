use crate::migrate::{self, MigrationError};
use crate::room::{new_id, Room};
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use thiserror::Error;

const MAX_SLUG_LEN: usize = 64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Room `{0}` already exists")]
    AlreadyExists(String),
    #[error("Room `{0}` is missing right after it was created")]
    Missing(String),
    #[error("Invalid room slug {0:?}")]
    InvalidSlug(String),
    #[error("Room store lock is poisoned")]
    Poisoned,
    #[error("Room store I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("Room blob is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Slugs name files and URL segments: ASCII letters, digits, `-` and `_`
pub fn validate_slug(slug: &str) -> Result<(), StoreError> {
    let valid = !slug.is_empty()
        && slug.len() <= MAX_SLUG_LEN
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidSlug(slug.to_string()))
    }
}

/// An atomic blob store keyed by room slug.
///
/// Implementors provide the three primitive operations; `load` and `save`
/// build the room contract on top of them.
pub trait RoomStore: Send + Sync {
    fn fetch(&self, slug: &str) -> Result<Option<Value>, StoreError>;

    /// Stores `blob` only if `slug` is unknown, `StoreError::AlreadyExists`
    /// otherwise
    fn create(&self, slug: &str, blob: &Value) -> Result<(), StoreError>;

    /// Unconditional overwrite
    fn put(&self, slug: &str, blob: &Value) -> Result<(), StoreError>;

    /// Reads a room, creating it from `seed` on first access.
    ///
    /// When another writer creates the room between our read and our
    /// create, their data wins and is read back. Older blob shapes are
    /// upgraded, `today` decides which week legacy data lands in.
    fn load(&self, slug: &str, seed: &Room, today: NaiveDate) -> Result<Room, StoreError> {
        let blob = match self.fetch(slug)? {
            Some(blob) => blob,
            None => {
                let seed_blob = serde_json::to_value(seed)?;
                match self.create(slug, &seed_blob) {
                    Ok(()) => {
                        info!("seeded room {}", slug);
                        seed_blob
                    }
                    Err(StoreError::AlreadyExists(_)) => {
                        warn!("room {} was created concurrently, reading it back", slug);
                        self.fetch(slug)?
                            .ok_or_else(|| StoreError::Missing(slug.to_string()))?
                    }
                    Err(e) => return Err(e),
                }
            }
        };

        Ok(migrate::upgrade(blob, today)?)
    }

    /// Last write wins, there is no version check
    fn save(&self, slug: &str, room: &Room) -> Result<(), StoreError> {
        let blob = serde_json::to_value(room)?;
        self.put(slug, &blob)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    rooms: RwLock<HashMap<String, Value>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    /// Number of successful `create` and `put` calls so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl RoomStore for MemoryStore {
    fn fetch(&self, slug: &str) -> Result<Option<Value>, StoreError> {
        let rooms = self.rooms.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rooms.get(slug).cloned())
    }

    fn create(&self, slug: &str, blob: &Value) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().map_err(|_| StoreError::Poisoned)?;
        if rooms.contains_key(slug) {
            return Err(StoreError::AlreadyExists(slug.to_string()));
        }
        rooms.insert(slug.to_string(), blob.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn put(&self, slug: &str, blob: &Value) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().map_err(|_| StoreError::Poisoned)?;
        rooms.insert(slug.to_string(), blob.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// One `<slug>.json` per room inside a directory.
///
/// Blobs are written to a temporary file first. `create` hard-links it into
/// place, which fails if the room exists; `put` renames it over the target.
/// Either way readers never see a half-written room.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<FileStore, StoreError> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(FileStore {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, slug: &str) -> Result<PathBuf, StoreError> {
        validate_slug(slug)?;
        Ok(self.dir.join(format!("{}.json", slug)))
    }

    fn write_temp(&self, slug: &str, blob: &Value) -> Result<PathBuf, StoreError> {
        let temp = self.dir.join(format!(".{}.{}.tmp", slug, new_id()));
        let mut writer = BufWriter::new(File::create(&temp)?);
        serde_json::to_writer(&mut writer, blob)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(temp)
    }
}

impl RoomStore for FileStore {
    fn fetch(&self, slug: &str) -> Result<Option<Value>, StoreError> {
        let path = self.path(slug)?;
        match fs::read(&path) {
            Ok(bytes) => {
                debug!("read {} bytes from {}", bytes.len(), path.display());
                Ok(Some(serde_json::from_slice(&bytes)?))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn create(&self, slug: &str, blob: &Value) -> Result<(), StoreError> {
        let path = self.path(slug)?;
        let temp = self.write_temp(slug, blob)?;

        let linked = fs::hard_link(&temp, &path);
        let _ = fs::remove_file(&temp);

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::AlreadyExists(slug.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, slug: &str, blob: &Value) -> Result<(), StoreError> {
        let path = self.path(slug)?;
        let temp = self.write_temp(slug, blob)?;

        if let Err(e) = fs::rename(&temp, &path) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }
        debug!("wrote {}", path.display());
        Ok(())
    }
}
