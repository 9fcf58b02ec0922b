//! Persisted dedup state: which coaches were already reported, per source and direction.
//!
//! Each source owns one JSON document holding a sub-list per direction:
//!
//! ```text
//! {"onward": [{"coach_no": "DR-101"}], "return": [{"coach_no": "RD-7"}]}
//! ```
//!
//! A partition is overwritten with the latest cycle's ids rather than merged, so a coach that
//! disappears and comes back is reported again.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::lenient::string_or_number;
use crate::model::{JourneyType, SourceId, TicketRecord};
use crate::ports::{CacheError, CacheStore};

/// Coach ids previously seen in one partition.
pub type SeenSet = HashSet<String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
/// Address of one partition of the dedup state.
pub struct PartitionKey {
    /// Source owning the partition.
    pub source: SourceId,
    /// Direction the partition tracks.
    pub journey_type: JourneyType,
}

impl PartitionKey {
    /// Construct a key for the given source and direction.
    #[must_use]
    pub fn new(source: SourceId, journey_type: JourneyType) -> Self {
        Self {
            source,
            journey_type,
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}/{}", self.source, self.journey_type.cache_key())
    }
}

/// Tickets from `current` whose coach id is not in `previously_seen`, in input order.
///
/// An empty `previously_seen` returns every ticket, which is what a first run reports.
#[must_use]
pub fn diff(current: &[TicketRecord], previously_seen: &SeenSet) -> Vec<TicketRecord> {
    current
        .iter()
        .filter(|ticket| !previously_seen.contains(&ticket.coach_id))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CacheEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    coach_no: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    onward: Vec<CacheEntry>,
    #[serde(default, rename = "return")]
    returning: Vec<CacheEntry>,
}

impl CacheDocument {
    fn entries(&self, journey_type: JourneyType) -> &[CacheEntry] {
        match journey_type {
            JourneyType::Onward => &self.onward,
            JourneyType::Return => &self.returning,
        }
    }

    fn replace(&mut self, journey_type: JourneyType, entries: Vec<CacheEntry>) {
        match journey_type {
            JourneyType::Onward => self.onward = entries,
            JourneyType::Return => self.returning = entries,
        }
    }
}

/// Shapes accepted when reading a cache file.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDocument {
    Partitioned(CacheDocument),
    /// Older single-list layout; shared by both directions until the next save.
    Flat(Vec<CacheEntry>),
}

impl From<StoredDocument> for CacheDocument {
    fn from(stored: StoredDocument) -> Self {
        match stored {
            StoredDocument::Partitioned(document) => document,
            StoredDocument::Flat(entries) => CacheDocument {
                onward: entries.clone(),
                returning: entries,
            },
        }
    }
}

/// Cache backed by one JSON file per source inside a directory.
pub struct JsonFileCache {
    dir: PathBuf,
    locks: Mutex<HashMap<SourceId, Arc<AsyncMutex<()>>>>,
}

impl JsonFileCache {
    /// Create a cache storing its files under `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Location of the document backing `source`.
    #[must_use]
    pub fn path_for(&self, source: &SourceId) -> PathBuf {
        self.dir.join(format!("ticket_cache_{source}.json"))
    }

    async fn read_document(&self, source: &SourceId) -> Result<Option<CacheDocument>, CacheError> {
        let path = self.path_for(source);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(CacheError::Io(err)),
        };
        let stored: StoredDocument = serde_json::from_slice(&bytes)?;
        Ok(Some(stored.into()))
    }

    async fn write_document(&self, source: &SourceId, document: &CacheDocument) -> Result<(), CacheError> {
        let path = self.path_for(source);
        let bytes = serde_json::to_vec(document)?;
        write_atomically(&path, &bytes).await
    }
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = path.with_extension("json.tmp");
    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(bytes).await?;
    file.flush().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl CacheStore for JsonFileCache {
    async fn lock(&self, source: &SourceId) -> OwnedMutexGuard<()> {
        let partition_lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(source.clone()).or_default())
        };
        partition_lock.lock_owned().await
    }

    async fn load(&self, key: &PartitionKey) -> SeenSet {
        match self.read_document(&key.source).await {
            Ok(Some(document)) => document
                .entries(key.journey_type)
                .iter()
                .map(|entry| entry.coach_no.clone())
                .collect(),
            Ok(None) => {
                debug!(partition = %key, "no cache state yet");
                SeenSet::new()
            }
            Err(err) => {
                warn!(partition = %key, error = %err, "discarding unreadable cache state");
                SeenSet::new()
            }
        }
    }

    async fn save(&self, key: &PartitionKey, current: &[TicketRecord]) -> Result<(), CacheError> {
        let mut document = match self.read_document(&key.source).await {
            Ok(document) => document.unwrap_or_default(),
            Err(err) => {
                warn!(partition = %key, error = %err, "rewriting unreadable cache state");
                CacheDocument::default()
            }
        };

        let mut seen = HashSet::new();
        let entries = current
            .iter()
            .filter(|ticket| seen.insert(ticket.coach_id.as_str()))
            .map(|ticket| CacheEntry {
                coach_no: ticket.coach_id.clone(),
            })
            .collect();
        document.replace(key.journey_type, entries);

        self.write_document(&key.source, &document).await?;
        debug!(partition = %key, count = seen.len(), "cache state saved");
        Ok(())
    }
}
