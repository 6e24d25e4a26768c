// src/dedup.rs
//! Item identity and the persisted set of already-published fingerprints.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, warn};

use crate::ingest::truncate_chars;
use crate::ingest::types::RawItem;

const SERIALIZED_IDENTITY_MAX: usize = 512;

/// Where an item's identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentitySource {
    Id,
    Link,
    Title,
    Serialized,
}

/// Tried in order; the first strategy yielding a non-blank value wins.
pub const IDENTITY_STRATEGIES: [IdentitySource; 4] = [
    IdentitySource::Id,
    IdentitySource::Link,
    IdentitySource::Title,
    IdentitySource::Serialized,
];

impl IdentitySource {
    fn extract(&self, item: &RawItem) -> Option<String> {
        let non_blank = |s: &str| {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        };
        match self {
            IdentitySource::Id => item.id.as_deref().and_then(non_blank),
            IdentitySource::Link => item.link.as_deref().and_then(non_blank),
            IdentitySource::Title => non_blank(&item.title),
            IdentitySource::Serialized => serde_json::to_string(item)
                .ok()
                .map(|s| truncate_chars(&s, SERIALIZED_IDENTITY_MAX)),
        }
    }
}

pub fn identity(item: &RawItem) -> (IdentitySource, String) {
    IDENTITY_STRATEGIES
        .iter()
        .find_map(|s| s.extract(item).map(|v| (*s, v)))
        // Serialization of a plain struct does not fail.
        .unwrap_or((IdentitySource::Serialized, String::new()))
}

/// Lowercase hex SHA-256 of an item's identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(item: &RawItem) -> Self {
        let (_, key) = identity(item);
        let digest = Sha256::digest(key.as_bytes());
        let mut out = String::with_capacity(64);
        for b in digest.iter() {
            use std::fmt::Write as _;
            let _ = write!(&mut out, "{:02x}", b);
        }
        Self(out)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn fingerprint(item: &RawItem) -> Fingerprint {
    Fingerprint::of(item)
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    ids: BTreeSet<Fingerprint>,
}

/// Seen-set backed by a JSON file `{"ids": [...]}`, rewritten in full on every `mark`.
pub struct FingerprintStore {
    path: PathBuf,
    ids: BTreeSet<Fingerprint>,
}

impl FingerprintStore {
    /// Missing or corrupt file gives an empty store; never fails.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let ids = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<StoreFile>(&raw) {
                Ok(file) => file.ids,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "fingerprint store unreadable, starting empty");
                    BTreeSet::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no fingerprint store yet");
                BTreeSet::new()
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "fingerprint store unreadable, starting empty");
                BTreeSet::new()
            }
        };
        debug!(path = %path.display(), count = ids.len(), "fingerprint store loaded");
        Self { path, ids }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.ids.contains(fp)
    }

    pub fn is_new(&self, item: &RawItem) -> bool {
        !self.contains(&Fingerprint::of(item))
    }

    /// Record `item` as published and persist. A write failure is logged; the
    /// in-memory set still holds the fingerprint for the rest of the run.
    pub fn mark(&mut self, item: &RawItem) {
        self.mark_fingerprint(Fingerprint::of(item));
    }

    pub fn mark_fingerprint(&mut self, fp: Fingerprint) {
        if !self.ids.insert(fp) {
            return;
        }
        if let Err(e) = self.persist() {
            error!(error = ?e, path = %self.path.display(), "failed to persist fingerprint store");
        }
    }

    fn persist(&self) -> Result<()> {
        let body = serde_json::to_string(&StoreFile {
            ids: self.ids.clone(),
        })
        .context("serializing fingerprints")?;
        write_atomic(&self.path, body.as_bytes())
            .with_context(|| format!("writing {}", self.path.display()))
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(tmp, path)?;
    Ok(())
}
