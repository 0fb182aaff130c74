use std::{
    collections::HashMap,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{SystemTime, UNIX_EPOCH},
};

use anyhow::anyhow;
use chrono::{DateTime, Utc};

use crate::{
    domain::{
        estimate::estimate,
        id::TrackId,
        track::Track,
        validate::GenerationRequest,
    },
    storage::error::StorageError,
};

struct Inner {
    tracks: HashMap<TrackId, Track>,
    next_sequence: u64,
}

/// In-memory store of every track known to the process.
///
/// The registry is the only owner of track records: callers get clones,
/// and changes go through [`TrackRegistry::update`]. It is also the only
/// place ids are issued, so ids never collide for the registry's lifetime.
pub struct TrackRegistry {
    seed: [u8; 32],
    inner: RwLock<Inner>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::with_seed(random_seed())
    }

    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            seed,
            inner: RwLock::new(Inner {
                tracks: HashMap::new(),
                next_sequence: 0,
            }),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StorageError> {
        self.inner
            .read()
            .map_err(|e| StorageError::Internal(anyhow!("Could not read track registry: {e}")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StorageError> {
        self.inner
            .write()
            .map_err(|e| StorageError::Internal(anyhow!("Could not write track registry: {e}")))
    }

    /// registers a new track in `processing` state and returns a copy of it
    pub fn create(&self, request: &GenerationRequest) -> Result<Track, StorageError> {
        let estimated_secs = estimate(request.duration(), request.prompt());
        let mut inner = self.write()?;

        let id = loop {
            let candidate = TrackId::derive(&self.seed, inner.next_sequence);
            inner.next_sequence += 1;
            if !inner.tracks.contains_key(&candidate) {
                break candidate;
            }
            log::warn!("Track id {candidate} already issued, deriving another one");
        };

        let track = Track::new(
            id.clone(),
            request.prompt().to_string(),
            request.duration(),
            estimated_secs,
            Utc::now(),
        );
        inner.tracks.insert(id, track.clone());
        Ok(track)
    }

    pub fn get(&self, id: &TrackId) -> Result<Track, StorageError> {
        self.read()?
            .tracks
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::TrackNotFound(id.clone()))
    }

    /// Applies `mutator` to the stored track while holding the write lock.
    ///
    /// Readers see the record either before or after the whole mutation.
    pub fn update<F, R>(&self, id: &TrackId, mutator: F) -> Result<R, StorageError>
    where
        F: FnOnce(&mut Track) -> R,
    {
        let mut inner = self.write()?;
        let track = inner
            .tracks
            .get_mut(id)
            .ok_or_else(|| StorageError::TrackNotFound(id.clone()))?;
        Ok(mutator(track))
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        Ok(self.read()?.tracks.len())
    }

    /// Removes terminal tracks that finished at or before `cutoff`.
    ///
    /// Tracks still processing are never evicted. Returns the removed tracks.
    pub fn evict_finished_by(&self, cutoff: DateTime<Utc>) -> Result<Vec<Track>, StorageError> {
        let mut inner = self.write()?;

        let expired = inner
            .tracks
            .values()
            .filter(|track| track.finished_at.is_some_and(|at| at <= cutoff))
            .map(|track| track.id.clone())
            .collect::<Vec<_>>();

        Ok(expired
            .iter()
            .filter_map(|id| inner.tracks.remove(id))
            .collect())
    }
}

impl Default for TrackRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn random_seed() -> [u8; 32] {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();

    let mut hasher = blake3::Hasher::new();
    hasher.update(&nanos.to_le_bytes());
    hasher.update(&std::process::id().to_le_bytes());
    hasher.update(&rand::random::<[u8; 32]>());
    *hasher.finalize().as_bytes()
}
