//! Storage of generated audio files.
//!
//! The simulator only needs to hand over bytes and get back an
//! [`ArtifactRef`]; where the bytes end up is decided by the store
//! configured at startup.

use std::{
    collections::HashMap,
    fs::File,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use anyhow::anyhow;

use crate::{
    config::Downloads,
    domain::track::{ArtifactRef, Track},
    storage::{error::StorageError, mp3},
};

/// Contents of a stored artifact, ready to be sent to a client.
pub enum ArtifactBody {
    File(File),
    Bytes(Vec<u8>),
}

pub trait ArtifactStore: Send + Sync {
    fn put(&self, filename: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    fn open(&self, filename: &str) -> Result<ArtifactBody, StorageError>;

    /// Removing a file that does not exist is not an error.
    fn remove(&self, filename: &str) -> Result<(), StorageError>;
}

/// builds a store according to the `[downloads]` config section
pub fn open_store(config: &Downloads) -> Arc<dyn ArtifactStore> {
    if config.in_memory {
        log::info!("Keeping generated audio in memory");
        Arc::new(MemoryArtifactStore::default())
    } else {
        let store = FsArtifactStore::new(config.dir.clone());
        log::info!("Writing generated audio to {}", store.dir().display());
        Arc::new(store)
    }
}

/// Writes the placeholder audio of a finished track into `store`.
pub fn materialize(store: &dyn ArtifactStore, track: &Track) -> Result<ArtifactRef, StorageError> {
    let filename = track.id.artifact_filename();
    let bytes = mp3::silent_track(&track.prompt, track.requested_duration);
    log::debug!("Writing {} bytes of audio to {filename}", bytes.len());
    store.put(&filename, bytes)?;
    Ok(ArtifactRef { filename })
}

/// Only plain file names are served, nothing that could leave the store.
fn check_filename(filename: &str) -> Result<(), StorageError> {
    let invalid = filename.is_empty()
        || filename.contains(['/', '\\', '\0'])
        || filename.contains("..");
    if invalid {
        return Err(StorageError::InvalidArtifactName(filename.to_string()));
    }
    Ok(())
}

/// Keeps artifacts as files in a directory, created on first write.
pub struct FsArtifactStore {
    dir: PathBuf,
}

impl FsArtifactStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, filename: &str) -> Result<PathBuf, StorageError> {
        check_filename(filename)?;
        Ok(self.dir.join(filename))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn put(&self, filename: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_of(filename)?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn open(&self, filename: &str) -> Result<ArtifactBody, StorageError> {
        let path = self.path_of(filename)?;
        match File::open(&path) {
            Ok(file) if path.is_file() => Ok(ArtifactBody::File(file)),
            Ok(_) => Err(StorageError::ArtifactNotFound(filename.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::ArtifactNotFound(filename.to_string()))
            }
            Err(e) => Err(StorageError::Fs(e)),
        }
    }

    fn remove(&self, filename: &str) -> Result<(), StorageError> {
        let path = self.path_of(filename)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Fs(e)),
        }
    }
}

/// Keeps artifacts in process memory; they are gone when the process exits.
#[derive(Default)]
pub struct MemoryArtifactStore {
    files: RwLock<HashMap<String, Vec<u8>>>,
}

impl ArtifactStore for MemoryArtifactStore {
    fn put(&self, filename: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        check_filename(filename)?;
        self.files
            .write()
            .map_err(|e| StorageError::Internal(anyhow!("Could not write artifact store: {e}")))?
            .insert(filename.to_string(), bytes);
        Ok(())
    }

    fn open(&self, filename: &str) -> Result<ArtifactBody, StorageError> {
        check_filename(filename)?;
        self.files
            .read()
            .map_err(|e| StorageError::Internal(anyhow!("Could not read artifact store: {e}")))?
            .get(filename)
            .cloned()
            .map(ArtifactBody::Bytes)
            .ok_or_else(|| StorageError::ArtifactNotFound(filename.to_string()))
    }

    fn remove(&self, filename: &str) -> Result<(), StorageError> {
        check_filename(filename)?;
        self.files
            .write()
            .map_err(|e| StorageError::Internal(anyhow!("Could not write artifact store: {e}")))?
            .remove(filename);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn read_body(body: ArtifactBody) -> anyhow::Result<Vec<u8>> {
    use std::io::Read;

    match body {
        ArtifactBody::Bytes(bytes) => Ok(bytes),
        ArtifactBody::File(mut file) => {
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::id::TrackId;
    use chrono::Utc;
    use tempfile::tempdir;

    fn mock_track() -> Track {
        Track::new(
            TrackId::new("track_0011223344556677"),
            "relaxing piano".to_string(),
            5,
            10,
            Utc::now(),
        )
    }

    fn roundtrip(store: &dyn ArtifactStore) -> anyhow::Result<()> {
        store.put("song.mp3", b"x".to_vec())?;
        assert_eq!(read_body(store.open("song.mp3")?)?, b"x");

        store.remove("song.mp3")?;
        assert!(matches!(
            store.open("song.mp3"),
            Err(StorageError::ArtifactNotFound(name)) if name == "song.mp3"
        ));

        // second removal is a no-op
        store.remove("song.mp3")?;
        Ok(())
    }

    #[test]
    fn test_memory_store_put_open_remove() -> anyhow::Result<()> {
        roundtrip(&MemoryArtifactStore::default())
    }

    #[test]
    fn test_fs_store_put_open_remove() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = FsArtifactStore::new(dir.path().join("downloads"));

        roundtrip(&store)?;
        assert!(store.dir().is_dir());

        Ok(())
    }

    #[test]
    fn test_fs_store_unknown_file() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let store = FsArtifactStore::new(dir.path().to_path_buf());

        assert!(matches!(
            store.open("missing.mp3"),
            Err(StorageError::ArtifactNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn test_rejects_path_traversal() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let fs_store = FsArtifactStore::new(dir.path().join("downloads"));
        let memory_store = MemoryArtifactStore::default();

        for name in ["", "..", "../secret", "a/b.mp3", "a\\b.mp3"] {
            assert!(matches!(
                fs_store.open(name),
                Err(StorageError::InvalidArtifactName(_))
            ));
            assert!(matches!(
                memory_store.put(name, vec![1]),
                Err(StorageError::InvalidArtifactName(_))
            ));
        }

        Ok(())
    }

    #[test]
    fn test_materialize_writes_mp3() -> anyhow::Result<()> {
        let store = MemoryArtifactStore::default();
        let track = mock_track();

        let reference = materialize(&store, &track)?;

        assert_eq!(reference.filename, "track_0011223344556677.mp3");
        let bytes = read_body(store.open(&reference.filename)?)?;
        assert!(bytes.starts_with(b"ID3"));
        assert!(bytes.len() > mp3::frame_count(5) * mp3::FRAME_LEN);

        Ok(())
    }

    #[test]
    fn test_open_store_honors_in_memory_flag() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let config = Downloads {
            in_memory: true,
            dir: dir.path().join("unused"),
        };

        let store = open_store(&config);
        store.put("a.mp3", vec![1, 2, 3])?;

        assert!(!dir.path().join("unused").exists());
        assert_eq!(read_body(store.open("a.mp3")?)?, vec![1, 2, 3]);

        Ok(())
    }
}
