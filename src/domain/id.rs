use std::fmt::Display;

/// Prefix shared by every generated track id.
pub const TRACK_ID_PREFIX: &str = "track_";

/// Number of hex characters following the prefix.
const TRACK_ID_HEX_LEN: usize = 16;

/// Represents the track ID.
///
/// Ids handed out by the registry look like `track_0123456789abcdef`.
/// Ids coming from clients are not validated: an id that was never issued
/// is simply unknown to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(String);

impl TrackId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// derives an id from the registry seed and a sequence number
    pub fn derive(seed: &[u8], sequence: u64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(seed);
        hasher.update(&sequence.to_le_bytes());
        let hex = hasher.finalize().to_hex();
        Self(format!("{TRACK_ID_PREFIX}{}", &hex.as_str()[..TRACK_ID_HEX_LEN]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// name of the file the track's audio is stored under
    pub fn artifact_filename(&self) -> String {
        format!("{}.mp3", self.0)
    }
}

impl Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_format() {
        let id = TrackId::derive(b"seed", 1);

        assert!(id.as_str().starts_with(TRACK_ID_PREFIX));
        assert_eq!(id.as_str().len(), TRACK_ID_PREFIX.len() + TRACK_ID_HEX_LEN);
        assert!(
            id.as_str()[TRACK_ID_PREFIX.len()..]
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_derive_is_deterministic_per_seed_and_sequence() {
        assert_eq!(TrackId::derive(b"seed", 7), TrackId::derive(b"seed", 7));
        assert_ne!(TrackId::derive(b"seed", 7), TrackId::derive(b"seed", 8));
        assert_ne!(TrackId::derive(b"seed", 7), TrackId::derive(b"other", 7));
    }

    #[test]
    fn test_artifact_filename() {
        let id = TrackId::new("track_abc");
        assert_eq!(id.artifact_filename(), "track_abc.mp3");
        assert_eq!(id.to_string(), "track_abc");
    }
}
