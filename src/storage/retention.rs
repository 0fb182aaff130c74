//! Optional eviction of finished tracks.
//!
//! Without a configured retention the registry keeps every track for the
//! lifetime of the process.

use std::{sync::Arc, thread, time::Duration};

use chrono::Utc;

use crate::storage::{artifacts::ArtifactStore, error::StorageError, registry::TrackRegistry};

/// Removes tracks that finished more than `retention` ago, along with their audio.
///
/// Returns the number of evicted tracks.
pub fn sweep(
    registry: &TrackRegistry,
    artifacts: &dyn ArtifactStore,
    retention: Duration,
) -> Result<usize, StorageError> {
    let cutoff = chrono::Duration::from_std(retention)
        .ok()
        .and_then(|retention| Utc::now().checked_sub_signed(retention))
        .ok_or_else(|| {
            StorageError::Internal(anyhow::anyhow!("retention of {retention:?} is out of range"))
        })?;
    let evicted = registry.evict_finished_by(cutoff)?;

    for track in &evicted {
        if let Some(output) = &track.output {
            if let Err(e) = artifacts.remove(&output.filename) {
                log::warn!("Could not remove {} of evicted track {}: {e}", output.filename, track.id);
            }
        }
    }

    Ok(evicted.len())
}

/// Runs [`sweep`] every `interval` on a background thread.
pub fn spawn_sweeper(
    registry: Arc<TrackRegistry>,
    artifacts: Arc<dyn ArtifactStore>,
    retention: Duration,
    interval: Duration,
) -> std::io::Result<()> {
    thread::Builder::new()
        .name("retention-sweeper".to_string())
        .spawn(move || {
            loop {
                thread::sleep(interval);
                match sweep(&registry, artifacts.as_ref(), retention) {
                    Ok(0) => {}
                    Ok(n) => match registry.len() {
                        Ok(left) => log::info!("Evicted {n} finished tracks, {left} remain"),
                        Err(_) => log::info!("Evicted {n} finished tracks"),
                    },
                    Err(e) => log::error!("Retention sweep failed: {e}"),
                }
            }
        })?;
    Ok(())
}
