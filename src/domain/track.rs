use chrono::{DateTime, Utc};
use thiserror::Error;

use super::id::TrackId;

/// Lifecycle state of a generated track.
///
/// `Processing` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Processing,
    Completed,
    Failed,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Processing => "processing",
            TrackStatus::Completed => "completed",
            TrackStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TrackStatus::Processing)
    }
}

/// Locates the generated audio of a completed track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub filename: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("track {0} is already {1}")]
    AlreadyTerminal(TrackId, &'static str),

    #[error("progress of track {id} cannot go from {from}% back to {to}%")]
    ProgressRegression { id: TrackId, from: u8, to: u8 },

    #[error("progress {0}% is out of range")]
    ProgressOutOfRange(u8),
}

/// Represent a single generation request and its lifecycle
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub prompt: String,
    pub requested_duration: u32,
    pub status: TrackStatus,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub estimated_processing_secs: u32,
    pub estimated_completion: DateTime<Utc>,
    pub output: Option<ArtifactRef>,
    /// When the track entered a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
}

impl Track {
    pub fn new(
        id: TrackId,
        prompt: String,
        requested_duration: u32,
        estimated_processing_secs: u32,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            prompt,
            requested_duration,
            status: TrackStatus::Processing,
            progress: 0,
            created_at,
            estimated_processing_secs,
            estimated_completion: created_at
                + chrono::Duration::seconds(i64::from(estimated_processing_secs)),
            output: None,
            finished_at: None,
        }
    }

    fn ensure_processing(&self) -> Result<(), TransitionError> {
        if self.status.is_terminal() {
            return Err(TransitionError::AlreadyTerminal(
                self.id.clone(),
                self.status.as_str(),
            ));
        }
        Ok(())
    }

    pub fn advance(&mut self, progress: u8) -> Result<(), TransitionError> {
        self.ensure_processing()?;
        if progress > 100 {
            return Err(TransitionError::ProgressOutOfRange(progress));
        }
        if progress < self.progress {
            return Err(TransitionError::ProgressRegression {
                id: self.id.clone(),
                from: self.progress,
                to: progress,
            });
        }
        self.progress = progress;
        Ok(())
    }

    pub fn complete(&mut self, output: ArtifactRef) -> Result<(), TransitionError> {
        self.ensure_processing()?;
        self.progress = 100;
        self.output = Some(output);
        self.status = TrackStatus::Completed;
        self.finished_at = Some(Utc::now());
        Ok(())
    }

    /// progress stays where it was, output stays empty
    pub fn fail(&mut self) -> Result<(), TransitionError> {
        self.ensure_processing()?;
        self.status = TrackStatus::Failed;
        self.finished_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_track() -> Track {
        Track::new(
            TrackId::new("track_test"),
            "relaxing piano".to_string(),
            60,
            30,
            Utc::now(),
        )
    }

    fn artifact() -> ArtifactRef {
        ArtifactRef {
            filename: "track_test.mp3".to_string(),
        }
    }

    #[test]
    fn test_new_track_is_processing() {
        let track = mock_track();

        assert_eq!(track.status, TrackStatus::Processing);
        assert_eq!(track.progress, 0);
        assert!(track.output.is_none());
        assert!(track.finished_at.is_none());
        assert_eq!(
            track.estimated_completion - track.created_at,
            chrono::Duration::seconds(30)
        );
    }

    #[test]
    fn test_advance_is_monotonic() -> anyhow::Result<()> {
        let mut track = mock_track();
        track.advance(10)?;
        track.advance(10)?;
        track.advance(40)?;

        assert_eq!(
            track.advance(30),
            Err(TransitionError::ProgressRegression {
                id: track.id.clone(),
                from: 40,
                to: 30,
            })
        );
        assert_eq!(track.progress, 40);
        assert_eq!(
            track.advance(101),
            Err(TransitionError::ProgressOutOfRange(101))
        );

        Ok(())
    }

    #[test]
    fn test_complete_pins_progress_and_sets_output() -> anyhow::Result<()> {
        let mut track = mock_track();
        track.advance(90)?;
        track.complete(artifact())?;

        assert_eq!(track.status, TrackStatus::Completed);
        assert_eq!(track.progress, 100);
        assert_eq!(track.output, Some(artifact()));
        assert!(track.finished_at.is_some());

        Ok(())
    }

    #[test]
    fn test_fail_freezes_progress() -> anyhow::Result<()> {
        let mut track = mock_track();
        track.advance(50)?;
        track.fail()?;

        assert_eq!(track.status, TrackStatus::Failed);
        assert_eq!(track.progress, 50);
        assert!(track.output.is_none());

        Ok(())
    }

    #[test]
    fn test_terminal_states_reject_transitions() -> anyhow::Result<()> {
        let mut failed = mock_track();
        failed.fail()?;
        assert!(matches!(
            failed.complete(artifact()),
            Err(TransitionError::AlreadyTerminal(_, "failed"))
        ));
        assert!(failed.advance(60).is_err());
        assert!(failed.output.is_none());

        let mut completed = mock_track();
        completed.complete(artifact())?;
        assert!(matches!(
            completed.fail(),
            Err(TransitionError::AlreadyTerminal(_, "completed"))
        ));
        assert_eq!(completed.status, TrackStatus::Completed);
        assert_eq!(completed.progress, 100);

        Ok(())
    }
}
