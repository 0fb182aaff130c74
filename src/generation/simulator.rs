//! Background progression of tracks from `processing` to a terminal state.
//!
//! Each track gets its own worker thread. The worker advances progress in
//! fixed steps, writes the placeholder audio and marks the track completed.
//! Any error or panic on the way ends in the `failed` state instead.

use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
    time::Duration,
};

use log::{debug, error, info, warn};
use rand::Rng;
use thiserror::Error;

use crate::{
    config,
    domain::{
        id::TrackId,
        track::{TrackStatus, TransitionError},
    },
    storage::{
        artifacts::{self, ArtifactStore},
        error::StorageError,
        registry::TrackRegistry,
    },
};

/// Decides whether, and at which step, a simulation breaks down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaultPlan {
    Never,
    /// Fail right before the given step (1-based) would be applied.
    AtStep(u32),
    /// Fail with probability `rate`, at a random step.
    Random { rate: f64 },
}

impl FaultPlan {
    pub fn from_rate(rate: f64) -> Self {
        if rate > 0.0 {
            FaultPlan::Random { rate }
        } else {
            FaultPlan::Never
        }
    }

    fn pick(&self, steps: u32) -> Option<u32> {
        match *self {
            FaultPlan::Never => None,
            FaultPlan::AtStep(step) => Some(step),
            FaultPlan::Random { rate } => {
                let mut rng = rand::thread_rng();
                rng.gen_bool(rate.clamp(0.0, 1.0))
                    .then(|| rng.gen_range(1..=steps))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulatorSettings {
    pub steps: u32,
    pub time_scale: f64,
    pub faults: FaultPlan,
}

impl SimulatorSettings {
    /// Pause between two progress updates of a track estimated at `estimated_secs`.
    pub fn step_interval(&self, estimated_secs: u32) -> Duration {
        let secs = f64::from(estimated_secs) * self.time_scale / f64::from(self.steps.max(1));
        if secs > 0.0 {
            Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
        } else {
            Duration::ZERO
        }
    }
}

impl From<&config::Generation> for SimulatorSettings {
    fn from(config: &config::Generation) -> Self {
        Self {
            steps: config.steps,
            time_scale: config.time_scale,
            faults: match config.fail_at_step {
                Some(step) => FaultPlan::AtStep(step),
                None => FaultPlan::from_rate(config.failure_rate),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error("simulated fault at step {0}")]
    InjectedFault(u32),
}

/// Percentage reached after `step` of `steps`.
fn progress_at(step: u32, steps: u32) -> u8 {
    (u64::from(step.min(steps)) * 100 / u64::from(steps.max(1))) as u8
}

#[derive(Clone)]
pub struct Simulator {
    registry: Arc<TrackRegistry>,
    artifacts: Arc<dyn ArtifactStore>,
    settings: SimulatorSettings,
}

impl Simulator {
    pub fn new(
        registry: Arc<TrackRegistry>,
        artifacts: Arc<dyn ArtifactStore>,
        settings: SimulatorSettings,
    ) -> Self {
        Self {
            registry,
            artifacts,
            settings,
        }
    }

    /// Starts simulating `id` on a detached thread and returns immediately.
    pub fn spawn(&self, id: TrackId) -> std::io::Result<()> {
        let simulator = self.clone();
        thread::Builder::new()
            .name(format!("simulate-{id}"))
            .spawn(move || {
                simulator.drive(&id);
            })?;
        Ok(())
    }

    /// Runs the simulation of `id` to the end on the current thread.
    ///
    /// Never panics: failures are recorded on the track and reported as
    /// [`TrackStatus::Failed`].
    pub fn drive(&self, id: &TrackId) -> TrackStatus {
        let reason = match panic::catch_unwind(AssertUnwindSafe(|| self.run(id))) {
            Ok(Ok(())) => {
                info!("Track {id} completed");
                return TrackStatus::Completed;
            }
            Ok(Err(e)) => e.to_string(),
            Err(payload) => format!("worker panicked: {}", panic_message(payload.as_ref())),
        };

        error!("Generation of track {id} failed: {reason}");
        self.mark_failed(id);
        TrackStatus::Failed
    }

    pub fn mark_failed(&self, id: &TrackId) {
        match self.registry.update(id, |track| track.fail()) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Could not mark track {id} as failed: {e}"),
            Err(e) => warn!("Could not mark track {id} as failed: {e}"),
        }
    }

    fn run(&self, id: &TrackId) -> Result<(), SimulationError> {
        let track = self.registry.get(id)?;
        let steps = self.settings.steps.max(1);
        let interval = self.settings.step_interval(track.estimated_processing_secs);
        let fault_step = self.settings.faults.pick(steps);

        debug!(
            "Simulating track {id}: {steps} steps, {} ms apart",
            interval.as_millis()
        );

        for step in 1..=steps {
            thread::sleep(interval);

            if fault_step == Some(step) {
                return Err(SimulationError::InjectedFault(step));
            }

            // the last step is applied together with the completion
            if step < steps {
                let progress = progress_at(step, steps);
                self.registry.update(id, |t| t.advance(progress))??;
                debug!("Track {id} at {progress}%");
            }
        }

        let output = artifacts::materialize(self.artifacts.as_ref(), &track)?;
        self.registry.update(id, |t| t.complete(output))??;
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
