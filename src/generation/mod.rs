//! Simulated music generation.

pub mod simulator;

pub use simulator::{FaultPlan, SimulationError, Simulator, SimulatorSettings};
