//! The staged reconstruction pipeline.
//!
//! A [`ReconstructionSession`] owns the rig configuration, the loaded input
//! data, and everything computed so far. Step functions
//! ([`step_calibrate`], [`step_background`], [`step_silhouettes`],
//! [`step_reconstruct`]) validate their preconditions, fill in session
//! state, and append to the run log; [`run_full`] chains them.

pub mod config;
pub mod frames;
pub mod input;
pub mod loader;
pub mod params_io;
pub mod report;
pub mod session;

pub use config::{CalibrationSettings, DataLayout, RigConfig};
pub use input::{CameraInput, RigInput};
pub use loader::load_rig_input;
pub use report::{CameraReport, ReconstructionReport};
pub use session::{
    run_full, step_background, step_calibrate, step_reconstruct, step_silhouettes, LogEntry,
    ReconstructionSession, SessionState,
};
