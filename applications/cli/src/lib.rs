//! Vireo CLI
//!
//! Command-line front end for the playback engine: inspect which stream a
//! quality profile selects for a video, and replay whole sessions against
//! the simulated backends.

pub mod config;
pub mod session;

pub use config::AppConfig;
pub use session::{
    load_video, select, simulate, SelectionReport, SimulationOptions, SimulationSummary,
};
