pub mod settings;
pub mod tracker;

pub use settings::{Config, TrackerSettings, MOUNT_POINT};
pub use tracker::{Cycle, Rig, Tracker};
