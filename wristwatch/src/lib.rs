//! Hand-tracked XR wristwatch.
//!
//! Follows the tracked wrist with a smoothed pose, gates visibility on a
//! palm-up gesture, cross-fades between the watch and a "tracking lost"
//! panel, and renders the time and date text.

pub mod error;
pub mod ipc;
pub mod sim;
pub mod vr;
pub mod watch;

pub use error::SetupError;
pub use watch::{WatchConfig, WatchEvent, WristWatch};
