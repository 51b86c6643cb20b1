//! Setup errors.
//!
//! Nothing in the per-frame path is fatal. A component whose setup check
//! fails reports once and stays inert until the setup is fixed.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    /// The wrist-height gate needs a head position to compare against.
    #[error("wrist-height gate is enabled but no head pose source is attached")]
    MissingHeadPose,
}
