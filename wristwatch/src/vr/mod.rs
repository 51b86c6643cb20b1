//! XR input side: joint poses from the host's hand tracker and the math
//! needed to work with them.
//!
//! Provides:
//! - `spatial`: `Vec3`, `Quat`, `Pose`
//! - `hand_tracking`: `Hand`, `HandJoint`, `HandSnapshot`
//! - `HeadPoseSource`: optional head pose collaborator

pub mod hand_tracking;
pub mod spatial;

pub use hand_tracking::{Hand, HandJoint, HandSnapshot, JointPose, JOINT_COUNT};
pub use spatial::{Pose, Quat, Vec3};

/// Supplies the current head (HMD) position.
///
/// Returns `None` when the head pose is not available this frame.
pub trait HeadPoseSource {
    fn head_position(&self) -> Option<Vec3>;
}

/// Head pose fixed at one point, for hosts without HMD tracking and for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedHeadPose(pub Vec3);

impl HeadPoseSource for FixedHeadPose {
    fn head_position(&self) -> Option<Vec3> {
        Some(self.0)
    }
}
