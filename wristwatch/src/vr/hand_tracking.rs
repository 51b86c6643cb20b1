//! Hand tracking input types.
//!
//! Models the 26 joints per hand of XR_EXT_hand_tracking as delivered by the
//! host's tracking subsystem once per frame. A joint that was not resolved
//! this frame carries `valid: false` and queries for it return `None`.

use tracing::debug;

use super::spatial::{Pose, Quat, Vec3};

// ── Joint definitions ──────────────────────────────────────

/// The 26 hand joints in XR_EXT_hand_tracking order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandJoint {
    Palm,
    Wrist,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    ThumbTip,
    IndexMetacarpal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    IndexTip,
    MiddleMetacarpal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    MiddleTip,
    RingMetacarpal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    RingTip,
    LittleMetacarpal,
    LittleProximal,
    LittleIntermediate,
    LittleDistal,
    LittleTip,
}

/// Total number of joints per hand.
pub const JOINT_COUNT: usize = 26;

impl HandJoint {
    /// Position of this joint in a snapshot's joint array.
    pub fn index(&self) -> usize {
        *self as usize
    }
}

// ── Hand enum ──────────────────────────────────────────────

/// Which hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parse "left" / "right".
    pub fn parse(s: &str) -> Option<Hand> {
        match s {
            "left" => Some(Hand::Left),
            "right" => Some(Hand::Right),
            _ => None,
        }
    }
}

// ── Joint pose ─────────────────────────────────────────────

/// Pose data for a single joint.
#[derive(Debug, Clone, Copy)]
pub struct JointPose {
    pub pose: Pose,
    /// Joint radius in meters.
    pub radius: f32,
    /// Whether the tracker resolved this joint this frame.
    pub valid: bool,
}

impl Default for JointPose {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            radius: 0.01,
            valid: false,
        }
    }
}

impl JointPose {
    /// A resolved joint at the given pose.
    pub fn tracked(position: Vec3, rotation: Quat) -> Self {
        Self {
            pose: Pose::new(position, rotation),
            radius: 0.01,
            valid: true,
        }
    }
}

// ── Snapshot ───────────────────────────────────────────────

/// One frame of joint data for a single hand.
#[derive(Debug, Clone)]
pub struct HandSnapshot {
    pub hand: Hand,
    /// 26 joint poses indexed by `HandJoint`.
    joints: Vec<JointPose>,
    /// Host timestamp of the sample in nanoseconds.
    pub timestamp_ns: u64,
}

impl HandSnapshot {
    /// Snapshot with every joint unresolved.
    pub fn new(hand: Hand) -> Self {
        Self {
            hand,
            joints: vec![JointPose::default(); JOINT_COUNT],
            timestamp_ns: 0,
        }
    }

    /// Build from a full joint array. Returns `None` unless exactly
    /// `JOINT_COUNT` joints are supplied.
    pub fn from_joints(hand: Hand, joints: Vec<JointPose>, timestamp_ns: u64) -> Option<Self> {
        if joints.len() != JOINT_COUNT {
            debug!(
                "hand snapshot: expected {} joints, got {} for {:?}",
                JOINT_COUNT,
                joints.len(),
                hand,
            );
            return None;
        }
        Some(Self {
            hand,
            joints,
            timestamp_ns,
        })
    }

    /// Replace one joint.
    pub fn set_joint(&mut self, joint: HandJoint, pose: JointPose) {
        self.joints[joint.index()] = pose;
    }

    /// Builder form of `set_joint` for a resolved joint.
    pub fn with_joint(mut self, joint: HandJoint, position: Vec3, rotation: Quat) -> Self {
        self.set_joint(joint, JointPose::tracked(position, rotation));
        self
    }

    /// Pose of a joint, or `None` if it was not resolved this frame.
    pub fn joint_pose(&self, joint: HandJoint) -> Option<Pose> {
        let j = &self.joints[joint.index()];
        j.valid.then_some(j.pose)
    }

    /// Number of joints resolved this frame.
    pub fn valid_count(&self) -> usize {
        self.joints.iter().filter(|j| j.valid).count()
    }
}
