//! Wrist pose tracking and palm-up visibility gate.
//!
//! Turns per-frame wrist/palm joint poses into the watch transform. The
//! offset is defined in wrist-local space so it rotates with the hand.
//! Smoothing is an exponential approach driven by elapsed time, so it
//! behaves the same at 72 Hz and 120 Hz.

use tracing::{debug, info, warn};

use crate::error::SetupError;
use crate::vr::{Hand, HandJoint, HandSnapshot, HeadPoseSource, Pose, Quat, Vec3};

/// Allowed range for the palm-up threshold (degrees).
pub const PALM_THRESHOLD_MIN_DEG: f32 = 15.0;
pub const PALM_THRESHOLD_MAX_DEG: f32 = 90.0;
pub const DEFAULT_PALM_THRESHOLD_DEG: f32 = 45.0;

/// Tolerance on the inclusive palm-up boundary, absorbing f32 round-off.
const ANGLE_EPSILON_DEG: f32 = 1e-3;

// ── Visibility ─────────────────────────────────────────────

/// Output of the visibility gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityState {
    Hidden,
    Visible,
}

impl VisibilityState {
    pub fn from_visible(visible: bool) -> Self {
        if visible {
            Self::Visible
        } else {
            Self::Hidden
        }
    }

    pub fn is_visible(&self) -> bool {
        matches!(self, Self::Visible)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hidden => "hidden",
            Self::Visible => "visible",
        }
    }
}

// ── Config ─────────────────────────────────────────────────

/// Configuration for wrist tracking and the visibility gate.
#[derive(Debug, Clone)]
pub struct PoseTrackerConfig {
    /// Hand the watch is worn on.
    pub hand: Hand,
    /// Watch position relative to the wrist joint, in wrist-local meters.
    pub position_offset: Vec3,
    /// Watch rotation relative to the wrist joint, Euler degrees.
    pub rotation_offset_deg: Vec3,
    /// Interpolate toward the target each frame instead of snapping.
    pub smoothing: bool,
    /// Exponential approach rate (1/s).
    pub smoothing_speed: f32,
    /// Only show the watch when the palm faces up.
    pub palm_gating: bool,
    /// Maximum angle (degrees) between palm up-axis and world up.
    pub palm_up_threshold_deg: f32,
    /// Additionally require the wrist to be raised relative to the head.
    pub wrist_height_gate: bool,
    /// Minimum `wrist_y - head_y` (meters) for the height gate.
    pub min_wrist_height_m: f32,
}

impl Default for PoseTrackerConfig {
    fn default() -> Self {
        Self {
            hand: Hand::Left,
            position_offset: Vec3::new(0.0, 0.02, 0.0),
            rotation_offset_deg: Vec3::ZERO,
            smoothing: true,
            smoothing_speed: 15.0,
            palm_gating: false,
            palm_up_threshold_deg: DEFAULT_PALM_THRESHOLD_DEG,
            wrist_height_gate: false,
            min_wrist_height_m: -0.45,
        }
    }
}

impl PoseTrackerConfig {
    pub fn rotation_offset(&self) -> Quat {
        Quat::from_euler_deg(self.rotation_offset_deg)
    }

    /// Set the palm-up threshold, clamped to the supported range.
    /// Non-finite values are rejected and the current threshold kept.
    pub fn set_palm_up_threshold(&mut self, degrees: f32) {
        if !degrees.is_finite() {
            warn!("palm-up threshold {} rejected", degrees);
            return;
        }
        self.palm_up_threshold_deg = degrees.clamp(PALM_THRESHOLD_MIN_DEG, PALM_THRESHOLD_MAX_DEG);
    }

    /// Threshold the gate actually uses: the field clamped to range, or the
    /// default when it was assigned a non-finite value directly.
    pub fn effective_palm_up_threshold(&self) -> f32 {
        if self.palm_up_threshold_deg.is_finite() {
            self.palm_up_threshold_deg
                .clamp(PALM_THRESHOLD_MIN_DEG, PALM_THRESHOLD_MAX_DEG)
        } else {
            DEFAULT_PALM_THRESHOLD_DEG
        }
    }
}

/// Angle in degrees between a rotation's local up axis and world up.
pub fn palm_up_angle_deg(palm_rotation: Quat) -> f32 {
    (palm_rotation * Vec3::UP).angle_deg(Vec3::UP)
}

/// Whether the palm-up angle passes the threshold (inclusive).
pub fn palm_is_up(palm_rotation: Quat, threshold_deg: f32) -> bool {
    palm_up_angle_deg(palm_rotation) <= threshold_deg + ANGLE_EPSILON_DEG
}

// ── State ──────────────────────────────────────────────────

/// Wrist tracker state.
pub struct PoseTracker {
    pub config: PoseTrackerConfig,
    head: Option<Box<dyn HeadPoseSource>>,
    /// Pose currently applied to the watch.
    transform: Pose,
    /// Pose computed from the latest wrist sample.
    target: Pose,
    /// False until the first wrist sample after (re)acquisition.
    has_valid_pose: bool,
    tracking_active: bool,
    /// Last emitted visibility; `None` until the first evaluation.
    visibility: Option<VisibilityState>,
    /// Setup error already reported; cleared once setup is valid again.
    setup_reported: bool,
}

impl Default for PoseTracker {
    fn default() -> Self {
        Self::new(PoseTrackerConfig::default())
    }
}

impl PoseTracker {
    pub fn new(config: PoseTrackerConfig) -> Self {
        Self {
            config,
            head: None,
            transform: Pose::IDENTITY,
            target: Pose::IDENTITY,
            has_valid_pose: false,
            tracking_active: false,
            visibility: None,
            setup_reported: false,
        }
    }

    /// Attach the head pose collaborator used by the wrist-height gate.
    pub fn set_head_source(&mut self, head: Box<dyn HeadPoseSource>) {
        self.head = Some(head);
    }

    /// Check that every collaborator the current config needs is attached.
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.config.palm_gating && self.config.wrist_height_gate && self.head.is_none() {
            return Err(SetupError::MissingHeadPose);
        }
        Ok(())
    }

    /// Returns true when the tracker may run; reports a setup error once.
    fn setup_ok(&mut self) -> bool {
        match self.validate() {
            Ok(()) => {
                if self.setup_reported {
                    info!("pose tracker: setup resolved, resuming");
                    self.setup_reported = false;
                }
                true
            }
            Err(e) => {
                if !self.setup_reported {
                    warn!("pose tracker inert: {}", e);
                    self.setup_reported = true;
                }
                false
            }
        }
    }

    pub fn on_tracking_acquired(&mut self) {
        debug!("pose tracker: tracking acquired");
        self.tracking_active = true;
        self.has_valid_pose = false;
        self.visibility = None;
    }

    pub fn on_tracking_lost(&mut self) {
        debug!("pose tracker: tracking lost");
        self.tracking_active = false;
        self.visibility = None;
    }

    /// Consume one frame of joint data.
    ///
    /// Returns the new visibility when it changed this frame. Frames without
    /// a resolved wrist are ignored and the last target is kept.
    pub fn on_joints_updated(&mut self, snapshot: &HandSnapshot) -> Option<VisibilityState> {
        if snapshot.hand != self.config.hand || !self.setup_ok() {
            return None;
        }

        let wrist = snapshot.joint_pose(HandJoint::Wrist)?;
        self.target = wrist.offset_by(self.config.position_offset, self.config.rotation_offset());

        // First sample after acquisition snaps
        if !self.config.smoothing || !self.has_valid_pose {
            self.transform = self.target;
        }
        self.has_valid_pose = true;

        if !self.tracking_active {
            return None;
        }
        let visible = self.evaluate_visibility(snapshot, &wrist)?;
        self.emit_edge(VisibilityState::from_visible(visible))
    }

    /// Palm-up and wrist-height gates. `None` when a needed pose is missing.
    fn evaluate_visibility(&self, snapshot: &HandSnapshot, wrist: &Pose) -> Option<bool> {
        if !self.config.palm_gating {
            return Some(true);
        }

        let palm = snapshot.joint_pose(HandJoint::Palm)?;
        let palm_up = palm_is_up(palm.rotation, self.config.effective_palm_up_threshold());
        if !self.config.wrist_height_gate {
            return Some(palm_up);
        }

        let head = self.head.as_ref()?.head_position()?;
        let raised = wrist.position.y - head.y >= self.config.min_wrist_height_m;
        Some(palm_up && raised)
    }

    /// Forget the last emitted visibility so the next frame reports the
    /// current gate value again.
    pub fn reset_visibility(&mut self) {
        self.visibility = None;
    }

    fn emit_edge(&mut self, state: VisibilityState) -> Option<VisibilityState> {
        if self.visibility == Some(state) {
            return None;
        }
        debug!("pose tracker: watch {}", state.as_str());
        self.visibility = Some(state);
        Some(state)
    }

    /// Per-frame smoothing step. `dt_s` is the time since the previous tick.
    pub fn tick(&mut self, dt_s: f32) {
        if !self.config.smoothing || !self.has_valid_pose || dt_s <= 0.0 {
            return;
        }
        let alpha = 1.0 - (-self.config.smoothing_speed * dt_s).exp();
        self.transform = self.transform.interpolate(&self.target, alpha);
    }

    pub fn transform(&self) -> &Pose {
        &self.transform
    }

    pub fn target(&self) -> &Pose {
        &self.target
    }

    pub fn has_valid_pose(&self) -> bool {
        self.has_valid_pose
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking_active
    }

    pub fn visibility(&self) -> Option<VisibilityState> {
        self.visibility
    }

    /// Status s-expression for the control surface.
    pub fn status_sexp(&self) -> String {
        let p = self.transform.position;
        format!(
            "(:tracking {} :has-pose {} :visibility {} :position (:x {:.4} :y {:.4} :z {:.4}))",
            if self.tracking_active { "t" } else { "nil" },
            if self.has_valid_pose { "t" } else { "nil" },
            self.visibility.map(|v| v.as_str()).unwrap_or("nil"),
            p.x,
            p.y,
            p.z,
        )
    }

    /// Config s-expression for the control surface.
    pub fn config_sexp(&self) -> String {
        let c = &self.config;
        format!(
            "(:hand :{} :position-offset ({:.3} {:.3} {:.3}) :rotation-offset ({:.1} {:.1} {:.1}) :smoothing {} :smoothing-speed {:.1} :palm-gating {} :palm-up-threshold {:.1} :wrist-height-gate {} :min-wrist-height {:.3})",
            c.hand.as_str(),
            c.position_offset.x,
            c.position_offset.y,
            c.position_offset.z,
            c.rotation_offset_deg.x,
            c.rotation_offset_deg.y,
            c.rotation_offset_deg.z,
            if c.smoothing { "t" } else { "nil" },
            c.smoothing_speed,
            if c.palm_gating { "t" } else { "nil" },
            c.palm_up_threshold_deg,
            if c.wrist_height_gate { "t" } else { "nil" },
            c.min_wrist_height_m,
        )
    }
}

// ── Test helpers ───────────────────────────────────────────

#[cfg(test)]
fn wrist_snapshot(hand: Hand, position: Vec3, rotation: Quat) -> HandSnapshot {
    HandSnapshot::new(hand).with_joint(HandJoint::Wrist, position, rotation)
}

#[cfg(test)]
fn palm_snapshot(palm_angle_deg: f32) -> HandSnapshot {
    let palm = Quat::from_axis_angle(Vec3::RIGHT, palm_angle_deg.to_radians());
    wrist_snapshot(Hand::Left, Vec3::new(0.0, 1.0, 0.3), Quat::IDENTITY)
        .with_joint(HandJoint::Palm, Vec3::new(0.0, 1.0, 0.35), palm)
}

// ── Tests ──────────────────────────────────────────────────
