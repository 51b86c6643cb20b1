//! The wristwatch: pose tracking, debounced visibility, and time display
//! composed behind plain entry points.
//!
//! The host calls `on_joints_updated` / `on_tracking_acquired` /
//! `on_tracking_lost` as its tracker reports, and `tick` once per frame.
//! Output events queue up until `drain_events`.

pub mod debounce;
pub mod fade;
pub mod pose_tracker;
pub mod time_display;
pub mod visibility_fader;

use tracing::{debug, info};

use crate::vr::{HandSnapshot, HeadPoseSource};
use pose_tracker::{PoseTracker, PoseTrackerConfig};
use time_display::{Clock, TimeFormatConfig, TimeFormatter};
use visibility_fader::{FaderConfig, VisibilityFader};

// ── Events ─────────────────────────────────────────────────

/// Edge-triggered notifications for the host's UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEvent {
    TrackingAcquired,
    TrackingLost,
    WatchBecameVisible,
    WatchBecameHidden,
}

impl WatchEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TrackingAcquired => "tracking-acquired",
            Self::TrackingLost => "tracking-lost",
            Self::WatchBecameVisible => "watch-visible",
            Self::WatchBecameHidden => "watch-hidden",
        }
    }
}

// ── Config ─────────────────────────────────────────────────

/// Configuration for all watch components.
#[derive(Debug, Clone, Default)]
pub struct WatchConfig {
    pub tracker: PoseTrackerConfig,
    pub fader: FaderConfig,
    pub time: TimeFormatConfig,
}

// ── State ──────────────────────────────────────────────────

pub struct WristWatch {
    pub tracker: PoseTracker,
    pub fader: VisibilityFader,
    pub time: TimeFormatter,
    events: Vec<WatchEvent>,
    last_tick_s: Option<f64>,
}

impl WristWatch {
    pub fn new(config: WatchConfig, clock: Box<dyn Clock>) -> Self {
        info!(
            "wristwatch: {} hand, palm gating {}",
            config.tracker.hand.as_str(),
            if config.tracker.palm_gating { "on" } else { "off" },
        );
        Self {
            tracker: PoseTracker::new(config.tracker),
            fader: VisibilityFader::new(config.fader),
            time: TimeFormatter::new(config.time, clock),
            events: Vec::new(),
            last_tick_s: None,
        }
    }

    pub fn set_head_source(&mut self, head: Box<dyn HeadPoseSource>) {
        self.tracker.set_head_source(head);
    }

    /// Joint data for one hand this frame.
    pub fn on_joints_updated(&mut self, snapshot: &HandSnapshot, now_s: f64) {
        if let Some(state) = self.tracker.on_joints_updated(snapshot) {
            self.fader.on_palm_visibility(state, now_s);
        }
    }

    pub fn on_tracking_acquired(&mut self, now_s: f64) {
        self.tracker.on_tracking_acquired();
        self.fader.on_tracking_acquired(now_s);
    }

    pub fn on_tracking_lost(&mut self, now_s: f64) {
        self.tracker.on_tracking_lost();
        self.fader.on_tracking_lost(now_s);
    }

    /// Per-frame update: smoothing, debounce timers, fades, clock text.
    pub fn tick(&mut self, now_s: f64) {
        let dt_s = self
            .last_tick_s
            .map(|last| (now_s - last).max(0.0))
            .unwrap_or(0.0);
        self.last_tick_s = Some(now_s);

        self.tracker.tick(dt_s as f32);
        let events = self.fader.tick(now_s);
        for event in &events {
            debug!("watch event: {}", event.as_str());
        }
        self.events.extend(events);
        self.time.tick(now_s);
    }

    /// Force the shown/hidden state without debounce or animation.
    ///
    /// The tracker's last visibility edge is cleared, so the next joint frame
    /// re-reports the live palm gate and gating resumes from there.
    pub fn set_immediate(&mut self, visible: bool) {
        self.fader.set_immediate(visible);
        self.tracker.reset_visibility();
    }

    /// Take all queued output events.
    pub fn drain_events(&mut self) -> Vec<WatchEvent> {
        std::mem::take(&mut self.events)
    }

    /// Combined status s-expression.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:tracker {} :fader {} :time {})",
            self.tracker.status_sexp(),
            self.fader.status_sexp(),
            self.time.status_sexp(),
        )
    }

    /// Combined config s-expression.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:tracker {} :fader {} :time-format \"{}\" :date-format \"{}\" :update-interval {:.2})",
            self.tracker.config_sexp(),
            self.fader.config_sexp(),
            time_display::escape(&self.time.config().time_format),
            time_display::escape(&self.time.config().date_format),
            self.time.config().update_interval_s,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vr::{Hand, HandJoint, Quat, Vec3};
    use chrono::NaiveDate;
    use std::rc::Rc;
    use time_display::FixedClock;

    const FRAME_S: f64 = 1.0 / 90.0;

    fn clock() -> Rc<FixedClock> {
        let t = NaiveDate::from_ymd_opt(2024, 3, 15)
            .and_then(|d| d.and_hms_opt(13, 30, 0))
            .expect("valid test timestamp");
        Rc::new(FixedClock::new(t))
    }

    fn watch_with(config: WatchConfig) -> WristWatch {
        WristWatch::new(config, Box::new(clock()))
    }

    fn hand(palm_angle_deg: f32) -> HandSnapshot {
        HandSnapshot::new(Hand::Left)
            .with_joint(HandJoint::Wrist, Vec3::new(0.0, 1.0, 0.3), Quat::IDENTITY)
            .with_joint(
                HandJoint::Palm,
                Vec3::new(0.0, 1.0, 0.35),
                Quat::from_axis_angle(Vec3::RIGHT, palm_angle_deg.to_radians()),
            )
    }

    /// Run frames from `from_s` to `to_s`, feeding `palm_angle(t)` each frame.
    fn run_frames(
        watch: &mut WristWatch,
        from_s: f64,
        to_s: f64,
        palm_angle: impl Fn(f64) -> f32,
    ) -> Vec<WatchEvent> {
        let mut t = from_s;
        while t <= to_s + 1e-9 {
            watch.on_joints_updated(&hand(palm_angle(t)), t);
            watch.tick(t);
            t += FRAME_S;
        }
        watch.drain_events()
    }

    #[test]
    fn test_initial_state() {
        let watch = watch_with(WatchConfig::default());
        assert_eq!(watch.fader.watch_alpha(), 0.0);
        assert_eq!(watch.fader.panel_alpha(), 1.0);
        assert!(watch.fader.panel_active());
        assert!(watch.fader.is_tracking_lost());
        assert_eq!(watch.time.time_text(), "1:30 PM");
    }

    #[test]
    fn test_scenario_acquire_fades_in() {
        let mut watch = watch_with(WatchConfig::default());
        watch.on_tracking_acquired(0.0);

        // Debounce window: nothing visible changes
        let events = run_frames(&mut watch, 0.0, 0.19, |_| 0.0);
        assert!(events.is_empty());
        assert_eq!(watch.fader.watch_alpha(), 0.0);
        assert_eq!(watch.fader.panel_alpha(), 1.0);

        let events = run_frames(&mut watch, 0.2, 0.21, |_| 0.0);
        assert_eq!(
            events,
            vec![WatchEvent::TrackingAcquired, WatchEvent::WatchBecameVisible]
        );

        // Fade runs for 300 ms; panel deactivates only at the end
        let events = run_frames(&mut watch, 0.22, 0.45, |_| 0.0);
        assert!(events.is_empty());
        assert!(watch.fader.watch_alpha() > 0.0 && watch.fader.watch_alpha() < 1.0);
        assert!(watch.fader.panel_active());

        run_frames(&mut watch, 0.46, 0.7, |_| 0.0);
        assert_eq!(watch.fader.watch_alpha(), 1.0);
        assert_eq!(watch.fader.panel_alpha(), 0.0);
        assert!(!watch.fader.panel_active());
    }

    #[test]
    fn test_scenario_palm_up_reveals_watch_once() {
        let mut config = WatchConfig::default();
        config.tracker.palm_gating = true;
        let mut watch = watch_with(config);

        // Palm facing down at acquisition: the short palm debounce commits
        // "hidden" before tracking commits, so the watch never flashes
        watch.on_tracking_acquired(0.0);
        let events = run_frames(&mut watch, 0.0, 1.0, |_| 180.0);
        assert_eq!(events, vec![WatchEvent::TrackingAcquired]);
        assert_eq!(watch.fader.watch_alpha(), 0.0);

        // Rotate palm from 180° to 0° over half a second, then hold
        let events = run_frames(&mut watch, 1.0, 3.0, |t| {
            let p = ((t - 1.0) / 0.5).clamp(0.0, 1.0);
            (180.0 * (1.0 - p)) as f32
        });
        assert_eq!(events, vec![WatchEvent::WatchBecameVisible]);
        assert_eq!(watch.fader.watch_alpha(), 1.0);
        assert!(!watch.fader.panel_active());
    }

    #[test]
    fn test_palm_visible_fires_after_palm_debounce() {
        let mut config = WatchConfig::default();
        config.tracker.palm_gating = true;
        let mut watch = watch_with(config);
        watch.on_tracking_acquired(0.0);
        run_frames(&mut watch, 0.0, 1.0, |_| 180.0);

        // Palm snaps up at t=1.0; palm debounce is 100 ms
        let events = run_frames(&mut watch, 1.0, 1.09, |_| 0.0);
        assert!(events.is_empty());
        let events = run_frames(&mut watch, 1.1, 1.15, |_| 0.0);
        assert_eq!(events, vec![WatchEvent::WatchBecameVisible]);
    }

    #[test]
    fn test_tracking_loss_with_palm_hidden() {
        let mut config = WatchConfig::default();
        config.tracker.palm_gating = true;
        let mut watch = watch_with(config);
        watch.on_tracking_acquired(0.0);
        run_frames(&mut watch, 0.0, 1.0, |_| 0.0);
        assert!(watch.fader.is_watch_visible());

        // Palm down, then tracking drops
        let events = run_frames(&mut watch, 1.0, 1.5, |_| 180.0);
        assert_eq!(events, vec![WatchEvent::WatchBecameHidden]);

        watch.on_tracking_lost(1.5);
        let mut t = 1.5;
        while t <= 2.2 {
            watch.tick(t);
            t += FRAME_S;
        }
        assert_eq!(watch.drain_events(), vec![WatchEvent::TrackingLost]);
        assert_eq!(watch.fader.panel_alpha(), 1.0);
        assert_eq!(watch.fader.watch_alpha(), 0.0);

        // Back with the palm still down: panel fades, watch stays hidden
        watch.on_tracking_acquired(2.2);
        let events = run_frames(&mut watch, 2.2, 3.0, |_| 180.0);
        assert_eq!(events, vec![WatchEvent::TrackingAcquired]);
        assert_eq!(watch.fader.panel_alpha(), 0.0);
        assert_eq!(watch.fader.watch_alpha(), 0.0);
    }

    #[test]
    fn test_set_immediate() {
        let mut watch = watch_with(WatchConfig::default());
        watch.set_immediate(true);
        assert_eq!(watch.fader.watch_alpha(), 1.0);
        assert!(!watch.fader.panel_active());
        watch.tick(0.0);
        assert!(watch.drain_events().is_empty());
    }

    #[test]
    fn test_forced_show_keeps_palm_gating() {
        let mut config = WatchConfig::default();
        config.tracker.palm_gating = true;
        let mut watch = watch_with(config);
        watch.on_tracking_acquired(0.0);
        run_frames(&mut watch, 0.0, 1.0, |_| 180.0);
        assert!(watch.fader.is_hidden_by_palm());

        watch.set_immediate(true);
        assert_eq!(watch.fader.watch_alpha(), 1.0);

        // Palm still down: gating takes the watch away again
        let events = run_frames(&mut watch, 1.0, 3.0, |_| 180.0);
        assert_eq!(events, vec![WatchEvent::WatchBecameHidden]);
        assert!(watch.fader.is_hidden_by_palm());
        assert_eq!(watch.fader.watch_alpha(), 0.0);
    }

    #[test]
    fn test_smoothing_follows_tick_time() {
        let mut watch = watch_with(WatchConfig::default());
        watch.tracker.config.position_offset = Vec3::ZERO;
        watch.on_tracking_acquired(0.0);
        watch.on_joints_updated(&hand(0.0), 0.0);
        watch.tick(0.0);
        assert!((watch.tracker.transform().position.z - 0.3).abs() < 1e-6);

        let moved = HandSnapshot::new(Hand::Left).with_joint(
            HandJoint::Wrist,
            Vec3::new(0.0, 1.0, 0.4),
            Quat::IDENTITY,
        );
        watch.on_joints_updated(&moved, 0.1);
        watch.tick(0.1);
        let z = watch.tracker.transform().position.z;
        assert!(z > 0.3 && z < 0.4, "z = {}", z);
    }

    #[test]
    fn test_status_sexp() {
        let watch = watch_with(WatchConfig::default());
        let sexp = watch.status_sexp();
        assert!(sexp.starts_with("(:tracker (:tracking nil"));
        assert!(sexp.contains(":fader (:tracking-lost t"));
        assert!(sexp.contains(":time \"1:30 PM\""));
        let config = watch.config_sexp();
        assert!(config.contains(":time-format \"h:mm tt\""));
    }

    #[test]
    fn test_config_sexp_escapes_templates() {
        let mut watch = watch_with(WatchConfig::default());
        watch.time.set_time_format("\\h \"at\" H");
        let config = watch.config_sexp();
        assert!(
            config.contains(r#":time-format "\\h \"at\" H""#),
            "got {}",
            config
        );
    }

    #[test]
    fn test_event_names() {
        assert_eq!(WatchEvent::TrackingAcquired.as_str(), "tracking-acquired");
        assert_eq!(WatchEvent::WatchBecameHidden.as_str(), "watch-hidden");
    }
}
