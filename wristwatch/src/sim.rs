//! Headless driver: runs the watch against a scripted hand.
//!
//! The synthetic hand sways slightly in front of a fixed head, rolls its palm
//! between down and up on a fixed period, and drops out of tracking once so
//! every output event fires during a short run.

use std::f64::consts::TAU;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::ipc::format_event;
use crate::vr::{FixedHeadPose, Hand, HandJoint, HandSnapshot, Quat, Vec3};
use crate::watch::{WatchEvent, WristWatch};

/// Head position used by the driver, roughly standing eye height.
pub const HEAD_POSITION: Vec3 = Vec3::new(0.0, 1.6, 0.0);

/// Scripted hand motion.
#[derive(Debug, Clone)]
pub struct SyntheticHand {
    pub hand: Hand,
    /// Seconds for one full palm roll, down to up and back.
    pub roll_period_s: f64,
    /// Tracking is absent in `[start, end)`.
    pub dropout_s: Option<(f64, f64)>,
}

impl Default for SyntheticHand {
    fn default() -> Self {
        Self {
            hand: Hand::Left,
            roll_period_s: 4.0,
            dropout_s: Some((2.0, 2.6)),
        }
    }
}

impl SyntheticHand {
    pub fn is_tracked(&self, t: f64) -> bool {
        match self.dropout_s {
            Some((start, end)) => !(start..end).contains(&t),
            None => true,
        }
    }

    /// Palm-up angle at `t`: 180° (palm down) at t = 0, 0° at half period.
    pub fn palm_angle_deg(&self, t: f64) -> f32 {
        let phase = TAU * t / self.roll_period_s.max(f64::EPSILON);
        (90.0 + 90.0 * phase.cos()) as f32
    }

    /// Joint snapshot at `t`, or `None` while tracking is dropped.
    pub fn sample(&self, t: f64) -> Option<HandSnapshot> {
        if !self.is_tracked(t) {
            return None;
        }
        let sway = Vec3::new(
            (0.03 * t.sin()) as f32,
            (0.02 * (2.0 * t).sin()) as f32,
            0.0,
        );
        let wrist = Vec3::new(-0.2, 1.25, -0.35) + sway;
        let palm = Quat::from_axis_angle(Vec3::RIGHT, self.palm_angle_deg(t).to_radians());

        let mut snapshot = HandSnapshot::new(self.hand)
            .with_joint(HandJoint::Wrist, wrist, Quat::IDENTITY)
            .with_joint(HandJoint::Palm, wrist + Vec3::new(0.0, 0.0, -0.05), palm);
        snapshot.timestamp_ns = (t * 1e9) as u64;
        Some(snapshot)
    }
}

/// Driver run parameters.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub duration_s: f64,
    pub fps: u32,
    /// Pace frames against the wall clock instead of running flat out.
    pub realtime: bool,
    pub hand: SyntheticHand,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            duration_s: 5.0,
            fps: 90,
            realtime: false,
            hand: SyntheticHand::default(),
        }
    }
}

/// What happened during a run.
#[derive(Debug, Default)]
pub struct SimSummary {
    pub frames: u64,
    /// Output events with the simulated time they were raised at.
    pub events: Vec<(f64, WatchEvent)>,
}

impl SimSummary {
    pub fn kinds(&self) -> Vec<WatchEvent> {
        self.events.iter().map(|(_, e)| *e).collect()
    }
}

/// Drive `watch` with the synthetic hand for `config.duration_s` seconds.
pub fn run(watch: &mut WristWatch, config: &SimConfig) -> anyhow::Result<SimSummary> {
    if config.fps == 0 {
        anyhow::bail!("fps must be positive");
    }
    watch.set_head_source(Box::new(FixedHeadPose(HEAD_POSITION)));
    watch.tracker.validate()?;

    let frame_count = (config.duration_s.max(0.0) * f64::from(config.fps)).round() as u64;
    let frame_time = Duration::from_secs_f64(1.0 / f64::from(config.fps));
    info!(
        "simulation: {} frame(s) at {} fps, {} hand",
        frame_count,
        config.fps,
        config.hand.hand.as_str()
    );

    let start = Instant::now();
    let mut summary = SimSummary::default();
    let mut tracked = false;
    let mut last_status_s = 0.0;

    for frame in 0..=frame_count {
        let t = frame as f64 / f64::from(config.fps);

        let snapshot = config.hand.sample(t);
        match (tracked, snapshot.is_some()) {
            (false, true) => watch.on_tracking_acquired(t),
            (true, false) => watch.on_tracking_lost(t),
            _ => {}
        }
        tracked = snapshot.is_some();
        if let Some(snapshot) = snapshot {
            watch.on_joints_updated(&snapshot, t);
        }

        watch.tick(t);
        for event in watch.drain_events() {
            info!("t={:.3}s {}", t, format_event(event));
            summary.events.push((t, event));
        }

        if t - last_status_s >= 1.0 {
            debug!("status: {}", watch.status_sexp());
            last_status_s = t;
        }

        summary.frames += 1;

        if config.realtime {
            let deadline = frame_time * (frame as u32 + 1);
            if let Some(remaining) = deadline.checked_sub(start.elapsed()) {
                std::thread::sleep(remaining);
            }
        }
    }

    info!(
        "simulation finished: {} frame(s), {} event(s), watch alpha {:.2}",
        summary.frames,
        summary.events.len(),
        watch.fader.watch_alpha()
    );
    Ok(summary)
}
