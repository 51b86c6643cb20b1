//! Debounced show/hide transitions between the watch face and the
//! "tracking lost" panel.
//!
//! Two signals are debounced independently: `tracking_lost` (slow window)
//! and `hidden_by_palm` (fast window). Tracking loss wins visually: the
//! panel is shown and the watch held at zero; palm-hide keeps the watch at
//! zero underneath, so re-acquiring tracking while the palm is down fades
//! the panel out without bringing the watch back.

use tracing::{debug, info};

use super::debounce::Debouncer;
use super::fade::FadeChannel;
use super::pose_tracker::VisibilityState;
use super::WatchEvent;

// ── Config ─────────────────────────────────────────────────

/// Fade and debounce timing.
#[derive(Debug, Clone)]
pub struct FaderConfig {
    /// Full fade (tracking lost/acquired) duration in ms.
    pub fade_duration_ms: f64,
    /// Partial fade (palm gesture) duration in ms.
    pub palm_fade_duration_ms: f64,
    /// Debounce window for tracking lost/acquired in ms.
    pub tracking_debounce_ms: f64,
    /// Debounce window for palm visible/hidden in ms.
    pub palm_debounce_ms: f64,
}

impl Default for FaderConfig {
    fn default() -> Self {
        Self {
            fade_duration_ms: 300.0,
            palm_fade_duration_ms: 150.0,
            tracking_debounce_ms: 200.0,
            palm_debounce_ms: 100.0,
        }
    }
}

// ── State ──────────────────────────────────────────────────

/// Opacity state machine for the watch view and lost panel.
pub struct VisibilityFader {
    pub config: FaderConfig,
    tracking_lost: Debouncer,
    hidden_by_palm: Debouncer,
    watch: FadeChannel,
    panel: FadeChannel,
    /// Whether the lost panel is rendered at all.
    panel_active: bool,
    /// Last reported effective watch visibility.
    watch_visible: bool,
}

impl Default for VisibilityFader {
    fn default() -> Self {
        Self::new(FaderConfig::default())
    }
}

impl VisibilityFader {
    /// Starts waiting for tracking: watch transparent, panel opaque and active.
    pub fn new(config: FaderConfig) -> Self {
        Self {
            config,
            tracking_lost: Debouncer::new("tracking-lost", true),
            hidden_by_palm: Debouncer::new("hidden-by-palm", false),
            watch: FadeChannel::new("watch", 0.0),
            panel: FadeChannel::new("lost-panel", 1.0),
            panel_active: true,
            watch_visible: false,
        }
    }

    pub fn on_tracking_acquired(&mut self, now_s: f64) {
        self.tracking_lost
            .set(false, now_s, self.config.tracking_debounce_ms);
    }

    pub fn on_tracking_lost(&mut self, now_s: f64) {
        self.tracking_lost
            .set(true, now_s, self.config.tracking_debounce_ms);
    }

    /// Feed a palm-gate edge from the pose tracker.
    pub fn on_palm_visibility(&mut self, state: VisibilityState, now_s: f64) {
        self.hidden_by_palm
            .set(!state.is_visible(), now_s, self.config.palm_debounce_ms);
    }

    /// Watch opacity the committed signals call for.
    fn watch_target(&self) -> f32 {
        if self.target_visible() {
            1.0
        } else {
            0.0
        }
    }

    fn target_visible(&self) -> bool {
        !self.tracking_lost.value() && !self.hidden_by_palm.value()
    }

    /// Tracking changed: watch and panel move together.
    fn start_full_fade(&mut self, now_s: f64) {
        let lost = self.tracking_lost.value();
        let duration = self.config.fade_duration_ms;
        let panel_target = if lost { 1.0 } else { 0.0 };

        // Panel must be live before it starts becoming visible
        if lost && !self.panel_active {
            self.panel_active = true;
            debug!("lost panel activated");
        }

        self.watch.fade_to(self.watch_target(), now_s, duration);
        self.panel.fade_to(panel_target, now_s, duration);

        if !lost && !self.panel.is_animating() && self.panel.alpha() <= 0.0 {
            self.deactivate_panel();
        }
    }

    /// Palm gesture changed: only the watch moves.
    fn start_partial_fade(&mut self, now_s: f64) {
        self.watch
            .fade_to(self.watch_target(), now_s, self.config.palm_fade_duration_ms);
    }

    fn deactivate_panel(&mut self) {
        if self.panel_active {
            self.panel_active = false;
            debug!("lost panel deactivated");
        }
    }

    /// Advance timers and fades. Returns output events raised this tick.
    pub fn tick(&mut self, now_s: f64) -> Vec<WatchEvent> {
        let mut events = Vec::new();

        if let Some(lost) = self.tracking_lost.poll(now_s) {
            if lost {
                info!("tracking lost");
                events.push(WatchEvent::TrackingLost);
            } else {
                info!("tracking acquired");
                events.push(WatchEvent::TrackingAcquired);
            }
            self.start_full_fade(now_s);
        }

        if self.hidden_by_palm.poll(now_s).is_some() {
            self.start_partial_fade(now_s);
        }

        let visible = self.target_visible();
        if visible != self.watch_visible {
            self.watch_visible = visible;
            events.push(if visible {
                WatchEvent::WatchBecameVisible
            } else {
                WatchEvent::WatchBecameHidden
            });
        }

        self.watch.tick(now_s);
        if self.panel.tick(now_s) && self.panel.alpha() <= 0.0 {
            self.deactivate_panel();
        }

        events
    }

    /// Force the final shown/hidden state: no debounce, no animation.
    ///
    /// Cancels pending timers and running fades. Emits no events.
    pub fn set_immediate(&mut self, visible: bool) {
        self.tracking_lost.force(!visible);
        self.hidden_by_palm.force(false);
        self.watch.set(if visible { 1.0 } else { 0.0 });
        self.panel.set(if visible { 0.0 } else { 1.0 });
        self.panel_active = !visible;
        self.watch_visible = visible;
        debug!("visibility set immediately: {}", visible);
    }

    pub fn watch_alpha(&self) -> f32 {
        self.watch.alpha()
    }

    pub fn panel_alpha(&self) -> f32 {
        self.panel.alpha()
    }

    pub fn panel_active(&self) -> bool {
        self.panel_active
    }

    pub fn is_tracking_lost(&self) -> bool {
        self.tracking_lost.value()
    }

    pub fn is_hidden_by_palm(&self) -> bool {
        self.hidden_by_palm.value()
    }

    pub fn is_watch_visible(&self) -> bool {
        self.watch_visible
    }

    pub fn is_animating(&self) -> bool {
        self.watch.is_animating() || self.panel.is_animating()
    }

    /// Whether any debounce timer is armed.
    pub fn is_pending(&self) -> bool {
        self.tracking_lost.is_pending() || self.hidden_by_palm.is_pending()
    }

    /// Status s-expression for the control surface.
    pub fn status_sexp(&self) -> String {
        format!(
            "(:tracking-lost {} :hidden-by-palm {} :watch-visible {} :watch-alpha {:.3} :panel-alpha {:.3} :panel-active {} :animating {})",
            if self.tracking_lost.value() { "t" } else { "nil" },
            if self.hidden_by_palm.value() { "t" } else { "nil" },
            if self.watch_visible { "t" } else { "nil" },
            self.watch.alpha(),
            self.panel.alpha(),
            if self.panel_active { "t" } else { "nil" },
            if self.is_animating() { "t" } else { "nil" },
        )
    }

    /// Config s-expression for the control surface.
    pub fn config_sexp(&self) -> String {
        format!(
            "(:fade-ms {:.0} :palm-fade-ms {:.0} :tracking-debounce-ms {:.0} :palm-debounce-ms {:.0})",
            self.config.fade_duration_ms,
            self.config.palm_fade_duration_ms,
            self.config.tracking_debounce_ms,
            self.config.palm_debounce_ms,
        )
    }
}

// ── Tests ──────────────────────────────────────────────────
