//! Opacity animation state.
//!
//! A fade is plain data `{from, to, start, duration}` sampled by `tick(now)`;
//! nothing suspends across frames. Each subject owns at most one fade.

use tracing::trace;

/// Cubic ease `t²(3 − 2t)`, input clamped to [0, 1].
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// One in-flight opacity animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fade {
    pub from: f32,
    pub to: f32,
    pub start_s: f64,
    pub duration_s: f64,
}

impl Fade {
    pub fn new(from: f32, to: f32, start_s: f64, duration_ms: f64) -> Self {
        Self {
            from,
            to,
            start_s,
            duration_s: (duration_ms / 1000.0).max(0.0),
        }
    }

    /// Linear progress in [0, 1].
    pub fn progress(&self, now_s: f64) -> f32 {
        if self.duration_s <= 0.0 {
            return 1.0;
        }
        ((now_s - self.start_s) / self.duration_s).clamp(0.0, 1.0) as f32
    }

    /// Eased value at `now_s`.
    pub fn sample(&self, now_s: f64) -> f32 {
        self.from + (self.to - self.from) * smoothstep(self.progress(now_s))
    }

    pub fn is_complete(&self, now_s: f64) -> bool {
        self.progress(now_s) >= 1.0
    }
}

/// An opacity value plus its (optional) running fade.
#[derive(Debug, Clone)]
pub struct FadeChannel {
    name: &'static str,
    alpha: f32,
    fade: Option<Fade>,
}

impl FadeChannel {
    pub fn new(name: &'static str, alpha: f32) -> Self {
        Self {
            name,
            alpha: alpha.clamp(0.0, 1.0),
            fade: None,
        }
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn fade(&self) -> Option<&Fade> {
        self.fade.as_ref()
    }

    pub fn is_animating(&self) -> bool {
        self.fade.is_some()
    }

    /// Value the channel is heading to (current alpha when idle).
    pub fn target(&self) -> f32 {
        self.fade.map(|f| f.to).unwrap_or(self.alpha)
    }

    /// Start fading toward `target`, replacing any running fade.
    ///
    /// The new fade starts from the opacity reached at `now_s`. Asking for
    /// the target already being approached keeps the running fade.
    pub fn fade_to(&mut self, target: f32, now_s: f64, duration_ms: f64) {
        let target = target.clamp(0.0, 1.0);
        if let Some(running) = self.fade {
            if running.to == target {
                return;
            }
            self.alpha = running.sample(now_s);
        } else if self.alpha == target {
            return;
        }

        trace!(
            "{} fade {:.3} -> {:.3} over {:.0} ms",
            self.name,
            self.alpha,
            target,
            duration_ms
        );
        self.fade = Some(Fade::new(self.alpha, target, now_s, duration_ms));
    }

    /// Jump to `alpha`, cancelling any running fade.
    pub fn set(&mut self, alpha: f32) {
        self.fade = None;
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    /// Advance the running fade. Returns true on the tick it completes.
    pub fn tick(&mut self, now_s: f64) -> bool {
        let Some(fade) = self.fade else {
            return false;
        };
        if fade.is_complete(now_s) {
            self.alpha = fade.to;
            self.fade = None;
            return true;
        }
        self.alpha = fade.sample(now_s);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoothstep_shape() {
        assert_eq!(smoothstep(0.0), 0.0);
        assert_eq!(smoothstep(1.0), 1.0);
        assert!((smoothstep(0.5) - 0.5).abs() < 1e-6);
        assert!((smoothstep(0.25) - 0.15625).abs() < 1e-6);
        assert_eq!(smoothstep(-1.0), 0.0);
        assert_eq!(smoothstep(2.0), 1.0);
    }

    #[test]
    fn test_fade_sample() {
        let f = Fade::new(0.0, 1.0, 10.0, 400.0);
        assert_eq!(f.sample(10.0), 0.0);
        assert!((f.sample(10.2) - 0.5).abs() < 1e-5);
        assert_eq!(f.sample(10.4), 1.0);
        assert!(f.is_complete(10.5));
        assert!(!f.is_complete(10.3));
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let f = Fade::new(1.0, 0.0, 0.0, 0.0);
        assert!(f.is_complete(0.0));
        assert_eq!(f.sample(0.0), 0.0);
    }

    #[test]
    fn test_channel_runs_to_completion() {
        let mut ch = FadeChannel::new("watch", 0.0);
        ch.fade_to(1.0, 0.0, 100.0);
        assert!(ch.is_animating());
        assert!(!ch.tick(0.05));
        assert!(ch.alpha() > 0.0 && ch.alpha() < 1.0);
        assert!(ch.tick(0.1));
        assert_eq!(ch.alpha(), 1.0);
        assert!(!ch.is_animating());
        assert!(!ch.tick(0.2));
    }

    #[test]
    fn test_same_target_twice_keeps_single_fade() {
        let mut ch = FadeChannel::new("watch", 0.0);
        ch.fade_to(1.0, 0.0, 200.0);
        let first = *ch.fade().expect("running");
        ch.fade_to(1.0, 0.0, 200.0);
        assert_eq!(*ch.fade().expect("still running"), first);

        let mut completions = 0;
        let mut t = 0.0;
        while t <= 0.3 {
            if ch.tick(t) {
                completions += 1;
            }
            t += 0.01;
        }
        assert_eq!(completions, 1);
        assert_eq!(ch.alpha(), 1.0);
    }

    #[test]
    fn test_retarget_starts_from_current_value() {
        let mut ch = FadeChannel::new("watch", 0.0);
        ch.fade_to(1.0, 0.0, 200.0);
        ch.tick(0.1);
        let mid = ch.alpha();
        assert!((mid - 0.5).abs() < 1e-4);

        // Reverse halfway: no snap
        ch.fade_to(0.0, 0.1, 200.0);
        let fade = *ch.fade().expect("retargeted");
        assert!((fade.from - mid).abs() < 1e-6);
        assert_eq!(fade.to, 0.0);
        ch.tick(0.1);
        assert!((ch.alpha() - mid).abs() < 1e-6);
    }

    #[test]
    fn test_retarget_samples_unticked_fade() {
        let mut ch = FadeChannel::new("panel", 1.0);
        ch.fade_to(0.0, 0.0, 100.0);
        // No tick in between: the start value is sampled at the retarget time
        ch.fade_to(1.0, 0.05, 100.0);
        let fade = *ch.fade().expect("retargeted");
        assert!((fade.from - 0.5).abs() < 1e-4);
    }

    #[test]
    fn test_fade_to_current_value_is_noop() {
        let mut ch = FadeChannel::new("panel", 1.0);
        ch.fade_to(1.0, 0.0, 100.0);
        assert!(!ch.is_animating());
    }

    #[test]
    fn test_set_cancels_fade() {
        let mut ch = FadeChannel::new("watch", 0.0);
        ch.fade_to(1.0, 0.0, 100.0);
        ch.set(0.25);
        assert!(!ch.is_animating());
        assert_eq!(ch.alpha(), 0.25);
        assert_eq!(ch.target(), 0.25);
    }
}
