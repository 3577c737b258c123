//! Intensity state - turns discrete signals into smoothed scalars.
//!
//! Every value here lives in [0, 1] and is advanced exactly once per rendered
//! frame. Values below [`SNAP_EPSILON`] are snapped to exactly zero so that
//! renderers can detect "idle" with a plain comparison.

use crate::bus::Pending;
use crate::config::{DecayConfig, FluidFieldConfig};

/// Below this an intensity is considered settled and forced to zero.
pub const SNAP_EPSILON: f32 = 1e-3;

#[inline]
fn lerp(start: f32, end: f32, t: f32) -> f32 {
    start * (1.0 - t) + end * t
}

/// Linearly decaying intensity, re-armed to 1.0 by every trigger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Intensity {
    value: f32,
    step: f32,
}

impl Intensity {
    /// Create an idle intensity that loses `step` per frame.
    pub fn new(step: f32) -> Self {
        Self { value: 0.0, step }
    }

    /// Re-arm to full strength, whatever the current value.
    pub fn trigger(&mut self) {
        self.value = 1.0;
    }

    /// Remove one frame's worth of intensity.
    pub fn decay(&mut self) {
        if self.value > 0.0 {
            self.value -= self.step;
            if self.value < SNAP_EPSILON {
                self.value = 0.0;
            }
        }
    }

    /// Current strength in [0, 1].
    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    /// True until the value has snapped to exactly zero.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.value > 0.0
    }
}

/// Which signal currently drives the visuals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Dominant {
    Idle,
    Pulse(f32),
    /// Error wins whenever it is non-zero, regardless of the pulse.
    Error(f32),
}

/// The pulse/error pair owned by one renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActivityState {
    pub pulse: Intensity,
    pub error: Intensity,
}

impl ActivityState {
    /// Both intensities idle, decaying at the configured steps.
    pub fn new(decay: DecayConfig) -> Self {
        Self {
            pulse: Intensity::new(decay.pulse_step),
            error: Intensity::new(decay.error_step),
        }
    }

    /// Per-frame update: decay, then apply whatever arrived since last frame.
    ///
    /// Repeated spikes while already elevated re-trigger to 1.0.
    pub fn advance(&mut self, pending: Pending) {
        self.pulse.decay();
        self.error.decay();
        if pending.pulses > 0 {
            self.pulse.trigger();
        }
        if pending.spikes > 0 {
            self.error.trigger();
        }
    }

    /// Either intensity is still non-zero.
    pub fn has_activity(&self) -> bool {
        self.pulse.is_active() || self.error.is_active()
    }

    /// The signal the visuals should follow this frame.
    pub fn dominant(&self) -> Dominant {
        if self.error.is_active() {
            Dominant::Error(self.error.value())
        } else if self.pulse.is_active() {
            Dominant::Pulse(self.pulse.value())
        } else {
            Dominant::Idle
        }
    }
}

impl Default for ActivityState {
    fn default() -> Self {
        Self::new(DecayConfig::default())
    }
}

/// Fast-attack, slow-release typing speed for the fluid field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SmoothedSpeed {
    current: f32,
    target: f32,
    /// Animation time at which the target drops back to zero.
    release_at: Option<f32>,
    release_delay: f32,
    attack_rate: f32,
    release_rate: f32,
}

impl SmoothedSpeed {
    /// At rest, with rates and release delay taken from `config`.
    pub fn new(config: &FluidFieldConfig) -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            release_at: None,
            release_delay: config.release_delay,
            attack_rate: config.attack_rate,
            release_rate: config.release_rate,
        }
    }

    /// Raise the target and replace any pending release with a fresh one.
    pub fn pulse(&mut self, now: f32) {
        self.target = 1.0;
        self.release_at = Some(now + self.release_delay);
    }

    /// Interpolation factor for one frame of `delta` seconds.
    pub fn rate(&self, delta: f32) -> f32 {
        let rate = if self.target > self.current {
            self.attack_rate
        } else {
            self.release_rate
        };
        (rate * delta).clamp(0.0, 1.0)
    }

    /// Fire a due release, then move one frame toward the target.
    pub fn advance(&mut self, now: f32, delta: f32) {
        if self.release_at.is_some_and(|at| now >= at) {
            self.target = 0.0;
            self.release_at = None;
        }

        let t = self.rate(delta);
        self.current = lerp(self.current, self.target, t).clamp(0.0, 1.0);
        if self.target == 0.0 && self.current < SNAP_EPSILON {
            self.current = 0.0;
        }
    }

    /// Smoothed speed in [0, 1].
    #[inline]
    pub fn value(&self) -> f32 {
        self.current
    }

    /// Level the speed is currently moving toward.
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Color blend weight: engages past half speed, full at speed 1.0.
    pub fn color_intensity(&self) -> f32 {
        ((self.current - 0.5) * 2.0).max(0.0)
    }
}

/// Glitch strength plus the fast clock that animates its flicker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlitchDecay {
    intensity: f32,
    clock: f32,
    recovery_rate: f32,
    clock_rate: f32,
}

impl GlitchDecay {
    /// Settled, with rates from `config`.
    pub fn new(config: &FluidFieldConfig) -> Self {
        Self {
            intensity: 0.0,
            clock: 0.0,
            recovery_rate: config.glitch_recovery_rate,
            clock_rate: config.glitch_clock_rate,
        }
    }

    /// Jump straight to full glitch.
    pub fn spike(&mut self) {
        self.intensity = 1.0;
    }

    /// Recover toward zero; the clock only runs while the glitch is live.
    pub fn advance(&mut self, delta: f32) {
        if self.intensity > SNAP_EPSILON {
            let t = (self.recovery_rate * delta).clamp(0.0, 1.0);
            self.intensity = lerp(self.intensity, 0.0, t);
            self.clock += delta * self.clock_rate;
        }
        if self.intensity <= SNAP_EPSILON {
            self.intensity = 0.0;
        }
    }

    /// Current glitch strength in [0, 1].
    #[inline]
    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Glitch animation clock. Frozen once the glitch settles.
    pub fn clock(&self) -> f32 {
        self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    #[test]
    fn test_pulse_decays_to_exact_zero() {
        let mut pulse = Intensity::new(0.05);
        pulse.trigger();
        assert_eq!(pulse.value(), 1.0);

        let mut previous = pulse.value();
        for frame in 1..=20 {
            pulse.decay();
            assert!(pulse.value() < previous, "frame {frame} did not decrease");
            previous = pulse.value();
            if frame < 20 {
                assert!(pulse.is_active(), "settled early at frame {frame}");
            }
        }
        assert_eq!(pulse.value(), 0.0);

        pulse.decay();
        assert_eq!(pulse.value(), 0.0);
    }

    #[test]
    fn test_error_uses_slower_step() {
        let mut state = ActivityState::default();
        state.advance(Pending {
            pulses: 1,
            spikes: 1,
        });
        assert_eq!(state.pulse.value(), 1.0);
        assert_eq!(state.error.value(), 1.0);

        for _ in 0..20 {
            state.advance(Pending::default());
        }
        assert_eq!(state.pulse.value(), 0.0);
        assert!(state.error.is_active());

        for _ in 0..30 {
            state.advance(Pending::default());
        }
        assert_eq!(state.error.value(), 0.0);
        assert!(!state.has_activity());
    }

    #[test]
    fn test_retrigger_resets_to_full() {
        let mut state = ActivityState::default();
        state.advance(Pending {
            pulses: 0,
            spikes: 1,
        });
        for _ in 0..10 {
            state.advance(Pending::default());
        }
        assert!(state.error.value() < 1.0);

        state.advance(Pending {
            pulses: 0,
            spikes: 3,
        });
        assert_eq!(state.error.value(), 1.0);
    }

    #[test]
    fn test_error_dominates_pulse() {
        let mut state = ActivityState::default();
        state.advance(Pending {
            pulses: 1,
            spikes: 0,
        });
        assert_eq!(state.dominant(), Dominant::Pulse(1.0));

        state.advance(Pending {
            pulses: 1,
            spikes: 1,
        });
        assert_eq!(state.dominant(), Dominant::Error(1.0));
    }

    #[test]
    fn test_speed_attack_faster_than_release() {
        let config = FluidFieldConfig::default();
        for delta in [0.001, FRAME, 0.05, 0.1] {
            let mut rising = SmoothedSpeed::new(&config);
            rising.pulse(0.0);
            let up = rising.rate(delta);

            let mut falling = SmoothedSpeed::new(&config);
            falling.current = 1.0;
            let down = falling.rate(delta);

            assert!((up / down - 10.0).abs() < 1e-4, "delta {delta}: {up} vs {down}");
        }
    }

    #[test]
    fn test_speed_rises_then_releases() {
        let config = FluidFieldConfig::default();
        let mut speed = SmoothedSpeed::new(&config);
        let mut now = 0.0;

        speed.pulse(now);
        // Keep typing for one second.
        for frame in 0..60 {
            now += FRAME;
            if frame % 5 == 0 {
                speed.pulse(now);
            }
            speed.advance(now, FRAME);
        }
        assert!(speed.value() > 0.99);
        assert_eq!(speed.color_intensity(), (speed.value() - 0.5) * 2.0);

        // Release is an order of magnitude slower than the attack.
        for _ in 0..60 {
            now += FRAME;
            speed.advance(now, FRAME);
        }
        assert_eq!(speed.target(), 0.0);
        assert!(speed.value() > 0.5);
    }

    #[test]
    fn test_newer_pulse_replaces_pending_release() {
        let config = FluidFieldConfig::default();
        let mut speed = SmoothedSpeed::new(&config);

        speed.pulse(0.0);
        speed.pulse(0.1);
        // The first pulse's release (0.15) must not fire.
        speed.advance(0.2, FRAME);
        assert_eq!(speed.target(), 1.0);

        speed.advance(0.3, FRAME);
        assert_eq!(speed.target(), 0.0);
    }

    #[test]
    fn test_color_intensity_threshold() {
        let config = FluidFieldConfig::default();
        let mut speed = SmoothedSpeed::new(&config);
        speed.current = 0.4;
        assert_eq!(speed.color_intensity(), 0.0);
        speed.current = 1.0;
        assert_eq!(speed.color_intensity(), 1.0);
    }

    #[test]
    fn test_glitch_recovers_to_exact_zero() {
        let config = FluidFieldConfig::default();
        let mut glitch = GlitchDecay::new(&config);
        glitch.spike();
        assert_eq!(glitch.intensity(), 1.0);

        let mut frames = 0;
        while glitch.intensity() > 0.0 {
            let before = glitch.intensity();
            glitch.advance(FRAME);
            assert!(glitch.intensity() < before);
            frames += 1;
            assert!(frames < 200);
        }
        assert_eq!(glitch.intensity(), 0.0);

        let clock = glitch.clock();
        assert!(clock > 0.0);
        glitch.advance(FRAME);
        assert_eq!(glitch.clock(), clock);
    }
}
