//! Renderer configuration

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Decay steps for the two per-renderer intensities.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecayConfig {
    /// Amount removed from the typing pulse intensity per frame.
    pub pulse_step: f32,

    /// Amount removed from the error intensity per frame.
    pub error_step: f32,
}

impl DecayConfig {
    pub fn new(pulse_step: f32, error_step: f32) -> Self {
        Self {
            pulse_step,
            error_step,
        }
    }

    /// Frames for a fresh pulse to fully decay.
    pub fn pulse_frames(&self) -> u32 {
        (1.0 / self.pulse_step).ceil() as u32
    }

    /// Frames for a fresh error spike to fully decay.
    pub fn error_frames(&self) -> u32 {
        (1.0 / self.error_step).ceil() as u32
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.pulse_step > 0.0 && self.pulse_step <= 1.0) {
            return Err("pulse_step must be in (0, 1]");
        }
        if !(self.error_step > 0.0 && self.error_step <= 1.0) {
            return Err("error_step must be in (0, 1]");
        }
        Ok(())
    }
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self::new(0.05, 0.02)
    }
}

/// Configuration for the point-field renderer.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointFieldConfig {
    /// Points along X.
    pub amount_x: usize,

    /// Points along Z.
    pub amount_y: usize,

    /// World-space distance between neighbouring points.
    pub separation: f32,

    /// Resting point size in pixels.
    pub base_size: f32,

    /// Color blended toward while typing.
    pub accent: [f32; 3],

    /// Upper bound on the device pixel ratio used for the backing canvas.
    pub max_pixel_ratio: f32,

    pub decay: DecayConfig,
}

impl PointFieldConfig {
    pub fn new(amount_x: usize, amount_y: usize) -> Self {
        Self {
            amount_x,
            amount_y,
            ..Self::default()
        }
    }

    /// Total number of points in the grid.
    pub fn point_count(&self) -> usize {
        self.amount_x * self.amount_y
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.amount_x == 0 || self.amount_y == 0 {
            return Err("grid dimensions must be > 0");
        }
        if !(self.separation > 0.0) {
            return Err("separation must be > 0");
        }
        if !(self.base_size > 0.0) {
            return Err("base_size must be > 0");
        }
        if self.accent.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err("accent channels must be in [0, 1]");
        }
        if !(self.max_pixel_ratio > 0.0) {
            return Err("max_pixel_ratio must be > 0");
        }
        self.decay.validate()
    }
}

impl Default for PointFieldConfig {
    fn default() -> Self {
        Self {
            amount_x: 40,
            amount_y: 60,
            separation: 150.0,
            base_size: 9.0,
            accent: [0.0, 1.0, 1.0],
            max_pixel_ratio: 1.5,
            decay: DecayConfig::default(),
        }
    }
}

/// Configuration for the fluid-field renderer.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FluidFieldConfig {
    /// Fixed pixel ratio of the backing canvas. The fluid look is soft
    /// enough to render well below native resolution.
    pub pixel_ratio: f32,

    /// Seconds the typing target stays raised after the latest pulse.
    pub release_delay: f32,

    /// Interpolation rate toward a higher speed target.
    pub attack_rate: f32,

    /// Interpolation rate toward a lower speed target.
    pub release_rate: f32,

    /// Interpolation rate of the glitch back to zero.
    pub glitch_recovery_rate: f32,

    /// Glitch clock advance per second of animation.
    pub glitch_clock_rate: f32,
}

impl FluidFieldConfig {
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.pixel_ratio > 0.0) {
            return Err("pixel_ratio must be > 0");
        }
        if !(self.release_delay >= 0.0) {
            return Err("release_delay must be >= 0");
        }
        if !(self.attack_rate > 0.0 && self.release_rate > 0.0) {
            return Err("speed rates must be > 0");
        }
        if !(self.glitch_recovery_rate > 0.0) {
            return Err("glitch_recovery_rate must be > 0");
        }
        Ok(())
    }
}

impl Default for FluidFieldConfig {
    fn default() -> Self {
        Self {
            pixel_ratio: 0.5,
            release_delay: 0.15,
            attack_rate: 5.0,
            release_rate: 0.5,
            glitch_recovery_rate: 5.0,
            glitch_clock_rate: 50.0,
        }
    }
}
