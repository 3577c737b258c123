//! Discrete point-field renderer.
//!
//! A lattice of points rolling under a travelling double-sine wave. Typing
//! tints the field toward the accent color, errors flush it red and shake it.
//! All motion is computed on the host; the surface only receives buffers.
//!
//! The color buffer is the expensive upload, so it is only pushed on frames
//! where the field is active, plus exactly one frame after activity ends to
//! flush the reset back to white.

use crate::bus::{SignalBus, SignalInbox};
use crate::camera::{Camera, Mat4};
use crate::config::PointFieldConfig;
use crate::error::{RenderError, RenderResult};
use crate::grid::{PointGrid, BASE_COLOR};
use crate::intensity::{ActivityState, Dominant};
use crate::scheduler::{FrameTime, Renderer};
use crate::surface::{PointSurface, Viewport};
use bytemuck::{Pod, Zeroable};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Linear fog range, in view-space depth.
pub const FOG_NEAR: f32 = 2000.0;
pub const FOG_FAR: f32 = 10_000.0;

/// Per-draw uniforms, matching `PointUniforms` in `points.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PointUniforms {
    pub view_proj: Mat4,
    /// Backing canvas size in physical pixels.
    pub viewport: [f32; 2],
    pub point_size: f32,
    pub fog_near: f32,
    pub fog_far: f32,
    pub _pad: [f32; 3],
}

/// Height of grid cell (ix, iy) at wave phase `counter`.
#[inline]
pub fn wave_height(ix: usize, iy: usize, counter: f32) -> f32 {
    ((ix as f32 + counter) * 0.3).sin() * 50.0 + ((iy as f32 + counter) * 0.5).sin() * 50.0
}

#[inline]
fn lerp3(a: [f32; 3], b: [f32; 3], t: f32) -> [f32; 3] {
    [
        a[0] * (1.0 - t) + b[0] * t,
        a[1] * (1.0 - t) + b[1] * t,
        a[2] * (1.0 - t) + b[2] * t,
    ]
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointFieldStats {
    pub frames: u64,
    pub color_uploads: u64,
}

pub struct PointField<S: PointSurface> {
    config: PointFieldConfig,
    grid: PointGrid,
    activity: ActivityState,
    inbox: Option<SignalInbox>,
    surface: S,
    camera: Camera,
    viewport: Viewport,
    backing: (u32, u32),
    pending_viewport: Option<Viewport>,
    counter: f32,
    point_size: f32,
    was_active: bool,
    /// Initial colors have not reached the surface yet.
    colors_dirty: bool,
    rng: StdRng,
    stats: PointFieldStats,
}

impl<S: PointSurface> PointField<S> {
    /// Build the grid, subscribe to `bus` and size the field for `viewport`.
    pub fn mount<B: SignalBus + ?Sized>(
        config: PointFieldConfig,
        bus: &B,
        surface: S,
        viewport: Viewport,
    ) -> RenderResult<Self> {
        config.validate().map_err(RenderError::InvalidConfig)?;

        let grid = PointGrid::new(config.amount_x, config.amount_y, config.separation);
        let mut camera = Camera::new(1.0);
        camera.set_viewport(viewport.width, viewport.height);
        tracing::debug!(points = grid.len(), "point field mounted");

        Ok(Self {
            activity: ActivityState::new(config.decay),
            point_size: config.base_size,
            config,
            grid,
            inbox: Some(SignalInbox::attach(bus)),
            surface,
            camera,
            viewport,
            backing: (0, 0),
            pending_viewport: Some(viewport),
            counter: 0.0,
            was_active: false,
            colors_dirty: true,
            rng: StdRng::from_entropy(),
            stats: PointFieldStats::default(),
        })
    }

    /// Replace the jitter source, e.g. with a seeded one.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Seed the jitter source for reproducible frames.
    pub fn with_seed(self, seed: u64) -> Self {
        self.with_rng(StdRng::seed_from_u64(seed))
    }

    /// Pulse and error intensities as of the last frame.
    pub fn activity(&self) -> &ActivityState {
        &self.activity
    }

    /// Host-side positions and colors.
    pub fn grid(&self) -> &PointGrid {
        &self.grid
    }

    /// Camera used for the last applied viewport.
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Last viewport that reached the surface. A pending resize is not
    /// reflected until the next frame applies it.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The surface this field draws into.
    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Mutable access to the surface.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Wave phase. Advances every frame, faster under activity.
    pub fn counter(&self) -> f32 {
        self.counter
    }

    /// Point size drawn by the last frame, in pixels.
    pub fn point_size(&self) -> f32 {
        self.point_size
    }

    /// Frame and color-upload counters.
    pub fn stats(&self) -> PointFieldStats {
        self.stats
    }

    /// False once torn down.
    pub fn is_subscribed(&self) -> bool {
        self.inbox.is_some()
    }

    /// Uniform block for the current camera, canvas and point size.
    pub fn uniforms(&self) -> PointUniforms {
        PointUniforms {
            view_proj: self.camera.view_projection(),
            viewport: [self.backing.0 as f32, self.backing.1 as f32],
            point_size: self.point_size,
            fog_near: FOG_NEAR,
            fog_far: FOG_FAR,
            _pad: [0.0; 3],
        }
    }

    /// Color every point should carry for the current activity.
    pub fn activity_color(&self) -> [f32; 3] {
        match self.activity.dominant() {
            Dominant::Error(e) => [1.0, 1.0 - e, 1.0 - e],
            Dominant::Pulse(t) => lerp3(BASE_COLOR, self.config.accent, t),
            Dominant::Idle => BASE_COLOR,
        }
    }

    fn apply_viewport(&mut self) {
        let Some(viewport) = self.pending_viewport else {
            return;
        };
        let ratio = viewport
            .device_pixel_ratio
            .min(self.config.max_pixel_ratio);
        let (width, height) = viewport.backing_size(ratio);

        // Camera and canvas change together or not at all.
        match self.surface.resize(width, height) {
            Ok(()) => {
                self.camera.set_viewport(viewport.width, viewport.height);
                self.viewport = viewport;
                self.backing = (width, height);
                self.pending_viewport = None;
                tracing::debug!(width, height, "point field resized");
            }
            Err(err) => tracing::warn!(error = %err, "resize deferred"),
        }
    }

    fn update_heights(&mut self, error: f32) {
        let amount_x = self.grid.amount_x();
        let amount_y = self.grid.amount_y();
        let shake = 50.0 * error;

        for ix in 0..amount_x {
            for iy in 0..amount_y {
                let mut y = wave_height(ix, iy, self.counter);
                if error > 0.0 {
                    y += (self.rng.gen::<f32>() - 0.5) * shake;
                }
                let index = self.grid.index(ix, iy);
                self.grid.set_height(index, y);
            }
        }
    }
}

impl<S: PointSurface> Renderer for PointField<S> {
    fn render_frame(&mut self, _time: FrameTime) -> RenderResult<()> {
        self.apply_viewport();

        let pending = self
            .inbox
            .as_ref()
            .map(SignalInbox::drain)
            .unwrap_or_default();
        self.activity.advance(pending);
        let has_activity = self.activity.has_activity();
        let dominant = self.activity.dominant();

        self.update_heights(self.activity.error.value());

        // Idle frames leave the color buffer alone, except the first one
        // after activity, which must land on pure white.
        if has_activity {
            self.grid.fill_color(self.activity_color());
        } else if self.was_active {
            self.grid.reset_colors();
        }

        self.surface.upload_positions(self.grid.positions())?;
        if has_activity || self.was_active || self.colors_dirty {
            self.surface.upload_colors(self.grid.colors())?;
            self.stats.color_uploads += 1;
            self.colors_dirty = false;
            tracing::trace!(has_activity, "color buffer uploaded");
        }
        self.was_active = has_activity;

        let (extra_size, speed_boost) = match dominant {
            Dominant::Error(e) => (self.rng.gen::<f32>() * 5.0 * e, 0.5 * e),
            Dominant::Pulse(p) => (p * 3.0, 0.3 * p),
            Dominant::Idle => (0.0, 0.0),
        };
        self.point_size = self.config.base_size + extra_size;

        let result = self.surface.draw(&self.uniforms());
        self.counter += 0.1 + speed_boost;
        self.stats.frames += 1;
        result
    }

    fn resize(&mut self, viewport: Viewport) {
        self.pending_viewport = Some(viewport);
    }

    fn teardown(&mut self) {
        if let Some(inbox) = self.inbox.take() {
            inbox.detach();
        }
        self.surface.release();
        tracing::debug!(frames = self.stats.frames, "point field torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalSignalBus;
    use crate::observer::Signal;
    use crate::surface::recording::RecordingPointSurface;

    fn small_config() -> PointFieldConfig {
        PointFieldConfig::new(8, 6)
    }

    fn mount(bus: &LocalSignalBus) -> PointField<RecordingPointSurface> {
        PointField::mount(
            small_config(),
            bus,
            RecordingPointSurface::default(),
            Viewport::new(1280.0, 720.0),
        )
        .unwrap()
        .with_seed(7)
    }

    fn frames(field: &mut PointField<RecordingPointSurface>, n: u32) {
        for i in 0..n {
            field.render_frame(FrameTime::nth(i, 60.0)).unwrap();
        }
    }

    #[test]
    fn test_idle_field_follows_the_wave() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        frames(&mut field, 1);

        let grid = field.grid();
        for (ix, iy) in [(0, 0), (3, 2), (7, 5)] {
            let y = grid.position(grid.index(ix, iy))[1];
            assert_eq!(y, wave_height(ix, iy, 0.0));
        }
        assert_eq!(field.point_size(), 9.0);
        assert!((field.counter() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_pulse_tints_toward_accent() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        bus.publish(Signal::TypingPulse);
        frames(&mut field, 1);

        assert_eq!(field.activity().pulse.value(), 1.0);
        assert_eq!(field.grid().color(0), [0.0, 1.0, 1.0]);
        assert_eq!(field.point_size(), 12.0);
        assert_eq!(field.surface().last_colors[..3], [0.0, 1.0, 1.0]);

        frames(&mut field, 10);
        let [r, g, b] = field.grid().color(0);
        assert!(r > 0.0 && r < 1.0);
        assert_eq!((g, b), (1.0, 1.0));
    }

    #[test]
    fn test_error_overrides_pulse_and_shakes() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        bus.publish(Signal::TypingPulse);
        bus.publish(Signal::ErrorSpike);
        frames(&mut field, 1);

        assert_eq!(field.grid().color(5), [1.0, 0.0, 0.0]);
        let size = field.point_size();
        assert!((9.0..14.0).contains(&size));

        let grid = field.grid();
        let shaken = (0..grid.amount_x())
            .flat_map(|ix| (0..grid.amount_y()).map(move |iy| (ix, iy)))
            .any(|(ix, iy)| grid.position(grid.index(ix, iy))[1] != wave_height(ix, iy, 0.0));
        assert!(shaken);

        // Error keeps red dominance after the pulse has long decayed.
        frames(&mut field, 25);
        let [r, g, b] = field.grid().color(0);
        assert_eq!(r, 1.0);
        assert!(g > 0.0 && g < 1.0 && g == b);
    }

    #[test]
    fn test_error_drives_motion_over_pulse() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        bus.publish(Signal::TypingPulse);
        bus.publish(Signal::ErrorSpike);
        frames(&mut field, 1);

        // Pulse rule would give 0.1 + 0.3 = 0.4.
        assert!((field.counter() - 0.6).abs() < 1e-6);

        // Same seed: one jitter draw per point, then the size draw.
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..field.grid().len() {
            rng.gen::<f32>();
        }
        let expected = 9.0 + rng.gen::<f32>() * 5.0;
        assert_eq!(field.point_size(), expected);
        assert_eq!(field.surface().last_uniforms.unwrap().point_size, expected);
    }

    #[test]
    fn test_idle_settles_to_white_and_stops_uploading() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        frames(&mut field, 3);
        assert_eq!(field.stats().color_uploads, 1);

        bus.publish(Signal::TypingPulse);
        frames(&mut field, 25);

        // 20 active frames plus the one reset frame.
        assert_eq!(field.stats().color_uploads, 22);
        assert!(field.grid().is_base_color());
        assert!(field
            .surface()
            .last_colors
            .chunks_exact(3)
            .all(|c| c == BASE_COLOR.as_slice()));

        frames(&mut field, 30);
        assert_eq!(field.stats().color_uploads, 22);
        assert_eq!(field.surface().position_uploads, 58);
    }

    #[test]
    fn test_resize_applies_before_next_draw() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        frames(&mut field, 1);
        assert_eq!(field.surface().size, Some((1280, 720)));

        field.resize(Viewport::new(1000.0, 500.0).with_pixel_ratio(2.0));
        assert_eq!(field.surface().size, Some((1280, 720)));

        frames(&mut field, 1);
        assert_eq!(field.surface().size, Some((1500, 750)));
        assert_eq!(field.camera().aspect(), 2.0);
        let uniforms = field.surface().last_uniforms.unwrap();
        assert_eq!(uniforms.viewport, [1500.0, 750.0]);
        assert_eq!(uniforms.view_proj, field.camera().view_projection());
    }

    #[test]
    fn test_resize_before_surface_ready_is_deferred() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        field.surface_mut().not_ready = true;
        frames(&mut field, 2);

        assert_eq!(field.surface().size, None);
        assert_eq!(field.surface().draws, 2);

        field.surface_mut().not_ready = false;
        frames(&mut field, 1);
        assert_eq!(field.surface().size, Some((1280, 720)));
    }

    #[test]
    fn test_teardown_detaches_everything() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        assert_eq!(bus.listener_count(), 2);

        field.teardown();
        assert_eq!(bus.listener_count(), 0);
        assert!(!field.is_subscribed());
        assert!(field.surface().released);

        bus.publish(Signal::ErrorSpike);
        assert!(!field.activity().has_activity());
        assert!(matches!(
            field.render_frame(FrameTime::default()),
            Err(RenderError::Released)
        ));
    }

    #[test]
    fn test_chaos_speeds_up_the_wave() {
        let bus = LocalSignalBus::new();
        let mut busy = mount(&bus);
        bus.publish(Signal::ErrorSpike);
        frames(&mut busy, 1);

        let quiet_bus = LocalSignalBus::new();
        let mut quiet = mount(&quiet_bus);
        frames(&mut quiet, 1);

        assert!((busy.counter() - 0.6).abs() < 1e-6);
        assert!((quiet.counter() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bus = LocalSignalBus::new();
        let result = PointField::mount(
            PointFieldConfig::new(0, 4),
            &bus,
            RecordingPointSurface::default(),
            Viewport::new(10.0, 10.0),
        );
        assert!(matches!(result, Err(RenderError::InvalidConfig(_))));
        assert_eq!(bus.listener_count(), 0);
    }
}
