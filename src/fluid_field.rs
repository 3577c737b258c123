//! Continuous fluid-field renderer (host side).
//!
//! The look itself is computed per pixel by `shaders/fluid.wgsl`. This side
//! only owns the uniform block: it turns signals into a smoothed typing speed
//! and a decaying glitch, and writes them through once per frame. The block
//! is created at mount and updated in place, never reallocated.

use crate::bus::{SignalBus, SignalInbox};
use crate::config::FluidFieldConfig;
use crate::error::{RenderError, RenderResult};
use crate::intensity::{GlitchDecay, SmoothedSpeed};
use crate::scheduler::{FrameTime, Renderer};
use crate::surface::{FluidSurface, Viewport};
use crate::theme::Palette;
use bytemuck::{Pod, Zeroable};

/// Uniform block of the fluid shader, matching `FluidUniforms` in `fluid.wgsl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FluidUniforms {
    pub time: f32,
    pub typing_speed: f32,
    /// Weight of the intense color, see [`SmoothedSpeed::color_intensity`].
    pub intensity: f32,
    pub glitch_intensity: f32,
    /// Logical viewport size.
    pub resolution: [f32; 2],
    pub glitch_time: f32,
    pub tint_opacity: f32,
    pub color1: [f32; 3],
    pub _pad0: f32,
    pub color2: [f32; 3],
    pub _pad1: f32,
    pub color3: [f32; 3],
    pub _pad2: f32,
    pub intense_color: [f32; 3],
    pub _pad3: f32,
}

impl FluidUniforms {
    /// Zeroed block carrying `palette`'s colors and tint.
    pub fn new(palette: &Palette) -> Self {
        let mut uniforms = Self::default();
        uniforms.set_palette(palette);
        uniforms
    }

    /// Copy `palette`'s colors and tint into the block.
    pub fn set_palette(&mut self, palette: &Palette) {
        self.color1 = palette.color1;
        self.color2 = palette.color2;
        self.color3 = palette.color3;
        self.intense_color = palette.intense_color;
        self.tint_opacity = palette.opacity;
    }
}

pub struct FluidField<S: FluidSurface> {
    config: FluidFieldConfig,
    uniforms: FluidUniforms,
    speed: SmoothedSpeed,
    glitch: GlitchDecay,
    inbox: Option<SignalInbox>,
    surface: S,
    viewport: Viewport,
    pending_viewport: Option<Viewport>,
    frames: u64,
}

impl<S: FluidSurface> FluidField<S> {
    /// Validate, subscribe to `bus` and size the field for `viewport`.
    pub fn mount<B: SignalBus + ?Sized>(
        config: FluidFieldConfig,
        palette: &Palette,
        bus: &B,
        surface: S,
        viewport: Viewport,
    ) -> RenderResult<Self> {
        config.validate().map_err(RenderError::InvalidConfig)?;
        palette.validate().map_err(RenderError::InvalidConfig)?;
        tracing::debug!("fluid field mounted");

        Ok(Self {
            uniforms: FluidUniforms::new(palette),
            speed: SmoothedSpeed::new(&config),
            glitch: GlitchDecay::new(&config),
            config,
            inbox: Some(SignalInbox::attach(bus)),
            surface,
            viewport,
            pending_viewport: Some(viewport),
            frames: 0,
        })
    }

    /// Swap theme colors without touching animation state.
    pub fn set_palette(&mut self, palette: &Palette) {
        self.uniforms.set_palette(palette);
    }

    /// The uniform block as written by the last frame.
    pub fn uniforms(&self) -> &FluidUniforms {
        &self.uniforms
    }

    /// Smoothed typing speed.
    pub fn speed(&self) -> &SmoothedSpeed {
        &self.speed
    }

    /// Glitch strength and clock.
    pub fn glitch(&self) -> &GlitchDecay {
        &self.glitch
    }

    /// Last viewport applied to the surface.
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

    /// Frames rendered since mount.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// False once torn down.
    pub fn is_subscribed(&self) -> bool {
        self.inbox.is_some()
    }

    fn apply_viewport(&mut self) {
        let Some(viewport) = self.pending_viewport else {
            return;
        };
        let (width, height) = viewport.backing_size(self.config.pixel_ratio);
        match self.surface.resize(width, height) {
            Ok(()) => {
                self.uniforms.resolution = [viewport.width, viewport.height];
                self.viewport = viewport;
                self.pending_viewport = None;
                tracing::debug!(width, height, "fluid field resized");
            }
            Err(err) => tracing::warn!(error = %err, "resize deferred"),
        }
    }
}

impl<S: FluidSurface> Renderer for FluidField<S> {
    fn render_frame(&mut self, time: FrameTime) -> RenderResult<()> {
        self.apply_viewport();

        let pending = self
            .inbox
            .as_ref()
            .map(SignalInbox::drain)
            .unwrap_or_default();

        if pending.pulses > 0 {
            self.speed.pulse(time.elapsed);
        }
        self.speed.advance(time.elapsed, time.delta);

        // Recover first so a fresh spike renders at full strength.
        self.glitch.advance(time.delta);
        if pending.spikes > 0 {
            self.glitch.spike();
        }

        let uniforms = &mut self.uniforms;
        uniforms.time = time.elapsed;
        uniforms.typing_speed = self.speed.value();
        uniforms.intensity = self.speed.color_intensity();
        uniforms.glitch_intensity = self.glitch.intensity();
        uniforms.glitch_time = self.glitch.clock();

        self.frames += 1;
        self.surface.write_uniforms(&self.uniforms)?;
        self.surface.draw()
    }

    fn resize(&mut self, viewport: Viewport) {
        self.pending_viewport = Some(viewport);
    }

    fn teardown(&mut self) {
        if let Some(inbox) = self.inbox.take() {
            inbox.detach();
        }
        self.surface.release();
        tracing::debug!(frames = self.frames, "fluid field torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::LocalSignalBus;
    use crate::observer::Signal;
    use crate::scheduler::{FrameLoop, ManualScheduler};
    use crate::surface::recording::RecordingFluidSurface;
    use crate::theme::Theme;

    fn mount(bus: &LocalSignalBus) -> FluidField<RecordingFluidSurface> {
        FluidField::mount(
            FluidFieldConfig::default(),
            &Theme::PURE_NIGHT.palette,
            bus,
            RecordingFluidSurface::default(),
            Viewport::new(1200.0, 800.0),
        )
        .unwrap()
    }

    fn run(field: &mut FluidField<RecordingFluidSurface>, from: u32, n: u32) {
        for i in from..from + n {
            field.render_frame(FrameTime::nth(i, 60.0)).unwrap();
        }
    }

    #[test]
    fn test_uniform_layout() {
        assert_eq!(std::mem::size_of::<FluidUniforms>(), 96);
        assert_eq!(std::mem::size_of::<FluidUniforms>() % 16, 0);
    }

    #[test]
    fn test_first_frame_uniforms() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        field.render_frame(FrameTime::new(2.5, 1.0 / 60.0)).unwrap();

        let uniforms = field.surface().last_uniforms.unwrap();
        assert_eq!(uniforms.time, 2.5);
        assert_eq!(uniforms.resolution, [1200.0, 800.0]);
        assert_eq!(uniforms.color2, Theme::PURE_NIGHT.palette.color2);
        assert_eq!(uniforms.tint_opacity, 0.3);
        assert_eq!(uniforms.typing_speed, 0.0);
        assert_eq!(uniforms.glitch_intensity, 0.0);
        assert_eq!(field.surface().size, Some((600, 400)));
    }

    #[test]
    fn test_typing_raises_speed_then_color() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);

        bus.publish(Signal::TypingPulse);
        run(&mut field, 0, 1);
        let first = field.uniforms().typing_speed;
        assert!(first > 0.0);
        assert_eq!(field.uniforms().intensity, 0.0);

        // Sustained typing drives the speed past the color threshold.
        for i in 1..90 {
            if i % 4 == 0 {
                bus.publish(Signal::TypingPulse);
            }
            run(&mut field, i, 1);
        }
        assert!(field.uniforms().typing_speed > 0.9);
        assert!(field.uniforms().intensity > 0.8);

        // Stop typing: the speed falls, but slowly.
        run(&mut field, 90, 30);
        let after = field.uniforms().typing_speed;
        assert!(after < 1.0 && after > 0.6);
    }

    #[test]
    fn test_glitch_spikes_and_recovers() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        run(&mut field, 0, 2);

        bus.publish(Signal::ErrorSpike);
        run(&mut field, 2, 1);
        assert_eq!(field.uniforms().glitch_intensity, 1.0);

        run(&mut field, 3, 1);
        let clock = field.uniforms().glitch_time;
        assert!(clock > 0.0);
        assert!(field.uniforms().glitch_intensity < 1.0);

        run(&mut field, 4, 200);
        assert_eq!(field.uniforms().glitch_intensity, 0.0);
        // The glitch clock freezes once the glitch has settled.
        let settled = field.uniforms().glitch_time;
        run(&mut field, 204, 5);
        assert_eq!(field.uniforms().glitch_time, settled);
    }

    #[test]
    fn test_resize_updates_resolution_next_frame() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        run(&mut field, 0, 1);

        field.resize(Viewport::new(1920.0, 1080.0).with_pixel_ratio(2.0));
        assert_eq!(field.uniforms().resolution, [1200.0, 800.0]);

        run(&mut field, 1, 1);
        let uniforms = field.surface().last_uniforms.unwrap();
        assert_eq!(uniforms.resolution, [1920.0, 1080.0]);
        assert_eq!(field.surface().size, Some((960, 540)));
    }

    #[test]
    fn test_palette_swap_keeps_motion() {
        let bus = LocalSignalBus::new();
        let mut field = mount(&bus);
        bus.publish(Signal::TypingPulse);
        run(&mut field, 0, 5);
        let speed = field.uniforms().typing_speed;

        field.set_palette(&Theme::NEBULA.palette);
        assert_eq!(field.uniforms().intense_color, [0.1, 0.3, 0.5]);
        assert_eq!(field.uniforms().typing_speed, speed);
    }

    #[test]
    fn test_teardown_stops_frames_and_signals() {
        let bus = LocalSignalBus::new();
        let spy = ManualScheduler::new();
        let mut frame_loop = FrameLoop::mount(mount(&bus), spy.clone());

        for i in 0..5 {
            let request = spy.take_due().unwrap();
            frame_loop.run_frame(request, FrameTime::nth(i, 60.0));
        }
        assert_eq!(frame_loop.renderer().frames(), 5);

        frame_loop.unmount();
        let requested = spy.requested();
        assert_eq!(bus.listener_count(), 0);
        assert!(frame_loop.renderer().surface().released);

        bus.publish(Signal::ErrorSpike);
        assert!(spy.take_due().is_none());
        assert_eq!(spy.requested(), requested);
        assert_eq!(frame_loop.renderer().glitch().intensity(), 0.0);
        assert_eq!(frame_loop.renderer().frames(), 5);
    }

    #[test]
    fn test_failed_draw_is_skipped_by_loop() {
        let bus = LocalSignalBus::new();
        let spy = ManualScheduler::new();
        let mut frame_loop = FrameLoop::mount(mount(&bus), spy.clone());
        frame_loop.renderer_mut().surface_mut().fail_draws = true;

        for i in 0..3 {
            let request = spy.take_due().unwrap();
            frame_loop.run_frame(request, FrameTime::nth(i, 60.0));
        }
        assert_eq!(frame_loop.stats().skipped, 3);
        assert!(frame_loop.pending().is_some());
    }
}
