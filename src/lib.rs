//! Glaze Field - ambient renderers that breathe with a terminal session
//!
//! Nothing here polls the terminal. The session's I/O path publishes
//! signals, and each renderer folds them into its own decaying state on the
//! next frame.
//!
//! # Core Types
//!
//! - **Signal**: payload-free `typing-pulse` / `error-spike` events
//! - **SignalBus**: fire-and-forget pub/sub carrying them
//! - **ActivityState**: per-renderer pulse/error intensities in [0, 1]
//! - **PointField** / **FluidField**: the two interchangeable renderers
//!
//! # Architecture: Tap / Bus / Renderer
//!
//! 1. **Tap** - sits on the PTY data path and turns keystrokes and
//!    error-looking output into signals
//! 2. **Bus** - delivers each signal to whoever is subscribed right now
//! 3. **Renderers** - drain their inbox once per frame, decay, then draw
//!
//! The two renderers never talk to each other and share no clock. Either can
//! be mounted, torn down or swapped at any time.
//!
//! # Example: Typing, then an Error
//!
//! ```rust
//! use glaze_field::{ActivityState, ActivityTap, Dominant, LocalSignalBus, Pending, SignalInbox};
//!
//! let bus = LocalSignalBus::new();
//! let inbox = SignalInbox::attach(&bus);
//! let tap = ActivityTap::new(bus.clone());
//!
//! // A keystroke goes in, the shell complains.
//! tap.on_user_input(b"l");
//! tap.on_process_output(b"zsh: command not found: sl\r\n");
//!
//! // Next frame: both intensities fire, the error wins.
//! let mut activity = ActivityState::default();
//! activity.advance(inbox.drain());
//! assert_eq!(activity.dominant(), Dominant::Error(1.0));
//!
//! // The pulse is gone after 20 quiet frames; the error lingers.
//! for _ in 0..20 {
//!     activity.advance(Pending::default());
//! }
//! assert_eq!(activity.pulse.value(), 0.0);
//! assert!(activity.error.is_active());
//! ```

mod activity;
mod bus;
mod camera;
mod config;
mod error;
mod fluid_field;
mod grid;
mod intensity;
mod observer;
mod point_field;
pub mod procedural;
mod scheduler;
mod surface;
mod theme;

#[cfg(feature = "gpu")]
pub mod gpu;

pub use activity::{looks_like_error, ActivityTap, ERROR_PATTERNS};
pub use bus::{LocalSignalBus, Pending, SignalBus, SignalInbox, Subscription};
pub use camera::{Camera, Mat4};
pub use config::{DecayConfig, FluidFieldConfig, PointFieldConfig};
pub use error::{RenderError, RenderResult};
pub use fluid_field::{FluidField, FluidUniforms};
pub use grid::{PointGrid, BASE_COLOR};
pub use intensity::{ActivityState, Dominant, GlitchDecay, Intensity, SmoothedSpeed, SNAP_EPSILON};
pub use observer::{ChannelObserver, FnObserver, Signal, SignalObserver};
pub use point_field::{wave_height, PointField, PointFieldStats, PointUniforms, FOG_FAR, FOG_NEAR};
pub use scheduler::{
    FixedRateScheduler, FrameClock, FrameLoop, FrameRequest, FrameTime, LoopStats,
    ManualScheduler, Renderer, Scheduler,
};
pub use surface::{FluidSurface, PointSurface, Viewport};
pub use theme::{Palette, Theme};
