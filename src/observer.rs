//! Activity signals and the observers that receive them.
//!
//! A signal carries no payload. It only says that something happened on the
//! terminal at the moment it was published: a unit of keystroke input, or an
//! output chunk that looked like an error. Observers decide what the event
//! means for them; the bus never stores or coalesces anything.

use std::fmt;
use std::sync::mpsc;

/// Kind of activity observed on the terminal session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// One discrete unit of user input.
    TypingPulse,
    /// Session output matched the error heuristic.
    ErrorSpike,
}

impl Signal {
    pub const ALL: [Signal; 2] = [Signal::TypingPulse, Signal::ErrorSpike];

    /// Wire name of the signal.
    pub fn name(self) -> &'static str {
        match self {
            Signal::TypingPulse => "typing-pulse",
            Signal::ErrorSpike => "error-spike",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Observer that receives activity signals.
///
/// Called synchronously from whatever context published the signal, possibly
/// while another delivery is still in progress. Implementations must not
/// assume they run on the render thread.
pub trait SignalObserver: Send + Sync {
    fn on_signal(&self, signal: Signal);
}

/// Function-based observer for simple cases
pub struct FnObserver<F: Fn(Signal) + Send + Sync>(pub F);

impl<F: Fn(Signal) + Send + Sync> SignalObserver for FnObserver<F> {
    fn on_signal(&self, signal: Signal) {
        (self.0)(signal);
    }
}

/// Channel-based observer - forwards signals to a channel
pub struct ChannelObserver {
    sender: mpsc::Sender<Signal>,
}

impl ChannelObserver {
    pub fn new(sender: mpsc::Sender<Signal>) -> Self {
        Self { sender }
    }
}

impl SignalObserver for ChannelObserver {
    fn on_signal(&self, signal: Signal) {
        // Receiver gone means the renderer was torn down.
        let _ = self.sender.send(signal);
    }
}
