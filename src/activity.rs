//! Activity tap - the terminal side of the signal contract.
//!
//! Sits on the PTY data path like any other pass-through layer: input and
//! output flow through unchanged, and the tap publishes a `typing-pulse` per
//! unit of user input and an `error-spike` per output chunk that looks like a
//! failure. Renderers never see the bytes, only the signals.

use crate::bus::SignalBus;
use crate::observer::Signal;
use regex::Regex;
use std::sync::OnceLock;

/// Words that mark an output chunk as an error, matched case-insensitively.
pub const ERROR_PATTERNS: [&str; 9] = [
    "error",
    "fatal",
    "fail",
    "denied",
    "not found",
    "command not found",
    "unknown command",
    "unknown",
    "panic",
];

fn error_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let alternation = ERROR_PATTERNS
            .iter()
            .map(|p| regex::escape(p))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("(?i){alternation}")).expect("error pattern is a valid regex")
    })
}

/// True when a chunk of session output matches the error heuristic.
pub fn looks_like_error(chunk: &str) -> bool {
    error_regex().is_match(chunk)
}

/// Pass-through tap publishing activity signals onto a bus.
pub struct ActivityTap<B: SignalBus> {
    bus: B,
}

impl<B: SignalBus> ActivityTap<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// User input heading to the shell. Each non-empty write is one unit.
    pub fn on_user_input<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        if !data.is_empty() {
            self.bus.publish(Signal::TypingPulse);
        }
        data
    }

    /// Output heading to the terminal. At most one spike per chunk.
    pub fn on_process_output<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        if !data.is_empty() && looks_like_error(&String::from_utf8_lossy(data)) {
            tracing::debug!(bytes = data.len(), "error-like output");
            self.bus.publish(Signal::ErrorSpike);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{LocalSignalBus, SignalInbox};

    #[test]
    fn test_error_heuristic() {
        assert!(looks_like_error("zsh: command not found: sl"));
        assert!(looks_like_error("FATAL: role does not exist"));
        assert!(looks_like_error("thread 'main' panicked at src/main.rs"));
        assert!(looks_like_error("Permission Denied"));
        assert!(looks_like_error("test result: FAILED"));
        assert!(!looks_like_error("Compiling glaze-field v0.1.0"));
        assert!(!looks_like_error(""));
    }

    #[test]
    fn test_tap_passes_data_through() {
        let bus = LocalSignalBus::new();
        let inbox = SignalInbox::attach(&bus);
        let tap = ActivityTap::new(bus);

        assert_eq!(tap.on_user_input(b"l"), b"l");
        assert_eq!(tap.on_user_input(b"s"), b"s");
        assert_eq!(tap.on_user_input(b""), b"");
        assert_eq!(tap.on_process_output(b"total 0\r\n"), b"total 0\r\n");

        let pending = inbox.drain();
        assert_eq!(pending.pulses, 2);
        assert_eq!(pending.spikes, 0);
    }

    #[test]
    fn test_one_spike_per_chunk() {
        let bus = LocalSignalBus::new();
        let inbox = SignalInbox::attach(&bus);
        let tap = ActivityTap::new(bus);

        tap.on_process_output(b"error: unknown command; fatal panic\r\n");
        assert_eq!(inbox.drain().spikes, 1);

        tap.on_process_output(&[0xff, 0xfe, b'E', b'R', b'R', b'O', b'R']);
        assert_eq!(inbox.drain().spikes, 1);
    }
}
