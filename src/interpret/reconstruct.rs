//! The contract an error type signs to be rebuilt with a new message.

use regex::Regex;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::fmt::Display;
use std::sync::OnceLock;

/// An error that can be rebuilt, as the same type, around a new message.
///
/// `reconstruct` must keep everything except the message: the enum variant,
/// any extra fields, and any captured backtrace. Which field holds the message
/// is the implementor's call.
pub trait Reconstruct: Display + Sized {
    /// Rebuild this error with `message` as its message.
    fn reconstruct(self, message: String) -> Self;

    /// Frames leading to this error, outermost first. Empty if none were captured.
    fn traceback(&self) -> Vec<String> {
        Vec::new()
    }
}

impl Reconstruct for anyhow::Error {
    fn reconstruct(self, message: String) -> Self {
        self.context(message)
    }

    fn traceback(&self) -> Vec<String> {
        backtrace_lines(self.backtrace())
    }
}

/// Render a captured backtrace as one line per frame, outermost first.
pub fn backtrace_lines(backtrace: &Backtrace) -> Vec<String> {
    if backtrace.status() != BacktraceStatus::Captured {
        return Vec::new();
    }
    parse_backtrace(&backtrace.to_string())
}

fn frame_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*\d+:\s+(.+)$").expect("Invalid regex"))
}

fn location_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s+at\s+(.+)$").expect("Invalid regex"))
}

/// Frames that belong to capturing the backtrace or converting the error,
/// rather than to the code that failed.
fn is_capture_frame(symbol: &str) -> bool {
    let symbol = symbol.trim_start_matches('<');
    symbol.starts_with("std::backtrace")
        || symbol.starts_with("core::result::")
        || symbol.starts_with("core::ops::function::")
        || symbol.starts_with("core::convert::")
        || symbol.contains("anyhow::")
}

/// Parse std's backtrace rendering (innermost frame first) into frame lines,
/// dropping the capture frames above the failure.
fn parse_backtrace(text: &str) -> Vec<String> {
    let mut frames: Vec<(String, Option<String>)> = Vec::new();

    for line in text.lines() {
        if let Some(caps) = frame_pattern().captures(line) {
            frames.push((caps[1].trim().to_string(), None));
        } else if let Some(caps) = location_pattern().captures(line) {
            if let Some((_, location)) = frames.last_mut() {
                *location = Some(caps[1].trim().to_string());
            }
        }
    }

    let mut lines: Vec<String> = frames
        .into_iter()
        .skip_while(|(symbol, _)| is_capture_frame(symbol))
        .map(|(symbol, location)| match location {
            Some(location) => format!("{} in {}", location, symbol),
            None => symbol,
        })
        .collect();
    lines.reverse();
    lines
}
