//! Signal Validation
//!
//! Sanitizes and validates an inbound signal bundle before it reaches the
//! engine. Validation failures short-circuit before any I/O.

use crate::domain::signals::Signals;
use crate::error::{IdentityError, IdentityResult};

/// Canvas digests that signal a blocked or broken canvas rather than a hash.
/// Accepted as-is; they are strong bot markers downstream.
const CANVAS_SENTINELS: [&str; 2] = ["error", "no_context"];

const MAX_USER_AGENT_LEN: usize = 1000;
const MAX_HARDWARE_CONCURRENCY: i32 = 256;

/// Strip NUL and other control bytes, keeping `\n` and `\t`
pub fn sanitize_string(s: &str) -> String {
    s.chars()
        .filter(|&c| !c.is_control() || c == '\n' || c == '\t')
        .collect()
}

fn sanitize_list(items: Vec<String>) -> Vec<String> {
    items.iter().map(|s| sanitize_string(s)).collect()
}

/// Sanitize every client-supplied string in the bundle
///
/// `webgl_params` is an opaque blob and passes through untouched.
pub fn sanitize_signals(mut signals: Signals) -> Signals {
    signals.canvas_2d_hash = sanitize_string(&signals.canvas_2d_hash);
    signals.webgl_vendor = sanitize_string(&signals.webgl_vendor);
    signals.webgl_renderer = sanitize_string(&signals.webgl_renderer);
    signals.webgl_extensions = sanitize_list(signals.webgl_extensions);
    signals.webgl_hash = sanitize_string(&signals.webgl_hash);
    signals.audio_hash = sanitize_string(&signals.audio_hash);
    signals.audio_context_hash = sanitize_string(&signals.audio_context_hash);
    signals.color_gamut = sanitize_string(&signals.color_gamut);
    signals.timezone = sanitize_string(&signals.timezone);
    signals.languages = sanitize_list(signals.languages);
    signals.platform = sanitize_string(&signals.platform);
    signals.user_agent = sanitize_string(&signals.user_agent);
    signals.vendor = sanitize_string(&signals.vendor);
    signals.fonts = sanitize_list(signals.fonts);
    signals.plugins = sanitize_list(signals.plugins);
    signals.permissions_hash = sanitize_string(&signals.permissions_hash);
    signals.do_not_track = sanitize_string(&signals.do_not_track);
    signals
}

fn is_hex_digest(s: &str) -> bool {
    (8..=128).contains(&s.len()) && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Sanitize and validate a signal bundle, returning the clean copy
pub fn validate_signals(signals: Signals) -> IdentityResult<Signals> {
    let signals = sanitize_signals(signals);

    if signals.canvas_2d_hash.is_empty() {
        return Err(IdentityError::InvalidSignal {
            field: "canvas_2d_hash",
            reason: "required",
        });
    }
    if !CANVAS_SENTINELS.contains(&signals.canvas_2d_hash.as_str())
        && !is_hex_digest(&signals.canvas_2d_hash)
    {
        return Err(IdentityError::InvalidSignal {
            field: "canvas_2d_hash",
            reason: "invalid format",
        });
    }

    if signals.audio_hash.is_empty() {
        return Err(IdentityError::InvalidSignal {
            field: "audio_hash",
            reason: "required",
        });
    }

    if !(0..=MAX_HARDWARE_CONCURRENCY).contains(&signals.hardware_concurrency) {
        return Err(IdentityError::InvalidSignal {
            field: "hardware_concurrency",
            reason: "out of range",
        });
    }

    if signals.user_agent.len() > MAX_USER_AGENT_LEN {
        return Err(IdentityError::InvalidSignal {
            field: "user_agent",
            reason: "too long",
        });
    }

    Ok(signals)
}
