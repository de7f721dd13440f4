//! Bot Detection
//!
//! A pure predicate over the signal bundle. The verdict is recorded next to
//! each identification; it never alters matching or creation.

use crate::domain::signals::Signals;

/// WebGL vendor reported by Mesa software rendering
const SOFTWARE_GL_VENDOR: &str = "Brian Paul";
/// WebGL renderer reported by SwiftShader
const SOFTWARE_GL_RENDERER: &str = "Google SwiftShader";

/// Check for bot / headless browser indicators
pub fn detect_bot(signals: &Signals) -> bool {
    // Automation flags the agent found on the page
    if signals.webdriver
        || signals.phantom_present
        || signals.selenium_present
        || signals.automation_present
        || signals.headless_chrome
    {
        return true;
    }

    // Missing critical hardware signals (common in headless)
    if signals.canvas_2d_hash.is_empty()
        || signals.canvas_2d_hash == "error"
        || signals.audio_hash.is_empty()
        || signals.audio_hash == "error"
    {
        return true;
    }

    // Impossible hardware combinations
    if signals.hardware_concurrency == 0 || signals.device_memory == 0.0 {
        return true;
    }

    // Software-rendered WebGL signatures
    if signals.webgl_vendor == SOFTWARE_GL_VENDOR || signals.webgl_renderer == SOFTWARE_GL_RENDERER
    {
        return true;
    }

    false
}
