//! Signal Bundle
//!
//! The immutable record of client-measured attributes a browser agent
//! submits. Every field is optional on the wire; missing fields parse as
//! zero values, and the empty string / zero is the absent marker.
//!
//! Fields group into three stability tiers that drive feature weighting:
//! hardware (canvas, audio, WebGL, CPU, memory), environment (timezone,
//! languages, fonts, screen) and software (platform, user agent, plugins).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signals {
    // gpu / rendering
    pub canvas_2d_hash: String,
    pub canvas_winding: bool,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    pub webgl_extensions: Vec<String>,
    /// Free-form WebGL parameter map; stored opaquely, never interpreted
    pub webgl_params: serde_json::Map<String, serde_json::Value>,
    pub webgl_hash: String,

    // hardware dynamics
    pub audio_hash: String,
    pub audio_context_hash: String,
    pub hardware_concurrency: i32,
    pub device_memory: f64,
    pub color_depth: i32,
    pub pixel_ratio: f64,
    pub max_touch_points: i32,

    // screen / display
    pub screen_width: i32,
    pub screen_height: i32,
    pub avail_width: i32,
    pub avail_height: i32,
    pub color_gamut: String,
    pub hdr_capable: bool,

    // system environment
    pub timezone: String,
    pub timezone_offset: i32,
    pub languages: Vec<String>,
    pub platform: String,
    pub user_agent: String,
    pub vendor: String,
    pub fonts: Vec<String>,

    // bot detection
    pub webdriver: bool,
    pub chrome_present: bool,
    pub phantom_present: bool,
    pub headless_chrome: bool,
    pub selenium_present: bool,
    pub automation_present: bool,

    // advanced
    pub plugins: Vec<String>,
    pub media_devices: i32,
    pub battery_present: bool,
    pub permissions_hash: String,
    pub do_not_track: String,
}
