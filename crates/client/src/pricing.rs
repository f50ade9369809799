//! Client-side video cost estimation.
//!
//! The table mirrors published Veo 3.1 pricing. It is only an estimate:
//! the `estimated_cost` / `actual_cost` returned by the API are
//! authoritative whenever present.

use serde_json::Value;

/// Durations (seconds) accepted by video generation.
pub const VIDEO_DURATIONS: [u32; 3] = [4, 6, 8];
pub const DEFAULT_VIDEO_DURATION: u32 = 8;

const COSTS_WITH_AUDIO: [(u32, f64); 3] = [(4, 2.40), (6, 3.60), (8, 4.80)];
const COSTS_NO_AUDIO: [(u32, f64); 3] = [(4, 1.20), (6, 1.80), (8, 2.40)];

/// Price in USD for a video of `duration` seconds.
///
/// Durations outside the table are priced as the default duration.
pub fn video_cost(duration: u32, with_audio: bool) -> f64 {
    let table = if with_audio {
        &COSTS_WITH_AUDIO
    } else {
        &COSTS_NO_AUDIO
    };
    let duration = clamp_duration(duration);
    table
        .iter()
        .find(|(d, _)| *d == duration)
        .map(|(_, cost)| *cost)
        .unwrap_or(table[table.len() - 1].1)
}

/// Format a price the way it is shown to users (`"1.80"`).
pub fn format_cost(cost: f64) -> String {
    format!("{:.2}", cost)
}

/// Invalid durations fall back to the default rather than being rejected.
pub fn clamp_duration(duration: u32) -> u32 {
    if VIDEO_DURATIONS.contains(&duration) {
        duration
    } else {
        DEFAULT_VIDEO_DURATION
    }
}

/// Read a duration argument. Anything that is not numerically 4, 6 or 8
/// (including strings and missing values) becomes the default.
pub fn duration_from_value(value: Option<&Value>) -> u32 {
    value
        .and_then(Value::as_f64)
        .and_then(|d| {
            VIDEO_DURATIONS
                .iter()
                .copied()
                .find(|allowed| f64::from(*allowed) == d)
        })
        .unwrap_or(DEFAULT_VIDEO_DURATION)
}

/// Human-readable pricing table appended to cost estimates.
pub fn pricing_table() -> String {
    let mut out = String::from("Pricing with audio:");
    for (d, cost) in COSTS_WITH_AUDIO {
        out.push_str(&format!("\n- {} seconds: ${}", d, format_cost(cost)));
    }
    out.push_str("\n\nPricing without audio:");
    for (d, cost) in COSTS_NO_AUDIO {
        out.push_str(&format!("\n- {} seconds: ${}", d, format_cost(cost)));
    }
    out
}
