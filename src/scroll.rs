//! Scroll-position normalization.
//!
//! The wire value is a percentage of scrollable distance, not a pixel
//! offset, so the same value lands at a proportionally equivalent spot on
//! viewports of different heights. Deltas below a small threshold are
//! ignored to avoid jitter from float noise and fighting the user's own
//! scroll momentum.

/// Minimum change, in percentage points, before a student view follows.
pub const SCROLL_EPSILON_PERCENT: f64 = 0.3;

/// Percentage of scrollable distance for a pixel offset, clamped to
/// [0,100]. A document shorter than its viewport has no scrollable
/// distance and always reads as 0.
pub fn percent_from_offset(scroll_top: f64, document_height: f64, viewport_height: f64) -> f64 {
    let scrollable = document_height - viewport_height;
    if scrollable <= 0.0 {
        return 0.0;
    }
    (scroll_top / scrollable * 100.0).clamp(0.0, 100.0)
}

/// Pixel offset in the local document for a wire percentage.
pub fn offset_from_percent(percent: f64, document_height: f64, viewport_height: f64) -> f64 {
    let scrollable = document_height - viewport_height;
    if scrollable <= 0.0 {
        return 0.0;
    }
    (percent.clamp(0.0, 100.0) / 100.0) * scrollable
}

pub fn exceeds_threshold(previous: f64, incoming: f64) -> bool {
    (incoming - previous).abs() > SCROLL_EPSILON_PERCENT
}
