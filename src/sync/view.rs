//! Seams between the sync engine and whatever renders the content.
//!
//! The engine never renders anything itself; it measures and drives the
//! embedding surface through these traits. All methods are synchronous and
//! cheap: implementations are expected to be thin bindings onto the host
//! UI's scroll container, router and animation player.

/// Geometry and scroll control of the student's rendered document.
pub trait DocumentView: Send + Sync {
    fn scroll_top(&self) -> f64;
    fn document_height(&self) -> f64;
    fn viewport_height(&self) -> f64;
    /// Height of any reserved header chrome above the content area.
    fn header_offset(&self) -> f64 {
        0.0
    }
    /// Jump (no animation) to an absolute offset.
    fn scroll_to(&self, offset: f64);
    /// Visually fix the viewport in place while the control lock is held.
    /// `content_offset` is the scroll offset with any reserved header space
    /// already compensated, ready to anchor the fixed content at.
    fn pin_viewport(&self, content_offset: f64);
    fn unpin_viewport(&self);
    /// Path of the document currently shown locally.
    fn current_path(&self) -> String;
}

/// Collaborator capable of changing the current document view. Follow-mode
/// navigations carry a marker so the target UI suppresses its own controls.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str, follow_mode: bool);
}

/// Collaborator driving embedded animations on the student side.
pub trait AnimationDriver: Send + Sync {
    fn seek(&self, animation_id: &str, step: i32);
    fn set_playing(&self, animation_id: &str, playing: bool);
}
