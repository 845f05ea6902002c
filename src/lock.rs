//! The control lock gating a student's local input.
//!
//! The lock is derived strictly from the session's `studentCanControl`
//! field: a stale local flag must never outlive a session, so the engine
//! resets the lock whenever it returns to Idle. Engaging captures the
//! current scroll offset and pins the viewport; releasing restores that
//! exact offset on the next render frame, which hides the layout reflow
//! caused by removing the pin.

use tracing::debug;

use crate::sync::view::DocumentView;

/// Kinds of local input the lock can suppress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Wheel,
    Touch,
    PagingKey,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LockState {
    Unlocked,
    Locked { captured_offset: f64 },
}

/// Outcome of applying a session's control flag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LockTransition {
    /// Flag unchanged; nothing to do (same-value deltas are no-ops).
    Unchanged,
    Engaged,
    /// Lock released; caller must scroll back to the returned offset on the
    /// next render frame, after the unpin reflow has settled.
    Released { restore_offset: f64 },
}

pub struct ControlLock {
    state: LockState,
}

impl ControlLock {
    pub fn new() -> Self {
        ControlLock {
            state: LockState::Unlocked,
        }
    }

    /// Whether the "engaged" indicator should be shown.
    pub fn engaged(&self) -> bool {
        matches!(self.state, LockState::Locked { .. })
    }

    /// Consulted by the input layer before letting an event through.
    pub fn allows(&self, _input: InputKind) -> bool {
        !self.engaged()
    }

    /// Drive the lock from the session field. `can_control = false` means
    /// locked. Idempotent: re-applying the current value changes nothing,
    /// in particular the captured offset survives repeated lock deltas.
    pub fn apply(&mut self, can_control: bool, view: &dyn DocumentView) -> LockTransition {
        match (self.state, can_control) {
            (LockState::Unlocked, false) => {
                let captured_offset = view.scroll_top();
                // The pin anchors the content visually; reserved header
                // space sits above the content area and must not be pinned
                // over, so it is subtracted from the anchor.
                view.pin_viewport((captured_offset - view.header_offset()).max(0.0));
                self.state = LockState::Locked { captured_offset };
                debug!("Control lock engaged at offset {}", captured_offset);
                LockTransition::Engaged
            }
            (LockState::Locked { captured_offset }, true) => {
                view.unpin_viewport();
                self.state = LockState::Unlocked;
                debug!("Control lock released, restoring offset {}", captured_offset);
                LockTransition::Released {
                    restore_offset: captured_offset,
                }
            }
            _ => LockTransition::Unchanged,
        }
    }

    /// Drop any held state without touching the view. Used on session
    /// teardown, where the pin has already been released or no longer
    /// matters.
    pub fn reset(&mut self) {
        self.state = LockState::Unlocked;
    }

    /// Release the pin as part of teardown, restoring nothing: the student
    /// keeps whatever offset the session left them at.
    pub fn release_for_teardown(&mut self, view: &dyn DocumentView) {
        if self.engaged() {
            view.unpin_viewport();
        }
        self.state = LockState::Unlocked;
    }
}

impl Default for ControlLock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// View whose scroll offset can drift while locked, simulating layout
    /// shifts under the pin.
    struct ShiftyView {
        scroll_top: Mutex<f64>,
        header: f64,
        pins: Mutex<Vec<f64>>,
        unpins: AtomicUsize,
    }

    impl ShiftyView {
        fn at(offset: f64) -> Self {
            Self::with_header(offset, 0.0)
        }

        fn with_header(offset: f64, header: f64) -> Self {
            ShiftyView {
                scroll_top: Mutex::new(offset),
                header,
                pins: Mutex::new(Vec::new()),
                unpins: AtomicUsize::new(0),
            }
        }

        fn pin_count(&self) -> usize {
            self.pins.lock().unwrap().len()
        }
    }

    impl DocumentView for ShiftyView {
        fn scroll_top(&self) -> f64 {
            *self.scroll_top.lock().unwrap()
        }
        fn document_height(&self) -> f64 {
            2000.0
        }
        fn viewport_height(&self) -> f64 {
            800.0
        }
        fn header_offset(&self) -> f64 {
            self.header
        }
        fn scroll_to(&self, offset: f64) {
            *self.scroll_top.lock().unwrap() = offset;
        }
        fn pin_viewport(&self, content_offset: f64) {
            self.pins.lock().unwrap().push(content_offset);
        }
        fn unpin_viewport(&self) {
            self.unpins.fetch_add(1, Ordering::SeqCst);
        }
        fn current_path(&self) -> String {
            "/docs/cells".into()
        }
    }

    #[test]
    fn release_restores_the_offset_captured_on_engage() {
        let view = ShiftyView::at(420.0);
        let mut lock = ControlLock::new();

        assert_eq!(lock.apply(false, &view), LockTransition::Engaged);
        // Layout shifts while locked.
        view.scroll_to(999.0);

        match lock.apply(true, &view) {
            LockTransition::Released { restore_offset } => assert_eq!(restore_offset, 420.0),
            other => panic!("expected release, got {:?}", other),
        }
    }

    #[test]
    fn repeated_values_are_no_ops() {
        let view = ShiftyView::at(100.0);
        let mut lock = ControlLock::new();

        assert_eq!(lock.apply(true, &view), LockTransition::Unchanged);
        assert_eq!(lock.apply(false, &view), LockTransition::Engaged);
        view.scroll_to(500.0);
        // A second identical delta must not re-capture the offset.
        assert_eq!(lock.apply(false, &view), LockTransition::Unchanged);
        assert_eq!(
            lock.apply(true, &view),
            LockTransition::Released {
                restore_offset: 100.0
            }
        );
        assert_eq!(view.pin_count(), 1);
        assert_eq!(view.unpins.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn pin_anchor_compensates_reserved_header_space() {
        let view = ShiftyView::with_header(420.0, 64.0);
        let mut lock = ControlLock::new();

        lock.apply(false, &view);
        // The anchor excludes the header band above the content area.
        assert_eq!(view.pins.lock().unwrap().as_slice(), &[420.0 - 64.0]);

        view.scroll_to(777.0);
        // The restore target is the real scroll offset, not the anchor.
        assert_eq!(
            lock.apply(true, &view),
            LockTransition::Released {
                restore_offset: 420.0
            }
        );
    }

    #[test]
    fn pin_anchor_never_goes_negative_near_the_top() {
        let view = ShiftyView::with_header(20.0, 64.0);
        let mut lock = ControlLock::new();
        lock.apply(false, &view);
        assert_eq!(view.pins.lock().unwrap().as_slice(), &[0.0]);
    }

    #[test]
    fn lock_suppresses_wheel_and_paging_keys() {
        let view = ShiftyView::at(0.0);
        let mut lock = ControlLock::new();
        assert!(lock.allows(InputKind::Wheel));
        lock.apply(false, &view);
        assert!(!lock.allows(InputKind::Wheel));
        assert!(!lock.allows(InputKind::PagingKey));
        assert!(!lock.allows(InputKind::Touch));
        lock.apply(true, &view);
        assert!(lock.allows(InputKind::PagingKey));
    }

    #[test]
    fn teardown_releases_pin_without_restoring() {
        let view = ShiftyView::at(250.0);
        let mut lock = ControlLock::new();
        lock.apply(false, &view);
        view.scroll_to(600.0);
        lock.release_for_teardown(&view);
        assert!(!lock.engaged());
        assert_eq!(view.unpins.load(Ordering::SeqCst), 1);
        // Offset untouched by teardown.
        assert_eq!(view.scroll_top(), 600.0);
    }
}
