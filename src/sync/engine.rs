//! Student-side reconciliation of the teacher's published state.
//!
//! The engine is a two-state machine. Idle: no live session observed.
//! Joined: a session is being followed, and every incoming record is
//! diffed against the last applied snapshot, each field applied
//! idempotently and independently of the others. Observations arrive from
//! both the store's change feed and a 200 ms follow poll; heartbeat
//! bookkeeping runs on its own 2000 ms cadence. Observing the same record
//! twice must change nothing, because the backend promises neither
//! ordering nor exactly-once delivery.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::highlight::{ContentSurface, HighlightResolver};
use crate::identity::StudentIdentity;
use crate::lock::{ControlLock, LockTransition};
use crate::models::{Participant, Session, UiEvent};
use crate::presence::{self, HEARTBEAT_INTERVAL_MS, POLL_INTERVAL_MS};
use crate::scroll;
use crate::store::SessionStore;
use crate::sync::view::{AnimationDriver, DocumentView, Navigator};

const EVENT_CHANNEL_CAPACITY: usize = 64;

enum EngineState {
    Idle,
    Joined { last: Session },
}

pub struct SyncEngine {
    store: Arc<dyn SessionStore>,
    identity: StudentIdentity,
    view: Arc<dyn DocumentView>,
    navigator: Arc<dyn Navigator>,
    animations: Arc<dyn AnimationDriver>,
    surface: Arc<dyn ContentSurface>,
    events: broadcast::Sender<UiEvent>,
    lock: ControlLock,
    highlighter: HighlightResolver,
    state: EngineState,
    /// Document-visibility flag supplied by the embedding UI.
    visible: bool,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn SessionStore>,
        identity: StudentIdentity,
        view: Arc<dyn DocumentView>,
        navigator: Arc<dyn Navigator>,
        animations: Arc<dyn AnimationDriver>,
        surface: Arc<dyn ContentSurface>,
    ) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        SyncEngine {
            store,
            identity,
            view,
            navigator,
            animations,
            surface,
            events,
            lock: ControlLock::new(),
            highlighter: HighlightResolver::new(),
            state: EngineState::Idle,
            visible: true,
        }
    }

    /// Typed notifications for UI modules not wired to the engine.
    pub fn subscribe_events(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    /// The input layer consults this before letting wheel/touch/key events
    /// through; it also drives the "engaged" indicator.
    pub fn lock(&self) -> &ControlLock {
        &self.lock
    }

    pub fn joined_session_id(&self) -> Option<&str> {
        match &self.state {
            EngineState::Joined { last } => Some(&last.id),
            EngineState::Idle => None,
        }
    }

    /// Foreground/background flag, reported on the next presence tick.
    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Apply one observation of the store. This is the whole state
    /// machine; the run loop and the tests drive it the same way.
    pub async fn observe(&mut self, record: Option<Session>) {
        let live = record.filter(|s| presence::is_live(s, Utc::now()));
        let followed = match &self.state {
            EngineState::Joined { last } => Some(last.clone()),
            EngineState::Idle => None,
        };
        match (followed, live) {
            (None, Some(session)) => self.join(session).await,
            (None, None) => {}
            (Some(previous), Some(session)) => {
                if previous.id != session.id {
                    // A different broadcast replaced the one we followed.
                    self.teardown();
                    self.join(session).await;
                } else {
                    self.apply_delta(&session, Some(&previous));
                    self.state = EngineState::Joined { last: session };
                }
            }
            (Some(_), None) => self.teardown(),
        }
    }

    /// Read the store and apply what it holds. One follow-poll tick.
    pub async fn poll_once(&mut self) {
        match self.store.read_active().await {
            Ok(record) => self.observe(record).await,
            Err(e) => {
                // Next tick retries; the view just falls behind briefly.
                warn!("Follow poll failed: {}", e);
            }
        }
    }

    /// Explicit exit: best-effort departure note, then local teardown.
    pub async fn leave(&mut self) {
        let Some(session_id) = self.joined_session_id().map(str::to_string) else {
            return;
        };
        self.write_departure(&session_id).await;
        self.teardown();
    }

    /// Drive the follow poll, the change feed and presence bookkeeping
    /// until cancelled. The three cadences are independent.
    pub async fn run(mut self, token: CancellationToken) {
        let mut feed = self.store.subscribe();
        let mut poll = tokio::time::interval(Duration::from_millis(POLL_INTERVAL_MS));
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut presence_ticks =
            tokio::time::interval(Duration::from_millis(HEARTBEAT_INTERVAL_MS));
        presence_ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    self.leave().await;
                    return;
                }
                _ = poll.tick() => self.poll_once().await,
                _ = presence_ticks.tick() => self.presence_tick().await,
                pushed = feed.recv() => match pushed {
                    Ok(record) => self.observe(record).await,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed notifications are recovered by re-reading.
                        debug!("Change feed lagged by {}, re-reading", skipped);
                        self.poll_once().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        // Store went away; the poll keeps observing "none".
                        feed = self.store.subscribe();
                        tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
                    }
                },
            }
        }
    }

    /// One presence tick: refresh our participant entry while joined. The
    /// joined session id rides along so a record from a replacing
    /// broadcast is never written to before we have joined it.
    pub async fn presence_tick(&self) {
        if let EngineState::Joined { last } = &self.state {
            presence::touch_student(
                &self.store,
                &last.id,
                &self.identity.id,
                &self.identity.name,
                self.visible,
            )
            .await;
        }
    }

    async fn join(&mut self, session: Session) {
        info!(
            "Joining session {} ({} / {})",
            session.id, session.teacher_name, session.class_name
        );
        self.register_participant(&session).await;
        // The lock never carries over from a previous session.
        self.lock.reset();
        self.apply_delta(&session, None);
        let _ = self.events.send(UiEvent::SessionJoined {
            session_id: session.id.clone(),
        });
        self.state = EngineState::Joined { last: session };
    }

    /// Read-modify-write our own entry into `connectedStudents`. A rejoin
    /// to the same session updates the existing entry in place. Losing
    /// this write to a race is tolerated; the presence tick re-inserts.
    async fn register_participant(&self, session: &Session) {
        let mut record = match self.store.read_active().await {
            Ok(Some(r)) if r.id == session.id => r,
            Ok(_) => return,
            Err(e) => {
                warn!("Participant registration read failed: {}", e);
                return;
            }
        };
        match record.participant_mut(&self.identity.id) {
            Some(participant) => participant.touch(self.visible),
            None => record.connected_students.push(Participant::join(
                self.identity.id.clone(),
                self.identity.name.clone(),
            )),
        }
        if let Err(e) = self.store.write(&record).await {
            warn!("Participant registration write failed: {}", e);
        }
    }

    /// Diff `incoming` against the previous snapshot (None on first join)
    /// and apply each changed field. Fields are deliberately independent:
    /// a degenerate value in one must not keep the others from applying.
    fn apply_delta(&mut self, incoming: &Session, previous: Option<&Session>) {
        self.apply_navigation(incoming, previous);
        self.apply_scroll(incoming, previous);
        self.apply_control(incoming, previous);
        self.apply_highlight(incoming, previous);
        self.apply_animation(incoming, previous);
    }

    fn apply_navigation(&mut self, incoming: &Session, previous: Option<&Session>) {
        let changed = previous.map_or(true, |p| p.document_path != incoming.document_path);
        if !changed || incoming.document_path.is_empty() {
            return;
        }
        if self.view.current_path() == incoming.document_path {
            return;
        }
        debug!("Following navigation to {}", incoming.document_path);
        self.navigator.navigate(&incoming.document_path, true);
    }

    fn apply_scroll(&mut self, incoming: &Session, previous: Option<&Session>) {
        let follow = match previous {
            None => true,
            Some(p) => scroll::exceeds_threshold(p.scroll_position, incoming.scroll_position),
        };
        if !follow {
            return;
        }
        // Target offset is computed from the local geometry, never the
        // teacher's: the percentage is the wire value precisely so this
        // works across viewport sizes.
        let offset = scroll::offset_from_percent(
            incoming.scroll_position,
            self.view.document_height(),
            self.view.viewport_height(),
        );
        self.view.scroll_to(offset);
    }

    fn apply_control(&mut self, incoming: &Session, previous: Option<&Session>) {
        let changed =
            previous.map_or(true, |p| p.student_can_control != incoming.student_can_control);
        if !changed {
            return;
        }
        match self.lock.apply(incoming.student_can_control, self.view.as_ref()) {
            LockTransition::Released { restore_offset } => {
                // Restore after the unpin reflow; the view binding schedules
                // this on its next render frame.
                self.view.scroll_to(restore_offset);
            }
            LockTransition::Engaged | LockTransition::Unchanged => {}
        }
        let _ = self.events.send(UiEvent::ControlChanged {
            can_control: incoming.student_can_control,
        });
    }

    fn apply_highlight(&mut self, incoming: &Session, previous: Option<&Session>) {
        let changed = previous.map_or(true, |p| p.text_selection != incoming.text_selection);
        if !changed {
            return;
        }
        let needle = incoming.text_selection.as_ref().map(|t| t.text.as_str());
        match needle {
            Some(text) => self.highlighter.apply(self.surface.as_ref(), Some(text)),
            None => self.highlighter.clear(self.surface.as_ref()),
        }
        let _ = self.events.send(UiEvent::HighlightChanged {
            text: needle.map(str::to_string),
        });
    }

    fn apply_animation(&mut self, incoming: &Session, previous: Option<&Session>) {
        if previous.map_or(false, |p| p.animation_state == incoming.animation_state) {
            return;
        }
        let prev_state = previous.and_then(|p| p.animation_state.as_ref());
        match (&incoming.animation_state, prev_state) {
            (Some(anim), prev) => {
                let step_changed = prev.map_or(true, |p| {
                    p.animation_id != anim.animation_id || p.current_step != anim.current_step
                });
                if step_changed {
                    // Seek lands paused, then play state is matched.
                    self.animations.seek(&anim.animation_id, anim.current_step);
                }
                self.animations
                    .set_playing(&anim.animation_id, anim.is_playing);
                let _ = self.events.send(UiEvent::AnimationChanged {
                    animation_id: anim.animation_id.clone(),
                    step: anim.current_step,
                    playing: anim.is_playing,
                });
            }
            (None, Some(prev)) => {
                // Teacher cleared the animation; stop following it.
                self.animations.set_playing(&prev.animation_id, false);
            }
            (None, None) => {}
        }
    }

    /// Leave Joined: release every session side effect, then go Idle. A
    /// stale record is handled identically to a missing one.
    fn teardown(&mut self) {
        let EngineState::Joined { last } = &self.state else {
            return;
        };
        info!("Session {} is gone, returning to idle", last.id);
        if let Some(anim) = &last.animation_state {
            self.animations.set_playing(&anim.animation_id, false);
        }
        self.lock.release_for_teardown(self.view.as_ref());
        self.highlighter.clear(self.surface.as_ref());
        self.state = EngineState::Idle;
        let _ = self.events.send(UiEvent::SessionEnded);
    }

    /// Mark our participant entry inactive. Purely best-effort: when the
    /// record is already gone, inactive, or belongs to a different
    /// broadcast there is nothing to write to, and liveness detection
    /// never depends on this note arriving.
    async fn write_departure(&self, session_id: &str) {
        let mut record = match self.store.read_active().await {
            Ok(Some(r)) if r.id == session_id => r,
            Ok(_) => return,
            Err(e) => {
                debug!("Departure note skipped: {}", e);
                return;
            }
        };
        if let Some(participant) = record.participant_mut(&self.identity.id) {
            participant.is_active = false;
            participant.last_seen = Utc::now();
            if let Err(e) = self.store.write(&record).await {
                debug!("Departure note write failed: {}", e);
            }
        }
    }
}
