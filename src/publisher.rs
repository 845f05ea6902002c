//! Teacher-side ownership of the session record.
//!
//! While a session is active, every mutable field except the students'
//! own participant entries is written from here. The store has no partial
//! patches, so each mutator reads the current record, changes one field
//! and writes the whole record back. Store failures are logged and
//! swallowed: the next local change or heartbeat tick is the retry.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::models::{AnimationState, Session, SessionMeta, TextSelection};
use crate::presence::{self, HEARTBEAT_INTERVAL_MS};
use crate::store::{SessionStore, StoreError};

pub struct TeacherPublisher {
    store: Arc<dyn SessionStore>,
    session_id: String,
}

impl TeacherPublisher {
    /// Create and persist a fresh active session.
    pub async fn start_session(
        store: Arc<dyn SessionStore>,
        meta: SessionMeta,
    ) -> Result<(Self, Session), StoreError> {
        let session = Session::start(meta);
        store.write(&session).await?;
        info!(
            "Session {} started by {} for {}",
            session.id, session.teacher_name, session.class_name
        );
        let publisher = TeacherPublisher {
            store,
            session_id: session.id.clone(),
        };
        Ok((publisher, session))
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Publish the current scroll progress, clamped to [0,100].
    pub async fn update_scroll(&self, percent: f64) {
        self.mutate("scroll", |s| {
            s.scroll_position = percent.clamp(0.0, 100.0);
        })
        .await;
    }

    pub async fn update_control(&self, allowed: bool) {
        self.mutate("control", |s| {
            s.student_can_control = allowed;
        })
        .await;
    }

    /// Publish or clear the highlighted text.
    pub async fn update_highlight(&self, text: Option<String>) {
        self.mutate("highlight", |s| {
            s.text_selection = text.map(|text| TextSelection { text });
        })
        .await;
    }

    pub async fn update_animation(&self, animation_id: &str, step: i32, playing: bool) {
        let animation_id = animation_id.to_string();
        self.mutate("animation", move |s| {
            s.animation_state = Some(AnimationState {
                animation_id,
                current_step: step,
                is_playing: playing,
            });
        })
        .await;
    }

    /// Move the class to another document. Scroll restarts at the top and
    /// any highlight belonged to the previous document, so both reset.
    pub async fn navigate_to(&self, path: &str, title: &str) {
        let (path, title) = (path.to_string(), title.to_string());
        self.mutate("navigate", move |s| {
            s.document_path = path;
            s.document_title = title;
            s.scroll_position = 0.0;
            s.text_selection = None;
            s.animation_state = None;
        })
        .await;
    }

    /// One `is_active = false` write ends the broadcast; students converge
    /// to Idle on their own, no acknowledgement needed.
    pub async fn end_session(&self) -> Result<(), StoreError> {
        let Some(mut session) = self.own_record().await else {
            return Ok(());
        };
        session.is_active = false;
        self.store.write(&session).await?;
        info!("Session {} ended", self.session_id);
        Ok(())
    }

    /// Refresh `last_heartbeat` every interval until cancelled.
    pub async fn run_heartbeat(&self, token: CancellationToken) {
        let mut ticks = tokio::time::interval(Duration::from_millis(HEARTBEAT_INTERVAL_MS));
        ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = ticks.tick() => {
                    presence::heartbeat_teacher(&self.store, &self.session_id).await;
                }
            }
        }
    }

    async fn own_record(&self) -> Option<Session> {
        match self.store.read_active().await {
            Ok(Some(s)) if s.id == self.session_id => Some(s),
            Ok(_) => {
                warn!("Session {} no longer in store, ignoring mutation", self.session_id);
                None
            }
            Err(e) => {
                warn!("Failed to read session {}: {}", self.session_id, e);
                None
            }
        }
    }

    /// Read-modify-write one field change; heartbeat rides along so a busy
    /// teacher never goes stale between heartbeat ticks.
    async fn mutate(&self, what: &str, change: impl FnOnce(&mut Session)) {
        let Some(mut session) = self.own_record().await else {
            return;
        };
        change(&mut session);
        session.last_heartbeat = Utc::now();
        if let Err(e) = self.store.write(&session).await {
            warn!("Failed to publish {} for session {}: {}", what, self.session_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn meta() -> SessionMeta {
        SessionMeta {
            teacher_name: "Ms. Vos".into(),
            class_name: "4B".into(),
            document_path: "/docs/cells".into(),
            document_title: "Cells".into(),
        }
    }

    async fn publisher() -> (TeacherPublisher, Arc<dyn SessionStore>) {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let (publisher, _session) = TeacherPublisher::start_session(store.clone(), meta())
            .await
            .unwrap();
        (publisher, store)
    }

    #[tokio::test]
    async fn scroll_updates_are_clamped() {
        let (publisher, store) = publisher().await;
        publisher.update_scroll(175.0).await;
        let s = store.read_active().await.unwrap().unwrap();
        assert_eq!(s.scroll_position, 100.0);

        publisher.update_scroll(-3.0).await;
        let s = store.read_active().await.unwrap().unwrap();
        assert_eq!(s.scroll_position, 0.0);
    }

    #[tokio::test]
    async fn navigation_resets_scroll_highlight_and_animation() {
        let (publisher, store) = publisher().await;
        publisher.update_scroll(60.0).await;
        publisher.update_highlight(Some("mitochondria".into())).await;
        publisher.update_animation("anim-1", 3, true).await;

        publisher.navigate_to("/docs/osmosis", "Osmosis").await;
        let s = store.read_active().await.unwrap().unwrap();
        assert_eq!(s.document_path, "/docs/osmosis");
        assert_eq!(s.document_title, "Osmosis");
        assert_eq!(s.scroll_position, 0.0);
        assert!(s.text_selection.is_none());
        assert!(s.animation_state.is_none());
    }

    #[tokio::test]
    async fn end_session_flips_is_active_once() {
        let (publisher, store) = publisher().await;
        publisher.end_session().await.unwrap();
        // read_active hides inactive records, as students see it.
        assert!(store.read_active().await.unwrap().is_none());
        // Ending again is harmless.
        publisher.end_session().await.unwrap();
    }

    #[tokio::test]
    async fn mutations_keep_participants_written_by_students() {
        let (publisher, store) = publisher().await;
        crate::presence::touch_student(&store, publisher.session_id(), "dev-1", "Robin", true).await;

        publisher.update_control(false).await;
        let s = store.read_active().await.unwrap().unwrap();
        assert!(!s.student_can_control);
        assert_eq!(s.connected_students.len(), 1);
    }
}
