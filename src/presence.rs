//! Liveness rules and the heartbeat bookkeeping both roles run.
//!
//! The teacher refreshes `last_heartbeat` on the session record; each
//! student refreshes its own participant entry. Every observer applies the
//! same staleness test, so a crashed teacher converges to "no session" for
//! the whole class within one window. Heartbeat writes race with other
//! writers of the whole record and may be lost; the next tick repairs that,
//! which is why presence is advisory rather than authoritative.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::models::{Participant, Session};
use crate::store::SessionStore;

/// Cadence of heartbeat writes, both roles.
pub const HEARTBEAT_INTERVAL_MS: u64 = 2000;
/// A session (or participant) not refreshed within this window is dead.
pub const STALE_MS: i64 = 5000;
/// Cadence of the student follow poll.
pub const POLL_INTERVAL_MS: u64 = 200;

/// The one liveness test every observer applies. Failing it is equivalent
/// to "no session", even while `is_active` is still true in the record
/// (stale-write tolerance).
pub fn is_live(session: &Session, now: DateTime<Utc>) -> bool {
    session.is_active && (now - session.last_heartbeat).num_milliseconds() <= STALE_MS
}

/// Same window applied to a participant's own heartbeat.
pub fn participant_is_present(participant: &Participant, now: DateTime<Utc>) -> bool {
    participant.is_active && (now - participant.last_seen).num_milliseconds() <= STALE_MS
}

/// One teacher heartbeat tick: read-modify-write `last_heartbeat`. Store
/// failures are logged and left to the next tick.
pub async fn heartbeat_teacher(store: &Arc<dyn SessionStore>, session_id: &str) {
    let mut session = match store.read_active().await {
        Ok(Some(s)) if s.id == session_id => s,
        Ok(_) => {
            debug!("No active session {} to heartbeat", session_id);
            return;
        }
        Err(e) => {
            warn!("Heartbeat read failed for session {}: {}", session_id, e);
            return;
        }
    };
    session.last_heartbeat = Utc::now();
    if let Err(e) = store.write(&session).await {
        warn!("Heartbeat write failed for session {}: {}", session_id, e);
    }
}

/// One student presence tick: refresh (or re-insert, if a lost update
/// dropped it) this device's participant entry. Only the session the
/// student actually joined is written to; a record from a replacing
/// broadcast is left alone until the sync engine joins it. Racing writers
/// may still clobber this write; the following tick self-heals.
pub async fn touch_student(
    store: &Arc<dyn SessionStore>,
    session_id: &str,
    participant_id: &str,
    name: &str,
    visible: bool,
) {
    let mut session = match store.read_active().await {
        Ok(Some(s)) if s.id == session_id => s,
        Ok(Some(other)) => {
            debug!(
                "Record now belongs to session {}, skipping presence write for {}",
                other.id, session_id
            );
            return;
        }
        Ok(None) => return,
        Err(e) => {
            warn!("Presence read failed for participant {}: {}", participant_id, e);
            return;
        }
    };
    match session.participant_mut(participant_id) {
        Some(participant) => participant.touch(visible),
        None => {
            debug!("Participant {} missing from record, re-registering", participant_id);
            session
                .connected_students
                .push(Participant::join(participant_id.to_string(), name.to_string()));
        }
    }
    if let Err(e) = store.write(&session).await {
        warn!("Presence write failed for participant {}: {}", participant_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionMeta;
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn session() -> Session {
        Session::start(SessionMeta {
            teacher_name: "Ms. Vos".into(),
            class_name: "4B".into(),
            document_path: "/docs/cells".into(),
            document_title: "Cells".into(),
        })
    }

    #[test]
    fn fresh_heartbeat_is_live_and_stale_one_is_not() {
        let s = session();
        let now = s.last_heartbeat;
        assert!(is_live(&s, now));
        assert!(is_live(&s, now + Duration::milliseconds(STALE_MS)));
        assert!(!is_live(&s, now + Duration::milliseconds(STALE_MS + 1)));
    }

    #[test]
    fn ended_session_is_never_live() {
        let mut s = session();
        s.is_active = false;
        assert!(!is_live(&s, s.last_heartbeat));
    }

    #[tokio::test]
    async fn teacher_heartbeat_advances_timestamp() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let mut s = session();
        s.last_heartbeat = Utc::now() - Duration::milliseconds(4000);
        store.write(&s).await.unwrap();

        heartbeat_teacher(&store, &s.id).await;
        let read = store.read_active().await.unwrap().unwrap();
        assert!(read.last_heartbeat > s.last_heartbeat);
    }

    #[tokio::test]
    async fn student_touch_reinserts_a_lost_entry() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let s = session();
        store.write(&s).await.unwrap();

        // Entry was never there (or a racing write dropped it).
        touch_student(&store, &s.id, "dev-1", "Robin", true).await;
        let read = store.read_active().await.unwrap().unwrap();
        assert_eq!(read.connected_students.len(), 1);
        assert_eq!(read.connected_students[0].id, "dev-1");

        // Second tick updates in place rather than duplicating.
        touch_student(&store, &s.id, "dev-1", "Robin", false).await;
        let read = store.read_active().await.unwrap().unwrap();
        assert_eq!(read.connected_students.len(), 1);
        assert!(!read.connected_students[0].is_active);
    }

    #[tokio::test]
    async fn student_touch_skips_a_record_from_another_session() {
        let store: Arc<dyn SessionStore> = Arc::new(MemoryStore::new());
        let replacement = session();
        store.write(&replacement).await.unwrap();

        // Still ticking against the broadcast we joined, which is gone.
        touch_student(&store, "old-session", "dev-1", "Robin", true).await;
        let read = store.read_active().await.unwrap().unwrap();
        assert!(read.connected_students.is_empty());
    }

    #[test]
    fn participant_presence_applies_the_staleness_window() {
        let mut p = Participant::join("dev-1".into(), "Robin".into());
        let now = p.last_seen;
        assert!(participant_is_present(&p, now));
        assert!(participant_is_present(&p, now + Duration::milliseconds(STALE_MS)));
        assert!(!participant_is_present(&p, now + Duration::milliseconds(STALE_MS + 1)));

        // A backgrounded client is not present even with a fresh heartbeat.
        p.is_active = false;
        assert!(!participant_is_present(&p, now));
    }
}
