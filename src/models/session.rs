use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Participant;

/// Text span the teacher has selected for emphasis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextSelection {
    pub text: String,
}

/// Playback state of an embedded animation the teacher is driving.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnimationState {
    pub animation_id: String,
    pub current_step: i32,
    pub is_playing: bool,
}

/// One active teaching broadcast.
///
/// The record is owned by the teacher's publisher while `is_active` is true;
/// students only read it and read-modify-write their own entry inside
/// `connected_students`. Every mutation replaces the whole record (the store
/// offers no partial patches), so concurrent writers can lose updates;
/// presence self-heals on the next heartbeat tick.
///
/// Fields written by newer clients may be absent in records from older ones;
/// every optional field defaults on deserialization instead of failing.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub is_active: bool,
    pub teacher_name: String,
    pub class_name: String,
    #[serde(default)]
    pub document_path: String,
    #[serde(default)]
    pub document_title: String,
    /// Scroll progress as a percentage in [0,100], device independent.
    #[serde(default)]
    pub scroll_position: f64,
    #[serde(default)]
    pub student_can_control: bool,
    #[serde(default)]
    pub text_selection: Option<TextSelection>,
    #[serde(default)]
    pub animation_state: Option<AnimationState>,
    /// Refreshed by the teacher only.
    pub last_heartbeat: DateTime<Utc>,
    #[serde(default)]
    pub connected_students: Vec<Participant>,
}

/// Descriptive fields fixed at session start.
#[derive(Debug, Clone)]
pub struct SessionMeta {
    pub teacher_name: String,
    pub class_name: String,
    pub document_path: String,
    pub document_title: String,
}

impl Session {
    /// Create a fresh active session record for the given teacher metadata.
    pub fn start(meta: SessionMeta) -> Self {
        Session {
            id: Uuid::new_v4().to_string(),
            is_active: true,
            teacher_name: meta.teacher_name,
            class_name: meta.class_name,
            document_path: meta.document_path,
            document_title: meta.document_title,
            scroll_position: 0.0,
            student_can_control: true,
            text_selection: None,
            animation_state: None,
            last_heartbeat: Utc::now(),
            connected_students: Vec::new(),
        }
    }

    /// Find this device's participant entry, if registered.
    pub fn participant(&self, participant_id: &str) -> Option<&Participant> {
        self.connected_students
            .iter()
            .find(|p| p.id == participant_id)
    }

    pub fn participant_mut(&mut self, participant_id: &str) -> Option<&mut Participant> {
        self.connected_students
            .iter_mut()
            .find(|p| p.id == participant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_optional_fields_deserialize_as_defaults() {
        // A record written by an older client that predates highlights,
        // animations and the control flag.
        let raw = r#"{
            "id": "abc",
            "isActive": true,
            "teacherName": "Ms. Vos",
            "className": "4B",
            "lastHeartbeat": "2026-01-05T10:00:00Z"
        }"#;
        let session: Session = serde_json::from_str(raw).unwrap();
        assert!(session.is_active);
        assert_eq!(session.scroll_position, 0.0);
        assert!(session.text_selection.is_none());
        assert!(session.animation_state.is_none());
        assert!(session.connected_students.is_empty());
    }

    #[test]
    fn round_trips_camel_case_field_names() {
        let session = Session::start(SessionMeta {
            teacher_name: "Ms. Vos".into(),
            class_name: "4B".into(),
            document_path: "/docs/photosynthesis".into(),
            document_title: "Photosynthesis".into(),
        });
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("isActive").is_some());
        assert!(json.get("scrollPosition").is_some());
        assert!(json.get("connectedStudents").is_some());
    }
}
