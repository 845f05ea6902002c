use serde::{Deserialize, Serialize};

/// Typed notifications broadcast by the sync engine so independent UI
/// modules (animation player, lock indicator, navigation chrome) can react
/// to session transitions without being wired to the engine directly.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UiEvent {
    #[serde(rename = "sessionJoined")]
    SessionJoined { session_id: String },
    #[serde(rename = "sessionEnded")]
    SessionEnded,
    #[serde(rename = "controlChanged")]
    ControlChanged { can_control: bool },
    #[serde(rename = "highlightChanged")]
    HighlightChanged { text: Option<String> },
    #[serde(rename = "animationChanged")]
    AnimationChanged {
        animation_id: String,
        step: i32,
        playing: bool,
    },
}
