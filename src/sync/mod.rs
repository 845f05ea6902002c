pub mod engine;
pub mod view;

pub use engine::SyncEngine;
pub use view::{AnimationDriver, DocumentView, Navigator};
