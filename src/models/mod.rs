pub mod error;
pub mod events;
pub mod health;
pub mod participant;
pub mod session;

pub use error::*;
pub use events::*;
pub use health::*;
pub use participant::*;
pub use session::*;
