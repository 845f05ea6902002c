//! Live classroom mirroring: a teacher's viewing state (document, scroll,
//! control lock, highlight, animation step) replicated to any number of
//! student viewers through a shared state store with no transactions and
//! no ordering guarantees.
//!
//! The library side holds the protocol: [`publisher::TeacherPublisher`],
//! [`sync::SyncEngine`], the [`store::SessionStore`] contract and its
//! adapters. The binary runs the session relay, a reference store backend
//! over HTTP and WebSocket.

pub mod config;
pub mod docs;
pub mod handlers;
pub mod highlight;
pub mod identity;
pub mod lock;
pub mod models;
pub mod presence;
pub mod publisher;
pub mod relay;
pub mod routes;
pub mod scroll;
pub mod store;
pub mod sync;
pub mod utils;
