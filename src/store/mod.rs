//! Reactive, locally persisted application state.
//!
//! [`cell::PersistedCell`] is the building block: an observable value
//! mirrored into the SQLite state store. [`session::Session`] and
//! [`projects::ProjectCache`] compose cells into the console's two
//! long-lived stores.

pub mod cell;
pub mod projects;
pub mod session;
pub mod storage;
