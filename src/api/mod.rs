//! Typed client for the platform's REST API.
//!
//! [`client::ApiHandle`] owns the HTTP side; the endpoint modules hang
//! accessors off it so call sites read as `handle.auth().login(..)`,
//! `handle.projects().list()`, `handle.mongodb(id).documents(..)`.

pub mod auth;
pub mod client;
pub mod mongodb;
pub mod projects;
pub mod types;

#[cfg(test)]
pub mod testing;
