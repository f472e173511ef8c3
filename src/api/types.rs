//! Serde types matching the platform's REST API.
//!
//! Field names follow the wire format: MongoDB-style `_id` objects and
//! camelCase keys. Unknown fields are ignored so server-side additions do
//! not break the console.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Common nested field types
// ============================================================================

/// MongoDB extended-JSON object id: `{"$oid": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectId {
  #[serde(rename = "$oid")]
  pub oid: String,
}

impl ObjectId {
  #[allow(dead_code)]
  pub fn new(oid: impl Into<String>) -> Self {
    Self { oid: oid.into() }
  }
}

impl fmt::Display for ObjectId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.oid)
  }
}

// ============================================================================
// Auth endpoints
// ============================================================================

/// Profile of a signed-in user, as returned by the profile endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  #[serde(rename = "_id")]
  pub id: ObjectId,
  pub username: String,
  #[serde(rename = "firstName")]
  pub first_name: String,
  #[serde(rename = "lastName")]
  pub last_name: String,
  pub email: String,
}

/// Payload for the signup endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterUser {
  pub username: String,
  #[serde(rename = "firstName")]
  pub first_name: String,
  #[serde(rename = "lastName")]
  pub last_name: String,
  pub email: String,
  pub password: String,
}

/// Login endpoint response. A denial carries neither flag nor token.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
  #[serde(default)]
  pub success: bool,
  #[serde(default)]
  pub token: Option<String>,
}

// ============================================================================
// Project endpoints
// ============================================================================

/// A project the current user is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  #[serde(rename = "_id")]
  pub id: ObjectId,
  pub name: String,
  /// Hex ids of the member users.
  #[serde(default)]
  pub users: Vec<String>,
}

/// Body for the project create endpoint. The server assigns the id and
/// adds the creator as a member.
#[derive(Debug, Clone, Serialize)]
pub struct NewProject {
  pub name: String,
  pub users: Vec<String>,
}

/// Insert acknowledgement carrying the new record's id as a hex string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Created {
  #[serde(rename = "_id")]
  pub id: String,
}

// ============================================================================
// MongoDB service endpoints
// ============================================================================

/// Descriptor of a collection in a project's database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
  pub name: String,
  #[serde(rename = "type", default)]
  pub kind: String,
  #[serde(default)]
  pub options: serde_json::Value,
  #[serde(default)]
  pub info: CollectionDetails,
  #[serde(rename = "idIndex", default)]
  pub id_index: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionDetails {
  #[serde(rename = "readOnly", default)]
  pub read_only: bool,
  #[serde(default)]
  pub uuid: serde_json::Value,
}

/// Acknowledgement for document deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOutcome {
  #[serde(rename = "deletedCount")]
  pub deleted_count: u64,
}

/// Acknowledgement for document update and set operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateOutcome {
  #[serde(rename = "matchedCount")]
  pub matched_count: u64,
  #[serde(rename = "modifiedCount")]
  pub modified_count: u64,
  #[serde(rename = "upsertedId", default)]
  pub upserted_id: serde_json::Value,
}
