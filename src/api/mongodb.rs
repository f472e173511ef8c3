//! MongoDB service endpoints, scoped to one project's database.
//!
//! Every route lives under
//! `/projects/services/{project}/mongodb/collections`. Reads and mutations
//! alike are POSTs carrying their parameters in the body; only the
//! collection listing is a GET.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use super::client::ApiHandle;
use super::types::{CollectionInfo, Created, DeleteOutcome, UpdateOutcome};
use crate::error::Result;

/// Accessor for one project's MongoDB service.
pub struct MongoDbApi<'a> {
  handle: &'a ApiHandle,
  project_id: &'a str,
}

impl ApiHandle {
  /// Document database endpoints for the project with id `project_id`.
  pub fn mongodb<'a>(&'a self, project_id: &'a str) -> MongoDbApi<'a> {
    MongoDbApi {
      handle: self,
      project_id,
    }
  }
}

impl MongoDbApi<'_> {
  /// List the collections in the project database.
  pub async fn collections(&self) -> Result<Vec<CollectionInfo>> {
    self.handle.client().get(&self.scope(&[])).await
  }

  /// Create a collection. The server acknowledges with a bare boolean.
  pub async fn create_collection(&self, name: &str) -> Result<bool> {
    self
      .handle
      .client()
      .post(&self.scope(&[name, "create"]), json!({}))
      .await
  }

  /// Drop a collection and everything in it.
  pub async fn drop_collection(&self, name: &str) -> Result<bool> {
    self
      .handle
      .client()
      .post(&self.scope(&[name, "drop"]), json!({}))
      .await
  }

  /// Query documents in `collection`. `filter` and `options` take the
  /// MongoDB find filter and options documents; omitted means match all.
  pub async fn documents<T: DeserializeOwned>(
    &self,
    collection: &str,
    filter: Option<Value>,
    options: Option<Value>,
  ) -> Result<Vec<T>> {
    let mut body = Map::new();
    if let Some(filter) = filter {
      body.insert("filter".to_string(), filter);
    }
    if let Some(options) = options {
      body.insert("options".to_string(), options);
    }

    self
      .handle
      .client()
      .post(&self.scope(&[collection, "documents"]), Value::Object(body))
      .await
  }

  /// Insert one document.
  pub async fn create_document(&self, collection: &str, document: Value) -> Result<Created> {
    self
      .handle
      .client()
      .post(
        &self.scope(&[collection, "documents", "create"]),
        json!({ "document": document }),
      )
      .await
  }

  /// Fetch one document by its hex id.
  pub async fn get_document<T: DeserializeOwned>(&self, collection: &str, id: &str) -> Result<T> {
    self
      .handle
      .client()
      .post(&self.scope(&[collection, "documents", id, "get"]), json!({}))
      .await
  }

  /// Apply a MongoDB update document (`$set`, `$inc`, ...) to one document.
  pub async fn update_document(
    &self,
    collection: &str,
    id: &str,
    update: Value,
  ) -> Result<UpdateOutcome> {
    self
      .handle
      .client()
      .post(
        &self.scope(&[collection, "documents", id, "update"]),
        json!({ "update": update }),
      )
      .await
  }

  /// Overwrite fields on one document with `$set` semantics applied
  /// server-side.
  pub async fn set_document(
    &self,
    collection: &str,
    id: &str,
    fields: Value,
    options: Option<Value>,
  ) -> Result<UpdateOutcome> {
    let mut body = Map::new();
    body.insert("set".to_string(), fields);
    if let Some(options) = options {
      body.insert("options".to_string(), options);
    }

    self
      .handle
      .client()
      .post(
        &self.scope(&[collection, "documents", id, "set"]),
        Value::Object(body),
      )
      .await
  }

  /// Delete one document by its hex id.
  pub async fn delete_document(&self, collection: &str, id: &str) -> Result<DeleteOutcome> {
    self
      .handle
      .client()
      .post(
        &self.scope(&[collection, "documents", id, "delete"]),
        json!({}),
      )
      .await
  }

  /// Path segments under the project's collections route.
  fn scope<'s>(&'s self, tail: &[&'s str]) -> Vec<&'s str> {
    let mut segments = vec![
      "projects",
      "services",
      self.project_id,
      "mongodb",
      "collections",
    ];
    segments.extend_from_slice(tail);
    segments
  }
}
