//! Project metadata endpoints.

use serde_json::json;

use super::client::ApiHandle;
use super::types::{Created, NewProject, Project};
use crate::error::Result;

/// Accessor for the `/projects/info` and `/projects/edit` endpoints.
pub struct ProjectsApi<'a> {
  handle: &'a ApiHandle,
}

impl ApiHandle {
  /// Project metadata endpoints.
  pub fn projects(&self) -> ProjectsApi<'_> {
    ProjectsApi { handle: self }
  }
}

impl ProjectsApi<'_> {
  /// Every project the current user is a member of.
  pub async fn list(&self) -> Result<Vec<Project>> {
    self.handle.client().get(&["projects", "info", "list"]).await
  }

  /// A single project by id.
  pub async fn get(&self, id: &str) -> Result<Project> {
    self.handle.client().get(&["projects", "info", id]).await
  }

  /// Create a project. The server assigns the id; fetch the project back
  /// to see the stored record.
  pub async fn create(&self, project: &NewProject) -> Result<Created> {
    self
      .handle
      .client()
      .post(
        &["projects", "edit", "new"],
        json!({ "name": project.name, "users": project.users }),
      )
      .await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::client::Transport;
  use crate::api::testing::FakeTransport;
  use reqwest::Method;
  use serde_json::json;
  use std::sync::Arc;

  fn handle(transport: &Arc<FakeTransport>) -> ApiHandle {
    ApiHandle::new(
      "https://basalt.example.dev",
      Arc::clone(transport) as Arc<dyn Transport>,
    )
    .unwrap()
  }

  #[tokio::test]
  async fn test_list_and_get_routes() {
    let transport = FakeTransport::new();
    transport.reply(Method::GET, "/api/projects/info/list", json!([]));
    transport.reply(
      Method::GET,
      "/api/projects/info/64a1f0c2e4b0a93f5c8d1b2b",
      json!({ "_id": { "$oid": "64a1f0c2e4b0a93f5c8d1b2b" }, "name": "orbital", "users": [] }),
    );

    let handle = handle(&transport);
    assert!(handle.projects().list().await.unwrap().is_empty());
    let project = handle
      .projects()
      .get("64a1f0c2e4b0a93f5c8d1b2b")
      .await
      .unwrap();
    assert_eq!(project.name, "orbital");
  }

  #[tokio::test]
  async fn test_create_posts_name_and_empty_members() {
    let transport = FakeTransport::new();
    transport.reply(
      Method::POST,
      "/api/projects/edit/new",
      json!({ "_id": "64a1f0c2e4b0a93f5c8d1b2c" }),
    );

    let handle = handle(&transport);
    let created = handle
      .projects()
      .create(&NewProject {
        name: "orbital".into(),
        users: Vec::new(),
      })
      .await
      .unwrap();

    assert_eq!(created.id, "64a1f0c2e4b0a93f5c8d1b2c");
    assert_eq!(
      transport.seen()[0].body,
      Some(json!({ "name": "orbital", "users": [] }))
    );
  }
}
