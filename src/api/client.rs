//! HTTP plumbing for the platform API.
//!
//! [`ApiHandle`] owns the active [`ApiClient`] and rebuilds it whenever the
//! auth token changes. Snapshots taken with [`ApiHandle::client`] keep the
//! token they were built with, so requests already in flight are never
//! retagged by a later sign-in or sign-out.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// Mount point of the REST API under the platform origin.
const API_MOUNT: &str = "api";

/// One HTTP exchange, independent of the underlying client library.
#[derive(Debug, Clone)]
pub struct TransportRequest {
  pub method: Method,
  pub url: Url,
  pub bearer: Option<String>,
  pub body: Option<Value>,
}

/// Raw response: status plus body bytes.
#[derive(Debug, Clone)]
pub struct TransportResponse {
  pub status: StatusCode,
  pub body: Vec<u8>,
}

/// Request executor behind the API client. Swapped out in tests.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: TransportRequest) -> Result<TransportResponse>;
}

/// Reqwest-backed transport. One instance, and its connection pool, is
/// shared by every client the handle builds.
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new() -> Result<Self> {
    let client = reqwest::Client::builder().build()?;
    Ok(Self { client })
  }
}

#[async_trait]
impl Transport for HttpTransport {
  async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
    let mut builder = self.client.request(request.method, request.url);
    if let Some(token) = &request.bearer {
      builder = builder.bearer_auth(token);
    }
    if let Some(body) = &request.body {
      builder = builder.json(body);
    }

    let response = builder.send().await?;
    let status = response.status();
    let body = response.bytes().await?;

    Ok(TransportResponse {
      status,
      body: body.to_vec(),
    })
  }
}

/// One immutable client: the API base URL plus the token it was built with.
pub struct ApiClient {
  base: Url,
  bearer: Option<String>,
  transport: Arc<dyn Transport>,
}

impl ApiClient {
  fn new(base: Url, bearer: Option<String>, transport: Arc<dyn Transport>) -> Self {
    Self {
      base,
      bearer,
      transport,
    }
  }

  /// Issue a GET and decode the JSON response.
  pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
    self.request(Method::GET, segments, None).await
  }

  /// Issue a POST with a JSON body and decode the JSON response.
  pub async fn post<T: DeserializeOwned>(&self, segments: &[&str], body: Value) -> Result<T> {
    self.request(Method::POST, segments, Some(body)).await
  }

  async fn request<T: DeserializeOwned>(
    &self,
    method: Method,
    segments: &[&str],
    body: Option<Value>,
  ) -> Result<T> {
    let url = self.endpoint(segments);
    debug!(%method, %url, authenticated = self.bearer.is_some(), "issuing API request");

    let response = self
      .transport
      .send(TransportRequest {
        method,
        url,
        bearer: self.bearer.clone(),
        body,
      })
      .await?;

    if !response.status.is_success() {
      return Err(Error::Status {
        status: response.status,
        message: String::from_utf8_lossy(&response.body).trim().to_string(),
      });
    }

    Ok(serde_json::from_slice(&response.body)?)
  }

  /// Build an endpoint URL, percent-encoding each path segment.
  fn endpoint(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.extend(segments);
    }
    url
  }
}

/// Factory for the active API client.
pub struct ApiHandle {
  base: Url,
  transport: Arc<dyn Transport>,
  current: RwLock<Arc<ApiClient>>,
}

impl ApiHandle {
  /// Handle for the platform at `origin`, with no auth token yet.
  ///
  /// The REST API lives under `/api` on the origin; the mount is appended
  /// here so callers configure the plain platform URL.
  pub fn new(origin: &str, transport: Arc<dyn Transport>) -> Result<Self> {
    let mut base = Url::parse(origin)
      .map_err(|e| Error::Config(format!("invalid platform URL {origin}: {e}")))?;
    base
      .path_segments_mut()
      .map_err(|_| Error::Config(format!("platform URL {origin} cannot carry a path")))?
      .pop_if_empty()
      .push(API_MOUNT);

    let current = Arc::new(ApiClient::new(
      base.clone(),
      None,
      Arc::clone(&transport),
    ));

    Ok(Self {
      base,
      transport,
      current: RwLock::new(current),
    })
  }

  /// Snapshot of the current client. The snapshot keeps its token for its
  /// whole lifetime, across any number of `set_auth_token` calls.
  pub fn client(&self) -> Arc<ApiClient> {
    match self.current.read() {
      Ok(client) => Arc::clone(&client),
      Err(poisoned) => Arc::clone(&poisoned.into_inner()),
    }
  }

  /// Replace the active client with a fresh one carrying `token`.
  pub fn set_auth_token(&self, token: Option<&str>) {
    let next = Arc::new(ApiClient::new(
      self.base.clone(),
      token.map(str::to_owned),
      Arc::clone(&self.transport),
    ));

    match self.current.write() {
      Ok(mut current) => *current = next,
      Err(poisoned) => *poisoned.into_inner() = next,
    }
    debug!(authenticated = token.is_some(), "rebuilt API client");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::FakeTransport;
  use crate::api::types::User;
  use serde_json::json;

  fn handle(transport: &Arc<FakeTransport>) -> ApiHandle {
    ApiHandle::new("https://basalt.example.dev", Arc::clone(transport) as Arc<dyn Transport>)
      .unwrap()
  }

  #[test]
  fn test_rejects_unparseable_origin() {
    let transport = FakeTransport::new();
    let result = ApiHandle::new("not a url", transport as Arc<dyn Transport>);
    assert!(matches!(result, Err(Error::Config(_))));
  }

  #[tokio::test]
  async fn test_get_decodes_json_response() {
    let transport = FakeTransport::new();
    transport.reply(
      Method::GET,
      "/api/auth/profile",
      json!({
        "_id": { "$oid": "64a1f0c2e4b0a93f5c8d1b2a" },
        "username": "ada",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": "ada@example.dev"
      }),
    );

    let handle = handle(&transport);
    let user: User = handle.client().get(&["auth", "profile"]).await.unwrap();
    assert_eq!(user.username, "ada");
  }

  #[tokio::test]
  async fn test_post_sends_body_and_bearer() {
    let transport = FakeTransport::new();
    transport.reply(Method::POST, "/api/auth/login", json!({ "success": true }));

    let handle = handle(&transport);
    handle.set_auth_token(Some("jwt-token"));
    let _: Value = handle
      .client()
      .post(&["auth", "login"], json!({ "email": "a@b.c" }))
      .await
      .unwrap();

    let seen = transport.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].path, "/api/auth/login");
    assert_eq!(seen[0].bearer.as_deref(), Some("jwt-token"));
    assert_eq!(seen[0].body, Some(json!({ "email": "a@b.c" })));
  }

  #[tokio::test]
  async fn test_no_bearer_without_token() {
    let transport = FakeTransport::new();
    transport.reply(Method::GET, "/api/projects/info/list", json!([]));

    let handle = handle(&transport);
    let _: Value = handle.client().get(&["projects", "info", "list"]).await.unwrap();

    assert_eq!(transport.seen()[0].bearer, None);
  }

  #[tokio::test]
  async fn test_path_segments_are_percent_encoded() {
    let transport = FakeTransport::new();
    transport.reply(Method::GET, "/api/projects/info/a%20b%2Fc", json!([]));

    let handle = handle(&transport);
    let _: Value = handle
      .client()
      .get(&["projects", "info", "a b/c"])
      .await
      .unwrap();

    assert_eq!(transport.seen()[0].path, "/api/projects/info/a%20b%2Fc");
  }

  #[tokio::test]
  async fn test_error_status_carries_body_text() {
    let transport = FakeTransport::new();
    transport.reply_status(
      Method::GET,
      "/api/auth/profile",
      StatusCode::UNAUTHORIZED,
      "Authentication failed.",
    );

    let handle = handle(&transport);
    let result: Result<User> = handle.client().get(&["auth", "profile"]).await;

    match result {
      Err(Error::Status { status, message }) => {
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message, "Authentication failed.");
      }
      other => panic!("expected status error, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_decode_error_on_shape_mismatch() {
    let transport = FakeTransport::new();
    transport.reply(Method::GET, "/api/auth/profile", json!({ "nope": 1 }));

    let handle = handle(&transport);
    let result: Result<User> = handle.client().get(&["auth", "profile"]).await;
    assert!(matches!(result, Err(Error::Decode(_))));
  }

  #[tokio::test]
  async fn test_snapshot_keeps_its_token_across_swaps() {
    let transport = FakeTransport::new();
    transport.reply(Method::GET, "/api/auth/profile", json!({}));
    transport.reply(Method::GET, "/api/auth/profile", json!({}));

    let handle = handle(&transport);
    handle.set_auth_token(Some("old"));
    let snapshot = handle.client();

    handle.set_auth_token(Some("new"));
    let _: Value = snapshot.get(&["auth", "profile"]).await.unwrap();
    let _: Value = handle.client().get(&["auth", "profile"]).await.unwrap();

    let seen = transport.seen();
    assert_eq!(seen[0].bearer.as_deref(), Some("old"));
    assert_eq!(seen[1].bearer.as_deref(), Some("new"));
  }
}
