//! Recording transport with canned replies, for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde_json::Value;
use tokio::sync::Notify;

use super::client::{Transport, TransportRequest, TransportResponse};
use crate::error::Result;

/// One request as the fake transport saw it. The path keeps its percent
/// encoding so tests can assert on the exact wire form.
#[derive(Debug, Clone)]
pub struct SeenRequest {
  pub method: Method,
  pub path: String,
  pub bearer: Option<String>,
  pub body: Option<Value>,
}

struct Reply {
  status: StatusCode,
  body: String,
  /// When set, the reply is withheld until the notify fires.
  gate: Option<Arc<Notify>>,
}

/// Transport serving canned replies keyed by method and path, recording
/// every request. Requests with no canned reply come back as status 599 so
/// the offending call is visible in assertions instead of panicking inside
/// a background task.
pub struct FakeTransport {
  replies: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
  seen: Mutex<Vec<SeenRequest>>,
}

impl FakeTransport {
  pub fn new() -> Arc<Self> {
    Arc::new(Self {
      replies: Mutex::new(HashMap::new()),
      seen: Mutex::new(Vec::new()),
    })
  }

  /// Queue a 200 reply with a JSON body for `method` `path`.
  pub fn reply(&self, method: Method, path: &str, body: Value) {
    self.push(method, path, StatusCode::OK, body.to_string(), None);
  }

  /// Queue a reply with an explicit status and raw body text.
  pub fn reply_status(&self, method: Method, path: &str, status: StatusCode, body: &str) {
    self.push(method, path, status, body.to_string(), None);
  }

  /// Queue a 200 JSON reply that is withheld until the returned notify
  /// fires, to order a response after other test steps.
  pub fn reply_gated(&self, method: Method, path: &str, body: Value) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    self.push(method, path, StatusCode::OK, body.to_string(), Some(Arc::clone(&gate)));
    gate
  }

  fn push(&self, method: Method, path: &str, status: StatusCode, body: String, gate: Option<Arc<Notify>>) {
    self
      .replies
      .lock()
      .unwrap()
      .entry((method, path.to_string()))
      .or_default()
      .push_back(Reply { status, body, gate });
  }

  /// Every request sent so far, in order.
  pub fn seen(&self) -> Vec<SeenRequest> {
    self.seen.lock().unwrap().clone()
  }

  /// Number of requests sent to `path`, any method.
  pub fn requests_to(&self, path: &str) -> usize {
    self.seen.lock().unwrap().iter().filter(|r| r.path == path).count()
  }
}

#[async_trait]
impl Transport for FakeTransport {
  async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
    let path = request.url.path().to_string();
    self.seen.lock().unwrap().push(SeenRequest {
      method: request.method.clone(),
      path: path.clone(),
      bearer: request.bearer.clone(),
      body: request.body.clone(),
    });

    let reply = self
      .replies
      .lock()
      .unwrap()
      .get_mut(&(request.method.clone(), path.clone()))
      .and_then(|queue| queue.pop_front());

    match reply {
      Some(reply) => {
        if let Some(gate) = &reply.gate {
          gate.notified().await;
        }
        Ok(TransportResponse {
          status: reply.status,
          body: reply.body.into_bytes(),
        })
      }
      None => Ok(TransportResponse {
        status: StatusCode::from_u16(599).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        body: format!("no canned reply for {} {}", request.method, path).into_bytes(),
      }),
    }
  }
}
