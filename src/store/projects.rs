//! Client-side cache of the user's project list.

use std::sync::Arc;

use tracing::debug;

use crate::api::client::ApiHandle;
use crate::api::types::{NewProject, Project};
use crate::error::Result;
use crate::store::cell::{PersistedCell, Subscription};
use crate::store::storage::StateStore;

/// Persisted key for the cached project list.
const PROJECTS_KEY: &str = "user_projects";

/// Read-through cache over the project endpoints.
///
/// `None` means "nothing cached": either never fetched or signed out.
/// Cached entries are served as-is, with no freshness check; only
/// [`ProjectCache::fetch_all`] and the miss path refresh them.
pub struct ProjectCache {
  api: Arc<ApiHandle>,
  cell: PersistedCell<Option<Vec<Project>>>,
  /// Keeps the sign-out wiring attached until the cache drops.
  _wiring: Subscription,
}

impl ProjectCache {
  /// Build the cache. Clearing `token` empties it, so another user signing
  /// in on the same machine never sees the previous user's projects.
  pub fn new(
    api: Arc<ApiHandle>,
    store: Arc<dyn StateStore>,
    token: &PersistedCell<Option<String>>,
  ) -> Self {
    let cell = {
      let token = token.clone();
      PersistedCell::with_activation(store, PROJECTS_KEY, None, move |projects| {
        let token_wiring = token.subscribe(move |current: &Option<String>| {
          if current.is_none() {
            projects.set(None);
          }
        });
        Box::new(move || drop(token_wiring))
      })
    };
    let wiring = cell.subscribe(|_| {});

    Self {
      api,
      cell,
      _wiring: wiring,
    }
  }

  /// Fetch the full list from the server, replacing the cache.
  pub async fn fetch_all(&self) -> Result<Vec<Project>> {
    let projects = self.api.projects().list().await?;
    self.cell.set(Some(projects.clone()));
    Ok(projects)
  }

  /// A project by id, served from the cache when present. A miss fetches
  /// the project and upserts it into the cache.
  pub async fn fetch_by_id(&self, id: &str) -> Result<Project> {
    if let Some(cached) = self.lookup(id) {
      debug!(id, "project served from cache");
      return Ok(cached);
    }

    let project = self.api.projects().get(id).await?;
    self.upsert(project.clone());
    Ok(project)
  }

  /// Create a project, then read it back through the cache so the new
  /// entry is mirrored locally.
  pub async fn create(&self, name: &str) -> Result<Project> {
    let created = self
      .api
      .projects()
      .create(&NewProject {
        name: name.to_string(),
        users: Vec::new(),
      })
      .await?;

    self.fetch_by_id(&created.id).await
  }

  /// Current cached list. `None` when signed out or never fetched.
  pub fn projects(&self) -> Option<Vec<Project>> {
    self.cell.get()
  }

  fn lookup(&self, id: &str) -> Option<Project> {
    self
      .cell
      .get()
      .and_then(|projects| projects.into_iter().find(|p| p.id.oid == id))
  }

  /// Replace the entry with the same id in place, keeping list order, or
  /// append when absent.
  fn upsert(&self, project: Project) {
    self.cell.update(|current| {
      let mut projects = current.unwrap_or_default();
      match projects.iter_mut().find(|p| p.id.oid == project.id.oid) {
        Some(existing) => *existing = project,
        None => projects.push(project),
      }
      Some(projects)
    });
  }
}
