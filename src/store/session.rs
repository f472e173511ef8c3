//! Session state: the auth token and the signed-in user's profile.
//!
//! Construction wires three things together and keeps them consistent for
//! the session's lifetime:
//!
//! * every token change rebuilds the API client, so the next request
//!   carries exactly the current token;
//! * a token appearing starts a background profile fetch, a token
//!   disappearing clears the stored profile;
//! * both cells persist locally, so a token from an earlier run signs the
//!   console back in and refreshes the profile on startup.

use std::sync::{Arc, Mutex};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::client::ApiHandle;
use crate::api::types::{LoginResponse, RegisterUser, User};
use crate::error::{Error, Result};
use crate::store::cell::{PersistedCell, Setter, Subscription};
use crate::store::storage::StateStore;

/// Persisted key for the bearer token.
const TOKEN_KEY: &str = "current_token_user";
/// Persisted key for the signed-in user's profile.
const USER_KEY: &str = "current_user";

type RefreshSlot = Arc<Mutex<Option<JoinHandle<()>>>>;

/// The signed-in session, if any.
pub struct Session {
  api: Arc<ApiHandle>,
  token: PersistedCell<Option<String>>,
  user: PersistedCell<Option<User>>,
  refresh: RefreshSlot,
  /// Keeps the token and profile wiring attached until the session drops.
  _wiring: Vec<Subscription>,
}

impl Session {
  /// Build the session over `api` and `store`. Must run inside a Tokio
  /// runtime: a persisted token immediately spawns a profile refresh.
  pub fn new(api: Arc<ApiHandle>, store: Arc<dyn StateStore>) -> Self {
    let token = PersistedCell::new(Arc::clone(&store), TOKEN_KEY, None);
    let refresh: RefreshSlot = Arc::new(Mutex::new(None));

    // Registered before the profile wiring: the client rebuild has to land
    // before any fetch spawned for the same token change.
    let client_wiring = {
      let api = Arc::clone(&api);
      token.subscribe(move |t: &Option<String>| api.set_auth_token(t.as_deref()))
    };

    let user = {
      let api = Arc::clone(&api);
      let token = token.clone();
      let refresh = Arc::clone(&refresh);
      PersistedCell::with_activation(
        Arc::clone(&store),
        USER_KEY,
        None,
        move |user: Setter<Option<User>>| {
          let api = Arc::clone(&api);
          let token_cell = token.clone();
          let refresh = Arc::clone(&refresh);
          let token_wiring = token.subscribe(move |current: &Option<String>| match current {
            None => user.set(None),
            Some(active) => {
              let task = tokio::spawn(refresh_profile(
                Arc::clone(&api),
                token_cell.clone(),
                user.clone(),
                active.clone(),
              ));
              let mut slot = match refresh.lock() {
                Ok(slot) => slot,
                Err(poisoned) => poisoned.into_inner(),
              };
              *slot = Some(task);
            }
          });
          Box::new(move || drop(token_wiring))
        },
      )
    };

    // Subscribing here activates the profile wiring for good.
    let user_wiring = user.subscribe(|_| {});

    Self {
      api,
      token,
      user,
      refresh,
      _wiring: vec![client_wiring, user_wiring],
    }
  }

  /// Exchange credentials for a session token.
  ///
  /// A response without both the success flag and a token leaves the
  /// stored token untouched and fails with [`Error::AuthDenied`].
  pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
    let response = self.api.auth().login(email, password).await?;
    let token = match &response.token {
      Some(token) if response.success => token.clone(),
      _ => return Err(Error::AuthDenied),
    };

    self.token.set(Some(token));
    Ok(response)
  }

  /// Create an account, then sign in with the new credentials.
  pub async fn register(&self, info: &RegisterUser) -> Result<LoginResponse> {
    self.api.auth().signup(info).await?;
    self.login(&info.email, &info.password).await
  }

  /// Drop the session token. The wiring clears the stored profile and
  /// strips auth from the API client.
  pub fn logout(&self) {
    self.token.set(None);
  }

  /// Current bearer token, if signed in.
  pub fn token(&self) -> Option<String> {
    self.token.get()
  }

  /// Profile of the signed-in user, as of the last completed refresh.
  pub fn user(&self) -> Option<User> {
    self.user.get()
  }

  /// Token cell, for stores that follow sign-in state.
  pub(crate) fn token_cell(&self) -> &PersistedCell<Option<String>> {
    &self.token
  }

  /// Wait for the most recently started profile refresh, if one is still
  /// running. The stored profile is in its final state afterwards.
  pub async fn profile_synced(&self) {
    let task = match self.refresh.lock() {
      Ok(mut slot) => slot.take(),
      Err(poisoned) => poisoned.into_inner().take(),
    };

    if let Some(task) = task {
      if let Err(e) = task.await {
        warn!(error = %e, "profile refresh task failed");
      }
    }
  }
}

/// Fetch the profile for `issued_token` and store it, unless the token
/// changed while the request was in flight.
async fn refresh_profile(
  api: Arc<ApiHandle>,
  token: PersistedCell<Option<String>>,
  user: Setter<Option<User>>,
  issued_token: String,
) {
  match api.auth().profile().await {
    Ok(profile) => {
      if token.get().as_deref() == Some(issued_token.as_str()) {
        user.set(Some(profile));
      } else {
        debug!("discarding profile fetched under a replaced token");
      }
    }
    // The cached profile stays as it was; the next token change retries.
    Err(e) => warn!(error = %e, "profile refresh failed"),
  }
}
