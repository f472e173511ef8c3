//! Auth endpoints.

use serde_json::json;

use super::client::ApiHandle;
use super::types::{LoginResponse, RegisterUser, User};
use crate::error::Result;

/// Accessor for the `/auth` endpoints.
pub struct AuthApi<'a> {
  handle: &'a ApiHandle,
}

impl ApiHandle {
  /// Auth endpoints.
  pub fn auth(&self) -> AuthApi<'_> {
    AuthApi { handle: self }
  }
}

impl AuthApi<'_> {
  /// Exchange credentials for a bearer token.
  pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
    self
      .handle
      .client()
      .post(
        &["auth", "login"],
        json!({ "email": email, "password": password }),
      )
      .await
  }

  /// Create an account. Signing up does not authenticate; the response is
  /// an insert acknowledgement the console has no use for.
  pub async fn signup(&self, info: &RegisterUser) -> Result<()> {
    let _: serde_json::Value = self
      .handle
      .client()
      .post(&["auth", "signup"], serde_json::to_value(info)?)
      .await?;
    Ok(())
  }

  /// Profile of the user the current token belongs to.
  pub async fn profile(&self) -> Result<User> {
    self.handle.client().get(&["auth", "profile"]).await
  }
}
