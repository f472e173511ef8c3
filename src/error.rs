use thiserror::Error;

/// Errors surfaced by the API and session layers.
///
/// Local persistence failures never show up here: the state store is a
/// best-effort cache and treats every failure as a miss.
#[derive(Error, Debug)]
pub enum Error {
  /// Network-level failure, passed through from the HTTP client.
  #[error("request failed: {0}")]
  Transport(#[from] reqwest::Error),

  /// The server answered with a non-success status.
  #[error("server returned {status}: {message}")]
  Status {
    status: reqwest::StatusCode,
    message: String,
  },

  /// A response body did not match the shape the endpoint promises.
  #[error("malformed response: {0}")]
  Decode(#[from] serde_json::Error),

  /// Login response carried no success flag or no token.
  #[error("server denied request")]
  AuthDenied,

  /// The console cannot talk to the platform with the given settings.
  #[error("configuration error: {0}")]
  Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
