//! Credentials attached to every request as an `Authorization` header.
//!
//! Credentials are redacted in Debug output.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, ErrorKind, Result};

/// Authentication scheme and secret for an API session.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    /// HTTP Basic with a username and password, encoded on use.
    Basic { username: String, password: String },
    /// HTTP Basic with an already base64-encoded `user:secret` token.
    BasicToken(String),
    /// OAuth-style bearer token.
    Bearer(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", &redact(username))
                .field("password", &"[REDACTED]")
                .finish(),
            Auth::BasicToken(_) => f.debug_tuple("BasicToken").field(&"[REDACTED]").finish(),
            Auth::Bearer(_) => f.debug_tuple("Bearer").field(&"[REDACTED]").finish(),
        }
    }
}

fn redact(value: &str) -> String {
    if value.len() <= 4 {
        "[REDACTED]".to_string()
    } else {
        format!("{}...[REDACTED]", &value[..value.char_indices().nth(4).map_or(0, |(i, _)| i)])
    }
}

impl Auth {
    /// API-key authentication: the key is the Basic username, the password
    /// is empty.
    pub fn basic_api_key(api_key: impl Into<String>) -> Self {
        Auth::Basic {
            username: api_key.into(),
            password: String::new(),
        }
    }

    /// Basic authentication from a prebuilt token.
    pub fn basic_token(token: impl Into<String>) -> Self {
        Auth::BasicToken(token.into())
    }

    /// Bearer token authentication.
    pub fn bearer(token: impl Into<String>) -> Self {
        Auth::Bearer(token.into())
    }

    /// Read a secret from the environment, failing with a configuration
    /// error naming the variable when it is unset or blank.
    pub fn secret_from_env(var: &str) -> Result<String> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(Error::new(ErrorKind::Config(format!(
                "environment variable {} is not set",
                var
            )))),
        }
    }

    /// The `Authorization` header value.
    pub fn header_value(&self) -> String {
        match self {
            Auth::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
            }
            Auth::BasicToken(token) => format!("Basic {}", token),
            Auth::Bearer(token) => format!("Bearer {}", token),
        }
    }
}
