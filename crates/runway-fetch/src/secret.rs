//! Credentials for authenticated access.
//!
//! Tokens are looked up per request and never stored in configuration.

use std::fmt;

/// Supplies the bearer token for API access.
pub trait SecretProvider: Send + Sync {
    /// Current token, if any.
    fn token(&self) -> Option<String>;
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvSecretProvider {
    var: String,
}

impl EnvSecretProvider {
    /// Provider reading `var`.
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    /// Name of the variable consulted.
    #[must_use]
    pub fn var(&self) -> &str {
        &self.var
    }
}

impl SecretProvider for EnvSecretProvider {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
    }
}

/// A fixed token (or none).
#[derive(Clone, Default)]
pub struct StaticSecret(Option<String>);

impl StaticSecret {
    /// Provider always returning `token`.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    /// Provider that never has a token.
    #[must_use]
    pub fn none() -> Self {
        Self(None)
    }
}

impl SecretProvider for StaticSecret {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

impl fmt::Debug for StaticSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticSecret")
            .field("has_token", &self.0.is_some())
            .finish()
    }
}
