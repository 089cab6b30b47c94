//! API credential management.
//!
//! The secret is optional so that market-data-only sessions can run with just
//! an API key (or nothing at all); signing fails loudly when it is absent.

use crate::error::AuthError;
use secrecy::{ExposeSecret, SecretString};

/// API credentials for authenticated requests.
#[derive(Clone)]
pub struct ApiCredentials {
    api_key: String,
    secret_key: Option<SecretString>,
}

impl ApiCredentials {
    /// Load credentials from environment variables.
    ///
    /// `BINANCE_API_KEY` is required. `BINANCE_SECRET_KEY` is optional;
    /// without it only API-key requests are possible.
    ///
    /// # Errors
    /// Returns `AuthError::MissingEnvVar` if the API key is not set.
    pub fn from_env() -> Result<Self, AuthError> {
        // Load .env file if present (ignores errors if file doesn't exist)
        dotenvy::dotenv().ok();

        let api_key = std::env::var("BINANCE_API_KEY")
            .map_err(|_| AuthError::MissingEnvVar("BINANCE_API_KEY".into()))?;

        let credentials = match std::env::var("BINANCE_SECRET_KEY") {
            Ok(secret) => Self::new(api_key, secret),
            Err(_) => Self::api_key_only(api_key),
        };

        Ok(credentials)
    }

    /// Create credentials from explicit values.
    ///
    /// A blank secret (e.g. `BINANCE_SECRET_KEY=` left empty in `.env`) counts
    /// as no secret, so signing fails instead of using an empty HMAC key.
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        let secret_key = secret_key.into();
        Self {
            api_key: api_key.into(),
            secret_key: (!secret_key.trim().is_empty()).then(|| SecretString::from(secret_key)),
        }
    }

    /// Credentials that can authenticate by key but cannot sign.
    pub fn api_key_only(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: None,
        }
    }

    /// Get the API key (public, safe to log).
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Whether a secret is available for signing.
    pub fn can_sign(&self) -> bool {
        self.secret_key.is_some()
    }

    /// Expose the secret key for signing.
    ///
    /// **WARNING**: Only use this for cryptographic operations.
    /// Never log or display the return value.
    ///
    /// # Errors
    /// Returns `AuthError::MissingSecret` when no secret was configured.
    pub fn expose_secret(&self) -> Result<&str, AuthError> {
        self.secret_key
            .as_ref()
            .map(|s| s.expose_secret())
            .ok_or(AuthError::MissingSecret)
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let secret = if self.secret_key.is_some() {
            "[REDACTED]"
        } else {
            "[NONE]"
        };
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &secret)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_new() {
        let creds = ApiCredentials::new("my_api_key", "my_secret");
        assert_eq!(creds.api_key(), "my_api_key");
        assert!(creds.can_sign());
        assert_eq!(creds.expose_secret().unwrap(), "my_secret");
    }

    #[test]
    fn test_api_key_only_has_no_secret() {
        let creds = ApiCredentials::api_key_only("my_api_key");
        assert!(!creds.can_sign());
        assert!(matches!(
            creds.expose_secret(),
            Err(AuthError::MissingSecret)
        ));
    }

    #[test]
    fn test_blank_secret_cannot_sign() {
        for blank in ["", "   ", "\t\n"] {
            let creds = ApiCredentials::new("my_api_key", blank);
            assert!(!creds.can_sign());
            assert!(matches!(
                creds.expose_secret(),
                Err(AuthError::MissingSecret)
            ));
            assert!(format!("{:?}", creds).contains("[NONE]"));
        }
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ApiCredentials::new("my_api_key", "super_secret_key");
        let debug_str = format!("{:?}", creds);

        assert!(debug_str.contains("my_api_key"));
        assert!(!debug_str.contains("super_secret_key"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
