use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    /// No API key configured for a request that needs one.
    #[error("API key is not configured")]
    MissingApiKey,

    /// No API secret configured for a request that must be signed.
    #[error("API secret is not configured, refusing to sign request")]
    MissingSecret,

    /// The secret could not be used as an HMAC key.
    #[error("Invalid signing key")]
    InvalidKey,
}
