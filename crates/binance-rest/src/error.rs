//! Binance REST API error types.

use auth::AuthError;
use connector_core::ConnectorError;
use rest_client::RestError;
use thiserror::Error;

/// Errors that can occur when interacting with the Binance REST API.
#[derive(Debug, Error)]
pub enum BinanceRestError {
    /// REST client error (network, timeout, unexpected status).
    #[error("REST client error: {0}")]
    Rest(RestError),

    /// Credentials missing or unusable; the request was not sent.
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Binance API error (returned by the exchange).
    #[error("Binance API error {code}: {message}")]
    ApiError {
        /// Binance error code.
        code: i32,
        /// Error message.
        message: String,
    },

    /// Listen key has expired or is invalid.
    #[error("Listen key expired or invalid")]
    ListenKeyExpired,
}

impl BinanceRestError {
    /// Parse a Binance API error response.
    ///
    /// Binance returns errors in the format: `{"code": -1000, "msg": "..."}`.
    /// Returns `None` when the body is not in that shape.
    pub fn from_api_response(body: &str) -> Option<Self> {
        #[derive(serde::Deserialize)]
        struct ApiError {
            code: i32,
            msg: String,
        }

        serde_json::from_str::<ApiError>(body)
            .ok()
            .map(|err| Self::classify_api_error(err.code, err.msg))
    }

    fn classify_api_error(code: i32, message: String) -> Self {
        match code {
            -1125 => Self::ListenKeyExpired,
            _ => Self::ApiError { code, message },
        }
    }
}

impl From<RestError> for BinanceRestError {
    fn from(err: RestError) -> Self {
        err.body()
            .and_then(Self::from_api_response)
            .unwrap_or(Self::Rest(err))
    }
}

impl From<BinanceRestError> for ConnectorError {
    fn from(err: BinanceRestError) -> Self {
        ConnectorError::Snapshot(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_with_api_body_is_classified() {
        let rest = RestError::HttpError {
            status: 400,
            body: r#"{"code":-1121,"msg":"Invalid symbol."}"#.into(),
        };
        match BinanceRestError::from(rest) {
            BinanceRestError::ApiError { code, message } => {
                assert_eq!(code, -1121);
                assert_eq!(message, "Invalid symbol.");
            }
            other => panic!("Expected ApiError, got {other:?}"),
        }
    }

    #[test]
    fn test_listen_key_error_code() {
        let err = BinanceRestError::from_api_response(
            r#"{"code":-1125,"msg":"This listenKey does not exist."}"#,
        );
        assert!(matches!(err, Some(BinanceRestError::ListenKeyExpired)));
    }

    #[test]
    fn test_non_api_body_stays_rest_error() {
        let rest = RestError::HttpError {
            status: 502,
            body: "<html>Bad Gateway</html>".into(),
        };
        assert!(matches!(
            BinanceRestError::from(rest),
            BinanceRestError::Rest(RestError::HttpError { status: 502, .. })
        ));
    }

    #[test]
    fn test_converts_to_snapshot_connector_error() {
        let err: ConnectorError = BinanceRestError::Rest(RestError::Timeout).into();
        assert!(matches!(err, ConnectorError::Snapshot(msg) if msg.contains("timeout")));
    }
}
