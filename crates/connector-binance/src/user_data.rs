//! User data stream client.
//!
//! Creates a listen key over REST, connects to `<ws_base>/ws/<listenKey>` and
//! keeps the key alive on a fixed interval. Messages are classified by their
//! `e` field; payloads stay raw JSON.

use binance_rest::{BinanceRestClient, BinanceRestError};
use connector_core::ConnectorError;
use futures_util::{SinkExt, StreamExt};
use metrics::SharedMetrics;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::stream::{connect_with_timeout, WsStream};

/// Listen key refresh interval (30 minutes).
/// Keys expire after 60 minutes, so we refresh at half that time.
const LISTEN_KEY_REFRESH_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Connection timeout for WebSocket.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Classified user data message.
#[derive(Debug, Clone, PartialEq)]
pub enum UserDataMessage {
    /// `outboundAccountInfo` balance snapshot.
    AccountInfo(Value),
    /// `executionReport` order update.
    ExecutionReport(Value),
    /// Any other event type.
    Other(Value),
}

impl UserDataMessage {
    pub fn payload(&self) -> &Value {
        match self {
            Self::AccountInfo(v) | Self::ExecutionReport(v) | Self::Other(v) => v,
        }
    }
}

/// Decode and classify one user data frame.
pub fn parse_user_data_message(text: &str) -> Result<UserDataMessage, serde_json::Error> {
    let payload = crate::parser::unwrap_payload(serde_json::from_str(text)?)?;

    let message = match payload.get("e").and_then(|v| v.as_str()) {
        Some("outboundAccountInfo") => UserDataMessage::AccountInfo(payload),
        Some("executionReport") => UserDataMessage::ExecutionReport(payload),
        _ => UserDataMessage::Other(payload),
    };
    Ok(message)
}

/// One item of a user data subscription; errors other than `Parse` are final.
pub type UserDataItem = Result<UserDataMessage, ConnectorError>;

#[derive(Debug, Clone)]
pub struct UserDataConfig {
    pub keepalive_interval: Duration,
    pub connect_timeout: Duration,
    pub queue_capacity: usize,
}

impl Default for UserDataConfig {
    fn default() -> Self {
        Self {
            keepalive_interval: LISTEN_KEY_REFRESH_INTERVAL,
            connect_timeout: CONNECTION_TIMEOUT,
            queue_capacity: 256,
        }
    }
}

/// Live user data stream.
///
/// [`close`](Self::close) stops the socket and deletes the listen key.
/// Dropping without closing stops the socket only; the key then lapses on
/// the exchange side.
#[derive(Debug)]
pub struct UserDataSubscription {
    receiver: mpsc::Receiver<UserDataItem>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl UserDataSubscription {
    /// Next message, or `None` once the stream has ended.
    pub async fn next(&mut self) -> Option<UserDataItem> {
        self.receiver.recv().await
    }

    /// Close the socket and the listen key, waiting for both.
    pub async fn close(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "User data task ended abnormally");
            }
        }
    }
}

impl Drop for UserDataSubscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Open the user data stream for the account behind `rest_client`.
///
/// Requires an API key; the listen key request fails otherwise.
pub async fn open_user_data_stream(
    rest_client: Arc<BinanceRestClient>,
    config: UserDataConfig,
    metrics: SharedMetrics,
) -> Result<UserDataSubscription, ConnectorError> {
    let listen_key = rest_client
        .create_listen_key()
        .await
        .map_err(|e| ConnectorError::ListenKey(e.to_string()))?;

    let url = rest_client.environment().stream_url(&listen_key);
    let ws_stream = match connect_with_timeout(&url, config.connect_timeout).await {
        Ok(ws) => ws,
        Err(e) => {
            metrics.inc_websocket_errors();
            close_listen_key(&rest_client, &listen_key).await;
            return Err(e);
        }
    };

    info!("Connected to user data stream");
    metrics.inc_subscriptions_opened();

    let (tx, rx) = mpsc::channel(config.queue_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let session = UserDataSession {
        listen_key,
        rest_client,
        sender: tx,
        metrics,
        keepalive_interval: config.keepalive_interval,
    };
    let task = tokio::spawn(session.run(ws_stream, shutdown_rx));

    Ok(UserDataSubscription {
        receiver: rx,
        shutdown_tx,
        task: Some(task),
    })
}

async fn close_listen_key(rest_client: &BinanceRestClient, listen_key: &str) {
    if let Err(e) = rest_client.close_listen_key(listen_key).await {
        warn!(error = %e, "Failed to close listen key");
    }
}

struct UserDataSession {
    listen_key: String,
    rest_client: Arc<BinanceRestClient>,
    sender: mpsc::Sender<UserDataItem>,
    metrics: SharedMetrics,
    keepalive_interval: Duration,
}

enum Wake {
    Shutdown,
    Keepalive,
    Frame(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
}

impl UserDataSession {
    async fn run(self, ws_stream: WsStream, mut shutdown_rx: watch::Receiver<bool>) {
        let (mut write, mut read) = ws_stream.split();
        let mut keepalive = tokio::time::interval(self.keepalive_interval);
        // Skip the first immediate tick
        keepalive.tick().await;

        let terminal = loop {
            let wake = tokio::select! {
                biased;

                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        Wake::Shutdown
                    } else {
                        continue;
                    }
                }
                _ = self.sender.closed() => Wake::Shutdown,
                _ = keepalive.tick() => Wake::Keepalive,
                frame = read.next() => Wake::Frame(frame),
            };

            match wake {
                Wake::Shutdown => {
                    info!("Closing user data stream");
                    let _ = write.close().await;
                    close_listen_key(&self.rest_client, &self.listen_key).await;
                    self.metrics.inc_subscriptions_closed();
                    return;
                }
                Wake::Keepalive => {
                    match self.rest_client.keepalive_listen_key(&self.listen_key).await {
                        Ok(()) => debug!("Listen key refreshed"),
                        Err(BinanceRestError::ListenKeyExpired) => {
                            warn!("Listen key expired during refresh");
                            break ConnectorError::ListenKey("listen key expired".to_string());
                        }
                        // Next tick tries again.
                        Err(e) => warn!(error = %e, "Failed to refresh listen key"),
                    }
                }
                Wake::Frame(Some(Ok(Message::Text(text)))) => {
                    self.metrics.inc_messages_received();
                    let item = parse_user_data_message(&text).map_err(|e| {
                        self.metrics.inc_parse_errors();
                        warn!(error = %e, "Failed to parse user data message");
                        ConnectorError::Parse(e.to_string())
                    });
                    if self.sender.send(item).await.is_err() {
                        break ConnectorError::ChannelClosed;
                    }
                }
                Wake::Frame(Some(Ok(Message::Ping(data)))) => {
                    debug!("Received Ping, sending Pong");
                    if let Err(e) = write.send(Message::Pong(data)).await {
                        warn!(error = %e, "Failed to send Pong");
                        self.metrics.inc_websocket_errors();
                        break ConnectorError::WebSocket(e.to_string());
                    }
                }
                Wake::Frame(Some(Ok(Message::Close(_)))) | Wake::Frame(None) => {
                    info!("User data stream closed by server");
                    break ConnectorError::ConnectionClosed;
                }
                Wake::Frame(Some(Err(e))) => {
                    error!(error = %e, "WebSocket error");
                    self.metrics.inc_websocket_errors();
                    break ConnectorError::WebSocket(e.to_string());
                }
                Wake::Frame(Some(Ok(_))) => {}
            }
        };

        self.metrics.inc_subscriptions_closed();
        let _ = self.sender.send(Err(terminal)).await;
        close_listen_key(&self.rest_client, &self.listen_key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::BinanceEnvironment;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::{accept_async, WebSocketStream};

    type ServerStream = WebSocketStream<TcpStream>;

    /// Run a session against a local WebSocket server.
    ///
    /// The REST client has no API key, so listen key calls fail without
    /// leaving the process.
    async fn local_session() -> (UserDataSubscription, ServerStream, SharedMetrics) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            accept_async(tcp).await.unwrap()
        });

        let url = format!("ws://{addr}/ws/test-listen-key");
        let client = connect_with_timeout(&url, Duration::from_secs(2))
            .await
            .unwrap();

        let metrics = metrics::create_metrics();
        let (tx, rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let session = UserDataSession {
            listen_key: "test-listen-key".to_string(),
            rest_client: Arc::new(BinanceRestClient::new(BinanceEnvironment::Testnet).unwrap()),
            sender: tx,
            metrics: metrics.clone(),
            keepalive_interval: Duration::from_secs(3600),
        };
        let task = tokio::spawn(session.run(client, shutdown_rx));
        let subscription = UserDataSubscription {
            receiver: rx,
            shutdown_tx,
            task: Some(task),
        };
        (subscription, server.await.unwrap(), metrics)
    }

    async fn next_item(subscription: &mut UserDataSubscription) -> Option<UserDataItem> {
        tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .expect("timed out waiting for user data item")
    }

    #[test]
    fn test_classify_account_info() {
        let json = r#"{"e":"outboundAccountInfo","E":1499405658849,"B":[{"a":"BTC","f":"1.0","l":"0.0"}]}"#;
        let msg = parse_user_data_message(json).unwrap();
        assert!(matches!(msg, UserDataMessage::AccountInfo(_)));
        assert_eq!(msg.payload()["B"][0]["a"], "BTC");
    }

    #[test]
    fn test_classify_execution_report() {
        let json = r#"{"e":"executionReport","s":"ETHBTC","c":"abc","X":"NEW"}"#;
        let msg = parse_user_data_message(json).unwrap();
        assert!(matches!(msg, UserDataMessage::ExecutionReport(_)));
        assert_eq!(msg.payload()["s"], "ETHBTC");
    }

    #[test]
    fn test_other_events_kept_raw() {
        let json = r#"{"e":"balanceUpdate","a":"BTC","d":"100.00000000"}"#;
        match parse_user_data_message(json).unwrap() {
            UserDataMessage::Other(v) => assert_eq!(v["d"], "100.00000000"),
            other => panic!("Expected Other, got {other:?}"),
        }
    }

    #[test]
    fn test_combined_envelope_unwrapped() {
        let json = r#"{"stream":"key","data":{"e":"executionReport","s":"BNBBTC"}}"#;
        assert!(matches!(
            parse_user_data_message(json).unwrap(),
            UserDataMessage::ExecutionReport(_)
        ));
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(parse_user_data_message("{").is_err());
    }

    #[tokio::test]
    async fn test_open_without_api_key_fails() {
        let rest = Arc::new(BinanceRestClient::new(BinanceEnvironment::Testnet).unwrap());
        let result =
            open_user_data_stream(rest, UserDataConfig::default(), metrics::create_metrics())
                .await;
        assert!(matches!(result, Err(ConnectorError::ListenKey(_))));
    }

    #[tokio::test]
    async fn test_session_delivers_messages_until_server_closes() {
        let (mut subscription, mut server, metrics) = local_session().await;

        server
            .send(Message::Text(r#"{"e":"executionReport","s":"BNBBTC"}"#.into()))
            .await
            .unwrap();
        server.send(Message::Text("not json".into())).await.unwrap();
        server
            .send(Message::Text(r#"{"e":"outboundAccountInfo","B":[]}"#.into()))
            .await
            .unwrap();
        server.close(None).await.unwrap();

        assert!(matches!(
            next_item(&mut subscription).await,
            Some(Ok(UserDataMessage::ExecutionReport(_)))
        ));
        assert!(matches!(
            next_item(&mut subscription).await,
            Some(Err(ConnectorError::Parse(_)))
        ));
        assert!(matches!(
            next_item(&mut subscription).await,
            Some(Ok(UserDataMessage::AccountInfo(_)))
        ));
        assert!(matches!(
            next_item(&mut subscription).await,
            Some(Err(ConnectorError::ConnectionClosed))
        ));
        assert!(next_item(&mut subscription).await.is_none());

        assert_eq!(metrics.messages_received(), 3);
        assert_eq!(metrics.parse_errors(), 1);
        assert_eq!(metrics.subscriptions_closed(), 1);
    }

    #[tokio::test]
    async fn test_close_sends_close_frame_and_finishes() {
        let (subscription, mut server, metrics) = local_session().await;

        tokio::time::timeout(Duration::from_secs(2), subscription.close())
            .await
            .unwrap();
        assert_eq!(metrics.subscriptions_closed(), 1);

        let frame = tokio::time::timeout(Duration::from_secs(2), server.next())
            .await
            .unwrap();
        assert!(matches!(frame, Some(Ok(Message::Close(_))) | None));
    }
}
