//! Diff depth stream subscriber.
//!
//! Each subscription owns one WebSocket connection to
//! `<ws_base>/ws/<symbol>@depth` and a feeder task that decodes frames into
//! the subscription queue. Connection loss ends the subscription; it is never
//! reopened from here.

use async_trait::async_trait;
use common::BinanceEnvironment;
use connector_core::{diff_channel, ConnectorError, DiffSender, DiffSource, DiffSubscription};
use futures_util::{SinkExt, StreamExt};
use metrics::SharedMetrics;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::parser::{parse_message, ParsedMessage};

pub(crate) type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Timeout for WebSocket connection attempts.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default capacity of each subscription queue.
const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Settings for [`BinanceDiffStream`].
#[derive(Debug, Clone)]
pub struct DiffStreamConfig {
    pub environment: BinanceEnvironment,
    /// Selects `@depth@<ms>ms` instead of the plain `@depth` stream.
    pub update_speed_ms: Option<u32>,
    pub connect_timeout: Duration,
    pub queue_capacity: usize,
}

impl Default for DiffStreamConfig {
    fn default() -> Self {
        Self {
            environment: BinanceEnvironment::default(),
            update_speed_ms: None,
            connect_timeout: CONNECTION_TIMEOUT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl DiffStreamConfig {
    pub fn new(environment: BinanceEnvironment) -> Self {
        Self {
            environment,
            ..Self::default()
        }
    }

    pub fn with_update_speed_ms(mut self, ms: u32) -> Self {
        self.update_speed_ms = Some(ms);
        self
    }

    /// Stream name for `symbol`, e.g. `btcusdt@depth`.
    pub fn stream_name(&self, symbol: &str) -> String {
        BinanceEnvironment::depth_stream_name(symbol, self.update_speed_ms)
    }

    /// Full WebSocket URL for `symbol`.
    pub fn stream_url(&self, symbol: &str) -> String {
        self.environment.stream_url(&self.stream_name(symbol))
    }
}

/// Opens Binance diff depth subscriptions.
#[derive(Debug, Clone)]
pub struct BinanceDiffStream {
    config: DiffStreamConfig,
    metrics: Option<SharedMetrics>,
}

impl BinanceDiffStream {
    pub fn new(config: DiffStreamConfig) -> Self {
        Self {
            config,
            metrics: None,
        }
    }

    /// Count frames, parse failures and socket errors into `metrics`.
    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &DiffStreamConfig {
        &self.config
    }
}

/// Connect to `url`, failing after `timeout`.
pub(crate) async fn connect_with_timeout(
    url: &str,
    timeout: Duration,
) -> Result<WsStream, ConnectorError> {
    match tokio::time::timeout(timeout, connect_async(url)).await {
        Ok(Ok((stream, _))) => Ok(stream),
        Ok(Err(e)) => Err(ConnectorError::WebSocket(e.to_string())),
        Err(_) => Err(ConnectorError::WebSocket("connection timeout".to_string())),
    }
}

#[async_trait]
impl DiffSource for BinanceDiffStream {
    async fn subscribe(&self, symbol: &str) -> Result<DiffSubscription, ConnectorError> {
        let stream = self.config.stream_name(symbol);
        let url = self.config.stream_url(symbol);
        info!(url = %url, "Connecting to Binance depth stream");

        let ws_stream = match connect_with_timeout(&url, self.config.connect_timeout).await {
            Ok(ws) => ws,
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.inc_websocket_errors();
                }
                return Err(e);
            }
        };

        info!(stream = %stream, "Connected to Binance depth stream");

        let (tx, subscription) = diff_channel(stream.clone(), self.config.queue_capacity);
        let feeder = tokio::spawn(run_feeder(ws_stream, stream, tx, self.metrics.clone()));
        Ok(subscription.with_feeder(feeder))
    }
}

/// Read frames until the socket ends or the subscription is dropped.
async fn run_feeder(
    ws_stream: WsStream,
    stream: String,
    sender: DiffSender,
    metrics: Option<SharedMetrics>,
) {
    let (mut write, mut read) = ws_stream.split();

    let terminal = loop {
        let msg = tokio::select! {
            _ = sender.closed() => {
                debug!(stream = %stream, "Subscription dropped, closing socket");
                let _ = write.close().await;
                return;
            }
            msg = read.next() => msg,
        };

        let msg = match msg {
            Some(Ok(m)) => m,
            Some(Err(e)) => {
                error!(stream = %stream, error = %e, "WebSocket error");
                if let Some(m) = &metrics {
                    m.inc_websocket_errors();
                }
                break ConnectorError::WebSocket(e.to_string());
            }
            None => {
                info!(stream = %stream, "WebSocket stream ended");
                break ConnectorError::ConnectionClosed;
            }
        };

        match msg {
            Message::Text(text) => {
                if let Some(m) = &metrics {
                    m.inc_messages_received();
                }
                let item = match parse_message(&text) {
                    Ok(ParsedMessage::DepthUpdate(event)) => Ok(event),
                    Ok(ParsedMessage::Unknown) => continue,
                    Err(e) => {
                        if let Some(m) = &metrics {
                            m.inc_parse_errors();
                        }
                        warn!(stream = %stream, error = %e, "Failed to parse depth message");
                        Err(ConnectorError::Parse(e.to_string()))
                    }
                };
                if sender.send(item).await.is_err() {
                    debug!(stream = %stream, "Receiver dropped, stopping feeder");
                    return;
                }
            }
            Message::Ping(data) => {
                debug!(stream = %stream, "Received Ping, sending Pong");
                if let Err(e) = write.send(Message::Pong(data)).await {
                    warn!(stream = %stream, error = %e, "Failed to send Pong");
                    if let Some(m) = &metrics {
                        m.inc_websocket_errors();
                    }
                    break ConnectorError::WebSocket(e.to_string());
                }
            }
            Message::Close(_) => {
                info!(stream = %stream, "WebSocket closed by server");
                break ConnectorError::ConnectionClosed;
            }
            _ => {}
        }
    };

    // Last item; the queue ends when the sender drops.
    let _ = sender.send(Err(terminal)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use connector_core::DiffItem;
    use rust_decimal_macros::dec;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::accept_async;

    type ServerStream = WebSocketStream<TcpStream>;

    const DEPTH_UPDATE: &str = r#"{"e":"depthUpdate","E":1,"s":"BTCUSDT","U":10,"u":11,"b":[["100.00","2"]],"a":[]}"#;

    /// Feed a subscription from a local WebSocket server.
    async fn local_feed(metrics: SharedMetrics) -> (DiffSubscription, ServerStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            accept_async(tcp).await.unwrap()
        });

        let url = format!("ws://{addr}/ws/btcusdt@depth");
        let client = connect_with_timeout(&url, Duration::from_secs(2))
            .await
            .unwrap();
        let (tx, subscription) = diff_channel("btcusdt@depth", 16);
        let feeder = tokio::spawn(run_feeder(
            client,
            "btcusdt@depth".to_string(),
            tx,
            Some(metrics),
        ));
        (subscription.with_feeder(feeder), server.await.unwrap())
    }

    async fn next_item(subscription: &mut DiffSubscription) -> Option<DiffItem> {
        tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .expect("timed out waiting for diff item")
    }

    #[test]
    fn test_stream_url_production() {
        let config = DiffStreamConfig::new(BinanceEnvironment::Production);
        assert_eq!(
            config.stream_url("BTCUSDT"),
            "wss://stream.binance.com:9443/ws/btcusdt@depth"
        );
    }

    #[test]
    fn test_stream_url_testnet_with_speed() {
        let config = DiffStreamConfig::new(BinanceEnvironment::Testnet).with_update_speed_ms(100);
        assert_eq!(config.stream_name("ETHBTC"), "ethbtc@depth@100ms");
        assert_eq!(
            config.stream_url("ETHBTC"),
            "wss://testnet.binance.vision/ws/ethbtc@depth@100ms"
        );
    }

    #[test]
    fn test_default_config() {
        let config = DiffStreamConfig::default();
        assert_eq!(config.environment, BinanceEnvironment::Production);
        assert_eq!(config.update_speed_ms, None);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert_eq!(config.queue_capacity, 1024);
    }

    #[tokio::test]
    async fn test_connect_failure_is_websocket_error() {
        // Nothing listens on the discard port of the loopback interface.
        let err = connect_with_timeout(
            "ws://127.0.0.1:9/ws/btcusdt@depth",
            Duration::from_millis(500),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ConnectorError::WebSocket(_)));
    }

    #[tokio::test]
    async fn test_feeder_forwards_events_and_ends_on_close() {
        let metrics = metrics::create_metrics();
        let (mut subscription, mut server) = local_feed(metrics.clone()).await;

        server.send(Message::Text(DEPTH_UPDATE.into())).await.unwrap();
        server.send(Message::Text("{".into())).await.unwrap();
        server
            .send(Message::Text(r#"{"result":null,"id":1}"#.into()))
            .await
            .unwrap();
        server.send(Message::Text(DEPTH_UPDATE.into())).await.unwrap();
        server.close(None).await.unwrap();

        let event = next_item(&mut subscription).await.unwrap().unwrap();
        assert_eq!(event.symbol, "BTCUSDT");
        assert_eq!(event.update_range(), Some((10, 11)));
        assert_eq!(event.bids, vec![(dec!(100.00), dec!(2))]);

        // A bad frame is reported and the stream goes on.
        match next_item(&mut subscription).await {
            Some(Err(ConnectorError::Parse(_))) => {}
            other => panic!("Expected parse error, got {other:?}"),
        }
        assert!(next_item(&mut subscription).await.unwrap().is_ok());

        match next_item(&mut subscription).await {
            Some(Err(ConnectorError::ConnectionClosed)) => {}
            other => panic!("Expected ConnectionClosed, got {other:?}"),
        }
        assert!(next_item(&mut subscription).await.is_none());

        assert_eq!(metrics.messages_received(), 4);
        assert_eq!(metrics.parse_errors(), 1);
    }

    #[tokio::test]
    async fn test_feeder_ends_with_one_error_when_socket_drops() {
        let metrics = metrics::create_metrics();
        let (mut subscription, server) = local_feed(metrics).await;

        drop(server);

        match next_item(&mut subscription).await {
            Some(Err(e)) => assert!(!e.is_recoverable()),
            other => panic!("Expected terminal error, got {other:?}"),
        }
        assert!(next_item(&mut subscription).await.is_none());
    }

    #[tokio::test]
    async fn test_feeder_answers_ping() {
        let (_subscription, mut server) = local_feed(metrics::create_metrics()).await;

        server.send(Message::Ping(vec![1, 2, 3])).await.unwrap();

        let pong = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match server.next().await {
                    Some(Ok(Message::Pong(data))) => return data,
                    Some(Ok(_)) => continue,
                    other => panic!("Expected Pong, got {other:?}"),
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(pong, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_dropping_subscription_closes_socket() {
        let (subscription, mut server) = local_feed(metrics::create_metrics()).await;

        drop(subscription);

        let closed = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                match server.next().await {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => return,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await;
        assert!(closed.is_ok());
    }
}
