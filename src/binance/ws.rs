use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite, MaybeTlsStream, WebSocketStream};

use super::rest::BinanceRestClient;
use super::types::BinanceKlineEvent;
use crate::config::BinanceConfig;
use crate::error::TrackerError;
use crate::feed::{MarketFeed, ReceiveOutcome};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Turn one text frame from the kline stream into a receive outcome.
pub fn parse_kline_message(text: &str) -> ReceiveOutcome {
    match serde_json::from_str::<BinanceKlineEvent>(text) {
        Ok(event) => ReceiveOutcome::Tick(event.to_tick()),
        Err(e) => ReceiveOutcome::TickError(e.to_string()),
    }
}

pub struct BinanceKlineFeed {
    rest: BinanceRestClient,
    url: String,
    stream: Option<WsStream>,
}

impl BinanceKlineFeed {
    pub fn new(config: &BinanceConfig) -> Result<Self, TrackerError> {
        Ok(Self {
            rest: BinanceRestClient::new(&config.rest_base_url)?,
            url: format!(
                "{}/{}",
                config.ws_base_url.trim_end_matches('/'),
                config.kline_stream()
            ),
            stream: None,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl MarketFeed for BinanceKlineFeed {
    async fn open_session(&mut self) -> Result<(), TrackerError> {
        self.rest
            .ping()
            .await
            .map_err(|e| TrackerError::Initialization(format!("ping failed: {}", e)))?;
        let server_time = self
            .rest
            .server_time()
            .await
            .map_err(|e| TrackerError::Initialization(format!("server time failed: {}", e)))?;
        let drift_ms = chrono::Utc::now().timestamp_millis() - server_time as i64;
        tracing::info!(server_time, drift_ms, "Binance session established");
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<(), TrackerError> {
        self.close().await;
        tracing::info!(url = %self.url, "Connecting");
        let (ws_stream, _resp) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| TrackerError::Connection(format!("WebSocket connect failed: {}", e)))?;
        self.stream = Some(ws_stream);
        Ok(())
    }

    async fn recv(&mut self) -> ReceiveOutcome {
        let Some(stream) = self.stream.as_mut() else {
            return ReceiveOutcome::ConnectionError("not subscribed".to_string());
        };

        let outcome = loop {
            match stream.next().await {
                Some(Ok(tungstenite::Message::Text(text))) => break parse_kline_message(&text),
                Some(Ok(tungstenite::Message::Close(frame))) => {
                    break ReceiveOutcome::ConnectionError(format!(
                        "server closed connection: {:?}",
                        frame
                    ));
                }
                // tokio-tungstenite answers pings itself
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    break ReceiveOutcome::ConnectionError(format!("WebSocket read error: {}", e));
                }
                None => break ReceiveOutcome::ConnectionError("WebSocket stream ended".to_string()),
            }
        };

        if matches!(outcome, ReceiveOutcome::ConnectionError(_)) {
            self.stream = None;
        }
        outcome
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                tracing::debug!(error = %e, "WebSocket close failed");
            }
        }
    }
}
