//! Dashboard-side session: pulls the static snapshot once, keeps a push
//! channel open and drives its own refresh cadence.

use crate::error::SystemError;
use crate::metrics::data::{DynamicSnapshot, StaticSnapshot};
use crate::web::messages::{ClientMessage, ServerMessage};
use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::time::Duration;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Settings for [`watch`].
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Base HTTP URL of the server, e.g. `http://localhost:8080`
    pub base_url: String,
    /// How often to send `requestDynamic`
    pub interval: Duration,
    /// Pause before reopening a closed push channel
    pub reconnect_delay: Duration,
}

impl WatchConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            interval: Duration::from_millis(crate::DEFAULT_REFRESH_MS),
            reconnect_delay: Duration::from_millis(crate::DEFAULT_RECONNECT_DELAY_MS),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn static_url(&self) -> String {
        format!("{}/api/static", self.base_url)
    }

    /// Push channel URL; `http` becomes `ws` and `https` becomes `wss`.
    pub fn push_url(&self) -> String {
        if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}/", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}/", rest)
        } else {
            format!("{}/", self.base_url)
        }
    }
}

/// What a client knows about one host.
///
/// The static snapshot is pinned once received and survives reconnects; a
/// later static message replaces it.
#[derive(Debug, Default, Clone)]
pub struct DashboardSession {
    static_data: Option<StaticSnapshot>,
    dynamic_data: Option<DynamicSnapshot>,
    last_pong: Option<i64>,
    connected: bool,
}

impl DashboardSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin_static(&mut self, data: StaticSnapshot) {
        self.static_data = Some(data);
    }

    /// Fold a server message into the session.
    pub fn apply(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Static { data, .. } => self.pin_static(data),
            ServerMessage::Dynamic { data, .. } => self.dynamic_data = Some(data),
            ServerMessage::Pong { timestamp } => self.last_pong = Some(timestamp),
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn static_data(&self) -> Option<&StaticSnapshot> {
        self.static_data.as_ref()
    }

    pub fn dynamic_data(&self) -> Option<&DynamicSnapshot> {
        self.dynamic_data.as_ref()
    }

    pub fn last_pong(&self) -> Option<i64> {
        self.last_pong
    }

    /// True until both halves have arrived at least once.
    pub fn is_initial_load(&self) -> bool {
        self.static_data.is_none() || self.dynamic_data.is_none()
    }

    /// Unified view: dynamic fields overlaid on static ones.
    ///
    /// Keys present in both with object values (`cpu`) are merged one level
    /// deep so the model and core count sit next to the usage figure.
    pub fn combined(&self) -> Option<Value> {
        let static_value = serde_json::to_value(self.static_data.as_ref()?).ok()?;
        let dynamic_value = serde_json::to_value(self.dynamic_data.as_ref()?).ok()?;
        Some(shallow_merge(static_value, dynamic_value))
    }
}

fn shallow_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                let merged = match (base.remove(&key), value) {
                    (Some(Value::Object(mut inner)), Value::Object(top)) => {
                        inner.extend(top);
                        Value::Object(inner)
                    }
                    (_, value) => value,
                };
                base.insert(key, merged);
            }
            Value::Object(base)
        }
        (_, overlay) => overlay,
    }
}

/// Fetch the static snapshot from `GET /api/static`.
pub async fn fetch_static(
    http: &reqwest::Client,
    config: &WatchConfig,
) -> anyhow::Result<StaticSnapshot> {
    let url = config.static_url();
    let response = http
        .get(&url)
        .send()
        .await
        .with_context(|| format!("GET {} failed", url))?
        .error_for_status()
        .with_context(|| format!("GET {} returned an error status", url))?;

    match response.json::<ServerMessage>().await.context("Invalid static payload")? {
        ServerMessage::Static { data, .. } => Ok(data),
        other => Err(SystemError::client_error(format!(
            "Expected a static message, got {:?}",
            other
        ))
        .into()),
    }
}

/// Follow a host until the future is dropped.
///
/// `on_update` runs after every message that changes the session. The
/// static snapshot is fetched once and kept across reconnects; a closed
/// channel is reopened after `reconnect_delay`.
pub async fn watch<F>(config: WatchConfig, mut on_update: F) -> anyhow::Result<()>
where
    F: FnMut(&DashboardSession) + Send,
{
    let http = reqwest::Client::new();
    let mut session = DashboardSession::new();

    loop {
        if session.static_data().is_none() {
            match fetch_static(&http, &config).await {
                Ok(data) => {
                    session.pin_static(data);
                    on_update(&session);
                }
                Err(e) => warn!("Could not fetch static data: {:#}", e),
            }
        }

        match run_connection(&config, &mut session, &mut on_update).await {
            Ok(()) => info!("Push channel closed by server"),
            Err(e) => warn!("Push channel failed: {:#}", e),
        }
        session.set_connected(false);

        debug!("Reconnecting in {:?}", config.reconnect_delay);
        tokio::time::sleep(config.reconnect_delay).await;
    }
}

async fn run_connection<F>(
    config: &WatchConfig,
    session: &mut DashboardSession,
    on_update: &mut F,
) -> anyhow::Result<()>
where
    F: FnMut(&DashboardSession) + Send,
{
    let url = config.push_url();
    let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("Could not connect to {}", url))?;
    let (mut write, mut read) = stream.split();

    info!("Connected to {}", url);
    session.set_connected(true);

    let request = serde_json::to_string(&ClientMessage::RequestDynamic)?;
    let ping = serde_json::to_string(&ClientMessage::Ping)?;

    let mut ticker = tokio::time::interval(config.interval);
    // The server pushes once on open, so skip the immediate first tick
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                write.send(Message::Text(request.clone())).await?;
                write.send(Message::Text(ping.clone())).await?;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMessage>(&text) {
                    Ok(message) => {
                        session.apply(message);
                        on_update(session);
                    }
                    Err(e) => warn!("Ignoring unexpected server message: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }
}
