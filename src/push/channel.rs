//! Push channel over WebSocket with fixed-delay reconnection.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
    MaybeTlsStream, WebSocketStream,
};

use super::events::{PushFrame, PushStatus};
use crate::config::ChatConfig;
use crate::error::RelayError;
use crate::types::RequestId;
use crate::util::reconnect::ReconnectPolicy;
use crate::util::timeout::with_timeout;

type PushWebSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ReplySender = oneshot::Sender<Result<String, RelayError>>;

#[derive(Default)]
struct PendingMap {
    waiters: Mutex<HashMap<RequestId, ReplySender>>,
}

impl PendingMap {
    fn insert(&self, id: RequestId, tx: ReplySender) {
        if let Ok(mut waiters) = self.waiters.lock() {
            waiters.insert(id, tx);
        }
    }

    fn remove(&self, id: &RequestId) -> Option<ReplySender> {
        self.waiters.lock().ok()?.remove(id)
    }

    fn ids(&self) -> Vec<RequestId> {
        self.waiters
            .lock()
            .map(|w| w.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn fail_all(&self, reason: &str) {
        let drained: Vec<ReplySender> = match self.waiters.lock() {
            Ok(mut waiters) => waiters.drain().map(|(_, tx)| tx).collect(),
            Err(_) => return,
        };
        for tx in drained {
            let _ = tx.send(Err(RelayError::PushDisconnected(reason.to_string())));
        }
    }
}

struct PushRuntime {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

#[derive(Clone)]
struct RuntimeParams {
    url: String,
    heartbeat_interval: Duration,
    reconnect: ReconnectPolicy,
}

/// A long-lived WebSocket that resolves pending sends by request id.
///
/// Opened once per session. Registrations made while the socket is down are
/// (re)sent as soon as it comes back.
pub struct PushChannel {
    pending: Arc<PendingMap>,
    outbound_tx: mpsc::UnboundedSender<PushFrame>,
    status_rx: watch::Receiver<PushStatus>,
    runtime: Mutex<Option<PushRuntime>>,
}

impl PushChannel {
    /// Open the connection and start the supervisor task.
    pub async fn connect(
        url: impl Into<String>,
        reconnect: ReconnectPolicy,
        heartbeat_interval: Duration,
    ) -> Result<Self, RelayError> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(RelayError::Configuration("Push channel URL cannot be empty".into()));
        }
        if heartbeat_interval.is_zero() {
            return Err(RelayError::Configuration(
                "Push channel heartbeat interval must be greater than zero".into(),
            ));
        }
        let socket = connect_push_socket(&url).await?;
        tracing::info!(%url, "push channel connected");

        let params = RuntimeParams {
            url,
            heartbeat_interval,
            reconnect,
        };
        let pending = Arc::new(PendingMap::default());
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(PushStatus::Connected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_supervisor_loop(
            socket,
            outbound_rx,
            status_tx,
            shutdown_rx,
            Arc::clone(&pending),
            params,
        ));

        Ok(Self {
            pending,
            outbound_tx,
            status_rx,
            runtime: Mutex::new(Some(PushRuntime { shutdown_tx, task })),
        })
    }

    pub async fn from_config(config: &ChatConfig) -> Result<Self, RelayError> {
        Self::connect(
            config.push_url.clone(),
            config.reconnect,
            config.heartbeat_interval,
        )
        .await
    }

    /// Current connection status.
    pub fn status(&self) -> PushStatus {
        *self.status_rx.borrow()
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<PushStatus> {
        self.status_rx.clone()
    }

    /// Register interest in the reply for `request_id`.
    ///
    /// Fails fast once the channel has given up reconnecting.
    pub fn register(&self, request_id: RequestId) -> Result<PendingReply, RelayError> {
        let status = self.status();
        if !status.is_usable() {
            return Err(RelayError::PushDisconnected(format!(
                "push channel is {status:?}"
            )));
        }

        let (tx, rx) = oneshot::channel();
        self.pending.insert(request_id.clone(), tx);
        self.outbound_tx
            .send(PushFrame::register(request_id.clone()))
            .map_err(|_| RelayError::PushDisconnected("push channel task has stopped".into()))?;
        tracing::debug!(%request_id, "registered request on push channel");

        Ok(PendingReply {
            request_id,
            rx,
            pending: Arc::clone(&self.pending),
        })
    }

    /// Close the channel gracefully and wait for the supervisor to stop.
    pub async fn close(&self) -> Result<(), RelayError> {
        let runtime = self.runtime.lock().ok().and_then(|mut r| r.take());
        if let Some(runtime) = runtime {
            let _ = runtime.shutdown_tx.send(true);
            runtime.task.await.map_err(|error| {
                RelayError::InvalidState(format!("Push channel task failed: {error}"))
            })?;
        }
        Ok(())
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.get_mut().ok().and_then(|r| r.take()) {
            let _ = runtime.shutdown_tx.send(true);
            runtime.task.abort();
        }
    }
}

/// A registered wait for one reply. Dropping it unregisters the id.
pub struct PendingReply {
    request_id: RequestId,
    rx: oneshot::Receiver<Result<String, RelayError>>,
    pending: Arc<PendingMap>,
}

impl PendingReply {
    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Wait until the server pushes the reply (or the channel gives up).
    pub async fn wait(mut self) -> Result<String, RelayError> {
        match (&mut self.rx).await {
            Ok(result) => result,
            Err(_) => Err(RelayError::PushDisconnected(
                "push channel closed before the reply arrived".into(),
            )),
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.pending.remove(&self.request_id);
    }
}

enum ConnectionOutcome {
    Shutdown,
    Disconnected,
}

async fn run_supervisor_loop(
    mut socket: PushWebSocket,
    mut outbound_rx: mpsc::UnboundedReceiver<PushFrame>,
    status_tx: watch::Sender<PushStatus>,
    mut shutdown_rx: watch::Receiver<bool>,
    pending: Arc<PendingMap>,
    params: RuntimeParams,
) {
    let mut attempt = 0u32;
    'session: loop {
        let outcome = run_active_connection(
            &mut socket,
            &mut outbound_rx,
            &mut shutdown_rx,
            &pending,
            params.heartbeat_interval,
        )
        .await;

        if matches!(outcome, ConnectionOutcome::Shutdown) || *shutdown_rx.borrow() {
            break;
        }
        let _ = status_tx.send(PushStatus::Disconnected);
        tracing::warn!(url = %params.url, "push channel disconnected");

        loop {
            attempt += 1;
            let Some(delay) = params.reconnect.delay_for(attempt) else {
                tracing::error!(
                    attempts = params.reconnect.max_attempts,
                    "push channel reconnect attempts exhausted"
                );
                let _ = status_tx.send(PushStatus::ReconnectFailed);
                pending.fail_all("reconnect attempts exhausted");
                return;
            };
            let _ = status_tx.send(PushStatus::Reconnecting { attempt });

            let sleep = time::sleep(delay);
            tokio::pin!(sleep);
            tokio::select! {
                _ = &mut sleep => {}
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break 'session;
                    }
                }
            }

            let handshake = with_timeout(params.heartbeat_interval, connect_push_socket(&params.url));
            tokio::pin!(handshake);
            let connected = tokio::select! {
                result = &mut handshake => result,
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break 'session;
                    }
                    continue;
                }
            };

            match connected {
                Ok(reconnected) => {
                    socket = reconnected;
                    attempt = 0;
                    let _ = status_tx.send(PushStatus::Connected);
                    tracing::info!(url = %params.url, "push channel reconnected");

                    // Queued frames are superseded by re-registering everything pending.
                    while outbound_rx.try_recv().is_ok() {}
                    for request_id in pending.ids() {
                        if let Err(error) = send_frame(&mut socket, &PushFrame::register(request_id)).await {
                            tracing::warn!(%error, "re-registration after reconnect failed");
                        }
                    }
                    continue 'session;
                }
                Err(error) => {
                    tracing::warn!(attempt, %error, "push channel reconnect failed");
                }
            }
        }
    }

    let _ = status_tx.send(PushStatus::Closed);
    pending.fail_all("push channel closed");
}

async fn run_active_connection(
    socket: &mut PushWebSocket,
    outbound_rx: &mut mpsc::UnboundedReceiver<PushFrame>,
    shutdown_rx: &mut watch::Receiver<bool>,
    pending: &PendingMap,
    heartbeat_interval: Duration,
) -> ConnectionOutcome {
    let mut heartbeat = time::interval(heartbeat_interval);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.tick().await;

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    let _ = socket.send(Message::Close(None)).await;
                    return ConnectionOutcome::Shutdown;
                }
            }
            _ = heartbeat.tick() => {
                if let Err(error) = socket.send(Message::Ping(Default::default())).await {
                    tracing::warn!(%error, "push channel heartbeat failed");
                    return ConnectionOutcome::Disconnected;
                }
            }
            frame = outbound_rx.recv() => {
                let Some(frame) = frame else {
                    return ConnectionOutcome::Shutdown;
                };
                if let Err(error) = send_frame(socket, &frame).await {
                    tracing::warn!(%error, "push channel send failed");
                    return ConnectionOutcome::Disconnected;
                }
            }
            incoming = socket.next() => {
                match incoming {
                    Some(Ok(message)) => {
                        if let Err(error) = handle_server_message(socket, pending, message).await {
                            tracing::debug!(%error, "push channel closed by server");
                            return ConnectionOutcome::Disconnected;
                        }
                    }
                    Some(Err(error)) => {
                        tracing::warn!(%error, "push channel receive failed");
                        return ConnectionOutcome::Disconnected;
                    }
                    None => return ConnectionOutcome::Disconnected,
                }
            }
        }
    }
}

async fn handle_server_message(
    socket: &mut PushWebSocket,
    pending: &PendingMap,
    message: Message,
) -> Result<(), WsError> {
    match message {
        Message::Text(text) => dispatch_payload(text.as_ref(), pending),
        Message::Binary(bytes) => {
            if let Ok(text) = String::from_utf8(bytes.to_vec()) {
                dispatch_payload(&text, pending);
            }
        }
        Message::Ping(payload) => socket.send(Message::Pong(payload)).await?,
        Message::Pong(_) => {}
        Message::Close(_) => return Err(WsError::ConnectionClosed),
        Message::Frame(_) => {}
    }
    Ok(())
}

fn dispatch_payload(payload: &str, pending: &PendingMap) {
    match PushFrame::from_server_payload(payload) {
        Ok(Some(PushFrame::WebhookResponse {
            request_id,
            response,
        })) => match pending.remove(&request_id) {
            Some(tx) => {
                tracing::debug!(%request_id, "push reply delivered");
                let _ = tx.send(Ok(response));
            }
            None => tracing::debug!(%request_id, "push reply for unknown request dropped"),
        },
        Ok(_) => {}
        Err(error) => tracing::warn!(%error, "unparseable push channel frame"),
    }
}

async fn send_frame(socket: &mut PushWebSocket, frame: &PushFrame) -> Result<(), RelayError> {
    let payload = serde_json::to_string(frame)?;
    socket
        .send(Message::Text(payload.into()))
        .await
        .map_err(|error| RelayError::PushDisconnected(format!("send failed: {error}")))
}

async fn connect_push_socket(url: &str) -> Result<PushWebSocket, RelayError> {
    connect_async(url)
        .await
        .map(|(socket, _)| socket)
        .map_err(map_connect_error)
}

fn map_connect_error(error: WsError) -> RelayError {
    match error {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            RelayError::http(
                status,
                format!("Push channel handshake failed with status {status}"),
            )
        }
        WsError::Io(error) => RelayError::Io(error),
        WsError::Url(error) => {
            RelayError::Configuration(format!("Invalid push channel URL: {error}"))
        }
        other => RelayError::PushDisconnected(format!("connect failed: {other}")),
    }
}
