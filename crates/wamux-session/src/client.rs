// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Device client: one protocol session managed end to end.
//!
//! Each client owns a single dispatcher task that consumes the protocol's
//! [`ProtocolEvent`] stream and drives the connection state machine:
//!
//! ```text
//! Disconnected -> Connecting -> Connected <-> Disconnected
//!                     \-> Failed (handshake error)
//! ```
//!
//! Connection, QR, and error events reach the [`EventHandler`] synchronously
//! in arrival order. Messages are pushed onto the client's [`InboundQueue`]
//! so the dispatcher never waits on user processing.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use wamux_config::WhatsAppConfig;
use wamux_core::validation::{validate_jid, validate_jid_for};
use wamux_core::{
    ChatPresence, ConnectionInfo, ConnectionStatus, EventHandler, MessageType, OutgoingMessage,
    ProtocolClient, ProtocolConnector, ProtocolEvent, ProtocolSession, QrCodeResponse, QrEvent,
    ReceiverType, WamuxError, WhatsAppContact, WhatsAppGroup, WhatsAppMessage,
};

use crate::queue::InboundQueue;
use crate::store::SessionStore;

/// Tunables for a device client, derived from [`WhatsAppConfig`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub max_concurrency: usize,
    pub queue_capacity: usize,
    pub qr_timeout: Duration,
    pub group_info_retries: u32,
    pub group_retry_backoff: Duration,
}

impl From<&WhatsAppConfig> for ClientSettings {
    fn from(config: &WhatsAppConfig) -> Self {
        Self {
            max_concurrency: config.max_concurrency,
            queue_capacity: config.queue_capacity,
            qr_timeout: config.qr_timeout(),
            group_info_retries: config.group_info_retries,
            group_retry_backoff: config.group_retry_backoff(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self::from(&WhatsAppConfig::default())
    }
}

#[derive(Debug, Clone)]
struct CachedQr {
    code: String,
    expires_at: DateTime<Utc>,
    valid_until: Instant,
}

#[derive(Debug, Default)]
struct ClientState {
    is_connected: bool,
    status: ConnectionStatus,
    jid: Option<String>,
    latest_qr: Option<CachedQr>,
    last_seen: Option<DateTime<Utc>>,
}

/// State shared between the client handle and its dispatcher task.
struct Shared {
    device_name: String,
    state: Mutex<ClientState>,
    handler: Arc<dyn EventHandler>,
    qr_ttl: Duration,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ClientState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.state().status = status;
    }

    /// Leaves `Connecting` for `status`. Any other state was set by a
    /// protocol event and is kept.
    fn settle_connecting(&self, status: ConnectionStatus) {
        let mut state = self.state();
        if state.status == ConnectionStatus::Connecting {
            state.status = status;
        }
    }

    fn cache_qr(&self, code: String) -> CachedQr {
        let cached = CachedQr {
            code,
            expires_at: Utc::now()
                + chrono::Duration::from_std(self.qr_ttl).unwrap_or_else(|_| chrono::Duration::zero()),
            valid_until: Instant::now() + self.qr_ttl,
        };
        self.state().latest_qr = Some(cached.clone());
        cached
    }

    fn mark_disconnected(&self) {
        let mut state = self.state();
        state.is_connected = false;
        state.status = ConnectionStatus::Disconnected;
        state.latest_qr = None;
    }

    fn dispatch(&self, event: ProtocolEvent, queue: &InboundQueue) {
        let name = self.device_name.as_str();
        match event {
            ProtocolEvent::Connected { jid } => {
                {
                    let mut state = self.state();
                    state.is_connected = true;
                    state.status = ConnectionStatus::Connected;
                    state.jid = Some(jid.clone());
                    state.latest_qr = None;
                    state.last_seen = Some(Utc::now());
                }
                info!(device = %name, jid = %jid, "device connected");
                self.handler.on_connected(name, &jid);
            }
            ProtocolEvent::Disconnected { reason } => {
                {
                    let mut state = self.state();
                    state.is_connected = false;
                    state.status = ConnectionStatus::Disconnected;
                    state.last_seen = Some(Utc::now());
                }
                warn!(device = %name, reason = %reason, "device disconnected");
                self.handler.on_disconnected(name, &reason);
            }
            ProtocolEvent::QrIssued { code } => {
                self.cache_qr(code.clone());
                debug!(device = %name, "QR code issued");
                self.handler.on_qr_code(name, &code);
            }
            ProtocolEvent::MessageReceived(raw) => {
                if raw.is_from_me {
                    return;
                }
                let Some(content) = raw.body().map(str::to_string) else {
                    debug!(device = %name, message_id = %raw.id, "skipping message without body");
                    return;
                };
                let own_jid = {
                    let mut state = self.state();
                    state.last_seen = Some(Utc::now());
                    state.jid.clone().unwrap_or_default()
                };
                let message = WhatsAppMessage {
                    id: raw.id,
                    chat: raw.chat,
                    from: raw.sender,
                    from_name: raw.sender_name,
                    to: own_jid,
                    message_type: raw.kind,
                    content,
                    media_url: raw.media_url,
                    caption: raw.caption,
                    timestamp: raw.timestamp,
                    is_from_me: false,
                    receiver_type: if raw.is_group {
                        ReceiverType::Group
                    } else {
                        ReceiverType::Individual
                    },
                };
                // Rejections are logged by the queue.
                let _ = queue.try_push(message);
            }
            ProtocolEvent::Error { message } => {
                self.settle_connecting(ConnectionStatus::Failed);
                let error = WamuxError::whatsapp_msg(message);
                warn!(device = %name, error = %error, "protocol error");
                self.handler.on_error(name, &error);
            }
        }
    }
}

async fn run_dispatcher(
    shared: Arc<Shared>,
    queue: Arc<InboundQueue>,
    mut events: mpsc::Receiver<ProtocolEvent>,
) {
    while let Some(event) = events.recv().await {
        shared.dispatch(event, &queue);
    }
    debug!(device = %shared.device_name, "protocol event stream ended");
}

/// A live protocol session for one device.
pub struct DeviceClient {
    shared: Arc<Shared>,
    protocol: Arc<dyn ProtocolClient>,
    queue: Arc<InboundQueue>,
    settings: ClientSettings,
    /// Serializes QR requests so concurrent callers share one pairing channel.
    qr_lock: AsyncMutex<()>,
    dispatcher: JoinHandle<()>,
}

impl DeviceClient {
    /// Opens the protocol session backed by the device's credential file and
    /// starts the event dispatcher.
    pub async fn open(
        device_name: &str,
        store: &SessionStore,
        connector: &dyn ProtocolConnector,
        handler: Arc<dyn EventHandler>,
        settings: ClientSettings,
    ) -> Result<Self, WamuxError> {
        let store_path = store.store_path(device_name);
        let ProtocolSession { client, events } = connector.open(device_name, &store_path).await?;

        let shared = Arc::new(Shared {
            device_name: device_name.to_string(),
            state: Mutex::new(ClientState {
                jid: client.jid(),
                ..ClientState::default()
            }),
            handler: handler.clone(),
            qr_ttl: settings.qr_timeout,
        });
        let queue = Arc::new(InboundQueue::spawn(
            device_name,
            settings.queue_capacity,
            settings.max_concurrency,
            handler,
        ));
        let dispatcher = tokio::spawn(run_dispatcher(shared.clone(), queue.clone(), events));

        debug!(device = %device_name, store = %store_path.display(), "device client opened");
        Ok(Self {
            shared,
            protocol: client,
            queue,
            settings,
            qr_lock: AsyncMutex::new(()),
            dispatcher,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.shared.device_name
    }

    fn ensure_connected(&self) -> Result<(), WamuxError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(WamuxError::not_connected(self.device_name()))
        }
    }

    /// Opens the protocol connection. Reports Conflict when already connected.
    pub async fn connect(&self) -> Result<(), WamuxError> {
        if self.protocol.is_connected() {
            return Err(WamuxError::conflict(format!(
                "device '{}' is already connected",
                self.device_name()
            )));
        }

        info!(device = %self.device_name(), "connecting to WhatsApp");
        self.shared.set_status(ConnectionStatus::Connecting);
        if let Err(e) = self.protocol.connect().await {
            self.shared.set_status(ConnectionStatus::Failed);
            return Err(WamuxError::connection("failed to connect to WhatsApp", e));
        }
        Ok(())
    }

    /// Tears the connection down. Idempotent; a panic inside the protocol
    /// library is logged and swallowed.
    pub async fn disconnect(&self) -> Result<(), WamuxError> {
        let active = {
            let state = self.shared.state();
            state.is_connected || state.status == ConnectionStatus::Connecting
        } || self.protocol.is_connected();

        if !active {
            debug!(device = %self.device_name(), "already disconnected");
            self.shared.mark_disconnected();
            return Ok(());
        }

        info!(device = %self.device_name(), "disconnecting from WhatsApp");
        let outcome = AssertUnwindSafe(self.protocol.disconnect())
            .catch_unwind()
            .await;
        self.shared.mark_disconnected();

        match outcome {
            Ok(Ok(())) => {
                info!(device = %self.device_name(), "disconnected");
                Ok(())
            }
            Ok(Err(e)) => Err(WamuxError::connection("failed to disconnect from WhatsApp", e)),
            Err(panic) => {
                warn!(
                    device = %self.device_name(),
                    panic = %panic_message(panic.as_ref()),
                    "protocol client panicked during disconnect"
                );
                Ok(())
            }
        }
    }

    /// Local state and the library's live-socket check must agree.
    pub fn is_connected(&self) -> bool {
        self.shared.state().is_connected && self.protocol.is_connected()
    }

    /// Whether the credential store holds a paired identity.
    pub fn is_logged_in(&self) -> bool {
        self.protocol.is_logged_in()
    }

    pub fn jid(&self) -> Option<String> {
        self.shared.state().jid.clone().or_else(|| self.protocol.jid())
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        let status = self.shared.state().status;
        if status == ConnectionStatus::Connected && !self.protocol.is_connected() {
            ConnectionStatus::Disconnected
        } else {
            status
        }
    }

    pub fn connection_info(&self) -> ConnectionInfo {
        let (jid, last_ping) = {
            let state = self.shared.state();
            (state.jid.clone(), state.last_seen)
        };
        ConnectionInfo {
            device_name: self.device_name().to_string(),
            status: self.connection_status(),
            jid: jid.or_else(|| self.protocol.jid()),
            is_connected: self.is_connected(),
            last_ping,
        }
    }

    /// Messages dropped because the inbound queue was full.
    pub fn dropped_messages(&self) -> u64 {
        self.queue.dropped()
    }

    fn qr_response(&self, cached: CachedQr) -> QrCodeResponse {
        QrCodeResponse {
            device_name: self.device_name().to_string(),
            qr_code: cached.code,
            expires_at: cached.expires_at,
            timeout: self.settings.qr_timeout.as_secs(),
        }
    }

    /// Returns a pairing code, waiting up to the QR timeout for one to be
    /// issued. A still-valid cached code is returned without a new channel.
    ///
    /// The timeout and `cancel` bound the whole request, including opening
    /// the pairing channel and connecting. A request that ends without a
    /// code leaves the client `Disconnected`, or `Failed` when the protocol
    /// reported an error.
    pub async fn get_qr_code(
        &self,
        cancel: &CancellationToken,
    ) -> Result<QrCodeResponse, WamuxError> {
        let timeout = self.settings.qr_timeout;
        let deadline = Instant::now() + timeout;

        let outcome = tokio::select! {
            outcome = self.request_qr() => outcome,
            () = tokio::time::sleep_until(deadline) => Err(WamuxError::whatsapp_msg(format!(
                "timed out waiting for QR code after {}s",
                timeout.as_secs()
            ))),
            () = cancel.cancelled() => Err(WamuxError::whatsapp_msg("QR code request cancelled")),
        };

        if outcome.is_err() {
            self.shared.settle_connecting(ConnectionStatus::Disconnected);
        }
        outcome
    }

    async fn request_qr(&self) -> Result<QrCodeResponse, WamuxError> {
        let _guard = self.qr_lock.lock().await;

        if self.is_connected() || (self.protocol.is_logged_in() && self.protocol.is_connected()) {
            return Err(WamuxError::conflict(format!(
                "device '{}' is already logged in",
                self.device_name()
            )));
        }

        let cached = self
            .shared
            .state()
            .latest_qr
            .clone()
            .filter(|qr| Instant::now() < qr.valid_until);
        if let Some(cached) = cached {
            debug!(device = %self.device_name(), "returning cached QR code");
            return Ok(self.qr_response(cached));
        }

        let mut qr_events = self
            .protocol
            .qr_channel()
            .await
            .map_err(|e| WamuxError::whatsapp("failed to open QR channel", e))?;

        if !self.protocol.is_connected() {
            self.shared.set_status(ConnectionStatus::Connecting);
            if let Err(e) = self.protocol.connect().await {
                self.shared.set_status(ConnectionStatus::Failed);
                return Err(WamuxError::connection(
                    "failed to connect for QR generation",
                    e,
                ));
            }
        }

        match qr_events.recv().await {
            Some(QrEvent::Code(code)) => {
                info!(device = %self.device_name(), "QR code generated");
                let cached = self.shared.cache_qr(code);
                Ok(self.qr_response(cached))
            }
            Some(QrEvent::Success) => Err(WamuxError::conflict(format!(
                "device '{}' completed pairing; no QR code needed",
                self.device_name()
            ))),
            Some(QrEvent::Timeout) => Err(WamuxError::whatsapp_msg(
                "pairing window expired before a QR code was issued",
            )),
            Some(QrEvent::Error(message)) => {
                self.shared.settle_connecting(ConnectionStatus::Failed);
                Err(WamuxError::whatsapp_msg(format!("QR channel error: {message}")))
            }
            None => Err(WamuxError::whatsapp_msg("QR channel closed before a code was issued")),
        }
    }

    /// Sends a text message and returns the protocol message id.
    pub async fn send_text_message(
        &self,
        to: &str,
        message: &str,
        receiver_type: ReceiverType,
    ) -> Result<String, WamuxError> {
        self.ensure_connected()?;
        validate_jid_for(to, receiver_type)?;
        if message.trim().is_empty() {
            return Err(WamuxError::validation("message text is required"));
        }

        let id = self
            .protocol
            .send_message(to, OutgoingMessage::Text(message.to_string()))
            .await
            .map_err(|e| WamuxError::whatsapp("failed to send message", e))?;
        info!(device = %self.device_name(), to = %to, message_id = %id, "text message sent");
        Ok(id)
    }

    /// Sends an attachment. `data` and `file_name` must both be non-empty.
    pub async fn send_file_message(
        &self,
        to: &str,
        receiver_type: ReceiverType,
        attachment: Attachment,
    ) -> Result<String, WamuxError> {
        self.ensure_connected()?;
        validate_jid_for(to, receiver_type)?;
        if attachment.data.is_empty() {
            return Err(WamuxError::validation("file data is required"));
        }
        if attachment.file_name.trim().is_empty() {
            return Err(WamuxError::validation("file name is required"));
        }

        let kind = if attachment.kind.is_media() {
            attachment.kind
        } else {
            MessageType::File
        };
        let mime_type = attachment
            .mime_type
            .unwrap_or_else(|| guess_mime_type(&attachment.file_name).to_string());
        let size = attachment.data.len();
        let file_name = attachment.file_name.clone();

        let id = self
            .protocol
            .send_message(
                to,
                OutgoingMessage::Media {
                    kind,
                    data: attachment.data,
                    file_name: attachment.file_name,
                    mime_type,
                    caption: attachment.caption,
                },
            )
            .await
            .map_err(|e| WamuxError::whatsapp("failed to send file", e))?;
        info!(
            device = %self.device_name(),
            to = %to,
            file = %file_name,
            size,
            message_id = %id,
            "file message sent"
        );
        Ok(id)
    }

    pub async fn contacts(&self) -> Result<Vec<WhatsAppContact>, WamuxError> {
        self.ensure_connected()?;
        let mut contacts = self
            .protocol
            .contacts()
            .await
            .map_err(|e| WamuxError::database("failed to retrieve contacts", e))?;

        for contact in &mut contacts {
            if contact.name.is_empty() {
                contact.name = contact.jid.split('@').next().unwrap_or_default().to_string();
            }
        }
        contacts.sort_by(|a, b| a.jid.cmp(&b.jid));
        debug!(device = %self.device_name(), count = contacts.len(), "contacts retrieved");
        Ok(contacts)
    }

    /// Lists joined groups. A group whose metadata cannot be fetched after
    /// all retries is logged and skipped.
    pub async fn groups(&self) -> Result<Vec<WhatsAppGroup>, WamuxError> {
        self.ensure_connected()?;
        let joined = self
            .protocol
            .joined_groups()
            .await
            .map_err(|e| WamuxError::whatsapp("failed to retrieve groups", e))?;

        let mut groups = Vec::with_capacity(joined.len());
        for jid in joined {
            match self.group_info_with_retry(&jid).await {
                Ok(group) => groups.push(group),
                Err(e) => {
                    warn!(device = %self.device_name(), group = %jid, error = %e, "skipping group");
                }
            }
        }
        debug!(device = %self.device_name(), count = groups.len(), "groups retrieved");
        Ok(groups)
    }

    async fn group_info_with_retry(&self, jid: &str) -> Result<WhatsAppGroup, WamuxError> {
        let attempts = self.settings.group_info_retries.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match self.protocol.group_info(jid).await {
                Ok(group) => return Ok(group),
                Err(e) => {
                    debug!(
                        device = %self.device_name(),
                        group = %jid,
                        attempt,
                        error = %e,
                        "group info fetch failed"
                    );
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.settings.group_retry_backoff * attempt).await;
            }
        }

        let message = format!("failed to fetch group info for {jid} after {attempts} attempts");
        Err(match last_error {
            Some(e) => WamuxError::whatsapp(message, e),
            None => WamuxError::whatsapp_msg(message),
        })
    }

    pub async fn set_presence(&self, available: bool) -> Result<(), WamuxError> {
        self.ensure_connected()?;
        self.protocol
            .send_presence(available)
            .await
            .map_err(|e| WamuxError::whatsapp("failed to set presence", e))
    }

    /// Maps `typing` to a composing or paused chat presence.
    pub async fn send_typing(&self, to: &str, typing: bool) -> Result<(), WamuxError> {
        self.ensure_connected()?;
        validate_jid(to)?;
        self.protocol
            .send_chat_presence(to, ChatPresence::from(typing))
            .await
            .map_err(|e| WamuxError::whatsapp("failed to send typing indicator", e))
    }
}

impl Drop for DeviceClient {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// An outbound attachment.
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    pub kind: MessageType,
    pub data: Vec<u8>,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub caption: Option<String>,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

fn guess_mime_type(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "3gp" => "video/3gpp",
        "mp3" => "audio/mpeg",
        "ogg" | "opus" => "audio/ogg",
        "m4a" => "audio/mp4",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
