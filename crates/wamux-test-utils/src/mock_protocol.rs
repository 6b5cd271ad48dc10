// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scriptable protocol connector and client.
//!
//! `MockConnector` hands out one `MockProtocolClient` per device name. Tests
//! keep a handle to the client to inject protocol events, queue QR codes,
//! toggle failures, and inspect what the device client asked for.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::{Notify, mpsc};

use wamux_core::{
    ChatPresence, OutgoingMessage, ProtocolClient, ProtocolConnector, ProtocolEvent,
    ProtocolSession, QrEvent, WamuxError, WhatsAppContact, WhatsAppGroup,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What `disconnect` does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisconnectBehavior {
    #[default]
    Succeed,
    Fail,
    Panic,
}

pub struct MockProtocolClient {
    device_name: String,
    events: mpsc::Sender<ProtocolEvent>,
    connected: AtomicBool,
    logged_in: AtomicBool,
    jid: Mutex<Option<String>>,
    fail_connect: AtomicBool,
    hang_connect: AtomicBool,
    fail_send: AtomicBool,
    disconnect_behavior: Mutex<DisconnectBehavior>,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
    qr_channel_calls: AtomicUsize,
    queued_qr: Mutex<VecDeque<QrEvent>>,
    qr_sender: Mutex<Option<mpsc::Sender<QrEvent>>>,
    sent: Mutex<Vec<(String, OutgoingMessage)>>,
    contacts: Mutex<Vec<WhatsAppContact>>,
    groups: Mutex<Vec<WhatsAppGroup>>,
    group_failures: Mutex<HashMap<String, u32>>,
    group_info_calls: AtomicUsize,
    presence: Mutex<Vec<bool>>,
    chat_presence: Mutex<Vec<(String, ChatPresence)>>,
}

impl MockProtocolClient {
    pub fn new(device_name: &str) -> (Arc<Self>, mpsc::Receiver<ProtocolEvent>) {
        let (events, rx) = mpsc::channel(64);
        let client = Arc::new(Self {
            device_name: device_name.to_string(),
            events,
            connected: AtomicBool::new(false),
            logged_in: AtomicBool::new(false),
            jid: Mutex::new(None),
            fail_connect: AtomicBool::new(false),
            hang_connect: AtomicBool::new(false),
            fail_send: AtomicBool::new(false),
            disconnect_behavior: Mutex::new(DisconnectBehavior::default()),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            qr_channel_calls: AtomicUsize::new(0),
            queued_qr: Mutex::new(VecDeque::new()),
            qr_sender: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            contacts: Mutex::new(Vec::new()),
            groups: Mutex::new(Vec::new()),
            group_failures: Mutex::new(HashMap::new()),
            group_info_calls: AtomicUsize::new(0),
            presence: Mutex::new(Vec::new()),
            chat_presence: Mutex::new(Vec::new()),
        });
        (client, rx)
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Marks the credential store as paired with `jid`.
    pub fn pair(&self, jid: &str) {
        self.logged_in.store(true, Ordering::SeqCst);
        *lock(&self.jid) = Some(jid.to_string());
    }

    /// Delivers an event to the device client's dispatcher.
    pub async fn emit(&self, event: ProtocolEvent) {
        // The dispatcher is gone once the device client is dropped.
        let _ = self.events.send(event).await;
    }

    /// Pairs, marks the socket live, and emits `Connected`.
    pub async fn go_online(&self, jid: &str) {
        self.pair(jid);
        self.connected.store(true, Ordering::SeqCst);
        self.emit(ProtocolEvent::Connected { jid: jid.to_string() }).await;
    }

    /// Queues an item for the next QR channel, or sends it on the open one.
    pub async fn issue_qr(&self, event: QrEvent) {
        let sender = lock(&self.qr_sender).clone();
        match sender {
            Some(sender) => {
                let _ = sender.send(event).await;
            }
            None => lock(&self.queued_qr).push_back(event),
        }
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    /// Makes `connect` never complete, like a stalled websocket handshake.
    pub fn set_connect_hangs(&self, hang: bool) {
        self.hang_connect.store(hang, Ordering::SeqCst);
    }

    pub fn set_fail_send(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::SeqCst);
    }

    pub fn set_disconnect_behavior(&self, behavior: DisconnectBehavior) {
        *lock(&self.disconnect_behavior) = behavior;
    }

    /// Forces the live-socket flag without emitting events.
    pub fn set_socket_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn set_contacts(&self, contacts: Vec<WhatsAppContact>) {
        *lock(&self.contacts) = contacts;
    }

    pub fn set_groups(&self, groups: Vec<WhatsAppGroup>) {
        *lock(&self.groups) = groups;
    }

    /// Makes the next `times` metadata fetches for `jid` fail.
    pub fn fail_group_info(&self, jid: &str, times: u32) {
        lock(&self.group_failures).insert(jid.to_string(), times);
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    pub fn qr_channel_calls(&self) -> usize {
        self.qr_channel_calls.load(Ordering::SeqCst)
    }

    pub fn group_info_calls(&self) -> usize {
        self.group_info_calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<(String, OutgoingMessage)> {
        lock(&self.sent).clone()
    }

    pub fn presence_updates(&self) -> Vec<bool> {
        lock(&self.presence).clone()
    }

    pub fn chat_presence_updates(&self) -> Vec<(String, ChatPresence)> {
        lock(&self.chat_presence).clone()
    }
}

#[async_trait]
impl ProtocolClient for MockProtocolClient {
    async fn connect(&self) -> Result<(), WamuxError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_connect.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(WamuxError::whatsapp_msg("websocket handshake failed"));
        }
        self.connected.store(true, Ordering::SeqCst);
        if self.logged_in.load(Ordering::SeqCst) {
            let jid = lock(&self.jid).clone().unwrap_or_default();
            self.emit(ProtocolEvent::Connected { jid }).await;
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), WamuxError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *lock(&self.disconnect_behavior);
        self.connected.store(false, Ordering::SeqCst);
        match behavior {
            DisconnectBehavior::Succeed => Ok(()),
            DisconnectBehavior::Fail => Err(WamuxError::whatsapp_msg("socket close failed")),
            DisconnectBehavior::Panic => panic!("teardown of {} exploded", self.device_name),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in.load(Ordering::SeqCst)
    }

    fn jid(&self) -> Option<String> {
        lock(&self.jid).clone()
    }

    async fn qr_channel(&self) -> Result<mpsc::Receiver<QrEvent>, WamuxError> {
        self.qr_channel_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(8);
        for event in lock(&self.queued_qr).drain(..) {
            let _ = tx.try_send(event);
        }
        *lock(&self.qr_sender) = Some(tx);
        Ok(rx)
    }

    async fn send_message(&self, to: &str, message: OutgoingMessage) -> Result<String, WamuxError> {
        if self.fail_send.load(Ordering::SeqCst) {
            return Err(WamuxError::whatsapp_msg("server rejected message"));
        }
        let mut sent = lock(&self.sent);
        sent.push((to.to_string(), message));
        Ok(format!("MSG-{}", sent.len()))
    }

    async fn contacts(&self) -> Result<Vec<WhatsAppContact>, WamuxError> {
        Ok(lock(&self.contacts).clone())
    }

    async fn joined_groups(&self) -> Result<Vec<String>, WamuxError> {
        Ok(lock(&self.groups).iter().map(|g| g.jid.clone()).collect())
    }

    async fn group_info(&self, jid: &str) -> Result<WhatsAppGroup, WamuxError> {
        self.group_info_calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut failures = lock(&self.group_failures);
            if let Some(remaining) = failures.get_mut(jid).filter(|n| **n > 0) {
                *remaining -= 1;
                return Err(WamuxError::whatsapp_msg(format!("info query for {jid} timed out")));
            }
        }
        lock(&self.groups)
            .iter()
            .find(|g| g.jid == jid)
            .cloned()
            .ok_or_else(|| WamuxError::not_found(format!("group {jid}")))
    }

    async fn send_presence(&self, available: bool) -> Result<(), WamuxError> {
        lock(&self.presence).push(available);
        Ok(())
    }

    async fn send_chat_presence(&self, to: &str, presence: ChatPresence) -> Result<(), WamuxError> {
        lock(&self.chat_presence).push((to.to_string(), presence));
        Ok(())
    }
}

/// Hands out a fresh [`MockProtocolClient`] per open.
#[derive(Default)]
pub struct MockConnector {
    clients: Mutex<HashMap<String, Arc<MockProtocolClient>>>,
    prepared: Mutex<HashMap<String, mpsc::Receiver<ProtocolEvent>>>,
    failing: Mutex<HashSet<String>>,
    stalled: Mutex<HashMap<String, Arc<Notify>>>,
    waiting: Mutex<HashSet<String>>,
    opened: Mutex<Vec<(String, PathBuf)>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the client that the next open of `device_name` will return,
    /// so tests can configure it up front.
    pub fn prepare(&self, device_name: &str) -> Arc<MockProtocolClient> {
        let (client, rx) = MockProtocolClient::new(device_name);
        lock(&self.prepared).insert(device_name.to_string(), rx);
        lock(&self.clients).insert(device_name.to_string(), client.clone());
        client
    }

    /// Makes every open of `device_name` fail.
    pub fn fail_open(&self, device_name: &str) {
        lock(&self.failing).insert(device_name.to_string());
    }

    /// Holds the next open of `device_name` until the returned gate is
    /// notified with `notify_one`.
    pub fn stall_open(&self, device_name: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        lock(&self.stalled).insert(device_name.to_string(), gate.clone());
        gate
    }

    /// Whether an open of `device_name` has reached the gate set by
    /// [`MockConnector::stall_open`].
    pub fn open_stalled(&self, device_name: &str) -> bool {
        lock(&self.waiting).contains(device_name)
    }

    /// The client most recently handed out for `device_name`.
    pub fn client(&self, device_name: &str) -> Option<Arc<MockProtocolClient>> {
        lock(&self.clients).get(device_name).cloned()
    }

    pub fn open_count(&self) -> usize {
        lock(&self.opened).len()
    }

    pub fn opened(&self) -> Vec<(String, PathBuf)> {
        lock(&self.opened).clone()
    }
}

#[async_trait]
impl ProtocolConnector for MockConnector {
    async fn open(&self, device_name: &str, store_path: &Path) -> Result<ProtocolSession, WamuxError> {
        let gate = lock(&self.stalled).remove(device_name);
        if let Some(gate) = gate {
            lock(&self.waiting).insert(device_name.to_string());
            gate.notified().await;
            lock(&self.waiting).remove(device_name);
        }
        if lock(&self.failing).contains(device_name) {
            return Err(WamuxError::database(
                format!("failed to open session store for {device_name}"),
                std::io::Error::new(std::io::ErrorKind::InvalidData, "file is not a database"),
            ));
        }
        lock(&self.opened).push((device_name.to_string(), store_path.to_path_buf()));

        let prepared = lock(&self.prepared).remove(device_name);
        let (client, events) = match prepared {
            Some(events) => {
                let client = self
                    .client(device_name)
                    .ok_or_else(|| WamuxError::internal_msg("prepared client missing"))?;
                (client, events)
            }
            None => {
                let (client, events) = MockProtocolClient::new(device_name);
                lock(&self.clients).insert(device_name.to_string(), client.clone());
                (client, events)
            }
        };

        Ok(ProtocolSession { client, events })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queued_qr_codes_land_on_the_next_channel() {
        let (client, _events) = MockProtocolClient::new("shop1");
        client.issue_qr(QrEvent::Code("2@ABC".into())).await;
        let mut rx = client.qr_channel().await.unwrap();
        assert_eq!(rx.recv().await, Some(QrEvent::Code("2@ABC".into())));
        assert_eq!(client.qr_channel_calls(), 1);
    }

    #[tokio::test]
    async fn group_failures_are_consumed() {
        let (client, _events) = MockProtocolClient::new("shop1");
        client.set_groups(vec![WhatsAppGroup {
            jid: "120363@g.us".into(),
            name: "Rekan".into(),
            topic: String::new(),
            owner_jid: None,
            participants: vec![],
            is_announce: false,
            is_locked: false,
            is_ephemeral: false,
            created_at: None,
        }]);
        client.fail_group_info("120363@g.us", 1);
        assert!(client.group_info("120363@g.us").await.is_err());
        assert!(client.group_info("120363@g.us").await.is_ok());
    }

    #[tokio::test]
    async fn prepared_client_is_returned_by_open() {
        let connector = MockConnector::new();
        let prepared = connector.prepare("shop1");
        prepared.pair("62811@s.whatsapp.net");
        let session = connector
            .open("shop1", Path::new("/tmp/shop1_store.db"))
            .await
            .unwrap();
        assert!(session.client.is_logged_in());
        assert_eq!(connector.open_count(), 1);
    }
}
