// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the session manager and device clients.
//!
//! Each test builds its own manager over a temp stores directory and a
//! scriptable mock connector. Tests are independent and order-insensitive.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use wamux_config::WhatsAppConfig;
use wamux_core::{
    ChatPresence, ConnectionStatus, ErrorKind, OutgoingMessage, ProtocolEvent, QrEvent,
    RawMessage, ReceiverType, WhatsAppContact, WhatsAppGroup,
};
use wamux_session::{
    Attachment, ConnectionChange, DefaultEventHandler, DeviceClient, ProcessorRegistry,
    SessionManager,
};
use wamux_test_utils::{
    DisconnectBehavior, MockConnector, MockProtocolClient, RecordingProcessor, raw_text,
};

struct Harness {
    dir: TempDir,
    connector: Arc<MockConnector>,
    registry: Arc<ProcessorRegistry>,
    changes: Arc<Mutex<Vec<ConnectionChange>>>,
    manager: SessionManager,
}

impl Harness {
    fn new() -> Self {
        Self::with_config(|_| {})
    }

    fn with_config(tweak: impl FnOnce(&mut WhatsAppConfig)) -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = WhatsAppConfig {
            stores_dir: dir.path().join("stores").to_string_lossy().into_owned(),
            ..WhatsAppConfig::default()
        };
        tweak(&mut config);

        let connector = Arc::new(MockConnector::new());
        let registry = Arc::new(ProcessorRegistry::new());
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let handler = DefaultEventHandler::new(registry.clone())
            .with_connection_handler(move |change| sink.lock().unwrap().push(change.clone()));
        let manager = SessionManager::new(&config, connector.clone(), Arc::new(handler));

        Self {
            dir,
            connector,
            registry,
            changes,
            manager,
        }
    }

    async fn client(&self, name: &str) -> (Arc<DeviceClient>, Arc<MockProtocolClient>) {
        let client = self.manager.create_client(name).await.unwrap();
        let mock = self.connector.client(name).unwrap();
        (client, mock)
    }

    async fn online(&self, name: &str, jid: &str) -> (Arc<DeviceClient>, Arc<MockProtocolClient>) {
        let (client, mock) = self.client(name).await;
        mock.go_online(jid).await;
        wait_until(|| client.is_connected()).await;
        (client, mock)
    }
}

async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

// ---- Test 1: Idempotent client creation ----

#[tokio::test]
async fn test_create_client_is_idempotent() {
    let harness = Harness::new();

    let first = harness.manager.create_client("shop1").await.unwrap();
    let second = harness.manager.create_client("shop1").await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(harness.manager.client_count().await, 1);
    assert_eq!(harness.connector.open_count(), 1);
}

#[tokio::test]
async fn test_concurrent_creates_build_one_client() {
    let harness = Arc::new(Harness::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let harness = harness.clone();
            tokio::spawn(async move { harness.manager.create_client("shop1").await.unwrap() })
        })
        .collect();
    let clients: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();

    assert!(clients.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    assert_eq!(harness.connector.open_count(), 1);
}

#[tokio::test]
async fn test_store_path_follows_naming_convention() {
    let harness = Harness::new();
    harness.manager.create_client("shop1").await.unwrap();

    let (name, path) = harness.connector.opened().remove(0);
    assert_eq!(name, "shop1");
    assert_eq!(path, harness.dir.path().join("stores").join("shop1_store.db"));
}

#[tokio::test]
async fn test_get_client_never_creates() {
    let harness = Harness::new();
    assert!(harness.manager.get_client("ghost").await.is_none());
    assert_eq!(harness.connector.open_count(), 0);
}

// ---- Test 2: QR pairing ----

#[tokio::test]
async fn test_qr_code_is_returned_then_served_from_cache() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;

    let waiter = {
        let client = client.clone();
        tokio::spawn(async move { client.get_qr_code(&CancellationToken::new()).await })
    };
    wait_until(|| mock.qr_channel_calls() == 1).await;
    mock.issue_qr(QrEvent::Code("2@ABC".into())).await;

    let qr = waiter.await.unwrap().unwrap();
    assert_eq!(qr.device_name, "shop1");
    assert_eq!(qr.qr_code, "2@ABC");
    assert_eq!(qr.timeout, 30);
    assert!(qr.expires_at > chrono::Utc::now());
    assert_eq!(mock.connect_calls(), 1);

    let again = client.get_qr_code(&CancellationToken::new()).await.unwrap();
    assert_eq!(again.qr_code, "2@ABC");
    assert_eq!(mock.qr_channel_calls(), 1);
}

#[tokio::test]
async fn test_qr_code_while_connected_is_conflict() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62811@s.whatsapp.net").await;

    let err = client.get_qr_code(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(mock.qr_channel_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_qr_code_times_out_with_whatsapp_error() {
    let harness = Harness::new();
    let (client, _mock) = harness.client("shop1").await;

    let started = tokio::time::Instant::now();
    let err = client.get_qr_code(&CancellationToken::new()).await.unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(err.kind(), ErrorKind::WhatsApp);
    assert!(err.to_string().contains("timed out"), "{err}");
    assert!(elapsed >= Duration::from_secs(30));
    assert!(elapsed < Duration::from_secs(31));
}

#[tokio::test]
async fn test_qr_code_observes_cancellation() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;
    let cancel = CancellationToken::new();

    let waiter = {
        let client = client.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { client.get_qr_code(&cancel).await })
    };
    wait_until(|| mock.qr_channel_calls() == 1).await;
    cancel.cancel();

    let err = tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("cancellation must unblock the waiter")
        .unwrap()
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WhatsApp);
    assert!(err.to_string().contains("cancelled"));
}

#[tokio::test]
async fn test_qr_pairing_success_event_is_conflict() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;
    mock.issue_qr(QrEvent::Success).await;

    let err = client.get_qr_code(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_qr_connect_failure_marks_client_failed() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;
    mock.set_fail_connect(true);

    let err = client.get_qr_code(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(client.connection_status(), ConnectionStatus::Failed);
}

#[tokio::test]
async fn test_connected_event_clears_cached_qr() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;
    mock.emit(ProtocolEvent::QrIssued { code: "2@OLD".into() }).await;
    mock.go_online("62811@s.whatsapp.net").await;
    wait_until(|| client.is_connected()).await;

    mock.emit(ProtocolEvent::Disconnected { reason: "logged out".into() }).await;
    wait_until(|| !client.is_connected()).await;
    mock.set_socket_connected(false);
    mock.issue_qr(QrEvent::Code("2@NEW".into())).await;

    let qr = client.get_qr_code(&CancellationToken::new()).await.unwrap();
    assert_eq!(qr.qr_code, "2@NEW");
}

#[tokio::test(start_paused = true)]
async fn test_qr_timeout_covers_a_stalled_connect() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;
    mock.set_connect_hangs(true);

    let started = tokio::time::Instant::now();
    let err = tokio::time::timeout(
        Duration::from_secs(120),
        client.get_qr_code(&CancellationToken::new()),
    )
    .await
    .expect("QR request must give up at its own timeout")
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::WhatsApp);
    assert!(err.to_string().contains("timed out"), "{err}");
    assert!(started.elapsed() < Duration::from_secs(31));
    assert_eq!(mock.connect_calls(), 1);
}

#[tokio::test]
async fn test_qr_cancellation_interrupts_a_stalled_connect() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;
    mock.set_connect_hangs(true);
    let cancel = CancellationToken::new();

    let waiter = {
        let client = client.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { client.get_qr_code(&cancel).await })
    };
    wait_until(|| mock.connect_calls() == 1).await;
    cancel.cancel();

    let err = tokio::time::timeout(Duration::from_secs(2), waiter)
        .await
        .expect("cancellation must unblock a stalled connect")
        .unwrap()
        .unwrap_err();
    assert!(err.to_string().contains("cancelled"), "{err}");
    assert_eq!(client.connection_status(), ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_qr_timeout_leaves_client_disconnected() {
    let harness = Harness::new();
    let (client, _mock) = harness.client("shop1").await;

    client.get_qr_code(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(client.connection_status(), ConnectionStatus::Disconnected);
    assert_eq!(client.connection_info().status, ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_qr_channel_error_marks_client_failed() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;
    mock.issue_qr(QrEvent::Error("pairing rejected".into())).await;

    let err = client.get_qr_code(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::WhatsApp);
    assert_eq!(client.connection_status(), ConnectionStatus::Failed);
}

#[tokio::test]
async fn test_expired_pairing_window_leaves_client_disconnected() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;
    mock.issue_qr(QrEvent::Timeout).await;

    client.get_qr_code(&CancellationToken::new()).await.unwrap_err();

    assert_eq!(client.connection_status(), ConnectionStatus::Disconnected);
}

// ---- Test 3: Connection lifecycle ----

#[tokio::test]
async fn test_connect_twice_is_conflict() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;
    mock.pair("62811@s.whatsapp.net");

    client.connect().await.unwrap();
    wait_until(|| client.is_connected()).await;
    assert_eq!(client.jid().as_deref(), Some("62811@s.whatsapp.net"));
    assert_eq!(client.connection_status(), ConnectionStatus::Connected);

    let err = client.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_connect_failure_is_connection_error() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;
    mock.set_fail_connect(true);

    let err = client.connect().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert_eq!(client.connection_status(), ConnectionStatus::Failed);
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62811@s.whatsapp.net").await;

    client.disconnect().await.unwrap();
    client.disconnect().await.unwrap();

    assert!(!client.is_connected());
    assert_eq!(mock.disconnect_calls(), 1);
    assert_eq!(client.connection_status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_disconnect_recovers_from_panic() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62811@s.whatsapp.net").await;
    mock.set_disconnect_behavior(DisconnectBehavior::Panic);

    client.disconnect().await.unwrap();
    assert!(!client.is_connected());
}

#[tokio::test]
async fn test_is_connected_requires_live_socket() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62811@s.whatsapp.net").await;

    mock.set_socket_connected(false);
    assert!(!client.is_connected());
    assert_eq!(client.connection_status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_connection_changes_reach_handlers_in_order() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62811@s.whatsapp.net").await;
    mock.emit(ProtocolEvent::Disconnected { reason: "stream replaced".into() }).await;
    wait_until(|| !client.is_connected()).await;

    let changes = harness.changes.lock().unwrap().clone();
    assert_eq!(changes.len(), 2);
    assert!(changes[0].connected);
    assert_eq!(changes[0].jid.as_deref(), Some("62811@s.whatsapp.net"));
    assert!(!changes[1].connected);
    assert_eq!(changes[1].reason.as_deref(), Some("stream replaced"));
}

// ---- Test 4: Sending ----

#[tokio::test]
async fn test_send_rejects_malformed_recipient_before_network() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62899@s.whatsapp.net").await;

    let err = client
        .send_text_message("not-a-jid", "hi", ReceiverType::Individual)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(mock.sent().is_empty());

    let id = client
        .send_text_message("628123@s.whatsapp.net", "hi", ReceiverType::Individual)
        .await
        .unwrap();
    assert_eq!(id, "MSG-1");
    assert_eq!(
        mock.sent(),
        vec![("628123@s.whatsapp.net".to_string(), OutgoingMessage::Text("hi".into()))]
    );
}

#[tokio::test]
async fn test_send_requires_connection() {
    let harness = Harness::new();
    let (client, mock) = harness.client("shop1").await;

    let err = client
        .send_text_message("628123@s.whatsapp.net", "hi", ReceiverType::Individual)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(mock.sent().is_empty());
}

#[tokio::test]
async fn test_send_to_group_checks_receiver_type() {
    let harness = Harness::new();
    let (client, _mock) = harness.online("shop1", "62899@s.whatsapp.net").await;

    let err = client
        .send_text_message("120363-1607@g.us", "rapat", ReceiverType::Individual)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    client
        .send_text_message("120363-1607@g.us", "rapat", ReceiverType::Group)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_file_requires_payload_and_name() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62899@s.whatsapp.net").await;
    let to = "628123@s.whatsapp.net";

    let empty = Attachment {
        file_name: "laporan.pdf".into(),
        ..Attachment::default()
    };
    let err = client
        .send_file_message(to, ReceiverType::Individual, empty)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let nameless = Attachment {
        data: vec![1, 2, 3],
        ..Attachment::default()
    };
    let err = client
        .send_file_message(to, ReceiverType::Individual, nameless)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let pdf = Attachment {
        data: b"%PDF-1.7".to_vec(),
        file_name: "laporan.pdf".into(),
        caption: Some("Laporan mingguan".into()),
        ..Attachment::default()
    };
    client
        .send_file_message(to, ReceiverType::Individual, pdf)
        .await
        .unwrap();

    let (_, sent) = mock.sent().remove(0);
    match sent {
        OutgoingMessage::Media { mime_type, kind, .. } => {
            assert_eq!(mime_type, "application/pdf");
            assert!(kind.is_media());
        }
        other => panic!("expected media, got {other:?}"),
    }
}

#[tokio::test]
async fn test_send_failure_is_whatsapp_error() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62899@s.whatsapp.net").await;
    mock.set_fail_send(true);

    let err = client
        .send_text_message("628123@s.whatsapp.net", "hi", ReceiverType::Individual)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WhatsApp);
}

#[tokio::test]
async fn test_typing_maps_to_chat_presence() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62899@s.whatsapp.net").await;

    client.send_typing("628123@s.whatsapp.net", true).await.unwrap();
    client.send_typing("628123@s.whatsapp.net", false).await.unwrap();
    client.set_presence(true).await.unwrap();

    assert_eq!(
        mock.chat_presence_updates(),
        vec![
            ("628123@s.whatsapp.net".to_string(), ChatPresence::Composing),
            ("628123@s.whatsapp.net".to_string(), ChatPresence::Paused),
        ]
    );
    assert_eq!(mock.presence_updates(), vec![true]);
}

// ---- Test 5: Contacts and groups ----

fn group(jid: &str, name: &str) -> WhatsAppGroup {
    WhatsAppGroup {
        jid: jid.into(),
        name: name.into(),
        topic: String::new(),
        owner_jid: None,
        participants: vec!["62811@s.whatsapp.net".into()],
        is_announce: false,
        is_locked: false,
        is_ephemeral: false,
        created_at: None,
    }
}

#[tokio::test(start_paused = true)]
async fn test_groups_retry_and_skip_unreachable_group() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62899@s.whatsapp.net").await;
    mock.set_groups(vec![group("1203631@g.us", "Petugas"), group("1203632@g.us", "Arsip")]);
    mock.fail_group_info("1203631@g.us", 1);
    mock.fail_group_info("1203632@g.us", 10);

    let groups = client.groups().await.unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].name, "Petugas");
    assert_eq!(mock.group_info_calls(), 2 + 3);
}

#[tokio::test]
async fn test_contacts_fill_missing_names_and_sort() {
    let harness = Harness::new();
    let (client, mock) = harness.online("shop1", "62899@s.whatsapp.net").await;
    mock.set_contacts(vec![
        WhatsAppContact {
            jid: "62822@s.whatsapp.net".into(),
            name: "Sari".into(),
            business_name: None,
            is_group: false,
            is_broadcast: false,
        },
        WhatsAppContact {
            jid: "62811@s.whatsapp.net".into(),
            name: String::new(),
            business_name: None,
            is_group: false,
            is_broadcast: false,
        },
    ]);

    let contacts = client.contacts().await.unwrap();
    assert_eq!(contacts[0].jid, "62811@s.whatsapp.net");
    assert_eq!(contacts[0].name, "62811");
    assert_eq!(contacts[1].name, "Sari");
}

// ---- Test 6: Inbound messages ----

#[tokio::test]
async fn test_inbound_messages_reach_processors() {
    let harness = Harness::new();
    let processor = Arc::new(RecordingProcessor::new("recorder", 10));
    harness.registry.register(processor.clone()).await;
    let (_client, mock) = harness.online("shop1", "62899@s.whatsapp.net").await;

    let own = RawMessage {
        is_from_me: true,
        ..raw_text("m0", "62899@s.whatsapp.net", "echo")
    };
    let blank = raw_text("m1", "62811@s.whatsapp.net", "   ");
    mock.emit(ProtocolEvent::MessageReceived(own)).await;
    mock.emit(ProtocolEvent::MessageReceived(blank)).await;
    mock.emit(ProtocolEvent::MessageReceived(raw_text("m2", "62811@s.whatsapp.net", "halo")))
        .await;

    tokio::time::timeout(Duration::from_secs(5), processor.wait_for(1))
        .await
        .unwrap();
    let seen = processor.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].id, "m2");
    assert_eq!(seen[0].device_name, "shop1");
    assert_eq!(seen[0].content, "halo");
    assert!(!seen[0].is_group);
}

#[tokio::test]
async fn test_single_worker_preserves_arrival_order() {
    let harness = Harness::with_config(|config| config.max_concurrency = 1);
    let processor = Arc::new(RecordingProcessor::new("recorder", 10));
    harness.registry.register(processor.clone()).await;
    let (_client, mock) = harness.online("shop1", "62899@s.whatsapp.net").await;

    for i in 0..20 {
        let raw = raw_text(&format!("m{i}"), "62811@s.whatsapp.net", &format!("pesan {i}"));
        mock.emit(ProtocolEvent::MessageReceived(raw)).await;
    }

    tokio::time::timeout(Duration::from_secs(5), processor.wait_for(20))
        .await
        .unwrap();
    let ids: Vec<String> = processor.seen().into_iter().map(|m| m.id).collect();
    let expected: Vec<String> = (0..20).map(|i| format!("m{i}")).collect();
    assert_eq!(ids, expected);
}

// ---- Test 7: Removal ----

#[tokio::test]
async fn test_remove_unknown_device_is_not_found() {
    let harness = Harness::new();
    harness.manager.create_client("shop1").await.unwrap();

    let err = harness.manager.remove_client("ghost").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(harness.manager.list_clients().await, vec!["shop1".to_string()]);
}

#[tokio::test]
async fn test_remove_succeeds_even_when_disconnect_fails() {
    let harness = Harness::new();
    let (_client, mock) = harness.online("shop1", "62811@s.whatsapp.net").await;
    mock.set_disconnect_behavior(DisconnectBehavior::Fail);
    let store_file = harness.manager.store().store_path("shop1");
    tokio::fs::write(&store_file, b"session").await.unwrap();

    harness.manager.remove_client("shop1").await.unwrap();

    assert!(harness.manager.list_clients().await.is_empty());
    assert!(!store_file.exists());
}

#[tokio::test]
async fn test_remove_keeps_session_file_when_purge_disabled() {
    let harness = Harness::with_config(|config| config.purge_session_on_remove = false);
    harness.manager.create_client("shop1").await.unwrap();
    let store_file = harness.manager.store().store_path("shop1");
    tokio::fs::write(&store_file, b"session").await.unwrap();

    harness.manager.remove_client("shop1").await.unwrap();
    assert!(store_file.exists());
}

// ---- Test 8: Startup loading ----

#[tokio::test]
async fn test_load_existing_devices_isolates_failures() {
    let harness = Harness::new();
    let store = harness.manager.store();
    store.ensure_dir().await.unwrap();
    for name in ["shop1", "shop2", "x"] {
        tokio::fs::write(store.store_path(name), b"session").await.unwrap();
    }
    harness.connector.fail_open("shop2");
    let paired = harness.connector.prepare("shop1");
    paired.pair("62811@s.whatsapp.net");

    let loaded = harness.manager.load_existing_devices().await.unwrap();

    assert_eq!(loaded, 1);
    assert_eq!(harness.manager.list_clients().await, vec!["shop1".to_string()]);
    assert_eq!(paired.connect_calls(), 1);
}

#[tokio::test]
async fn test_load_existing_devices_without_auto_connect() {
    let harness = Harness::with_config(|config| config.auto_connect = false);
    let store = harness.manager.store();
    store.ensure_dir().await.unwrap();
    tokio::fs::write(store.store_path("shop1"), b"session").await.unwrap();
    let paired = harness.connector.prepare("shop1");
    paired.pair("62811@s.whatsapp.net");

    assert_eq!(harness.manager.load_existing_devices().await.unwrap(), 1);
    assert_eq!(paired.connect_calls(), 0);
}

#[tokio::test]
async fn test_load_existing_devices_creates_missing_stores_dir() {
    let harness = Harness::new();
    let store = harness.manager.store();
    assert!(!store.dir().exists());

    assert_eq!(harness.manager.load_existing_devices().await.unwrap(), 0);
    assert!(store.dir().is_dir());
}

// ---- Test 9: Shutdown ----

#[tokio::test]
async fn test_disconnect_all_survives_a_panicking_device() {
    let harness = Harness::new();
    let mut mocks = Vec::new();
    for (name, jid) in [
        ("shop1", "62811@s.whatsapp.net"),
        ("shop2", "62822@s.whatsapp.net"),
        ("shop3", "62833@s.whatsapp.net"),
    ] {
        let (_client, mock) = harness.online(name, jid).await;
        mocks.push(mock);
    }
    mocks[1].set_disconnect_behavior(DisconnectBehavior::Panic);

    harness.manager.disconnect_all().await.unwrap();

    assert_eq!(harness.manager.client_count().await, 0);
    assert!(mocks.iter().all(|mock| mock.disconnect_calls() == 1));
}

#[tokio::test]
async fn test_disconnect_all_attributes_failures() {
    let harness = Harness::new();
    let (_a, _) = harness.online("shop1", "62811@s.whatsapp.net").await;
    let (_b, failing) = harness.online("shop2", "62822@s.whatsapp.net").await;
    failing.set_disconnect_behavior(DisconnectBehavior::Fail);

    let err = harness.manager.disconnect_all().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connection);
    assert!(err.to_string().contains("shop2:"), "{err}");
    assert!(!err.to_string().contains("shop1:"), "{err}");
    assert!(harness.manager.list_clients().await.is_empty());
}

#[tokio::test]
async fn test_connection_info_is_sorted_by_device() {
    let harness = Harness::new();
    harness.manager.create_client("zeta").await.unwrap();
    harness.online("alpha", "62811@s.whatsapp.net").await;

    let infos = harness.manager.get_all_connection_info().await;
    let names: Vec<&str> = infos.iter().map(|i| i.device_name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
    assert!(infos[0].is_connected);
    assert_eq!(infos[0].jid.as_deref(), Some("62811@s.whatsapp.net"));
    assert!(!infos[1].is_connected);
    assert_eq!(harness.manager.connected_count().await, 1);
}

// ---- Test 10: Slow client construction ----

#[tokio::test]
async fn test_stalled_open_does_not_block_other_devices() {
    let harness = Arc::new(Harness::new());
    harness.online("shop1", "62811@s.whatsapp.net").await;
    let gate = harness.connector.stall_open("slowdev");

    let pending = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.manager.create_client("slowdev").await })
    };
    wait_until(|| harness.connector.open_stalled("slowdev")).await;

    let other = tokio::time::timeout(Duration::from_secs(2), harness.manager.create_client("shop2"))
        .await
        .expect("another device must not wait on a stalled open");
    assert!(other.is_ok());
    assert_eq!(harness.manager.list_clients().await, vec!["shop1", "shop2"]);
    assert!(harness.manager.get_client("slowdev").await.is_none());

    tokio::time::timeout(Duration::from_secs(2), harness.manager.remove_client("shop2"))
        .await
        .expect("removal must not wait on a stalled open")
        .unwrap();

    gate.notify_one();
    let slow = pending.await.unwrap().unwrap();
    let again = harness.manager.create_client("slowdev").await.unwrap();
    assert!(Arc::ptr_eq(&slow, &again));
    assert_eq!(harness.manager.list_clients().await, vec!["shop1", "slowdev"]);
}

#[tokio::test]
async fn test_remove_of_device_still_opening_is_not_found() {
    let harness = Arc::new(Harness::new());
    let gate = harness.connector.stall_open("slowdev");

    let pending = {
        let harness = harness.clone();
        tokio::spawn(async move { harness.manager.create_client("slowdev").await })
    };
    wait_until(|| harness.connector.open_stalled("slowdev")).await;

    let err = harness.manager.remove_client("slowdev").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    gate.notify_one();
    pending.await.unwrap().unwrap();
    assert_eq!(harness.manager.client_count().await, 1);
}

#[tokio::test]
async fn test_failed_open_releases_the_name() {
    let harness = Harness::new();
    harness.connector.fail_open("shop1");

    let err = harness.manager.create_client("shop1").await.err().expect("expected create_client to fail");
    assert_eq!(err.kind(), ErrorKind::Database);
    assert_eq!(harness.manager.client_count().await, 0);
    assert!(harness.manager.list_clients().await.is_empty());
}
