// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Application container.
//!
//! Opens storage, registers the built-in message processors, and builds the
//! session manager plus the services on top of it. Connection changes are
//! mirrored onto device records in the background.

use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use wamux_config::WamuxConfig;
use wamux_core::{ApiKeyRepository, DeviceRepository, ProtocolConnector, WamuxError};
use wamux_quickresponse::{QuickResponseProcessor, QuickResponseRepository};
use wamux_service::{ApiKeyService, DeviceService, WhatsAppService, sync_connection_change};
use wamux_session::{DefaultEventHandler, ProcessorRegistry, SessionManager};
use wamux_storage::{
    Database, SqliteApiKeyRepository, SqliteDeviceRepository, SqliteQuickResponseRepository,
};

use crate::shutdown::bounded;

pub struct App {
    config: WamuxConfig,
    database: Database,
    devices: Arc<SqliteDeviceRepository>,
    quick_responses: Arc<SqliteQuickResponseRepository>,
    registry: Arc<ProcessorRegistry>,
    manager: Arc<SessionManager>,
    whatsapp: WhatsAppService,
    device_service: DeviceService,
    api_keys: ApiKeyService,
    background: TaskTracker,
}

impl App {
    /// Wires every component. Does not touch the stores directory; call
    /// [`App::start`] to load existing sessions.
    pub async fn build(
        config: WamuxConfig,
        connector: Arc<dyn ProtocolConnector>,
    ) -> Result<Self, WamuxError> {
        let database = Database::open_config(&config.storage).await?;
        let devices = Arc::new(SqliteDeviceRepository::new(database.clone()));
        let quick_responses = Arc::new(SqliteQuickResponseRepository::new(database.clone()));

        let registry = Arc::new(ProcessorRegistry::new());
        let report_repo: Arc<dyn QuickResponseRepository> = quick_responses.clone();
        registry
            .register(Arc::new(QuickResponseProcessor::new(report_repo)))
            .await;

        let background = TaskTracker::new();
        let handler = {
            let devices: Arc<dyn DeviceRepository> = devices.clone();
            let background = background.clone();
            DefaultEventHandler::new(registry.clone()).with_connection_handler(move |change| {
                let devices = devices.clone();
                let change = change.clone();
                background.spawn(async move {
                    if let Err(e) = sync_connection_change(devices.as_ref(), &change).await {
                        warn!(device = %change.device_name, error = %e, "failed to sync device record");
                    }
                });
            })
        };

        let manager = Arc::new(SessionManager::new(
            &config.whatsapp,
            connector,
            Arc::new(handler),
        ));
        let whatsapp = WhatsAppService::new(manager.clone());
        let device_repo: Arc<dyn DeviceRepository> = devices.clone();
        let device_service = DeviceService::new(device_repo).with_manager(manager.clone());
        let key_repo: Arc<dyn ApiKeyRepository> =
            Arc::new(SqliteApiKeyRepository::new(database.clone()));
        let api_keys = ApiKeyService::new(key_repo);

        info!(
            app = %config.app.name,
            database = %config.storage.database_path,
            stores = %config.whatsapp.stores_dir,
            "application initialized"
        );

        Ok(Self {
            config,
            database,
            devices,
            quick_responses,
            registry,
            manager,
            whatsapp,
            device_service,
            api_keys,
            background,
        })
    }

    /// Marks lapsed API keys expired, then loads every session found in the
    /// stores directory. A failed scan is logged and leaves the manager empty.
    pub async fn start(&self) -> usize {
        if let Err(e) = self.api_keys.cleanup_expired().await {
            warn!(error = %e, "failed to sweep expired API keys");
        }
        match self.manager.load_existing_devices().await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "failed to load existing devices");
                0
            }
        }
    }

    /// Disconnects all devices and drains background work, each bounded by
    /// the configured shutdown timeout.
    pub async fn shutdown(&self) -> Result<(), WamuxError> {
        let timeout = self.config.app.shutdown_timeout();
        info!(devices = self.manager.client_count().await, "shutting down");

        let disconnected = bounded("disconnect_all", timeout, self.manager.disconnect_all()).await;

        self.background.close();
        bounded("background tasks", timeout, self.background.wait()).await;

        if let Err(e) = self.database.checkpoint().await {
            warn!(error = %e, "WAL checkpoint failed");
        }

        match disconnected {
            Some(result) => result,
            None => Err(WamuxError::Connection {
                message: format!(
                    "timed out disconnecting devices after {}s",
                    timeout.as_secs()
                ),
                source: None,
            }),
        }
    }

    pub fn config(&self) -> &WamuxConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<SessionManager> {
        &self.manager
    }

    pub fn registry(&self) -> &Arc<ProcessorRegistry> {
        &self.registry
    }

    pub fn whatsapp(&self) -> &WhatsAppService {
        &self.whatsapp
    }

    pub fn devices(&self) -> &DeviceService {
        &self.device_service
    }

    pub fn api_keys(&self) -> &ApiKeyService {
        &self.api_keys
    }

    pub fn device_repository(&self) -> &Arc<SqliteDeviceRepository> {
        &self.devices
    }

    pub fn quick_responses(&self) -> &Arc<SqliteQuickResponseRepository> {
        &self.quick_responses
    }
}
