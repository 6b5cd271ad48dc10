// SPDX-FileCopyrightText: 2026 Wamux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session manager: the single owner of live device clients.
//!
//! Each device name maps to a slot that is reserved under a short write
//! lock and filled outside of it. A slow or stalled open therefore only
//! holds up callers asking for that same device. Removal takes the entry
//! out of the map first and tears the client down without any lock held.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use wamux_config::WhatsAppConfig;
use wamux_core::validation::validate_device_name;
use wamux_core::{ConnectionInfo, EventHandler, ProtocolConnector, WamuxError};

use crate::client::{ClientSettings, DeviceClient};
use crate::store::SessionStore;

/// A device's client, possibly still being opened.
type Slot = Arc<OnceCell<Arc<DeviceClient>>>;

pub struct SessionManager {
    store: SessionStore,
    connector: Arc<dyn ProtocolConnector>,
    handler: Arc<dyn EventHandler>,
    settings: ClientSettings,
    purge_on_remove: bool,
    auto_connect: bool,
    clients: RwLock<HashMap<String, Slot>>,
}

impl SessionManager {
    pub fn new(
        config: &WhatsAppConfig,
        connector: Arc<dyn ProtocolConnector>,
        handler: Arc<dyn EventHandler>,
    ) -> Self {
        Self {
            store: SessionStore::new(&config.stores_dir),
            connector,
            handler,
            settings: ClientSettings::from(config),
            purge_on_remove: config.purge_session_on_remove,
            auto_connect: config.auto_connect,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Returns the live client for `device_name`, constructing it if absent.
    /// Repeated and concurrent calls yield the same instance.
    pub async fn create_client(&self, device_name: &str) -> Result<Arc<DeviceClient>, WamuxError> {
        if let Some(client) = self.get_client(device_name).await {
            return Ok(client);
        }

        let slot = self.reserve(device_name).await;
        match slot.get_or_try_init(|| self.open_client(device_name)).await {
            Ok(client) => {
                let client = client.clone();
                Ok(self.publish(device_name, &slot, client).await)
            }
            Err(e) => {
                let mut clients = self.clients.write().await;
                let ours = clients
                    .get(device_name)
                    .is_some_and(|current| Arc::ptr_eq(current, &slot) && !current.initialized());
                if ours {
                    clients.remove(device_name);
                }
                Err(e)
            }
        }
    }

    /// Finds or inserts the slot for `device_name`. Check and insert happen
    /// under one write lock.
    async fn reserve(&self, device_name: &str) -> Slot {
        self.clients
            .write()
            .await
            .entry(device_name.to_string())
            .or_default()
            .clone()
    }

    /// Makes sure a freshly opened client is tracked. A slot dropped by a
    /// concurrent failure or `disconnect_all` is put back; a client published
    /// by another slot in the meantime wins.
    async fn publish(&self, device_name: &str, slot: &Slot, client: Arc<DeviceClient>) -> Arc<DeviceClient> {
        let mut clients = self.clients.write().await;
        match clients.get(device_name) {
            Some(current) if Arc::ptr_eq(current, slot) => client,
            Some(current) if current.initialized() => match current.get() {
                Some(winner) => winner.clone(),
                None => client,
            },
            _ => {
                clients.insert(device_name.to_string(), slot.clone());
                client
            }
        }
    }

    async fn open_client(&self, device_name: &str) -> Result<Arc<DeviceClient>, WamuxError> {
        self.store.ensure_dir().await?;
        let client = DeviceClient::open(
            device_name,
            &self.store,
            self.connector.as_ref(),
            self.handler.clone(),
            self.settings.clone(),
        )
        .await?;
        info!(device = %device_name, "device client created");
        Ok(Arc::new(client))
    }

    pub async fn get_client(&self, device_name: &str) -> Option<Arc<DeviceClient>> {
        self.clients
            .read()
            .await
            .get(device_name)
            .and_then(|slot| slot.get().cloned())
    }

    /// Disconnects and forgets a client. Disconnect failures are logged; the
    /// entry is removed regardless. A client still being opened counts as
    /// absent.
    pub async fn remove_client(&self, device_name: &str) -> Result<(), WamuxError> {
        let client = {
            let mut clients = self.clients.write().await;
            let client = clients.get(device_name).and_then(|slot| slot.get().cloned());
            if client.is_some() {
                clients.remove(device_name);
            }
            client
        };
        let Some(client) = client else {
            return Err(WamuxError::not_found(format!("device '{device_name}'")));
        };

        if let Err(e) = client.disconnect().await {
            warn!(device = %device_name, error = %e, "disconnect failed during removal");
        }
        drop(client);

        if self.purge_on_remove {
            match self.store.purge(device_name).await {
                Ok(true) => debug!(device = %device_name, "session store purged"),
                Ok(false) => {}
                Err(e) => warn!(device = %device_name, error = %e, "failed to purge session store"),
            }
        }
        info!(device = %device_name, "device client removed");
        Ok(())
    }

    /// Creates a client for every credential file in the stores directory,
    /// creating the directory on first run. A device that fails to load is
    /// logged and skipped. Returns how many clients were loaded.
    pub async fn load_existing_devices(&self) -> Result<usize, WamuxError> {
        self.store.ensure_dir().await?;
        let names = self.store.scan().await?;
        let mut loaded = 0;

        for name in names {
            if let Err(e) = validate_device_name(&name) {
                warn!(device = %name, error = %e, "skipping session file with invalid device name");
                continue;
            }
            let client = match self.create_client(&name).await {
                Ok(client) => client,
                Err(e) => {
                    warn!(device = %name, error = %e, "failed to load device");
                    continue;
                }
            };
            loaded += 1;

            if self.auto_connect && client.is_logged_in() && !client.is_connected() {
                if let Err(e) = client.connect().await {
                    warn!(device = %name, error = %e, "failed to reconnect device");
                }
            }
        }

        info!(loaded, "existing devices loaded");
        Ok(loaded)
    }

    /// Disconnects every client and empties the map. Per-device failures are
    /// combined into one error attributed by device name.
    pub async fn disconnect_all(&self) -> Result<(), WamuxError> {
        let mut drained: Vec<(String, Arc<DeviceClient>)> = self
            .clients
            .write()
            .await
            .drain()
            .filter_map(|(name, slot)| slot.get().cloned().map(|client| (name, client)))
            .collect();
        drained.sort_by(|a, b| a.0.cmp(&b.0));

        let outcomes = futures::future::join_all(
            drained
                .iter()
                .map(|(name, client)| async move { (name.as_str(), client.disconnect().await) }),
        )
        .await;

        let failures: Vec<String> = outcomes
            .into_iter()
            .filter_map(|(name, outcome)| outcome.err().map(|e| format!("{name}: {e}")))
            .collect();

        info!(devices = drained.len(), failed = failures.len(), "all devices disconnected");
        if failures.is_empty() {
            Ok(())
        } else {
            Err(WamuxError::Connection {
                message: format!("failed to disconnect some devices: {}", failures.join("; ")),
                source: None,
            })
        }
    }

    /// Live clients, without slots that are still opening.
    async fn live_clients(&self) -> Vec<(String, Arc<DeviceClient>)> {
        self.clients
            .read()
            .await
            .iter()
            .filter_map(|(name, slot)| slot.get().map(|client| (name.clone(), client.clone())))
            .collect()
    }

    /// Device names with a live client, sorted.
    pub async fn list_clients(&self) -> Vec<String> {
        let mut names: Vec<String> = self.live_clients().await.into_iter().map(|(name, _)| name).collect();
        names.sort();
        names
    }

    pub async fn client_count(&self) -> usize {
        self.live_clients().await.len()
    }

    pub async fn connected_count(&self) -> usize {
        self.live_clients()
            .await
            .iter()
            .filter(|(_, client)| client.is_connected())
            .count()
    }

    pub async fn get_all_connection_info(&self) -> Vec<ConnectionInfo> {
        let mut infos: Vec<ConnectionInfo> = self
            .live_clients()
            .await
            .iter()
            .map(|(_, client)| client.connection_info())
            .collect();
        infos.sort_by(|a, b| a.device_name.cmp(&b.device_name));
        infos
    }
}
