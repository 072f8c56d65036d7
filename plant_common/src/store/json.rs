//! File-backed order store.

use super::{consume_by_color, OrderConfig, OrderStore, PersistedOrder, StoreError};
use crate::color::BoxColor;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// On-disk document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct OrderDocument {
    #[serde(default)]
    config: OrderConfig,
    #[serde(default)]
    orders: Vec<PersistedOrder>,
}

/// Order store persisted as a single JSON document.
///
/// ```json
/// {
///   "config": { "order_count": 1, "order_color": "GREEN", ... },
///   "orders": [ { "client": "rafael_ltda", "color": "GREEN", "boxes_remaining": 5, "resource": 5 } ]
/// }
/// ```
///
/// Every mutation rewrites the document through a temporary file and a
/// rename, so a crash never leaves a truncated file behind.
pub struct JsonOrderStore {
    path: PathBuf,
    clients: Vec<String>,
    doc: Mutex<OrderDocument>,
}

impl JsonOrderStore {
    /// Open the store at `path`, creating it with defaults if missing.
    ///
    /// # Errors
    ///
    /// - `StoreError::Io` if the file cannot be read or created
    /// - `StoreError::Parse` if the file is not a valid document
    /// - `StoreError::Validation` if the stored config is invalid for `clients`
    pub fn open<S: AsRef<str>>(path: &Path, clients: &[S]) -> Result<Self, StoreError> {
        let clients: Vec<String> = clients.iter().map(|c| c.as_ref().to_string()).collect();
        let doc = if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))?;
            let doc: OrderDocument = serde_json::from_str(&content)
                .map_err(|e| StoreError::Parse(format!("{}: {e}", path.display())))?;
            doc.config.validate(&clients)?;
            info!(
                path = %path.display(),
                open_orders = doc.orders.len(),
                "Order store loaded"
            );
            doc
        } else {
            let doc = OrderDocument::default();
            write_document(path, &doc)?;
            info!(path = %path.display(), "Order store created with defaults");
            doc
        };

        Ok(Self {
            path: path.to_path_buf(),
            clients,
            doc: Mutex::new(doc),
        })
    }

    /// Replace the order configuration and persist it.
    pub fn update_config(&self, config: OrderConfig) -> Result<(), StoreError> {
        config.validate(&self.clients)?;
        let mut doc = self.doc.lock();
        let mut next = doc.clone();
        next.config = config;
        write_document(&self.path, &next)?;
        *doc = next;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OrderStore for JsonOrderStore {
    fn get_config(&self) -> OrderConfig {
        self.doc.lock().config.clone()
    }

    fn add_persistent_order(
        &self,
        client: &str,
        color: BoxColor,
        boxes: u32,
        resource: u32,
    ) -> Result<(), StoreError> {
        if boxes == 0 {
            return Err(StoreError::Validation("boxes must be >= 1".to_string()));
        }
        let mut doc = self.doc.lock();
        let mut next = doc.clone();
        next.orders.push(PersistedOrder {
            client: client.to_string(),
            color,
            boxes_remaining: boxes,
            resource,
        });
        write_document(&self.path, &next)?;
        *doc = next;
        debug!(%client, %color, boxes, "Order persisted");
        Ok(())
    }

    fn consume_persistent_order_by_color(&self, color: BoxColor) -> Result<bool, StoreError> {
        let mut doc = self.doc.lock();
        let mut next = doc.clone();
        if !consume_by_color(&mut next.orders, color) {
            return Ok(false);
        }
        write_document(&self.path, &next)?;
        *doc = next;
        Ok(true)
    }

    fn persisted_orders(&self) -> Vec<PersistedOrder> {
        self.doc.lock().orders.clone()
    }
}

fn write_document(path: &Path, doc: &OrderDocument) -> Result<(), StoreError> {
    let content =
        serde_json::to_string_pretty(doc).map_err(|e| StoreError::Parse(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|e| StoreError::Io(format!("{}: {e}", tmp.display())))?;
    fs::rename(&tmp, path).map_err(|e| StoreError::Io(format!("{}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEFAULT_CLIENTS;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.json");

        let store = JsonOrderStore::open(&path, &DEFAULT_CLIENTS).unwrap();
        assert!(path.exists());
        assert_eq!(store.get_config(), OrderConfig::default());
        assert!(store.persisted_orders().is_empty());
    }

    #[test]
    fn orders_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.json");

        let store = JsonOrderStore::open(&path, &DEFAULT_CLIENTS).unwrap();
        store
            .add_persistent_order("maria_sa", BoxColor::Blue, 2, 1)
            .unwrap();
        assert!(store.consume_persistent_order_by_color(BoxColor::Blue).unwrap());
        drop(store);

        let store = JsonOrderStore::open(&path, &DEFAULT_CLIENTS).unwrap();
        let orders = store.persisted_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].boxes_remaining, 1);
        assert_eq!(orders[0].client, "maria_sa");
    }

    #[test]
    fn consume_without_match_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.json");
        let store = JsonOrderStore::open(&path, &DEFAULT_CLIENTS).unwrap();
        store
            .add_persistent_order("ana_ind", BoxColor::Green, 1, 1)
            .unwrap();
        let before = fs::read_to_string(&path).unwrap();

        assert!(!store.consume_persistent_order_by_color(BoxColor::Blue).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn corrupt_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.json");
        fs::write(&path, "{ not json").unwrap();

        let result = JsonOrderStore::open(&path, &DEFAULT_CLIENTS);
        assert!(matches!(result, Err(StoreError::Parse(_))));
    }

    #[test]
    fn invalid_stored_client_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.json");
        fs::write(&path, r#"{"config": {"order_client": "nobody"}}"#).unwrap();

        let result = JsonOrderStore::open(&path, &DEFAULT_CLIENTS);
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn update_config_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orders.json");
        let store = JsonOrderStore::open(&path, &DEFAULT_CLIENTS).unwrap();

        let config = OrderConfig {
            order_color: BoxColor::Blue,
            order_client: "joao_corp".to_string(),
            ..Default::default()
        };
        store.update_config(config.clone()).unwrap();
        drop(store);

        let store = JsonOrderStore::open(&path, &DEFAULT_CLIENTS).unwrap();
        assert_eq!(store.get_config(), config);
    }
}
