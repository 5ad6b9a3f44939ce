// pipewright-core/src/infrastructure/config/connection.rs

use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use super::documents::load_documents;
use crate::domain::pipeline::ConnectionConfig;

/// Connection documents keyed by name. A later file with the same name
/// replaces the earlier one.
#[instrument]
pub fn load_connections(dir: &Path) -> BTreeMap<String, ConnectionConfig> {
    let mut connections = BTreeMap::new();
    for (path, config) in load_documents::<ConnectionConfig>(dir) {
        if let Err(e) = config.validate() {
            error!(path = ?path, "Skipping invalid connection: {}", e);
            continue;
        }
        if let Some(previous) = connections.insert(config.name.clone(), config) {
            warn!(path = ?path, "Connection '{}' defined twice, keeping the last one", previous.name);
        }
    }
    info!("🔌 Loaded {} connection(s)", connections.len());
    connections
}
