use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::fs;

use lottery_common::network::Network;

use crate::{error::NodeResult, node::NodeSnapshot};

/// JSON file holding the node snapshot of one network.
pub struct SnapshotStorage {
    path: PathBuf,
}

impl SnapshotStorage {
    pub async fn new(storage_dir: PathBuf, network: Network) -> NodeResult<Self> {
        if !storage_dir.exists() {
            fs::create_dir_all(&storage_dir).await?;
            if log::log_enabled!(log::Level::Info) {
                info!("Created storage directory: {:?}", storage_dir);
            }
        }

        Ok(Self {
            path: storage_dir.join(format!("lottery_{}.json", network)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved snapshot, if any. A file that cannot be parsed is an
    /// error: starting over would lose the funds it records.
    pub async fn load(&self) -> NodeResult<Option<NodeSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        if log::log_enabled!(log::Level::Debug) {
            debug!("Loading snapshot from: {:?}", self.path);
        }
        let content = fs::read_to_string(&self.path).await?;
        let snapshot = serde_json::from_str(&content)?;
        Ok(Some(snapshot))
    }

    /// Write through a temporary file so a crash never leaves a torn snapshot.
    pub async fn save(&self, snapshot: &NodeSnapshot) -> NodeResult<()> {
        let content = serde_json::to_string_pretty(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;

        if log::log_enabled!(log::Level::Debug) {
            debug!("Saved snapshot to: {:?}", self.path);
        }
        Ok(())
    }
}
