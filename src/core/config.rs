use serde::{Deserialize, Serialize};
use std::time::Duration;

/// All knobs the bridge has. There are no flags and no environment
/// variables; deployments edit the defaults and rebuild.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BridgeConfig {
    /// JSON file holding the database secret.
    pub credential_path: String,
    pub database_url: String,
    /// Watched boolean node, relative to the database root.
    pub trigger_path: String,
    /// Device endpoint pinged when the trigger fires.
    pub target_url: String,
    /// Wait bound on the ping, in seconds.
    pub wait_bound_secs: u64,
    /// Pause before reopening a dropped change stream, in seconds.
    pub reconnect_delay_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            credential_path: "serviceAccountKey.json".to_string(),
            database_url:
                "https://cryocare-46397-default-rtdb.europe-west1.firebasedatabase.app"
                    .to_string(),
            trigger_path: "device/trigger".to_string(),
            target_url: "http://192.168.1.118/servo".to_string(),
            wait_bound_secs: 10,
            reconnect_delay_secs: 2,
        }
    }
}

impl BridgeConfig {
    pub fn wait_bound(&self) -> Duration {
        Duration::from_secs(self.wait_bound_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}
