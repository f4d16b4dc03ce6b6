//! Chain configuration, loadable from the `chain:` section of a scenario file.

use serde::{Deserialize, Serialize};

use tezid_core::Timestamp;

/// 2021-01-01T00:00:00Z
const DEFAULT_GENESIS_EPOCH_SECS: i64 = 1_609_459_200;

/// Parameters of the in-process chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChainConfig {
    /// Timestamp of level 0.
    pub genesis_time: Timestamp,
    /// Seconds added by a bake with no explicit duration.
    pub block_time_secs: u64,
    /// Internal operations allowed per operation group.
    pub max_operations_per_group: usize,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            genesis_time: Timestamp::from_epoch_secs(DEFAULT_GENESIS_EPOCH_SECS)
                .unwrap_or_else(|_| Timestamp::from_utc(Default::default())),
            block_time_secs: 30,
            max_operations_per_group: 1_000,
        }
    }
}
