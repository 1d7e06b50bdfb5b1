//! Pipeline and transport configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// When observed changes are dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchMode {
    #[default]
    /// One batch per observed update, dispatched from the producing thread.
    Immediate,
    /// Changes are queued and dispatched every `interval` or on `flush`.
    Batched {
        #[serde(with = "millis")]
        interval: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: BatchMode,
    /// Columns whose queued updates collapse to the last value.
    pub last_value_columns: Vec<String>,
    /// Replays rows present at attach time as `Add` plus a full `Update`.
    pub replay_existing: bool,
    /// Follows every `Add` with an `Update` of all columns.
    pub snapshot_adds: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: BatchMode::Immediate,
            last_value_columns: Vec::new(),
            replay_existing: true,
            snapshot_adds: false,
        }
    }
}

impl PipelineConfig {
    pub fn immediate() -> Self {
        Self::default()
    }

    pub fn batched(interval: Duration) -> Self {
        Self {
            mode: BatchMode::Batched { interval },
            ..Self::default()
        }
    }

    pub fn last_value(mut self, column: impl Into<String>) -> Self {
        self.last_value_columns.push(column.into());
        self
    }

    pub fn replay_existing(mut self, replay: bool) -> Self {
        self.replay_existing = replay;
        self
    }

    pub fn snapshot_adds(mut self, snapshot: bool) -> Self {
        self.snapshot_adds = snapshot;
        self
    }
}

/// Address and read polling of a delta stream connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub address: String,
    /// Upper bound on how long a blocked transport thread takes to notice a
    /// stop request.
    #[serde(with = "millis")]
    pub poll_interval: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:7400".into(),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl ConnectionConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
