use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Frames transferred in one sender run.
pub const DEFAULT_TOTAL_FRAMES: u32 = 5;
/// Transmission attempts per frame before the sender gives up.
pub const DEFAULT_MAX_TRIES: u32 = 5;
/// How long one attempt waits for an acknowledgement.
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 2_000;
/// Pause between consecutive frame sessions.
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 1_000;
/// Chance that the receiver discards an acknowledgement (one in four).
pub const DEFAULT_DROP_PROBABILITY: f64 = 0.25;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub total_frames: u32,
    pub max_tries: u32,
    pub ack_timeout_ms: u64,
    pub frame_interval_ms: u64,
}

impl ProtocolConfig {
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            total_frames: DEFAULT_TOTAL_FRAMES,
            max_tries: DEFAULT_MAX_TRIES,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

/// Fault model of the channel itself. Defaults are lossless with
/// loopback-scale latency; acknowledgement loss is the receiver's policy,
/// not the link's.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub loss_rate: f64,
    pub min_latency: u64,
    pub max_latency: u64,
    pub seed: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            loss_rate: 0.0,
            min_latency: 1,
            max_latency: 5,
            seed: 0,
        }
    }
}

/// Serializable description of the receiver's acknowledgement-drop policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropSpec {
    /// Acknowledge every frame.
    Never,
    /// Discard every acknowledgement.
    Always,
    /// Independent seeded draw per received frame.
    Random { probability: f64, seed: u64 },
    /// Fixed decision sequence (`true` discards), then no further drops.
    Script { decisions: Vec<bool> },
}

impl Default for DropSpec {
    fn default() -> Self {
        DropSpec::Random {
            probability: DEFAULT_DROP_PROBABILITY,
            seed: 0,
        }
    }
}
