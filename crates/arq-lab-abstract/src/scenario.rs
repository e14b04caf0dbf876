use crate::config::{DropSpec, LinkConfig, ProtocolConfig};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub description: String,
    pub protocol: ProtocolConfigOverride,
    pub link: LinkConfigOverride,
    pub policy: DropSpec,
    pub assertions: Vec<TestAssertion>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ProtocolConfigOverride {
    pub total_frames: Option<u32>,
    pub max_tries: Option<u32>,
    pub ack_timeout_ms: Option<u64>,
    pub frame_interval_ms: Option<u64>,
}

impl ProtocolConfigOverride {
    pub fn apply_to(&self, config: &mut ProtocolConfig) {
        if let Some(v) = self.total_frames {
            config.total_frames = v;
        }
        if let Some(v) = self.max_tries {
            config.max_tries = v;
        }
        if let Some(v) = self.ack_timeout_ms {
            config.ack_timeout_ms = v;
        }
        if let Some(v) = self.frame_interval_ms {
            config.frame_interval_ms = v;
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct LinkConfigOverride {
    pub loss_rate: Option<f64>,
    pub min_latency: Option<u64>,
    pub max_latency: Option<u64>,
    pub seed: Option<u64>,
}

impl LinkConfigOverride {
    pub fn apply_to(&self, config: &mut LinkConfig) {
        if let Some(v) = self.loss_rate {
            config.loss_rate = v;
        }
        if let Some(v) = self.min_latency {
            config.min_latency = v;
        }
        if let Some(v) = self.max_latency {
            config.max_latency = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestAssertion {
    /// Assert that a frame's session ended in success, optionally after an
    /// exact number of attempts
    FrameDelivered { id: u32, attempts: Option<u32> },
    /// Assert that a frame's session exhausted every attempt unacknowledged
    FrameAbandoned { id: u32 },
    /// Assert that the total number of frame transmissions is within range
    TransmissionCount { min: u32, max: Option<u32> },
    /// Assert how many acknowledgements the receiver actually put on the wire
    AcksSent { count: u64 },
    /// Assert that delivered frames completed in identifier order
    DeliveredInOrder,
    /// Assert that the run finishes within time
    MaxDuration { ms: u64 },
}
