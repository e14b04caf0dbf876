use arq_lab_abstract::{LinkConfig, ProtocolConfig};
use arq_lab_core::{ProtocolEvent, ReceiverStats, SenderReport};
use serde::Serialize;

/// One rendered protocol event for visualization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    pub time: u64,
    pub description: String,
}

/// Per-frame result, flattened for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameSummary {
    pub id: u32,
    pub delivered: bool,
    pub attempts: u32,
}

/// Serializable summary of one run: what happened to every frame, what the
/// receiver counted, and the full event sequence.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub protocol: ProtocolConfig,
    pub link: LinkConfig,
    pub frames: Vec<FrameSummary>,
    pub receiver: ReceiverStats,
    pub duration_ms: u64,
    pub events: Vec<EventSummary>,
}

impl RunReport {
    pub fn new(
        scenario: String,
        protocol: ProtocolConfig,
        link: LinkConfig,
        sender: &SenderReport,
        receiver: ReceiverStats,
        duration_ms: u64,
        timeline: &[(u64, ProtocolEvent)],
    ) -> Self {
        let frames = sender
            .outcomes
            .iter()
            .map(|(id, outcome)| FrameSummary {
                id: *id,
                delivered: outcome.is_delivered(),
                attempts: outcome.attempts(),
            })
            .collect();
        let events = timeline
            .iter()
            .map(|(time, event)| EventSummary {
                time: *time,
                description: event.to_string(),
            })
            .collect();
        Self {
            scenario,
            protocol,
            link,
            frames,
            receiver,
            duration_ms,
            events,
        }
    }

    pub fn delivered_count(&self) -> usize {
        self.frames.iter().filter(|frame| frame.delivered).count()
    }
}
