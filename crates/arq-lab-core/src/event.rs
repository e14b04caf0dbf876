use std::fmt;
use std::sync::Mutex;
use std::time::Instant;

/// Everything the protocol reports, one discrete event per occurrence, in
/// the order it happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolEvent {
    /// Sender put a frame on the wire (`attempt` counts from 1).
    FrameSent { id: u32, attempt: u32 },
    /// Sender received the acknowledgement it was waiting for.
    AckReceived { id: u32 },
    /// Sender received an acknowledgement for some other frame.
    StaleAck { got: u32, want: u32 },
    /// Sender received a datagram that does not decode.
    AckUnreadable { want: u32 },
    /// One attempt's acknowledgement window elapsed.
    AttemptTimedOut { id: u32, attempt: u32 },
    /// Frame session ended in success.
    FrameDelivered { id: u32, attempts: u32 },
    /// Frame session exhausted every attempt.
    FrameAbandoned { id: u32, attempts: u32 },
    /// Receiver took a frame off the wire.
    FrameReceived { id: u32 },
    /// Receiver discarded the acknowledgement instead of sending it.
    AckDropped { id: u32 },
    /// Receiver put an acknowledgement on the wire.
    AckSent { id: u32 },
}

impl fmt::Display for ProtocolEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FrameSent { id, attempt } => {
                write!(f, "frame_sent id={} attempt={}", id, attempt)
            }
            Self::AckReceived { id } => write!(f, "ack_received id={}", id),
            Self::StaleAck { got, want } => {
                write!(f, "stale_ack got={} want={}", got, want)
            }
            Self::AckUnreadable { want } => write!(f, "ack_unreadable want={}", want),
            Self::AttemptTimedOut { id, attempt } => {
                write!(f, "attempt_timed_out id={} attempt={}", id, attempt)
            }
            Self::FrameDelivered { id, attempts } => {
                write!(f, "frame_delivered id={} attempts={}", id, attempts)
            }
            Self::FrameAbandoned { id, attempts } => {
                write!(f, "frame_abandoned id={} attempts={}", id, attempts)
            }
            Self::FrameReceived { id } => write!(f, "frame_received id={}", id),
            Self::AckDropped { id } => write!(f, "ack_dropped id={}", id),
            Self::AckSent { id } => write!(f, "ack_sent id={}", id),
        }
    }
}

/// Sink for protocol events. Implementations can write to tracing, record
/// for assertions, or discard.
pub trait ProtocolLogger: Send + Sync {
    fn log(&self, event: ProtocolEvent);
}

/// Logger that uses the `tracing` crate.
pub struct TracingLogger;

impl ProtocolLogger for TracingLogger {
    fn log(&self, event: ProtocolEvent) {
        // The event stream is the lab's primary output; only the oddball
        // arrivals are demoted to debug.
        match event {
            ProtocolEvent::StaleAck { .. } | ProtocolEvent::AckUnreadable { .. } => {
                tracing::debug!("{}", event);
            }
            _ => {
                tracing::info!("{}", event);
            }
        }
    }
}

/// No-op logger that discards all events.
pub struct NullLogger;

impl ProtocolLogger for NullLogger {
    fn log(&self, _event: ProtocolEvent) {}
}

/// Logger that keeps every event in order, stamped with milliseconds since
/// its creation, for tests and run reports.
pub struct RecordingLogger {
    started: Instant,
    events: Mutex<Vec<(u64, ProtocolEvent)>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Vec<ProtocolEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event)| *event)
            .collect()
    }

    /// Events with their offsets from logger creation.
    pub fn timeline(&self) -> Vec<(u64, ProtocolEvent)> {
        self.events.lock().unwrap().clone()
    }
}

impl Default for RecordingLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtocolLogger for RecordingLogger {
    fn log(&self, event: ProtocolEvent) {
        let at = self.started.elapsed().as_millis() as u64;
        self.events.lock().unwrap().push((at, event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_render_as_key_value_lines() {
        assert_eq!(
            ProtocolEvent::FrameSent { id: 3, attempt: 2 }.to_string(),
            "frame_sent id=3 attempt=2"
        );
        assert_eq!(
            ProtocolEvent::StaleAck { got: 1, want: 2 }.to_string(),
            "stale_ack got=1 want=2"
        );
        assert_eq!(
            ProtocolEvent::FrameAbandoned { id: 4, attempts: 5 }.to_string(),
            "frame_abandoned id=4 attempts=5"
        );
    }

    #[test]
    fn recording_logger_keeps_order() {
        let logger = RecordingLogger::new();
        logger.log(ProtocolEvent::FrameSent { id: 1, attempt: 1 });
        logger.log(ProtocolEvent::AckReceived { id: 1 });
        assert_eq!(
            logger.snapshot(),
            vec![
                ProtocolEvent::FrameSent { id: 1, attempt: 1 },
                ProtocolEvent::AckReceived { id: 1 },
            ]
        );
    }
}
