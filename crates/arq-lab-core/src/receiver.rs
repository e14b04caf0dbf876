use crate::channel::{ChannelError, ReceiverChannel};
use crate::event::{ProtocolEvent, ProtocolLogger};
use crate::policy::DropPolicy;
use arq_lab_abstract::Ack;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Shared stop signal for a receiver loop. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct ReceiverControl {
    stop: Arc<AtomicBool>,
}

impl ReceiverControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Receiver-side tallies for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverStats {
    pub frames_received: u64,
    pub acks_sent: u64,
    pub acks_dropped: u64,
}

/// Serve frames until `control` asks for a stop, checked once per poll
/// interval. Each arrival gets one fresh policy decision; the loop keeps
/// no memory of prior frames, so a retransmission is handled exactly like
/// a new frame.
pub fn run_receiver<C: ReceiverChannel>(
    channel: &mut C,
    policy: &mut dyn DropPolicy,
    control: &ReceiverControl,
    poll_interval: Duration,
    logger: &dyn ProtocolLogger,
) -> Result<ReceiverStats, ChannelError> {
    let mut stats = ReceiverStats::default();
    while !control.should_stop() {
        let Some((frame, peer)) = channel.poll_frame(poll_interval)? else {
            continue;
        };
        stats.frames_received += 1;
        logger.log(ProtocolEvent::FrameReceived { id: frame.id });
        if policy.should_drop(&frame) {
            stats.acks_dropped += 1;
            logger.log(ProtocolEvent::AckDropped { id: frame.id });
            continue;
        }
        let ack = Ack::for_frame(&frame);
        channel.send_ack(&ack, &peer)?;
        stats.acks_sent += 1;
        logger.log(ProtocolEvent::AckSent { id: ack.id });
    }
    Ok(stats)
}
