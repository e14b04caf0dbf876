use crate::channel::{ChannelError, SenderChannel, WaitOutcome};
use crate::event::{ProtocolEvent, ProtocolLogger};
use arq_lab_abstract::{Frame, ProtocolConfig};
use std::thread;

/// How one frame's session ended. Abandonment is a reported outcome, not
/// an error; channel failures are the only `Err` the sender produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Acknowledged on the `attempts`-th transmission.
    Delivered { attempts: u32 },
    /// Every attempt went unacknowledged.
    Abandoned { attempts: u32 },
}

impl SendOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SendOutcome::Delivered { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            SendOutcome::Delivered { attempts } | SendOutcome::Abandoned { attempts } => attempts,
        }
    }
}

/// Per-frame retry state. Created when the frame's transmission begins and
/// dropped when the session ends; nothing carries over to the next frame.
struct FrameSession {
    frame: Frame,
    attempts: u32,
}

impl FrameSession {
    fn new(id: u32) -> Self {
        Self {
            frame: Frame::new(id),
            attempts: 0,
        }
    }
}

/// Drive one frame to delivery or abandonment: transmit, wait out the
/// acknowledgement window, retransmit on anything but the awaited
/// acknowledgement. At most one transmission is ever outstanding.
pub fn send_frame<C: SenderChannel>(
    channel: &mut C,
    id: u32,
    config: &ProtocolConfig,
    logger: &dyn ProtocolLogger,
) -> Result<SendOutcome, ChannelError> {
    let mut session = FrameSession::new(id);
    while session.attempts < config.max_tries {
        session.attempts += 1;
        channel.send_frame(&session.frame)?;
        logger.log(ProtocolEvent::FrameSent {
            id,
            attempt: session.attempts,
        });
        match channel.wait_ack(config.ack_timeout())? {
            WaitOutcome::Message(ack) if ack.matches(id) => {
                logger.log(ProtocolEvent::AckReceived { id });
                logger.log(ProtocolEvent::FrameDelivered {
                    id,
                    attempts: session.attempts,
                });
                return Ok(SendOutcome::Delivered {
                    attempts: session.attempts,
                });
            }
            // Any arrival that is not the awaited acknowledgement costs the
            // attempt, exactly like a timeout.
            WaitOutcome::Message(ack) => {
                logger.log(ProtocolEvent::StaleAck { got: ack.id, want: id });
            }
            WaitOutcome::Malformed => {
                logger.log(ProtocolEvent::AckUnreadable { want: id });
            }
            WaitOutcome::TimedOut => {
                logger.log(ProtocolEvent::AttemptTimedOut {
                    id,
                    attempt: session.attempts,
                });
            }
        }
    }
    logger.log(ProtocolEvent::FrameAbandoned {
        id,
        attempts: session.attempts,
    });
    Ok(SendOutcome::Abandoned {
        attempts: session.attempts,
    })
}

/// Summary of a whole sender run, one entry per frame in session order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderReport {
    pub outcomes: Vec<(u32, SendOutcome)>,
}

impl SenderReport {
    pub fn delivered_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_delivered())
            .count()
    }

    pub fn all_delivered(&self) -> bool {
        self.delivered_count() == self.outcomes.len()
    }

    /// Total frame transmissions across every session.
    pub fn total_transmissions(&self) -> u32 {
        self.outcomes.iter().map(|(_, outcome)| outcome.attempts()).sum()
    }

    pub fn outcome_for(&self, id: u32) -> Option<SendOutcome> {
        self.outcomes
            .iter()
            .find(|(frame_id, _)| *frame_id == id)
            .map(|(_, outcome)| *outcome)
    }
}

/// The sender process: frames `1..=total_frames`, strictly one session at
/// a time, pausing `frame_interval` between consecutive frames. A frame
/// that gets abandoned does not stop the run.
pub fn run_sender<C: SenderChannel>(
    channel: &mut C,
    config: &ProtocolConfig,
    logger: &dyn ProtocolLogger,
) -> Result<SenderReport, ChannelError> {
    let mut outcomes = Vec::with_capacity(config.total_frames as usize);
    for id in 1..=config.total_frames {
        let outcome = send_frame(channel, id, config, logger)?;
        outcomes.push((id, outcome));
        if id != config.total_frames {
            thread::sleep(config.frame_interval());
        }
    }
    Ok(SenderReport { outcomes })
}
