use arq_lab_abstract::{Ack, Frame};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("channel i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("peer endpoint is gone")]
    Disconnected,
}

/// What one bounded wait for an acknowledgement produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A well-formed acknowledgement arrived. Whether its identifier is the
    /// awaited one is the caller's business.
    Message(Ack),
    /// A datagram arrived that does not decode as an acknowledgement.
    Malformed,
    /// The window elapsed with nothing to read.
    TimedOut,
}

/// Sender half of the channel.
pub trait SenderChannel {
    fn send_frame(&mut self, frame: &Frame) -> Result<(), ChannelError>;

    /// Block until something arrives or `timeout` elapses. This is the
    /// sender's only suspension point; implementations must sleep in the
    /// transport, never spin.
    fn wait_ack(&mut self, timeout: Duration) -> Result<WaitOutcome, ChannelError>;
}

/// Receiver half of the channel. `Peer` is the recorded return address a
/// frame arrived from, `SocketAddr` on UDP, `()` in memory.
pub trait ReceiverChannel {
    type Peer;

    /// Block for at most `poll_interval` waiting for a frame. `None` means
    /// the interval elapsed frame-less, giving the caller a chance to check
    /// its stop signal.
    fn poll_frame(
        &mut self,
        poll_interval: Duration,
    ) -> Result<Option<(Frame, Self::Peer)>, ChannelError>;

    fn send_ack(&mut self, ack: &Ack, peer: &Self::Peer) -> Result<(), ChannelError>;
}
