use arq_lab_abstract::{Ack, Frame, LinkConfig};
use arq_lab_core::{ChannelError, ReceiverChannel, SenderChannel, WaitOutcome};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Sender-side endpoint of an in-memory unreliable link.
pub struct LinkSender {
    frames: mpsc::Sender<Frame>,
    acks: mpsc::Receiver<Ack>,
}

/// Receiver-side endpoint of an in-memory unreliable link.
pub struct LinkReceiver {
    frames: mpsc::Receiver<Frame>,
    acks: mpsc::Sender<Ack>,
}

/// Build a connected endpoint pair over a channel with the given fault
/// model. Each direction runs its own relay thread and draws loss and
/// latency from its own seeded stream, so fixed seeds replay exactly.
/// Relays exit once their ingress endpoint is dropped.
pub fn pair(config: &LinkConfig) -> (LinkSender, LinkReceiver) {
    let (frames_in, frames_relay) = mpsc::channel();
    let (frames_out, frames_deliver) = mpsc::channel();
    let (acks_in, acks_relay) = mpsc::channel();
    let (acks_out, acks_deliver) = mpsc::channel();

    let frame_cfg = config.clone();
    let ack_cfg = config.clone();
    let frame_seed = config.seed;
    let ack_seed = config.seed.wrapping_add(1);
    thread::spawn(move || relay("frame", frames_relay, frames_out, frame_cfg, frame_seed));
    thread::spawn(move || relay("ack", acks_relay, acks_out, ack_cfg, ack_seed));

    (
        LinkSender {
            frames: frames_in,
            acks: acks_deliver,
        },
        LinkReceiver {
            frames: frames_deliver,
            acks: acks_in,
        },
    )
}

fn relay<T: Send + 'static>(
    label: &'static str,
    ingress: mpsc::Receiver<T>,
    egress: mpsc::Sender<T>,
    config: LinkConfig,
    seed: u64,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    for message in ingress {
        if rng.random::<f64>() < config.loss_rate {
            debug!("{} lost in channel", label);
            continue;
        }
        let latency = rng.random_range(config.min_latency..=config.max_latency);
        thread::sleep(Duration::from_millis(latency));
        if egress.send(message).is_err() {
            break;
        }
    }
}

impl SenderChannel for LinkSender {
    fn send_frame(&mut self, frame: &Frame) -> Result<(), ChannelError> {
        self.frames
            .send(*frame)
            .map_err(|_| ChannelError::Disconnected)
    }

    fn wait_ack(&mut self, timeout: Duration) -> Result<WaitOutcome, ChannelError> {
        match self.acks.recv_timeout(timeout) {
            Ok(ack) => Ok(WaitOutcome::Message(ack)),
            Err(RecvTimeoutError::Timeout) => Ok(WaitOutcome::TimedOut),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }
}

impl ReceiverChannel for LinkReceiver {
    type Peer = ();

    fn poll_frame(
        &mut self,
        poll_interval: Duration,
    ) -> Result<Option<(Frame, ())>, ChannelError> {
        match self.frames.recv_timeout(poll_interval) {
            Ok(frame) => Ok(Some((frame, ()))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(ChannelError::Disconnected),
        }
    }

    fn send_ack(&mut self, ack: &Ack, _peer: &()) -> Result<(), ChannelError> {
        self.acks
            .send(*ack)
            .map_err(|_| ChannelError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant_link(loss_rate: f64, seed: u64) -> LinkConfig {
        LinkConfig {
            loss_rate,
            min_latency: 0,
            max_latency: 0,
            seed,
        }
    }

    fn drain(receiver: &mut LinkReceiver) -> Vec<u32> {
        let mut ids = Vec::new();
        loop {
            match receiver.poll_frame(Duration::from_millis(50)) {
                Ok(Some((frame, _))) => ids.push(frame.id),
                Ok(None) => continue,
                Err(_) => break,
            }
        }
        ids
    }

    #[test]
    fn lossless_link_delivers_in_order() {
        let (mut sender, mut receiver) = pair(&instant_link(0.0, 0));
        for id in 1..=3 {
            sender.send_frame(&Frame::new(id)).unwrap();
        }
        drop(sender);
        assert_eq!(drain(&mut receiver), vec![1, 2, 3]);
    }

    #[test]
    fn acks_flow_back_to_the_sender() {
        let (mut sender, mut receiver) = pair(&instant_link(0.0, 0));
        receiver.send_ack(&Ack::new(7), &()).unwrap();
        match sender.wait_ack(Duration::from_millis(500)).unwrap() {
            WaitOutcome::Message(ack) => assert_eq!(ack, Ack::new(7)),
            other => panic!("expected an ack, got {:?}", other),
        }
    }

    #[test]
    fn quiet_link_times_out() {
        let (mut sender, _receiver) = pair(&instant_link(0.0, 0));
        assert_eq!(
            sender.wait_ack(Duration::from_millis(20)).unwrap(),
            WaitOutcome::TimedOut
        );
    }

    #[test]
    fn lossy_link_replays_per_seed() {
        let deliveries = |seed: u64| {
            let (mut sender, mut receiver) = pair(&instant_link(0.5, seed));
            for id in 1..=20 {
                sender.send_frame(&Frame::new(id)).unwrap();
            }
            drop(sender);
            drain(&mut receiver)
        };
        let first = deliveries(42);
        let second = deliveries(42);
        assert_eq!(first, second);
        assert!(first.len() < 20, "a half-lossy link should drop something");
    }
}
