//! Blocking UDP endpoints for live runs. The acknowledgement wait and the
//! receiver poll both ride on the socket read timeout; nothing spins.

use arq_lab_abstract::{Ack, Frame, MESSAGE_LEN};
use arq_lab_core::{ChannelError, ReceiverChannel, SenderChannel, WaitOutcome};
use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;
use tracing::debug;

/// Port the receiver listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 8080;

/// std sockets reject a zero read timeout.
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// Room for oversized datagrams so they fail decoding instead of being
/// silently clipped to `MESSAGE_LEN`.
const RECV_BUF_LEN: usize = MESSAGE_LEN * 16;

fn is_timeout(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::WouldBlock || err.kind() == io::ErrorKind::TimedOut
}

/// Sender endpoint: an ephemeral socket aimed at one receiver address.
pub struct UdpSenderChannel {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSenderChannel {
    pub fn connect(target: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self { socket, target })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl SenderChannel for UdpSenderChannel {
    fn send_frame(&mut self, frame: &Frame) -> Result<(), ChannelError> {
        self.socket.send_to(&frame.encode(), self.target)?;
        Ok(())
    }

    fn wait_ack(&mut self, timeout: Duration) -> Result<WaitOutcome, ChannelError> {
        self.socket
            .set_read_timeout(Some(timeout.max(MIN_READ_TIMEOUT)))?;
        let mut buf = [0u8; RECV_BUF_LEN];
        match self.socket.recv_from(&mut buf) {
            Ok((len, from)) => match Ack::decode(&buf[..len]) {
                Ok(ack) => Ok(WaitOutcome::Message(ack)),
                Err(err) => {
                    debug!("undecodable datagram from {}: {}", from, err);
                    Ok(WaitOutcome::Malformed)
                }
            },
            Err(err) if is_timeout(&err) => Ok(WaitOutcome::TimedOut),
            Err(err) => Err(ChannelError::Io(err)),
        }
    }
}

/// Receiver endpoint bound to a fixed address.
pub struct UdpReceiverChannel {
    socket: UdpSocket,
}

impl UdpReceiverChannel {
    pub fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl ReceiverChannel for UdpReceiverChannel {
    type Peer = SocketAddr;

    fn poll_frame(
        &mut self,
        poll_interval: Duration,
    ) -> Result<Option<(Frame, SocketAddr)>, ChannelError> {
        self.socket
            .set_read_timeout(Some(poll_interval.max(MIN_READ_TIMEOUT)))?;
        let mut buf = [0u8; RECV_BUF_LEN];
        match self.socket.recv_from(&mut buf) {
            Ok((len, peer)) => match Frame::decode(&buf[..len]) {
                Ok(frame) => Ok(Some((frame, peer))),
                Err(err) => {
                    // Skip garbage; the caller just polls again.
                    debug!("skipping undecodable datagram from {}: {}", peer, err);
                    Ok(None)
                }
            },
            Err(err) if is_timeout(&err) => Ok(None),
            Err(err) => Err(ChannelError::Io(err)),
        }
    }

    fn send_ack(&mut self, ack: &Ack, peer: &SocketAddr) -> Result<(), ChannelError> {
        self.socket.send_to(&ack.encode(), peer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arq_lab_abstract::ProtocolConfig;
    use arq_lab_core::{
        AlwaysDrop, NeverDrop, NullLogger, ReceiverControl, SendOutcome, run_receiver,
        run_sender,
    };
    use std::thread;

    fn loopback_pair() -> (UdpSenderChannel, UdpReceiverChannel) {
        let receiver = UdpReceiverChannel::bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let sender = UdpSenderChannel::connect(receiver.local_addr().unwrap()).unwrap();
        (sender, receiver)
    }

    fn quick_config(total_frames: u32, max_tries: u32) -> ProtocolConfig {
        ProtocolConfig {
            total_frames,
            max_tries,
            ack_timeout_ms: 200,
            frame_interval_ms: 0,
        }
    }

    #[test]
    fn loopback_round_trip() {
        let (mut sender, mut receiver) = loopback_pair();
        sender.send_frame(&Frame::new(1)).unwrap();
        let (frame, peer) = receiver
            .poll_frame(Duration::from_millis(500))
            .unwrap()
            .expect("frame should arrive on loopback");
        assert_eq!(frame, Frame::new(1));
        receiver.send_ack(&Ack::for_frame(&frame), &peer).unwrap();
        assert_eq!(
            sender.wait_ack(Duration::from_millis(500)).unwrap(),
            WaitOutcome::Message(Ack::new(1))
        );
    }

    #[test]
    fn quiet_socket_times_out() {
        let (mut sender, _receiver) = loopback_pair();
        assert_eq!(
            sender.wait_ack(Duration::from_millis(30)).unwrap(),
            WaitOutcome::TimedOut
        );
    }

    #[test]
    fn garbage_counts_as_malformed_arrival() {
        let (mut sender, _receiver) = loopback_pair();
        let prober = UdpSocket::bind("127.0.0.1:0").unwrap();
        prober
            .send_to(b"abc", sender.local_addr().unwrap())
            .unwrap();
        assert_eq!(
            sender.wait_ack(Duration::from_millis(500)).unwrap(),
            WaitOutcome::Malformed
        );
    }

    #[test]
    fn receiver_skips_garbage_then_takes_a_frame() {
        let (mut sender, mut receiver) = loopback_pair();
        let prober = UdpSocket::bind("127.0.0.1:0").unwrap();
        prober
            .send_to(&[0u8; 7], receiver.local_addr().unwrap())
            .unwrap();
        assert!(
            receiver
                .poll_frame(Duration::from_millis(500))
                .unwrap()
                .is_none()
        );
        sender.send_frame(&Frame::new(9)).unwrap();
        let (frame, _) = receiver
            .poll_frame(Duration::from_millis(500))
            .unwrap()
            .expect("real frame should follow the garbage");
        assert_eq!(frame.id, 9);
    }

    #[test]
    fn live_run_delivers_over_loopback() {
        let (mut sender, receiver) = loopback_pair();
        let control = ReceiverControl::new();

        let thread_control = control.clone();
        let receiver_thread = thread::spawn(move || {
            let mut receiver = receiver;
            let mut policy = NeverDrop;
            run_receiver(
                &mut receiver,
                &mut policy,
                &thread_control,
                Duration::from_millis(20),
                &NullLogger,
            )
        });

        let report = run_sender(&mut sender, &quick_config(3, 5), &NullLogger).unwrap();
        control.request_stop();
        let stats = receiver_thread.join().unwrap().unwrap();

        assert!(report.all_delivered());
        assert_eq!(report.total_transmissions(), 3);
        assert_eq!(stats.frames_received, 3);
        assert_eq!(stats.acks_sent, 3);
    }

    #[test]
    fn live_run_abandons_when_every_ack_is_dropped() {
        let (mut sender, receiver) = loopback_pair();
        let control = ReceiverControl::new();

        let thread_control = control.clone();
        let receiver_thread = thread::spawn(move || {
            let mut receiver = receiver;
            let mut policy = AlwaysDrop;
            run_receiver(
                &mut receiver,
                &mut policy,
                &thread_control,
                Duration::from_millis(20),
                &NullLogger,
            )
        });

        let config = ProtocolConfig {
            ack_timeout_ms: 100,
            ..quick_config(1, 2)
        };
        let report = run_sender(&mut sender, &config, &NullLogger).unwrap();
        control.request_stop();
        let stats = receiver_thread.join().unwrap().unwrap();

        assert_eq!(
            report.outcome_for(1),
            Some(SendOutcome::Abandoned { attempts: 2 })
        );
        assert_eq!(stats.frames_received, 2);
        assert_eq!(stats.acks_sent, 0);
        assert_eq!(stats.acks_dropped, 2);
    }
}
