pub mod channel;
pub mod event;
pub mod policy;
pub mod receiver;
pub mod sender;

pub use channel::{ChannelError, ReceiverChannel, SenderChannel, WaitOutcome};
pub use event::{NullLogger, ProtocolEvent, ProtocolLogger, RecordingLogger, TracingLogger};
pub use policy::{AlwaysDrop, DropPolicy, NeverDrop, RandomDrop, ScriptedDrop};
pub use receiver::{ReceiverControl, ReceiverStats, run_receiver};
pub use sender::{SendOutcome, SenderReport, run_sender, send_frame};
