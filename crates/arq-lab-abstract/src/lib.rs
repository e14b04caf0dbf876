pub mod config;
pub mod scenario;
pub mod wire;

pub use config::{DropSpec, LinkConfig, ProtocolConfig};
pub use scenario::{
    LinkConfigOverride, ProtocolConfigOverride, TestAssertion, TestScenario,
};
pub use wire::{Ack, Frame, MESSAGE_LEN, WireError};
