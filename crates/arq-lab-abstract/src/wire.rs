use thiserror::Error;

/// Exact size of every datagram on the wire: one unsigned 32-bit
/// identifier, big-endian, no header. Frames and acknowledgements share
/// the layout; direction tells them apart.
pub const MESSAGE_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WireError {
    #[error("datagram too short ({len} bytes, need {MESSAGE_LEN})")]
    Truncated { len: usize },
    #[error("datagram too long ({len} bytes, expected {MESSAGE_LEN})")]
    Oversized { len: usize },
}

fn decode_id(buf: &[u8]) -> Result<u32, WireError> {
    if buf.len() < MESSAGE_LEN {
        return Err(WireError::Truncated { len: buf.len() });
    }
    if buf.len() > MESSAGE_LEN {
        return Err(WireError::Oversized { len: buf.len() });
    }
    let mut raw = [0u8; MESSAGE_LEN];
    raw.copy_from_slice(buf);
    Ok(u32::from_be_bytes(raw))
}

/// A data frame, carrying nothing but its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub id: u32,
}

impl Frame {
    pub fn new(id: u32) -> Self {
        Self { id }
    }

    pub fn encode(&self) -> [u8; MESSAGE_LEN] {
        self.id.to_be_bytes()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        Ok(Self { id: decode_id(buf)? })
    }
}

/// An acknowledgement, echoing the identifier of the frame it confirms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub id: u32,
}

impl Ack {
    pub fn new(id: u32) -> Self {
        Self { id }
    }

    /// The acknowledgement a receiver produces for `frame`.
    pub fn for_frame(frame: &Frame) -> Self {
        Self { id: frame.id }
    }

    /// Identifier equality is the only check the protocol performs.
    pub fn matches(&self, frame_id: u32) -> bool {
        self.id == frame_id
    }

    pub fn encode(&self) -> [u8; MESSAGE_LEN] {
        self.id.to_be_bytes()
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        Ok(Self { id: decode_id(buf)? })
    }
}
