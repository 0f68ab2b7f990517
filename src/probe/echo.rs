//! ICMP echo request/reply wire codec.
//!
//! Layout: `[type:1][code:1][checksum:2][identifier:2][sequence:2][payload..]`.
//! ICMPv4 messages carry a one's-complement checksum computed here; ICMPv6
//! checksums cover a pseudo-header and are filled in by the kernel.

use thiserror::Error;

pub const ICMPV4_ECHO_REPLY: u8 = 0;
pub const ICMPV4_ECHO_REQUEST: u8 = 8;
pub const ICMPV6_ECHO_REQUEST: u8 = 128;
pub const ICMPV6_ECHO_REPLY: u8 = 129;

const HEADER_LEN: usize = 4;
const ECHO_HEADER_LEN: usize = 4;
const IPV4_MIN_HEADER_LEN: usize = 20;

/// Largest ICMP message that still fits in an IPv4 datagram.
pub const MAX_MESSAGE_LEN: usize = u16::MAX as usize - IPV4_MIN_HEADER_LEN;

/// Codec error types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("message too short: {len} bytes")]
    TooShort { len: usize },
    #[error("echo body too short: {len} bytes")]
    BodyTooShort { len: usize },
    #[error("message too large: {len} bytes")]
    TooLarge { len: usize },
}

/// Body of an echo request or reply.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EchoBody {
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl EchoBody {
    /// Encoded length of the body.
    pub fn len(&self) -> usize {
        ECHO_HEADER_LEN + self.payload.len()
    }

    fn marshal(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let len = HEADER_LEN + self.len();
        if len > MAX_MESSAGE_LEN {
            return Err(CodecError::TooLarge { len });
        }
        out.extend_from_slice(&self.identifier.to_be_bytes());
        out.extend_from_slice(&self.sequence.to_be_bytes());
        out.extend_from_slice(&self.payload);
        Ok(())
    }

    fn parse(b: &[u8]) -> Result<Self, CodecError> {
        if b.len() < ECHO_HEADER_LEN {
            return Err(CodecError::BodyTooShort { len: b.len() });
        }
        Ok(Self {
            identifier: u16::from_be_bytes([b[0], b[1]]),
            sequence: u16::from_be_bytes([b[2], b[3]]),
            payload: b[ECHO_HEADER_LEN..].to_vec(),
        })
    }
}

/// An ICMP message. Only echo messages carry a parsed body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EchoMessage {
    pub kind: u8,
    pub code: u8,
    pub checksum: u16,
    pub body: Option<EchoBody>,
}

impl EchoMessage {
    /// Build an echo request for the given address family.
    pub fn request(ipv6: bool, identifier: u16, sequence: u16, payload: Vec<u8>) -> Self {
        Self {
            kind: if ipv6 { ICMPV6_ECHO_REQUEST } else { ICMPV4_ECHO_REQUEST },
            code: 0,
            checksum: 0,
            body: Some(EchoBody {
                identifier,
                sequence,
                payload,
            }),
        }
    }

    /// Length of the body, 0 when absent.
    pub fn body_len(&self) -> usize {
        self.body.as_ref().map_or(0, EchoBody::len)
    }

    pub fn is_echo_request(&self) -> bool {
        matches!(self.kind, ICMPV4_ECHO_REQUEST | ICMPV6_ECHO_REQUEST)
    }

    /// Encode the message, filling in the checksum for ICMPv4 types.
    ///
    /// The `checksum` field of `self` is ignored.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        let mut b = Vec::with_capacity(HEADER_LEN + self.body_len());
        b.extend_from_slice(&[self.kind, self.code, 0, 0]);
        if let Some(body) = &self.body {
            body.marshal(&mut b)?;
        }

        if matches!(self.kind, ICMPV6_ECHO_REQUEST | ICMPV6_ECHO_REPLY) {
            return Ok(b);
        }

        // XOR rather than assign so a non-zero placeholder still verifies.
        let csum = checksum(&b);
        b[2] ^= (csum & 0xff) as u8;
        b[3] ^= (csum >> 8) as u8;
        Ok(b)
    }

    /// Decode a message. The checksum is read but never verified.
    pub fn decode(b: &[u8]) -> Result<Self, CodecError> {
        if b.len() < HEADER_LEN {
            return Err(CodecError::TooShort { len: b.len() });
        }

        let mut msg = Self {
            kind: b[0],
            code: b[1],
            checksum: u16::from_be_bytes([b[2], b[3]]),
            body: None,
        };

        if b.len() > HEADER_LEN {
            match msg.kind {
                ICMPV4_ECHO_REQUEST | ICMPV4_ECHO_REPLY | ICMPV6_ECHO_REQUEST | ICMPV6_ECHO_REPLY => {
                    msg.body = Some(EchoBody::parse(&b[HEADER_LEN..])?);
                }
                _ => {}
            }
        }

        Ok(msg)
    }
}

/// One's-complement checksum over little-endian 16-bit words.
///
/// The result is laid out so that its low byte goes at offset 2 and its high
/// byte at offset 3, which is network order for the on-wire checksum.
fn checksum(b: &[u8]) -> u16 {
    let mut sum: u32 = b
        .chunks(2)
        .map(|word| match word {
            [lo, hi] => u32::from(*hi) << 8 | u32::from(*lo),
            [lo] => u32::from(*lo),
            _ => 0,
        })
        .sum();
    sum = (sum >> 16) + (sum & 0xffff);
    sum += sum >> 16;
    !(sum as u16)
}

/// Strip the IPv4 header from a raw datagram.
///
/// Buffers shorter than a minimal IPv4 header are returned unchanged.
pub fn ipv4_payload(b: &[u8]) -> &[u8] {
    if b.len() < IPV4_MIN_HEADER_LEN {
        return b;
    }
    let header_len = usize::from(b[0] & 0x0f) * 4;
    b.get(header_len..).unwrap_or(&[])
}
