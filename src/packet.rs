use std::fmt;
use std::net::Ipv4Addr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{ProbeError, Result};
use crate::util;

pub const ECHO_REPLY: u8 = 0;
pub const ECHO_REQUEST: u8 = 8;

pub const IP_HEADER_LEN: usize = 20;
pub const ICMP_HEADER_LEN: usize = 8;
pub const TIMESTAMP_LEN: usize = 8;
/// Smallest datagram we can pull a reply out of
pub const MIN_REPLY_LEN: usize = IP_HEADER_LEN + ICMP_HEADER_LEN + TIMESTAMP_LEN;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct IcmpEchoHeader {
    pub message_type: u8,
    pub message_code: u8,
    pub checksum: u16,
    pub identifier: u16,
    pub sequence_num: u16,
}

/// Echo header followed by the sender's timestamp, as it goes on the wire
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct EchoMessage {
    pub header: IcmpEchoHeader,
    pub timestamp: f64,
}

#[derive(Serialize, Deserialize)]
pub struct IPv4Header {
    pub version_and_header_len: u8,
    pub type_of_service: u8,
    pub datagram_length: u16,
    pub ip_identifier: u16,
    pub flags_and_5frag_offset: u8, // flags are u3
    pub rest_of_frag_offset: u8,
    pub ttl: u8,
    pub protocol: u8,
    pub checksum: u16,
    pub source_ip: u32,
    pub destination_ip: u32,
}

/// Correlates a reply with the request that caused it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EchoIdentifier {
    pub id: u16,
    pub sequence: u16,
}

impl EchoIdentifier {
    pub fn new(id: u16, sequence: u16) -> Self {
        EchoIdentifier { id, sequence }
    }
}

impl fmt::Display for EchoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id={:#06x} seq={}", self.id, self.sequence)
    }
}

/// A received datagram, parsed from fixed offsets: IP header in the first
/// 20 bytes, ICMP header in the next 8, then the 8 byte timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoReply {
    pub source: Ipv4Addr,
    pub ttl: u8,
    pub message_type: u8,
    pub message_code: u8,
    pub checksum: u16,
    pub identifier: EchoIdentifier,
    pub timestamp: f64,
}

// ICMP uses big endian for every multi-byte field, the f64 timestamp included
#[allow(deprecated)]
fn coder() -> bincode::Config {
    let mut coder = bincode::config();
    coder.big_endian();
    coder
}

/// Seconds since the Unix epoch as a float, the unit of the wire timestamp.
pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Build an Echo Request stamped with the current time.
pub fn encode_echo_request(identifier: EchoIdentifier) -> Result<Vec<u8>> {
    encode_echo_request_at(identifier, now_seconds())
}

/// Build an Echo Request carrying `timestamp` as its payload.
///
/// The message is serialized once with a zero checksum, summed, then
/// serialized again with the real checksum in place.
pub fn encode_echo_request_at(identifier: EchoIdentifier, timestamp: f64) -> Result<Vec<u8>> {
    let coder = coder();
    let mut message = EchoMessage {
        header: IcmpEchoHeader {
            message_type: ECHO_REQUEST,
            message_code: 0,
            checksum: 0,
            identifier: identifier.id,
            sequence_num: identifier.sequence,
        },
        timestamp,
    };

    let unsummed = coder.serialize(&message)?;
    message.header.checksum = util::internet_checksum(&unsummed);

    Ok(coder.serialize(&message)?)
}

/// Parse the ICMP portion (header + timestamp) of a message, without the IP
/// header in front.
pub fn decode_echo_message(data: &[u8]) -> Result<EchoMessage> {
    if data.len() < ICMP_HEADER_LEN + TIMESTAMP_LEN {
        return Err(ProbeError::MalformedPacket { len: data.len() });
    }
    Ok(coder().deserialize::<EchoMessage>(&data[..ICMP_HEADER_LEN + TIMESTAMP_LEN])?)
}

/// Parse a datagram as read from a raw IPv4 ICMP socket.
pub fn decode_reply(data: &[u8]) -> Result<EchoReply> {
    if data.len() < MIN_REPLY_LEN {
        return Err(ProbeError::MalformedPacket { len: data.len() });
    }

    let ip = coder().deserialize::<IPv4Header>(&data[..IP_HEADER_LEN])?;
    let message = decode_echo_message(&data[IP_HEADER_LEN..])?;

    Ok(EchoReply {
        source: Ipv4Addr::from(ip.source_ip),
        ttl: ip.ttl,
        message_type: message.header.message_type,
        message_code: message.header.message_code,
        checksum: message.header.checksum,
        identifier: EchoIdentifier::new(message.header.identifier, message.header.sequence_num),
        timestamp: message.timestamp,
    })
}
