use std::io::{self, ErrorKind};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::{Duration, Instant};

use log::{debug, warn};
use socket2::{Domain, Protocol, SockAddr, Socket};

use crate::error::{ProbeError, Result};
use crate::packet::{self, EchoIdentifier, EchoReply};

// These two keep the meaning the reference ping gave them, which is swapped
// relative to RFC 792: type 3 is Destination Unreachable and type 11 is Time
// Exceeded. Replies of type 3 are reported as overtime and type 11 as
// unreachable.
pub const ICMP_TYPE_OVERTIME: u8 = 3;
pub const ICMP_TYPE_UNREACHABLE: u8 = 11;

const RECV_BUFFER_LEN: usize = 1024;

// Linux errno values, std has no stable ErrorKind for them
const ENETUNREACH: i32 = 101;
const EHOSTUNREACH: i32 = 113;

/// Result of one probe. Exactly one is produced per probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeOutcome {
    /// Round trip time in seconds
    Success(f64),
    TimedOut,
    Unreachable,
    OtherFailure,
}

/// Something that can send one echo request and wait for its answer.
///
/// `Err` is for failing to get hold of the network at all; anything that goes
/// wrong with sending the request or with the reply is an `Ok` outcome.
pub trait Transport {
    fn probe(
        &mut self,
        destination: Ipv4Addr,
        identifier: EchoIdentifier,
        timeout: Duration,
    ) -> Result<ProbeOutcome>;
}

/// What the receive step observed, before classification.
#[derive(Debug)]
pub enum Received {
    Datagram(Result<EchoReply>),
    Nothing,
}

/// Map what arrived (or didn't) onto a `ProbeOutcome`.
///
/// `now` is in seconds since the epoch, the same clock as the embedded
/// timestamp.
pub fn classify(
    received: Received,
    expected: EchoIdentifier,
    waited: Duration,
    timeout: Duration,
    now: f64,
) -> ProbeOutcome {
    let reply = match received {
        Received::Nothing => return ProbeOutcome::OtherFailure,
        Received::Datagram(Err(e)) => {
            warn!("Discarding reply for {}: {}", expected, e);
            return ProbeOutcome::OtherFailure;
        }
        Received::Datagram(Ok(reply)) => reply,
    };

    if reply.identifier == expected && reply.message_type == packet::ECHO_REPLY {
        ProbeOutcome::Success((now - reply.timestamp).max(0.0))
    } else if waited > timeout || reply.message_type == ICMP_TYPE_OVERTIME {
        ProbeOutcome::TimedOut
    } else if reply.message_type == ICMP_TYPE_UNREACHABLE {
        ProbeOutcome::Unreachable
    } else {
        debug!(
            "Unmatched reply from {} (ttl {}): type={} code={} {} (expected {})",
            reply.source,
            reply.ttl,
            reply.message_type,
            reply.message_code,
            reply.identifier,
            expected
        );
        ProbeOutcome::OtherFailure
    }
}

/// Outcome of a probe whose request never left the host.
pub fn send_failure(err: &io::Error) -> ProbeOutcome {
    match err.raw_os_error() {
        Some(ENETUNREACH) | Some(EHOSTUNREACH) => ProbeOutcome::Unreachable,
        _ => {
            warn!("Sending echo request failed: {}", err);
            ProbeOutcome::OtherFailure
        }
    }
}

/// Errors from a blocking receive that just mean the wait is over. A signal
/// (Ctrl-C) interrupts the wait without restarting it.
fn ends_wait(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}

/// Raw ICMPv4 transport. A fresh socket is opened for every probe and closed
/// when the probe returns.
pub struct RawTransport {
    ttl: Option<u32>,
}

impl RawTransport {
    pub fn new() -> Self {
        RawTransport { ttl: None }
    }

    pub fn set_ttl(&mut self, ttl: u32) {
        self.ttl = Some(ttl);
    }

    fn open(&self) -> Result<Socket> {
        let stype = socket2::Type::raw().cloexec();
        let socket = Socket::new(Domain::ipv4(), stype, Some(Protocol::icmpv4())).map_err(|e| {
            if e.kind() == ErrorKind::PermissionDenied {
                ProbeError::Privilege(e)
            } else {
                ProbeError::Io(e)
            }
        })?;

        if let Some(ttl) = self.ttl {
            socket.set_ttl(ttl)?;
        }
        Ok(socket)
    }

    /// Wait for one datagram addressed to us, skipping copies of our own
    /// requests that loop back on the raw socket.
    fn receive(&self, socket: &Socket, deadline: Instant) -> Result<Received> {
        let mut buf = [0u8; RECV_BUFFER_LEN];

        loop {
            // A zero timeval would mean "block forever"
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining < Duration::from_millis(1) {
                return Ok(Received::Nothing);
            }
            socket.set_read_timeout(Some(remaining))?;

            let len = match socket.recv_from(&mut buf[..]) {
                Ok((len, _from)) => len,
                Err(ref e) if ends_wait(e) => return Ok(Received::Nothing),
                Err(e) => return Err(e.into()),
            };

            let reply = packet::decode_reply(&buf[..len]);
            if let Ok(ref r) = reply {
                if r.message_type == packet::ECHO_REQUEST {
                    continue;
                }
            }
            return Ok(Received::Datagram(reply));
        }
    }
}

impl Default for RawTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for RawTransport {
    fn probe(
        &mut self,
        destination: Ipv4Addr,
        identifier: EchoIdentifier,
        timeout: Duration,
    ) -> Result<ProbeOutcome> {
        let socket = self.open()?;
        let sock_addr = SockAddr::from(SocketAddr::from((IpAddr::V4(destination), 0)));

        let request = packet::encode_echo_request(identifier)?;
        if let Err(e) = socket.send_to(&request, &sock_addr) {
            return Ok(send_failure(&e));
        }
        debug!("Sent echo request to {} ({})", destination, identifier);

        let begin = Instant::now();
        let received = self.receive(&socket, begin + timeout)?;
        let waited = begin.elapsed();

        let outcome = classify(received, identifier, waited, timeout, packet::now_seconds());
        debug!("Probe {} finished after {:?}: {:?}", identifier, waited, outcome);
        Ok(outcome)
    }
}
