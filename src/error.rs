use std::fmt;
use std::io;

/// Errors surfaced by the probe engine and the entry glue.
///
/// Per-probe conditions (timeouts, unreachable replies) are not errors: they
/// are folded into a `ProbeOutcome` by the transport. Only the variants here
/// leave the layer that produced them.
#[derive(Debug)]
pub enum ProbeError {
    /// Received datagram is shorter than IP + ICMP header + timestamp
    MalformedPacket { len: usize },
    Codec(String),
    Resolution { host: String, reason: String },
    /// Raw socket creation was refused by the OS
    Privilege(io::Error),
    Io(io::Error),
    InvalidInput(String),
}

impl ProbeError {
    /// Whether the whole run has to stop. Anything else may be retried by
    /// asking the user again.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProbeError::Privilege(_))
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeError::MalformedPacket { len } => {
                write!(f, "Malformed packet: {} bytes received", len)
            }
            ProbeError::Codec(msg) => write!(f, "Packet codec error: {}", msg),
            ProbeError::Resolution { host, reason } => {
                write!(f, "Cannot resolve {}: {}", host, reason)
            }
            ProbeError::Privilege(e) => write!(
                f,
                "Cannot open raw ICMP socket ({}), try running with elevated privileges",
                e
            ),
            ProbeError::Io(e) => write!(f, "I/O error: {}", e),
            ProbeError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProbeError::Privilege(e) | ProbeError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ProbeError {
    fn from(err: io::Error) -> Self {
        ProbeError::Io(err)
    }
}

impl From<bincode::Error> for ProbeError {
    fn from(err: bincode::Error) -> Self {
        ProbeError::Codec(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProbeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_privilege_is_fatal() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert!(ProbeError::Privilege(denied).is_fatal());
        assert!(!ProbeError::MalformedPacket { len: 10 }.is_fatal());
        assert!(!ProbeError::Resolution {
            host: "nowhere.invalid".to_string(),
            reason: "no address".to_string()
        }
        .is_fatal());
    }

    #[test]
    fn display_mentions_length() {
        let e = ProbeError::MalformedPacket { len: 10 };
        assert!(e.to_string().contains("10 bytes"));
    }
}
