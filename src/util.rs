use std::net::{IpAddr, Ipv4Addr};

use crate::error::{ProbeError, Result};

/// Resolve a hostname or dotted-quad literal to a single IPv4 address.
pub fn resolve_dest(dest: &str) -> Result<Ipv4Addr> {
    let dest = dest.trim();
    if dest.is_empty() {
        return Err(ProbeError::InvalidInput("empty destination".to_string()));
    }

    if let Ok(addr) = dest.parse::<Ipv4Addr>() {
        return Ok(addr);
    }

    let addrs = dns_lookup::lookup_host(dest).map_err(|e| ProbeError::Resolution {
        host: dest.to_string(),
        reason: e.to_string(),
    })?;

    addrs
        .into_iter()
        .find_map(|addr| match addr {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        })
        .ok_or_else(|| ProbeError::Resolution {
            host: dest.to_string(),
            reason: "no IPv4 address".to_string(),
        })
}

/// Internet checksum (RFC 1071) of `data`.
///
/// Bytes are paired little-endian (`data[2k+1]` high, `data[2k]` low), the
/// complemented sum is then byte-swapped so the returned value is in network
/// order. Callers write it big-endian into the checksum field.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let sum = fold(sum_le_words(data));
    let answer = !sum & 0xFFFF;
    (answer as u16).swap_bytes()
}

/// True when the one's complement sum over `data`, checksum field included,
/// folds to 0xFFFF.
pub fn verify_checksum(data: &[u8]) -> bool {
    fold(sum_le_words(data)) & 0xFFFF == 0xFFFF
}

/// Sum all words (16 bit chunks) in the given data, each treated as little
/// endian. A trailing odd byte is added on its own.
fn sum_le_words(data: &[u8]) -> u32 {
    data.chunks(2)
        .map(|word| match *word {
            [wl] => wl as u16,
            [wl, wh] => u16::from_le_bytes([wl, wh]),
            _ => unreachable!(),
        })
        .fold(0u32, |acc, w| acc.wrapping_add(w as u32))
}

fn fold(sum: u32) -> u32 {
    let sum = (sum >> 16) + (sum & 0xFFFF);
    sum + (sum >> 16)
}
