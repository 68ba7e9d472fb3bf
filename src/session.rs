use std::io::Write;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::info;

use crate::error::Result;
use crate::packet::EchoIdentifier;
use crate::ping::Transport;
use crate::report::Reporter;
use crate::stats::SessionStats;

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub count: u32,
    pub timeout: Duration,
    /// Pause between two probes
    pub interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            count: 4,
            timeout: Duration::from_secs(1),
            interval: Duration::from_secs(1),
        }
    }
}

/// Sequential probing of one destination. One probe is in flight at a time.
pub struct Session<T: Transport> {
    destination: Ipv4Addr,
    id: u16, // Used as 'identifier' word to match echo requests/replies
    config: SessionConfig,
    transport: T,
}

impl<T: Transport> Session<T> {
    /// A session identified by the low 16 bits of the process id.
    pub fn new(destination: Ipv4Addr, config: SessionConfig, transport: T) -> Self {
        Self::with_id(destination, config, transport, std::process::id() as u16)
    }

    pub fn with_id(destination: Ipv4Addr, config: SessionConfig, transport: T, id: u16) -> Self {
        Session {
            destination,
            id,
            config,
            transport,
        }
    }

    /// Send `count` probes, reporting each as it completes, then the summary.
    ///
    /// Clearing `running` stops the session before the next probe; the probes
    /// already sent are still summarised. Only failing to reach the network
    /// at all aborts with an error.
    pub fn run<W: Write>(
        &mut self,
        host: &str,
        reporter: &mut Reporter<W>,
        running: &AtomicBool,
    ) -> Result<SessionStats> {
        let mut stats = SessionStats::new();
        info!(
            "Probing {} ({}) {} times, id={:#06x}, timeout {:?}",
            host, self.destination, self.config.count, self.id, self.config.timeout
        );
        reporter.header(host, self.destination)?;

        for i in 0..self.config.count {
            if !running.load(Ordering::SeqCst) {
                info!("Session interrupted after {} probes", stats.sent);
                break;
            }

            let identifier = EchoIdentifier::new(self.id, i as u16);
            let outcome = self.transport.probe(self.destination, identifier, self.config.timeout)?;

            stats.record(&outcome);
            reporter.probe(self.destination, identifier, &outcome)?;

            if i + 1 < self.config.count {
                thread::sleep(self.config.interval);
            }
        }

        reporter.summary(host, &stats)?;
        Ok(stats)
    }
}
