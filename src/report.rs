use std::io::{self, Write};
use std::net::Ipv4Addr;

use colored::*;

use crate::packet::EchoIdentifier;
use crate::ping::ProbeOutcome;
use crate::stats::SessionStats;

/// Writes per-probe and summary lines to any text sink.
pub struct Reporter<W: Write> {
    out: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(out: W) -> Self {
        Reporter { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn header(&mut self, host: &str, destination: Ipv4Addr) -> io::Result<()> {
        writeln!(self.out, "{} {} ({})", "PING".cyan(), host.bold(), destination)
    }

    pub fn probe(
        &mut self,
        destination: Ipv4Addr,
        identifier: EchoIdentifier,
        outcome: &ProbeOutcome,
    ) -> io::Result<()> {
        match *outcome {
            ProbeOutcome::Success(rtt) => writeln!(
                self.out,
                "Receive from: {}, icmp_seq={}, delay = {}ms",
                destination.to_string().yellow(),
                identifier.sequence.to_string().bold(),
                ((rtt * 1000.0) as u64).to_string().bold()
            ),
            ref failure => writeln!(
                self.out,
                "{} {}.",
                "Fail to connect.".red(),
                failure_reason(failure)
            ),
        }
    }

    pub fn summary(&mut self, host: &str, stats: &SessionStats) -> io::Result<()> {
        writeln!(self.out)?;
        writeln!(
            self.out,
            "{} {} {} {}",
            "===".yellow(),
            host.bold(),
            "ping statistics".cyan(),
            "===".yellow()
        )?;

        match (stats.max_delay(), stats.min_delay(), stats.avg_delay()) {
            (Some(max), Some(min), Some(avg)) => {
                writeln!(
                    self.out,
                    "Send: {}, success: {}, lost: {}, rate of success: {}%.",
                    stats.sent,
                    stats.received,
                    stats.lost,
                    format!("{:.1}", stats.success_rate()).bold()
                )?;
                writeln!(
                    self.out,
                    "MaxTime = {}ms, MinTime = {}ms, AvgTime = {}ms",
                    max as u64, min as u64, avg as u64
                )
            }
            _ => writeln!(
                self.out,
                "Send: {}, success: {}, lost: {}, rate of success: {}%",
                stats.sent,
                stats.received,
                stats.lost,
                "0.0".bold()
            ),
        }
    }
}

/// Text shown for a probe that did not come back.
pub fn failure_reason(outcome: &ProbeOutcome) -> &'static str {
    match outcome {
        ProbeOutcome::Unreachable => "Destination Host/Network Unreachable",
        _ => "Request overtime",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> Reporter<Vec<u8>> {
        colored::control::set_override(false);
        Reporter::new(Vec::new())
    }

    fn text(reporter: Reporter<Vec<u8>>) -> String {
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn success_line_uses_whole_milliseconds() {
        let mut reporter = plain();
        let dest = Ipv4Addr::new(1, 1, 1, 1);
        reporter
            .probe(dest, EchoIdentifier::new(1, 3), &ProbeOutcome::Success(0.0127))
            .unwrap();
        assert_eq!(text(reporter), "Receive from: 1.1.1.1, icmp_seq=3, delay = 12ms\n");
    }

    #[test]
    fn failure_lines() {
        let mut reporter = plain();
        let dest = Ipv4Addr::new(10, 0, 0, 1);
        let id = EchoIdentifier::new(1, 0);
        reporter.probe(dest, id, &ProbeOutcome::Unreachable).unwrap();
        reporter.probe(dest, id, &ProbeOutcome::TimedOut).unwrap();
        reporter.probe(dest, id, &ProbeOutcome::OtherFailure).unwrap();

        let out = text(reporter);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Fail to connect. Destination Host/Network Unreachable.");
        assert_eq!(lines[1], "Fail to connect. Request overtime.");
        assert_eq!(lines[2], "Fail to connect. Request overtime.");
    }

    #[test]
    fn summary_with_replies() {
        let mut stats = SessionStats::new();
        stats.record(&ProbeOutcome::Success(0.0045));
        stats.record(&ProbeOutcome::Success(0.0125));
        stats.record(&ProbeOutcome::TimedOut);

        let mut reporter = plain();
        reporter.summary("example.org", &stats).unwrap();
        let out = text(reporter);

        assert!(out.contains("=== example.org ping statistics ==="));
        assert!(out.contains("Send: 3, success: 2, lost: 1, rate of success: 66.7%."));
        assert!(out.contains("MaxTime = 12ms, MinTime = 4ms, AvgTime = 8ms"));
    }

    #[test]
    fn summary_without_replies() {
        let mut stats = SessionStats::new();
        for _ in 0..3 {
            stats.record(&ProbeOutcome::Unreachable);
        }

        let mut reporter = plain();
        reporter.summary("10.0.0.1", &stats).unwrap();
        let out = text(reporter);

        assert!(out.contains("Send: 3, success: 0, lost: 3, rate of success: 0.0%"));
        assert!(!out.contains("MaxTime"));
    }
}
